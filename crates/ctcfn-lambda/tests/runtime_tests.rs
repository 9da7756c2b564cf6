//! The Runtime API loop against a mock Lambda service.

use ctcfn_engine::{CustomResourceHandler, HandlerConfig};
use ctcfn_lambda::runtime::{RuntimeClient, process_next};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NEXT: &str = "/2018-06-01/runtime/invocation/next";

fn runtime_for(server: &MockServer) -> RuntimeClient {
    RuntimeClient::new(reqwest::Client::new(), &server.address().to_string())
}

fn handler() -> CustomResourceHandler {
    CustomResourceHandler::new(HandlerConfig::default()).expect("handler")
}

fn create_event(server: &MockServer) -> Value {
    json!({
        "RequestType": "Create",
        "ResponseURL": format!("{}/cfn-response", server.uri()),
        "StackId": "stack",
        "RequestId": "cfn-req-1",
        "LogicalResourceId": "MyFnCommercetools",
        "ResourceProperties": {
            "fnName": "myFn",
            "authHost": server.uri(),
            "apiHost": server.uri(),
            "projectKey": "shop",
            "clientId": "client",
            "clientSecret": "secret"
        }
    })
}

async fn mount_next(server: &MockServer, event: Value) {
    Mock::given(method("GET"))
        .and(path(NEXT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Lambda-Runtime-Aws-Request-Id", "inv-1")
                .set_body_json(event),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn handled_event_is_reported_as_response() {
    let server = MockServer::start().await;
    mount_next(&server, create_event(&server)).await;
    Mock::given(method("PUT"))
        .and(path("/cfn-response"))
        .and(body_partial_json(json!({
            "Status": "SUCCESS",
            "PhysicalResourceId": r#"{"subscriptions":[],"extensions":[]}"#,
            "Reason": "See the details in CloudWatch Log Stream: stream-1"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2018-06-01/runtime/invocation/inv-1/response"))
        .and(body_partial_json(json!({ "Status": "SUCCESS" })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    process_next(&runtime_for(&server), &handler(), Some("stream-1"))
        .await
        .unwrap();
}

#[tokio::test]
async fn unacknowledgeable_event_is_reported_as_error() {
    let server = MockServer::start().await;
    let mut event = create_event(&server);
    event.as_object_mut().unwrap().remove("ResponseURL");
    mount_next(&server, event).await;
    Mock::given(method("POST"))
        .and(path("/2018-06-01/runtime/invocation/inv-1/error"))
        .and(header("Lambda-Runtime-Function-Error-Type", "Unhandled"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    process_next(&runtime_for(&server), &handler(), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn missing_request_id_header_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NEXT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = runtime_for(&server).next_invocation().await.unwrap_err();
    assert!(err.to_string().contains("Lambda-Runtime-Aws-Request-Id"));
}

#[tokio::test]
async fn init_error_is_posted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2018-06-01/runtime/init/error"))
        .and(body_partial_json(json!({
            "errorMessage": "failed to load configuration",
            "errorType": "Runtime.Unhandled"
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    runtime_for(&server)
        .post_init_error("failed to load configuration")
        .await
        .unwrap();
}

#[tokio::test]
async fn non_json_invocation_is_reported_before_failing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NEXT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Lambda-Runtime-Aws-Request-Id", "inv-1")
                .set_body_string("not json"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2018-06-01/runtime/invocation/inv-1/error"))
        .and(header("Lambda-Runtime-Function-Error-Type", "Unhandled"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let err = runtime_for(&server).next_invocation().await.unwrap_err();
    assert!(err.to_string().contains("not JSON"));
}
