//! Minimal client for the AWS Lambda Runtime API.
//!
//! See <https://docs.aws.amazon.com/lambda/latest/dg/runtimes-api.html>.

use anyhow::{Context, Result, anyhow, bail};
use ctcfn_engine::{CustomResourceHandler, InvocationContext};
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};

const API_VERSION: &str = "2018-06-01";
const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";
const ERROR_TYPE_HEADER: &str = "Lambda-Runtime-Function-Error-Type";

/// One event handed out by the Runtime API.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub request_id: String,
    pub event: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorReport<'a> {
    error_message: &'a str,
    error_type: &'a str,
}

pub struct RuntimeClient {
    http: Client,
    base_url: String,
}

impl RuntimeClient {
    /// `api` is the `host:port` found in `AWS_LAMBDA_RUNTIME_API`.
    pub fn new(http: Client, api: &str) -> Self {
        Self {
            http,
            base_url: format!("http://{api}/{API_VERSION}/runtime"),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api = std::env::var("AWS_LAMBDA_RUNTIME_API")
            .context("AWS_LAMBDA_RUNTIME_API is not set; use `invoke` outside Lambda")?;
        // `next` long-polls until an event arrives, so no request timeout.
        let http = Client::builder()
            .build()
            .context("failed to build runtime HTTP client")?;
        Ok(Self::new(http, &api))
    }

    pub async fn next_invocation(&self) -> Result<Invocation> {
        let resp = self
            .http
            .get(format!("{}/invocation/next", self.base_url))
            .send()
            .await
            .context("failed to fetch next invocation")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("Runtime API returned HTTP {status} for next invocation: {text}");
        }

        let request_id = resp
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("next invocation carries no {REQUEST_ID_HEADER} header"))?;
        let body = resp
            .text()
            .await
            .context("failed to read next invocation body")?;
        let event = match serde_json::from_str(&body) {
            Ok(event) => event,
            Err(e) => {
                let message = format!("invocation body is not JSON: {e}");
                self.post_error(&request_id, &message).await?;
                bail!(message);
            }
        };

        Ok(Invocation { request_id, event })
    }

    pub async fn post_response(&self, request_id: &str, body: &Value) -> Result<()> {
        let url = format!("{}/invocation/{request_id}/response", self.base_url);
        let resp = self.http.post(url).json(body).send().await?;
        check(resp, "invocation response").await
    }

    pub async fn post_error(&self, request_id: &str, message: &str) -> Result<()> {
        let url = format!("{}/invocation/{request_id}/error", self.base_url);
        self.report(url, message).await
    }

    pub async fn post_init_error(&self, message: &str) -> Result<()> {
        let url = format!("{}/init/error", self.base_url);
        self.report(url, message).await
    }

    async fn report(&self, url: String, message: &str) -> Result<()> {
        let report = ErrorReport {
            error_message: message,
            error_type: "Runtime.Unhandled",
        };
        let resp = self
            .http
            .post(url)
            .header(ERROR_TYPE_HEADER, "Unhandled")
            .json(&report)
            .send()
            .await?;
        check(resp, "error report").await
    }
}

async fn check(resp: reqwest::Response, what: &str) -> Result<()> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let text = resp.text().await.unwrap_or_default();
    bail!("Runtime API rejected {what} with HTTP {status}: {text}")
}

/// Fetch, handle and report one invocation.
///
/// An event that could not be acknowledged at all is reported as an
/// invocation error; everything else already went to CloudFormation.
pub async fn process_next(
    runtime: &RuntimeClient,
    handler: &CustomResourceHandler,
    log_stream_name: Option<&str>,
) -> Result<()> {
    let invocation = runtime.next_invocation().await?;
    let context = InvocationContext {
        request_id: invocation.request_id.clone(),
        log_stream_name: log_stream_name.map(str::to_string),
    };

    match handler.handle(&invocation.event, &context).await {
        Ok(status) => {
            runtime
                .post_response(&invocation.request_id, &json!({ "Status": status }))
                .await
        }
        Err(e) => {
            tracing::error!(request_id = %invocation.request_id, error = %e, "Event could not be acknowledged");
            runtime
                .post_error(&invocation.request_id, &e.to_string())
                .await
        }
    }
}

/// Serve invocations until the Runtime API fails; Lambda recycles the sandbox then.
pub async fn run(
    runtime: &RuntimeClient,
    handler: &CustomResourceHandler,
    log_stream_name: Option<&str>,
) -> Result<()> {
    tracing::info!(log_stream = log_stream_name.unwrap_or("-"), "Waiting for invocations");
    loop {
        process_next(runtime, handler, log_stream_name).await?;
    }
}
