//! Entry point for one custom resource event.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use ctcfn_commercetools::{ApiResult, ClientConfig, CommercetoolsApi, CommercetoolsClient};
use futures_util::FutureExt;
use reqwest::Client;
use serde_json::Value;

use crate::config::{HandlerConfig, HttpSettings};
use crate::dispatcher::{ReconcileOutcome, dispatch};
use crate::error::{EngineError, EngineResult};
use crate::signaler::{Acknowledgement, ResponseSignaler, ResponseStatus};
use crate::types::{Correlation, DesiredProperties, LifecycleRequest};

/// Identity of the current Lambda invocation.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    pub request_id: String,
    pub log_stream_name: Option<String>,
}

impl InvocationContext {
    /// Where this invocation's logs end up; the request id when unknown.
    pub fn log_stream(&self) -> &str {
        self.log_stream_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.request_id)
    }
}

/// Builds the commercetools client for one request's declared project.
pub type ApiFactory = Arc<
    dyn Fn(&DesiredProperties, &HttpSettings) -> ApiResult<Box<dyn CommercetoolsApi>> + Send + Sync,
>;

fn http_api(props: &DesiredProperties, http: &HttpSettings) -> ApiResult<Box<dyn CommercetoolsApi>> {
    let client = CommercetoolsClient::new(ClientConfig {
        api_host: props.api_host.clone(),
        credentials: props.credentials(),
        timeout: http.timeout(),
        connect_timeout: http.connect_timeout(),
    })?;
    Ok(Box::new(client))
}

pub struct CustomResourceHandler {
    config: HandlerConfig,
    signaler: ResponseSignaler,
    api_factory: ApiFactory,
}

impl CustomResourceHandler {
    pub fn new(config: HandlerConfig) -> EngineResult<Self> {
        let client = Client::builder()
            .timeout(config.http.timeout())
            .connect_timeout(config.http.connect_timeout())
            .build()
            .map_err(|e| EngineError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            signaler: ResponseSignaler::new(client),
            api_factory: Arc::new(http_api),
        })
    }

    /// Replace how the commercetools client is built.
    pub fn with_api_factory(mut self, factory: ApiFactory) -> Self {
        self.api_factory = factory;
        self
    }

    /// Reconcile `event` and acknowledge it exactly once.
    ///
    /// Errors and panics during reconciliation turn into a `FAILED`
    /// acknowledgement. Only an event without a usable `ResponseURL` returns
    /// `Err`, since there is nobody to acknowledge to.
    pub async fn handle(
        &self,
        event: &Value,
        invocation: &InvocationContext,
    ) -> EngineResult<ResponseStatus> {
        let correlation = Correlation::from_event(event)?;

        let request_type = event
            .get("RequestType")
            .and_then(Value::as_str)
            .unwrap_or("?");
        tracing::info!(
            request_type,
            request_id = %correlation.request_id,
            logical_resource_id = %correlation.logical_resource_id,
            physical_resource_id = correlation.prior_token().unwrap_or(invocation.log_stream()),
            "Received custom resource event"
        );

        let result = AssertUnwindSafe(self.reconcile(event))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                Err(EngineError::Panicked(msg))
            });

        let ack = match &result {
            Ok(outcome) => Acknowledgement::success(&correlation, invocation, outcome),
            Err(e) => {
                tracing::error!(error = %e, input_error = e.is_input_error(), "Reconciliation failed");
                Acknowledgement::failed(&correlation, invocation, e)
            }
        };

        self.signaler.send(&correlation.response_url, &ack).await;
        Ok(ack.status)
    }

    async fn reconcile(&self, event: &Value) -> EngineResult<ReconcileOutcome> {
        let request = LifecycleRequest::decode(event)?;
        let api = (self.api_factory)(&request.properties, &self.config.http)
            .map_err(EngineError::Client)?;

        dispatch(api.as_ref(), &request, self.config.retry.policy()).await
    }
}
