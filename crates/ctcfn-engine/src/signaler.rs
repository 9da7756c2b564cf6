//! The single acknowledgement sent back to CloudFormation.

use std::collections::BTreeMap;

use reqwest::{Client, header};
use serde::Serialize;

use crate::dispatcher::ReconcileOutcome;
use crate::error::EngineError;
use crate::handler::InvocationContext;
use crate::types::Correlation;

/// Longest failure message carried in `Reason`; CloudFormation rejects
/// response bodies over 4096 bytes.
const MAX_FAILURE_MESSAGE_LEN: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Acknowledgement {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub data: BTreeMap<String, String>,
}

impl Acknowledgement {
    pub fn success(
        correlation: &Correlation,
        invocation: &InvocationContext,
        outcome: &ReconcileOutcome,
    ) -> Self {
        let physical_resource_id = match &outcome.physical_resource_id {
            Some(id) => id.to_token(),
            None => fallback_physical_id(correlation, invocation),
        };
        Self {
            status: ResponseStatus::Success,
            reason: log_stream_reason(invocation),
            physical_resource_id,
            stack_id: correlation.stack_id.clone(),
            request_id: correlation.request_id.clone(),
            logical_resource_id: correlation.logical_resource_id.clone(),
            data: outcome.data.clone(),
        }
    }

    /// Failure never carries a new identifier, so CloudFormation keeps the prior one.
    pub fn failed(
        correlation: &Correlation,
        invocation: &InvocationContext,
        error: &EngineError,
    ) -> Self {
        let text = error.to_string();
        let message = truncate(&text, MAX_FAILURE_MESSAGE_LEN);
        Self {
            status: ResponseStatus::Failed,
            reason: format!("{message}. {}", log_stream_reason(invocation)),
            physical_resource_id: fallback_physical_id(correlation, invocation),
            stack_id: correlation.stack_id.clone(),
            request_id: correlation.request_id.clone(),
            logical_resource_id: correlation.logical_resource_id.clone(),
            data: BTreeMap::new(),
        }
    }
}

fn log_stream_reason(invocation: &InvocationContext) -> String {
    format!(
        "See the details in CloudWatch Log Stream: {}",
        invocation.log_stream()
    )
}

/// The caller's prior token, or the log stream name on Create; the field is
/// mandatory and must not be empty.
fn fallback_physical_id(correlation: &Correlation, invocation: &InvocationContext) -> String {
    correlation
        .prior_token()
        .unwrap_or_else(|| invocation.log_stream())
        .to_string()
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Delivers acknowledgements to the pre-signed response URL.
pub struct ResponseSignaler {
    client: Client,
}

impl ResponseSignaler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// One PUT, no retry. Returns whether the endpoint accepted it.
    ///
    /// The pre-signed URL is signed without a content type, so the header is
    /// sent empty.
    pub async fn send(&self, response_url: &str, ack: &Acknowledgement) -> bool {
        let body = match serde_json::to_string(ack) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize acknowledgement");
                return false;
            }
        };

        tracing::info!(
            status = ?ack.status,
            physical_resource_id = %ack.physical_resource_id,
            "Sending acknowledgement"
        );

        let result = self
            .client
            .put(response_url)
            .header(header::CONTENT_TYPE, "")
            .header(header::CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(status = resp.status().as_u16(), "Acknowledgement delivered");
                true
            }
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                tracing::error!(
                    status = status.as_u16(),
                    body = %text,
                    "Acknowledgement rejected"
                );
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to send acknowledgement");
                false
            }
        }
    }
}
