use ctcfn_commercetools::ApiError;
use thiserror::Error;

use crate::types::{ReconcileOperation, ResourceKind};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that fail a reconciliation run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The event cannot be addressed: there is nowhere to send an acknowledgement.
    #[error("Undeliverable event: {0}")]
    Undeliverable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Malformed physical resource id: {0}")]
    MalformedPhysicalId(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Failed to set up commercetools client: {0}")]
    Client(#[source] ApiError),

    #[error("Failed to {operation} {kind} #{index}: {source}")]
    Reconcile {
        kind: ResourceKind,
        operation: ReconcileOperation,
        index: usize,
        #[source]
        source: ApiError,
    },

    #[error("Reconciliation panicked: {0}")]
    Panicked(String),
}

impl EngineError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Input could not be decoded. Never worth a re-invocation with the same event.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Undeliverable(_) | Self::InvalidRequest(_) | Self::MalformedPhysicalId(_)
        )
    }
}
