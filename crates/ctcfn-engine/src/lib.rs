//! Reconciliation engine behind the commercetools CloudFormation custom
//! resource.
//!
//! A lifecycle request (`Create`/`Update`/`Delete`) fans out into one
//! reconciliation per declared subscription and extension, the resulting
//! identities are folded into the physical resource id, and exactly one
//! acknowledgement goes back to CloudFormation.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod extension;
pub mod handler;
pub mod observability;
pub mod retry;
pub mod signaler;
pub mod subscription;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{HandlerConfig, HttpSettings, LoggingConfig, RetrySettings};
pub use dispatcher::{ReconcileContext, ReconcileOutcome, dispatch};
pub use error::{EngineError, EngineResult};
pub use handler::{ApiFactory, CustomResourceHandler, InvocationContext};
pub use retry::RetryPolicy;
pub use signaler::{Acknowledgement, ResponseSignaler, ResponseStatus};
pub use types::*;
