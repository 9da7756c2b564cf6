//! Client for the parts of the commercetools HTTP API that the custom
//! resource manages: subscriptions and API extensions.
//!
//! Everything the reconcilers need goes through the [`CommercetoolsApi`]
//! trait; [`CommercetoolsClient`] is the reqwest-backed implementation.

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use api::CommercetoolsApi;
pub use auth::{ClientCredentials, TokenProvider};
pub use client::{ClientConfig, CommercetoolsClient};
pub use error::{ApiError, ApiResult};
pub use types::*;
