//! Lambda glue around the reconciliation engine: the Runtime API loop used in
//! the deployed function.

pub mod runtime;

pub use runtime::{Invocation, RuntimeClient};
