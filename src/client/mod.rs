//! Client for the HTTP API.
//!
//! Keeps the session context explicitly (no globals), attaches the access
//! token to every protected call, and renews it through the refresh cookie
//! when the server answers 401.

mod error;
mod interceptor;
mod session;
mod types;

pub use error::ClientError;
pub use interceptor::ApiClient;
pub use session::{Guard, Page, Session};
pub use types::{MetricInput, MetricRecord};
