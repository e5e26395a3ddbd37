//! JWT authentication.
//!
//! Dual-token system: short-lived access tokens (15 min, stateless, sent as
//! a bearer header) and long-lived refresh tokens (7 days, HTTP-only cookie,
//! one stored per user so a new sign-in revokes the previous session).

mod cookie;
mod errors;
mod extractors;
mod ip;
pub mod service;
mod state;
mod types;

pub use cookie::{REFRESH_COOKIE_NAME, clear_refresh_cookie, get_cookie, refresh_cookie};
pub use errors::AuthError;
pub use extractors::{ApiAuth, bearer_token};
pub use ip::{UNKNOWN_CLIENT, client_ip};
pub use service::Credentials;
pub use state::HasAuthBackend;
pub use types::{AuthenticatedUser, IssuedSession};
