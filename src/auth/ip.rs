//! Client IP extraction.

use std::net::SocketAddr;

use axum::{extract::ConnectInfo, extract::Request};

/// Bucket key used when no client address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Extract the client IP.
///
/// The first `X-Forwarded-For` hop is only read when `trust_forwarded_for` is
/// set, since any client can send that header. Otherwise the socket address
/// is used, then a shared placeholder.
pub fn client_ip<B>(request: &Request<B>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        if let Some(first) = forwarded_for(request) {
            return first;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn forwarded_for<B>(request: &Request<B>) -> Option<String> {
    let value = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())?;
    let first = value.split(',').next().map(str::trim)?;
    (!first.is_empty()).then(|| first.to_string())
}
