//! Refresh token cookie helpers.

use axum::http::header;

use crate::jwt::REFRESH_TOKEN_DURATION_SECS;

/// Cookie name for the refresh token (HTTP-only, 7 days).
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    for cookie_header in headers.get_all(header::COOKIE) {
        let Ok(cookie_header) = cookie_header.to_str() else {
            continue;
        };
        for part in cookie_header.split(';') {
            if let Some((key, value)) = part.trim().split_once('=') {
                if key.trim() == name {
                    return Some(value.trim());
                }
            }
        }
    }
    None
}

/// Build the Set-Cookie value carrying a freshly issued refresh token.
pub fn refresh_cookie(token: &str, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
        REFRESH_COOKIE_NAME, token, REFRESH_TOKEN_DURATION_SECS, secure
    )
}

/// Build the Set-Cookie value that removes the refresh token cookie.
pub fn clear_refresh_cookie(secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT{}",
        REFRESH_COOKIE_NAME, secure
    )
}
