use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Api { status: StatusCode, message: String },

    /// Renewal failed; the session has been cleared and the user must sign in
    /// again. Carries the renewal failure.
    #[error("Sign-in required: {0}")]
    SignInRequired(#[source] Box<ClientError>),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl ClientError {
    /// Build an error from a non-success response, preferring the server's
    /// `{error}` message over the raw body.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => parsed.error,
            Err(_) if body.len() > MAX_ERROR_BODY_LENGTH => {
                let mut end = MAX_ERROR_BODY_LENGTH;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}... (truncated)", &body[..end])
            }
            Err(_) => body,
        };

        ClientError::Api { status, message }
    }

    /// HTTP status of a server-side failure, if this is one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
