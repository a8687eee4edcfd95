use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was received.
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    /// The server answered with a non-2xx status. `message` is the most
    /// specific text the server provided.
    #[error("{message}")]
    Http { status: StatusCode, message: String },

    /// The request was superseded before it completed.
    #[error("Request cancelled")]
    Cancelled,

    #[error("Unexpected response: {0}")]
    UnexpectedShape(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Local storage error: {0}")]
    Storage(String),
}

impl ApiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build an HTTP error from a failed response body.
    ///
    /// Preference order: JSON `message`, JSON `error`, raw body text, then the
    /// canonical reason phrase for the status.
    pub fn from_body(status: StatusCode, body: &str) -> Self {
        let from_json = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| {
                ["message", "error"]
                    .iter()
                    .find_map(|key| json.get(*key)?.as_str().map(String::from))
            })
            .filter(|m| !m.trim().is_empty());

        let message = from_json
            .or_else(|| {
                let text = body.trim();
                (!text.is_empty()).then(|| text.to_string())
            })
            .unwrap_or_else(|| {
                format!(
                    "HTTP error {}",
                    status.canonical_reason().unwrap_or(status.as_str())
                )
            });

        ApiError::Http { status, message }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::UnexpectedShape(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::UnexpectedShape(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_prefers_json_message() {
        let err = ApiError::from_body(
            StatusCode::BAD_REQUEST,
            r#"{"message":"Mobile number already registered","error":"dup"}"#,
        );
        assert_eq!(err.to_string(), "Mobile number already registered");
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_message_falls_back_to_error_field() {
        let err = ApiError::from_body(StatusCode::NOT_FOUND, r#"{"error":"no such family"}"#);
        assert_eq!(err.to_string(), "no such family");
    }

    #[test]
    fn test_message_falls_back_to_text_then_status() {
        let err = ApiError::from_body(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(err.to_string(), "upstream down");

        let err = ApiError::from_body(StatusCode::INTERNAL_SERVER_ERROR, "  ");
        assert_eq!(err.to_string(), "HTTP error Internal Server Error");
    }
}
