use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures of the completion API call.
///
/// All three variants are surfaced to the caller unchanged; nothing retries.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Network failure, timeout or non-success HTTP status
    #[error("HTTP error: {0}")]
    Transport(String),
    /// Body is not JSON or does not match the chat completion schema
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    /// Anything else that went wrong upstream
    #[error("Unexpected error: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Failures of the translation store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same normalized source already exists
    #[error("Translation for '{0}' already exists")]
    Conflict(String),
    /// The record to update is gone
    #[error("Translation #{0} not found")]
    NotFound(i64),
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

/// Failures of the lookup-or-fetch-or-store flow.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures talking to the Telegram Bot API.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),
    /// The Bot API answered with `ok: false`
    #[error("Telegram API error ({code}): {description}")]
    Api { code: i64, description: String },
}

impl TelegramError {
    /// Telegram rejects malformed Markdown with a 400 "can't parse entities".
    pub fn is_parse_entities_error(&self) -> bool {
        match self {
            Self::Api { code, description } => {
                *code == 400 && description.contains("can't parse entities")
            }
            Self::HttpRequest(_) => false,
        }
    }
}

/// Errors returned by the webhook HTTP server
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": error_type_name(&self),
            }
        }));

        (status, body).into_response()
    }
}

fn error_type_name(error: &AppError) -> &'static str {
    match error {
        AppError::Unauthorized(_) => "unauthorized",
        AppError::BadRequest(_) => "bad_request",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_error_display() {
        let error = CompletionError::MalformedResponse("missing field `choices`".to_string());
        assert_eq!(error.to_string(), "Malformed response: missing field `choices`");
    }

    #[test]
    fn test_service_error_is_transparent() {
        let error = ServiceError::from(CompletionError::Transport("timed out".to_string()));
        assert_eq!(error.to_string(), "HTTP error: timed out");
    }

    #[test]
    fn test_parse_entities_detection() {
        let error = TelegramError::Api {
            code: 400,
            description: "Bad Request: can't parse entities: Can't find end of the entity".to_string(),
        };
        assert!(error.is_parse_entities_error());

        let other = TelegramError::Api {
            code: 403,
            description: "Forbidden: bot was blocked by the user".to_string(),
        };
        assert!(!other.is_parse_entities_error());
    }

    #[test]
    fn test_error_type_name() {
        assert_eq!(error_type_name(&AppError::Unauthorized("test".to_string())), "unauthorized");
        assert_eq!(error_type_name(&AppError::BadRequest("test".to_string())), "bad_request");
    }

    #[tokio::test]
    async fn test_error_response() {
        let error = AppError::Unauthorized("Invalid secret token".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
