use crate::{config::AccessConfig, error::AppError};
use axum::http::HeaderMap;
use std::collections::HashSet;
use subtle::ConstantTimeEq;

/// Header Telegram uses to echo the webhook secret
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Static allow-list of Telegram user ids
#[derive(Debug, Clone)]
pub struct AccessControl {
    allowed: HashSet<i64>,
}

impl AccessControl {
    pub fn new(allowed: impl IntoIterator<Item = i64>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(config.allowed_users.iter().copied())
    }

    pub fn is_allowed(&self, user_id: i64) -> bool {
        self.allowed.contains(&user_id)
    }
}

/// Check the webhook secret header against the configured token
pub fn verify_secret_token(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    let provided = headers
        .get(SECRET_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing secret token header".to_string()))?;

    if provided.is_empty() {
        return Err(AppError::Unauthorized("Secret token is empty".to_string()));
    }

    // Constant-time comparison
    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(AppError::Unauthorized("Invalid secret token".to_string()))
    }
}
