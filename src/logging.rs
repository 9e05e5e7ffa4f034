//! Secret masking for logs and config output
//!
//! Bot tokens and API keys must never reach a log line in clear.

use std::fmt;

/// Number of leading characters left visible
const VISIBLE_PREFIX: usize = 6;

/// Masked representation of a secret
///
/// Shows the first characters and replaces the rest with `***`.
#[derive(Clone, Debug)]
pub struct SensitiveValue<'a> {
    inner: &'a str,
}

impl<'a> SensitiveValue<'a> {
    /// # Example
    /// ```
    /// use translator_bot::logging::SensitiveValue;
    ///
    /// let key = "sk-proj-abcdef123456";
    /// assert_eq!(SensitiveValue::new(key).to_string(), "sk-pro***");
    /// ```
    pub fn new(value: &'a str) -> Self {
        Self { inner: value }
    }
}

impl fmt::Display for SensitiveValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short secrets are masked entirely
        let Some((idx, _)) = self.inner.char_indices().nth(VISIBLE_PREFIX) else {
            return write!(f, "***");
        };
        if self.inner.len() <= idx * 2 {
            write!(f, "***")
        } else {
            write!(f, "{}***", &self.inner[..idx])
        }
    }
}

/// Shorten user text for log fields
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
