//! Fetch errors and their user-facing translation
//!
//! `FetchError` is what the catalog source reports. `UserFacingError` is what
//! a catalog view shows: a short non-technical title, an actionable
//! suggestion and the affordance to offer.

use aerodex_common::events::FailureKind;
use serde::Serialize;
use thiserror::Error;

/// Longest server message ever shown verbatim
const MAX_DETAIL_LEN: usize = 160;

/// Catalog fetch errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Connectivity(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Request rejected {status}: {message}")]
    Validation { status: u16, message: String },

    #[error("Request timed out: {0}")]
    Timeout(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Connectivity(_) => FailureKind::Connectivity,
            FetchError::NotFound(_) => FailureKind::NotFound,
            FetchError::Server { .. } => FailureKind::Server,
            FetchError::Validation { .. } => FailureKind::Validation,
            FetchError::Timeout(_) => FailureKind::Timeout,
        }
    }

    /// Categorize a non-success HTTP status
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            404 => FetchError::NotFound(message),
            408 | 504 => FetchError::Timeout(message),
            400..=499 => FetchError::Validation { status, message },
            _ => FetchError::Server { status, message },
        }
    }

    /// Raw message carried by the error, without the category prefix
    pub fn message(&self) -> &str {
        match self {
            FetchError::Connectivity(message)
            | FetchError::NotFound(message)
            | FetchError::Timeout(message) => message,
            FetchError::Server { message, .. } | FetchError::Validation { message, .. } => message,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::from_status(status.as_u16(), err.to_string())
        } else if err.is_decode() || err.is_body() {
            FetchError::Server {
                status: 200,
                message: err.to_string(),
            }
        } else {
            FetchError::Connectivity(err.to_string())
        }
    }
}

/// What a view should offer next to the error message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Affordance {
    Retry,
    ResetFilters,
}

/// Error as presented to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserFacingError {
    pub kind: FailureKind,
    pub title: String,
    pub suggestion: String,
    /// Server-supplied explanation, only when it reads as plain prose
    pub detail: Option<String>,
    pub affordance: Affordance,
}

impl From<&FetchError> for UserFacingError {
    fn from(err: &FetchError) -> Self {
        let kind = err.kind();
        let (title, suggestion) = match kind {
            FailureKind::Connectivity => (
                "Can't reach the aircraft catalog",
                "Check your connection and try again.",
            ),
            FailureKind::Timeout => (
                "The catalog is taking too long to respond",
                "Try again in a moment.",
            ),
            FailureKind::Server => (
                "The catalog ran into a problem",
                "Please try again shortly.",
            ),
            FailureKind::Validation => (
                "That filter combination isn't supported",
                "Try different search terms or reset the filters.",
            ),
            FailureKind::NotFound => (
                "We couldn't find what you were looking for",
                "Try different search terms or reset the filters.",
            ),
        };
        let affordance = if kind.is_retryable() {
            Affordance::Retry
        } else {
            Affordance::ResetFilters
        };

        // only server-side rejections carry prose worth showing
        let detail = match err {
            FetchError::Validation { message, .. } | FetchError::NotFound(message) => {
                Some(message.trim()).filter(|m| is_human_readable(m)).map(str::to_string)
            }
            _ => None,
        };

        Self {
            kind,
            title: title.to_string(),
            suggestion: suggestion.to_string(),
            detail,
            affordance,
        }
    }
}

impl From<FetchError> for UserFacingError {
    fn from(err: FetchError) -> Self {
        UserFacingError::from(&err)
    }
}

impl std::fmt::Display for UserFacingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}. {}", self.title, self.suggestion)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

/// Whether a server message can be shown as-is
///
/// Rejects anything multi-line, long, or carrying stack-trace or
/// serialization tokens.
pub fn is_human_readable(message: &str) -> bool {
    const TECHNICAL_TOKENS: &[&str] = &[
        "::",
        "Exception",
        "exception",
        "panicked",
        "Traceback",
        "stack",
        "{",
        "}",
        "<",
        "null",
        "undefined",
        "error sending request",
    ];

    let message = message.trim();
    if message.is_empty() || message.chars().count() > MAX_DETAIL_LEN || message.contains('\n') {
        return false;
    }
    if message.trim_start().starts_with("at ") || message.contains("\tat ") {
        return false;
    }
    !TECHNICAL_TOKENS.iter().any(|token| message.contains(token))
}
