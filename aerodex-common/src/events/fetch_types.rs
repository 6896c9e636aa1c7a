//! Fetch-related event types

use serde::{Deserialize, Serialize};

/// Which accumulation mode a catalog fetch runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchMode {
    /// Page 0 for a new query; replaces accumulated results
    Replace,
    /// Next page under the unchanged query; appends
    LoadMore,
}

/// Failure categories surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Network unreachable or connection refused
    Connectivity,
    /// Requested resource absent
    NotFound,
    /// 5xx-class response or undecodable payload
    Server,
    /// Filter combination rejected by the catalog service
    Validation,
    /// Request exceeded its deadline
    Timeout,
}

impl FailureKind {
    /// Whether a plain retry can reasonably succeed
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            FailureKind::Connectivity | FailureKind::Server | FailureKind::Timeout
        )
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::Connectivity => "connectivity",
            FailureKind::NotFound => "not_found",
            FailureKind::Server => "server",
            FailureKind::Validation => "validation",
            FailureKind::Timeout => "timeout",
        };
        f.write_str(s)
    }
}
