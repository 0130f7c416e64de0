//! Query text sanitation and timeout policy.
//!
//! Runs before lexing: trims, bounds the length, rejects a small set of
//! cross-tool misuse patterns (markup injection, SQL verbs, scheme
//! prefixes) and collapses whitespace so cache keys normalize.

use std::time::Duration;

use thiserror::Error;

use crate::config::EngineConfig;

/// Case-insensitive substrings that are never legitimate in this dialect.
const FORBIDDEN_PATTERNS: &[&str] = &[
    "<script",
    "javascript:",
    "eval(",
    "drop ",
    "delete from",
    "union select",
    "<iframe",
    "<object",
    "<embed",
    "onclick",
    "onerror",
    "onload",
    "onmouseover",
    "data:",
    "vbscript:",
    "file:",
    "\0",
];

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SanitizeError {
    #[error("query is empty")]
    Empty,

    #[error("query exceeds maximum length ({length} > {max} bytes)")]
    TooLong { length: usize, max: usize },

    #[error("query contains forbidden pattern '{0}'")]
    ForbiddenPattern(&'static str),
}

/// Validate and normalize query text.
pub fn sanitize_query(text: &str, max_length: usize) -> Result<String, SanitizeError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SanitizeError::Empty);
    }
    if trimmed.len() > max_length {
        return Err(SanitizeError::TooLong {
            length: trimmed.len(),
            max: max_length,
        });
    }
    let lowered = trimmed.to_lowercase();
    for pattern in FORBIDDEN_PATTERNS {
        if lowered.contains(pattern) {
            return Err(SanitizeError::ForbiddenPattern(pattern));
        }
    }
    Ok(trimmed.split_whitespace().collect::<Vec<&str>>().join(" "))
}

/// Clamp policy shared by query and task timeouts: nonpositive requests
/// fall back to the default, requests under the minimum fall back to the
/// default, requests over the maximum are capped.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutPolicy {
    pub default: Duration,
    pub min: Option<Duration>,
    pub max: Option<Duration>,
}

impl TimeoutPolicy {
    /// Query timeout: default 30 s, hard max 5 min.
    pub fn query(config: &EngineConfig) -> Self {
        TimeoutPolicy {
            default: config.default_query_timeout(),
            min: None,
            max: Some(config.max_query_timeout()),
        }
    }

    /// Background task timeout: min 1 s, no max.
    pub fn task(config: &EngineConfig) -> Self {
        TimeoutPolicy {
            default: config.default_query_timeout(),
            min: Some(config.min_task_timeout()),
            max: None,
        }
    }

    pub fn clamp(&self, requested: Option<Duration>) -> Duration {
        let Some(requested) = requested else {
            return self.default;
        };
        if requested.is_zero() {
            return self.default;
        }
        if let Some(min) = self.min {
            if requested < min {
                return self.default;
            }
        }
        if let Some(max) = self.max {
            if requested > max {
                return max;
            }
        }
        requested
    }
}
