use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XError {
    #[error("X API returned HTTP {status}: {problem}")]
    Api {
        status: u16,
        problem: ApiProblem,
        /// Parsed from `x-rate-limit-reset` when the server sent it.
        rate_limit_reset: Option<DateTime<Utc>>,
    },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode {context} response: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("response is missing {0}")]
    MissingData(&'static str),
}

impl XError {
    /// Shorthand used by tests and fakes that need an API-level failure.
    pub fn api(status: u16, problem: ApiProblem) -> Self {
        XError::Api {
            status,
            problem,
            rate_limit_reset: None,
        }
    }

    /// HTTP status for API errors, `None` for everything else.
    pub fn status(&self) -> Option<u16> {
        match self {
            XError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn problem(&self) -> Option<&ApiProblem> {
        match self {
            XError::Api { problem, .. } => Some(problem),
            _ => None,
        }
    }

    pub fn rate_limit_reset(&self) -> Option<DateTime<Utc>> {
        match self {
            XError::Api {
                rate_limit_reset, ..
            } => *rate_limit_reset,
            _ => None,
        }
    }

    /// True for network-level failures that say nothing about the request
    /// itself: timeouts, refused connections, interrupted bodies.
    pub fn is_network(&self) -> bool {
        match self {
            XError::Transport(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// ApiProblem
// ---------------------------------------------------------------------------

/// Error body returned by the API.
///
/// v2 endpoints answer with an RFC 7807 style problem document
/// (`title`, `detail`, `type`), sometimes with an `errors` array; legacy
/// endpoints answer with `{"errors": [{"code": 139, "message": "..."}]}`.
/// Both shapes deserialize into this struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiProblem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ApiErrorEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

const MAX_RAW_BODY: usize = 512;

impl ApiProblem {
    /// Parse an error body. Non-JSON bodies are kept (truncated) as `detail`.
    pub fn parse(body: &str) -> Self {
        match serde_json::from_str::<ApiProblem>(body) {
            Ok(problem) => problem,
            Err(_) => {
                let trimmed = body.trim();
                ApiProblem {
                    detail: (!trimmed.is_empty())
                        .then(|| trimmed.chars().take(MAX_RAW_BODY).collect()),
                    ..Default::default()
                }
            }
        }
    }

    /// A problem carrying one legacy `{code, message}` entry.
    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        ApiProblem {
            errors: vec![ApiErrorEntry {
                code: Some(code),
                message: Some(message.into()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    /// A problem carrying only a `detail` string.
    pub fn with_detail(detail: impl Into<String>) -> Self {
        ApiProblem {
            detail: Some(detail.into()),
            ..Default::default()
        }
    }

    pub fn codes(&self) -> impl Iterator<Item = i64> + '_ {
        self.errors.iter().filter_map(|e| e.code)
    }

    /// Every human-readable string in the body, in document order.
    pub fn messages(&self) -> Vec<&str> {
        let mut out = Vec::new();
        out.extend(self.title.as_deref());
        out.extend(self.detail.as_deref());
        for e in &self.errors {
            out.extend(e.title.as_deref());
            out.extend(e.message.as_deref());
            out.extend(e.detail.as_deref());
        }
        out
    }
}

impl fmt::Display for ApiProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages = self.messages();
        if messages.is_empty() {
            return write!(f, "no error details");
        }
        write!(f, "{}", messages.join("; "))?;
        let codes: Vec<String> = self.codes().map(|c| c.to_string()).collect();
        if !codes.is_empty() {
            write!(f, " (code {})", codes.join(", "))?;
        }
        Ok(())
    }
}
