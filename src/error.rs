use crate::courts::Court;
use std::fmt;
use thiserror::Error;

/// Errors raised by the browser layer (launching, driving pages, reading elements)
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("JavaScript evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Element interaction failed: {0}")]
    InteractionFailed(String),

    /// A bounded wait expired. Kept apart from the other variants because some waits exist
    /// only to detect absence, and for those an expiry is a legitimate answer.
    #[error("Timed out: {0}")]
    Timeout(String),
}

impl BrowserError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BrowserError::Timeout(_))
    }
}

/// What the page looked like when a court site misbehaved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    /// URL of the page at the time of failure
    pub url: Option<String>,

    /// HTTP status of the last main-document response, when known
    pub status: Option<u16>,

    /// Page content rendered as text, truncated
    pub snapshot: Option<String>,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let url = self.url.as_deref().unwrap_or("unknown");
        match self.status {
            Some(status) => write!(f, "url={} status={}", url, status),
            None => write!(f, "url={}", url),
        }
    }
}

/// Errors returned by a research call
#[derive(Debug, Error)]
pub enum ResearchError {
    /// The request was malformed; no browser interaction happened
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The court site answered in a way the adapter cannot interpret
    #[error("{court} search misbehaved: {reason} ({diagnostics})")]
    ServiceMalfunction {
        court: Court,
        reason: String,
        diagnostics: Box<Diagnostics>,
    },

    /// More pages were requested than the search produced
    #[error("{court} search has {available} page(s) of results, page {requested} was requested")]
    PageOutOfRange {
        court: Court,
        requested: u32,
        available: u32,
    },

    /// A located summary could not be turned into a precedent record
    #[error("{court} returned an unreadable summary: {reason}")]
    InvalidRecord { court: Court, reason: String },
}

impl ResearchError {
    pub fn malfunction(court: Court, reason: impl Into<String>) -> Self {
        ResearchError::ServiceMalfunction {
            court,
            reason: reason.into(),
            diagnostics: Box::default(),
        }
    }

    /// Attach diagnostics to a malfunction; other variants pass through untouched
    pub fn with_diagnostics(self, extra: Diagnostics) -> Self {
        match self {
            ResearchError::ServiceMalfunction {
                court,
                reason,
                diagnostics,
            } => ResearchError::ServiceMalfunction {
                court,
                reason,
                diagnostics: Box::new(Diagnostics {
                    url: diagnostics.url.or(extra.url),
                    status: diagnostics.status.or(extra.status),
                    snapshot: diagnostics.snapshot.or(extra.snapshot),
                }),
            },
            other => other,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ResearchError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, BrowserError>;

pub type ResearchResult<T> = std::result::Result<T, ResearchError>;
