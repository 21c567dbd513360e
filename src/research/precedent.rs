use crate::courts::Court;
use serde::Serialize;
use thiserror::Error;

const FRAGMENT_OPEN: &str = "<!--";
const FRAGMENT_CLOSE: &str = "-->";

/// Why a piece of page text could not become a [`Precedent`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrecedentError {
    #[error("summary is empty")]
    Empty,

    #[error("summary starts with a style fragment that is never closed")]
    UnterminatedStyleFragment,
}

/// One decision summary (ementa) as published by a court
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Precedent {
    court: Court,
    summary: String,
}

impl Precedent {
    /// Build a record from raw element text. Whitespace is trimmed; nothing else is touched.
    pub fn new(court: Court, raw: &str) -> Result<Self, PrecedentError> {
        let summary = raw.trim();
        if summary.is_empty() {
            return Err(PrecedentError::Empty);
        }

        Ok(Self {
            court,
            summary: summary.to_string(),
        })
    }

    /// Like [`Precedent::new`], but first drops a leading `<!-- ... -->` fragment. Some sites
    /// ship an inline `<style>` block among the summary paragraphs and its text ends up here.
    pub fn without_style_fragment(court: Court, raw: &str) -> Result<Self, PrecedentError> {
        Self::new(court, strip_style_fragment(raw)?)
    }

    pub fn court(&self) -> Court {
        self.court
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// JSON form handed across the tool boundary
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Remove a leading `<!-- ... -->` fragment, if there is one
pub fn strip_style_fragment(raw: &str) -> Result<&str, PrecedentError> {
    let text = raw.trim_start();
    let Some(rest) = text.strip_prefix(FRAGMENT_OPEN) else {
        return Ok(raw);
    };

    match rest.find(FRAGMENT_CLOSE) {
        Some(end) => Ok(&rest[end + FRAGMENT_CLOSE.len()..]),
        None => Err(PrecedentError::UnterminatedStyleFragment),
    }
}
