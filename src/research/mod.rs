//! Precedent research: the query model, the shared extraction engine, and the orchestrator that
//! routes a request to the right court adapter.

pub mod engine;
pub mod precedent;

pub use precedent::{Precedent, PrecedentError};

use crate::browser::{Clipboard, Page};
use crate::courts::Court;
use crate::error::{ResearchError, ResearchResult};
use log::Level;
use std::fmt;
use std::time::Duration;

/// Text returned across the tool boundary when a search matched nothing
pub const NO_RESULTS_MESSAGE: &str = "Nenhum resultado encontrado";

/// A validated research request
///
/// The search text is handed to the court verbatim; each court has its own operator syntax
/// (`e`, `ou`, `adj5`, `"..."~3`, ...) and none of it is interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    search_text: String,
    page_number: u32,
}

impl Query {
    pub fn new(search_text: impl Into<String>, page_number: u32) -> ResearchResult<Self> {
        let search_text = search_text.into();
        if search_text.trim().is_empty() {
            return Err(ResearchError::Validation("the summary search text must not be empty".to_string()));
        }
        if page_number == 0 {
            return Err(ResearchError::Validation("page numbers start at 1".to_string()));
        }

        Ok(Self {
            search_text,
            page_number,
        })
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    /// 1-based results page to return
    pub fn page_number(&self) -> u32 {
        self.page_number
    }
}

/// Tunables for a research call
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchConfig {
    /// How many times the search is submitted when an anti-automation challenge shows up
    pub challenge_attempts: u32,

    /// Pause between two submissions after a challenge
    pub challenge_backoff: Duration,

    /// Upper bound of the random extra pause added to `challenge_backoff`
    pub challenge_jitter: Duration,

    /// Timeout for ordinary waits and element operations
    pub default_timeout: Duration,

    /// How long to look for a dismissible overlay before assuming there is none
    pub overlay_timeout: Duration,

    /// How long a loading spinner may stay on screen
    pub spinner_timeout: Duration,

    /// Quiet window used to decide that the network went idle
    pub network_idle_quiet: Duration,

    /// Wall-clock ceiling for a whole call, enforced by the caller
    pub call_timeout: Duration,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            challenge_attempts: 3,
            challenge_backoff: Duration::from_secs(2),
            challenge_jitter: Duration::from_millis(500),
            default_timeout: Duration::from_secs(10),
            overlay_timeout: Duration::from_secs(1),
            spinner_timeout: Duration::from_secs(30),
            network_idle_quiet: Duration::from_millis(500),
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl ResearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn challenge_attempts(mut self, attempts: u32) -> Self {
        self.challenge_attempts = attempts;
        self
    }

    pub fn challenge_backoff(mut self, backoff: Duration, jitter: Duration) -> Self {
        self.challenge_backoff = backoff;
        self.challenge_jitter = jitter;
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn spinner_timeout(mut self, timeout: Duration) -> Self {
        self.spinner_timeout = timeout;
        self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

/// Logging context of one research call
///
/// Every record goes out through the `log` facade carrying the court, requested page and query as
/// key-values, so concurrent calls can be told apart in the output.
#[derive(Debug, Clone)]
pub struct CallScope {
    court: Court,
    query: String,
    page: u32,
}

impl CallScope {
    pub fn new(court: Court, query: &Query) -> Self {
        Self {
            court,
            query: query.search_text().to_string(),
            page: query.page_number(),
        }
    }

    pub fn court(&self) -> Court {
        self.court
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(
            level,
            court = self.court.code(),
            page = self.page,
            query = self.query.as_str();
            "{}",
            args
        );
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }
}

/// Outcome of a successful research call
#[derive(Debug, Clone, PartialEq)]
pub enum Findings {
    Found(Vec<Precedent>),
    /// The court positively reported zero matches
    NoResults,
}

impl Findings {
    pub fn precedents(&self) -> &[Precedent] {
        match self {
            Findings::Found(precedents) => precedents,
            Findings::NoResults => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.precedents().is_empty()
    }

    /// Text payloads for the tool boundary: one JSON record per precedent, or the fixed
    /// no-results message
    pub fn into_texts(self) -> serde_json::Result<Vec<String>> {
        match self {
            Findings::Found(precedents) => precedents.iter().map(Precedent::to_json).collect(),
            Findings::NoResults => Ok(vec![NO_RESULTS_MESSAGE.to_string()]),
        }
    }
}

impl From<Vec<Precedent>> for Findings {
    fn from(precedents: Vec<Precedent>) -> Self {
        if precedents.is_empty() {
            Findings::NoResults
        } else {
            Findings::Found(precedents)
        }
    }
}

/// Routes research requests to the court adapters
#[derive(Debug, Clone, Default)]
pub struct Researcher {
    config: ResearchConfig,
}

impl Researcher {
    pub fn new(config: ResearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Search `court` for precedents whose summary matches `search_text`, returning the given
    /// results page
    ///
    /// The request is validated before the page is touched. The page is only borrowed for the
    /// duration of the call.
    pub fn research<P: Page + Clipboard>(
        &self,
        page: &P,
        court: Court,
        search_text: &str,
        page_number: u32,
    ) -> ResearchResult<Findings> {
        let query = Query::new(search_text, page_number)?;
        let scope = CallScope::new(court, &query);

        scope.info(format_args!("Starting research on the {}", court.name()));
        page.set_default_timeout(self.config.default_timeout);

        match court.research(page, &query, &scope, &self.config) {
            Ok(precedents) => {
                scope.info(format_args!("Found {} precedents", precedents.len()));
                Ok(Findings::from(precedents))
            }
            Err(e) => {
                scope.error(format_args!("Research failed: {}", e));
                if let ResearchError::ServiceMalfunction { diagnostics, .. } = &e {
                    if let Some(snapshot) = &diagnostics.snapshot {
                        scope.debug(format_args!("Page snapshot at failure:\n{}", snapshot));
                    }
                }
                Err(e)
            }
        }
    }
}
