//! Court adapters.
//!
//! Each supported court gets an independent [`CourtAdapter`] that knows its site's URLs, element
//! vocabulary, pagination style and extraction method. They share the search walk in
//! [`crate::research::engine`] and nothing else.

pub mod stf;
pub mod stj;
pub mod tst;

pub use stf::StfAdapter;
pub use stj::StjAdapter;
pub use tst::TstAdapter;

use crate::browser::{Clipboard, Page};
use crate::error::{ResearchError, ResearchResult};
use crate::research::{CallScope, Precedent, PrecedentError, Query, ResearchConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The courts whose case law can be searched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Court {
    /// Superior Tribunal de Justiça
    Stj,
    /// Tribunal Superior do Trabalho
    Tst,
    /// Supremo Tribunal Federal
    Stf,
}

impl Court {
    pub const ALL: [Court; 3] = [Court::Stj, Court::Tst, Court::Stf];

    /// Acronym the court is known by
    pub fn code(&self) -> &'static str {
        match self {
            Court::Stj => "STJ",
            Court::Tst => "TST",
            Court::Stf => "STF",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Court::Stj => "Superior Tribunal de Justiça",
            Court::Tst => "Tribunal Superior do Trabalho",
            Court::Stf => "Supremo Tribunal Federal",
        }
    }

    /// Run this court's adapter
    pub fn research<P: Page + Clipboard>(
        self,
        page: &P,
        query: &Query,
        scope: &CallScope,
        config: &ResearchConfig,
    ) -> ResearchResult<Vec<Precedent>> {
        match self {
            Court::Stj => StjAdapter.research(page, query, scope, config),
            Court::Tst => TstAdapter.research(page, query, scope, config),
            Court::Stf => StfAdapter.research(page, query, scope, config),
        }
    }
}

impl fmt::Display for Court {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Court {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Court::ALL
            .into_iter()
            .find(|court| court.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown court '{}', expected one of STJ, TST, STF", s))
    }
}

/// One court's search procedure
pub trait CourtAdapter {
    const COURT: Court;

    /// Search the court's site on `page` and return the precedents shown on the requested
    /// results page. An empty list means the court reported no matches.
    fn research<P: Page + Clipboard>(
        &self,
        page: &P,
        query: &Query,
        scope: &CallScope,
        config: &ResearchConfig,
    ) -> ResearchResult<Vec<Precedent>>;
}

/// Turn raw summary texts into records
///
/// Elements without text are skipped. A summary that cannot be normalised fails the call.
pub(crate) fn precedents_from_texts(
    scope: &CallScope,
    texts: Vec<Option<String>>,
    build: fn(Court, &str) -> Result<Precedent, PrecedentError>,
) -> ResearchResult<Vec<Precedent>> {
    let court = scope.court();
    let mut precedents = Vec::with_capacity(texts.len());

    for (position, text) in texts.into_iter().enumerate() {
        let Some(text) = text else {
            scope.warn(format_args!("Result {} has no text, skipping it", position + 1));
            continue;
        };

        match build(court, &text) {
            Ok(precedent) => precedents.push(precedent),
            Err(PrecedentError::Empty) => {
                scope.warn(format_args!("Result {} has an empty summary, skipping it", position + 1));
            }
            Err(e) => {
                return Err(ResearchError::InvalidRecord {
                    court,
                    reason: format!("result {}: {}", position + 1, e),
                });
            }
        }
    }

    Ok(precedents)
}
