//! Supremo Tribunal Federal
//!
//! The STF portal takes the whole query, page number included, as URL parameters. Summaries are
//! not readable from the result cards; each card has a copy control that puts the summary on the
//! clipboard, so extraction goes through clipboard reads.

use crate::browser::{Clipboard, ElementHandle, Page, WaitUntil};
use crate::courts::{Court, CourtAdapter, precedents_from_texts};
use crate::error::ResearchResult;
use crate::research::engine::Walk;
use crate::research::{CallScope, Precedent, Query, ResearchConfig};

const SEARCH_URL: &str = "https://jurisprudencia.stf.jus.br/pages/search";

/// Results per page requested from the portal
pub const PAGE_SIZE: u32 = 10;

const RESULT_COUNT: &str = "div.mat-tooltip-trigger > span.ml-5.font-weight-500";

const RESULT_CARDS: &str = "div[id^=result-index-]";

const COPY_CONTROL: &str = "app-clipboard";

#[derive(Debug, Clone, Copy, Default)]
pub struct StfAdapter;

/// Search URL for `query`, already pointing at the requested page
pub fn search_url(query: &Query) -> String {
    let page = query.page_number().to_string();
    let page_size = PAGE_SIZE.to_string();
    let params = [
        ("base", "acordaos"),
        ("pesquisa_inteiro_teor", "false"),
        ("sinonimo", "true"),
        ("plural", "true"),
        ("radicais", "false"),
        ("buscaExata", "true"),
        ("page", page.as_str()),
        ("pageSize", page_size.as_str()),
        ("queryString", query.search_text()),
    ];

    let encoded: Vec<String> = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect();

    format!("{}?{}", SEARCH_URL, encoded.join("&"))
}

/// Parse the result count indicator, e.g. `"(1.234)"`
pub fn parse_result_count(text: &str) -> Option<u64> {
    let digits = text
        .trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace())
        .replace('.', "");
    digits.parse().ok()
}

impl CourtAdapter for StfAdapter {
    const COURT: Court = Court::Stf;

    fn research<P: Page + Clipboard>(
        &self,
        page: &P,
        query: &Query,
        scope: &CallScope,
        config: &ResearchConfig,
    ) -> ResearchResult<Vec<Precedent>> {
        let mut walk = Walk::new(page, scope, config);

        page.grant_read()
            .map_err(|e| walk.malfunction(format!("clipboard permission refused: {}", e)))?;

        walk.open(&search_url(query), WaitUntil::NetworkIdle)?;
        walk.landed_on(query.page_number());

        let counters = page
            .locate(RESULT_COUNT)
            .map_err(|e| walk.malfunction(format!("locating the result count: {}", e)))?;
        let Some(counter) = counters.first() else {
            return Err(walk.malfunction("the result count indicator is missing"));
        };
        let count_text = counter
            .text_content()
            .map_err(|e| walk.malfunction(format!("reading the result count: {}", e)))?
            .unwrap_or_default();
        let Some(count) = parse_result_count(&count_text) else {
            return Err(walk.malfunction(format!("unreadable result count {:?}", count_text)));
        };

        scope.debug(format_args!("The portal reports {} matching precedents", count));
        if count == 0 {
            scope.info(format_args!("The court reported no matching precedents"));
            walk.finish();
            return Ok(Vec::new());
        }

        let available = u32::try_from(count.div_ceil(u64::from(PAGE_SIZE))).unwrap_or(u32::MAX);
        if query.page_number() > available {
            return Err(walk.out_of_range(query.page_number(), available));
        }

        let cards = page
            .locate(RESULT_CARDS)
            .map_err(|e| walk.malfunction(format!("locating result cards: {}", e)))?;
        if cards.is_empty() {
            return Err(walk.malfunction(format!("the portal reports {} results but shows none", count)));
        }

        let mut texts = Vec::with_capacity(cards.len());
        for (position, card) in cards.iter().enumerate() {
            let copy = card
                .locate(COPY_CONTROL)
                .map_err(|e| walk.malfunction(format!("locating the copy control: {}", e)))?
                .into_iter()
                .next();
            let Some(copy) = copy else {
                return Err(walk.malfunction(format!("result {} has no copy control", position + 1)));
            };

            copy.click()
                .map_err(|e| walk.malfunction(format!("copying result {}: {}", position + 1, e)))?;
            let text = page
                .read_text()
                .map_err(|e| walk.malfunction(format!("reading the clipboard: {}", e)))?;
            texts.push(text);
        }

        let precedents = precedents_from_texts(scope, texts, Precedent::new)?;
        walk.finish();
        Ok(precedents)
    }
}
