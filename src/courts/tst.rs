//! Tribunal Superior do Trabalho
//!
//! The TST site is a single page application. A summary is spread over several paragraphs inside
//! a result card, and sometimes an inline style block sits among them. Paging re-renders the list
//! in place behind a loading spinner.

use crate::browser::{Clipboard, ElementHandle, Page, WaitUntil};
use crate::courts::{Court, CourtAdapter, precedents_from_texts};
use crate::error::{BrowserError, ResearchResult};
use crate::research::engine::{
    Dismiss, Listing, NextPage, Ready, SearchForm, Snapshot, Staleness, StatusProbe, Submit, Walk,
};
use crate::research::{CallScope, Precedent, Query, ResearchConfig};

const SEARCH_URL: &str = "https://jurisprudencia.tst.jus.br/";

const SPINNER: &str = "circle";

/// Direct children of a result card
const CARD_PARAGRAPHS: &str = ":scope > *";

const FORM: SearchForm = SearchForm {
    advanced_toggle: None,
    overlay: Some(Dismiss {
        selector: "span[class^='jss']",
        text: Some("Fechar"),
    }),
    input: "#campoTxtEmenta",
    submit: Submit::Key("Enter"),
    ready: Ready::Hidden(SPINNER),
    challenge: None,
};

const LISTING: Listing = Listing {
    results: "div[id^=celulaLeiaMaisAcordao]",
    no_results: StatusProbe::ignoring_case("p[class^='MuiTypography']", "Nenhum resultado encontrado"),
};

// Disabled on the last page, so it stops matching
const NEXT: NextPage = NextPage {
    control: "button[aria-label='Próxima página']:not([disabled])",
    staleness: Staleness::Detached,
    settle: Some(Ready::Hidden(SPINNER)),
};

#[derive(Debug, Clone, Copy, Default)]
pub struct TstAdapter;

impl CourtAdapter for TstAdapter {
    const COURT: Court = Court::Tst;

    fn research<P: Page + Clipboard>(
        &self,
        page: &P,
        query: &Query,
        scope: &CallScope,
        config: &ResearchConfig,
    ) -> ResearchResult<Vec<Precedent>> {
        let mut walk = Walk::new(page, scope, config);

        walk.open(SEARCH_URL, WaitUntil::Load)?;
        walk.search(&FORM, &LISTING, query.search_text())?;

        let first = walk.collect(&LISTING)?;
        let cards = match walk.advance(query.page_number(), &LISTING, &NEXT, first)? {
            Snapshot::Empty => Vec::new(),
            Snapshot::Results(cards) => cards,
        };

        let mut texts = Vec::with_capacity(cards.len());
        for card in &cards {
            let text = card_text(card).map_err(|e| walk.malfunction(format!("reading a result card: {}", e)))?;
            texts.push(text);
        }

        let precedents = precedents_from_texts(scope, texts, Precedent::without_style_fragment)?;
        walk.finish();
        Ok(precedents)
    }
}

/// Visible paragraphs of a card joined by newlines, or the card's own text when it has no
/// child elements
fn card_text<E: ElementHandle>(card: &E) -> Result<Option<String>, BrowserError> {
    let paragraphs = card.locate(CARD_PARAGRAPHS)?;
    if paragraphs.is_empty() {
        return card.text_content();
    }

    let mut parts = Vec::with_capacity(paragraphs.len());
    for paragraph in &paragraphs {
        if !paragraph.is_visible()? {
            continue;
        }
        if let Some(text) = paragraph.text_content()? {
            let text = text.trim();
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
    }

    if parts.is_empty() {
        Ok(None)
    } else {
        Ok(Some(parts.join("\n")))
    }
}
