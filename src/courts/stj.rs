//! Superior Tribunal de Justiça
//!
//! The SCON search renders every summary into a read-only textarea, so extraction is a plain
//! text read. Each results page is a full page load.

use crate::browser::{Clipboard, ElementHandle, Page, WaitUntil};
use crate::courts::{Court, CourtAdapter, precedents_from_texts};
use crate::error::ResearchResult;
use crate::research::engine::{Listing, NextPage, Ready, SearchForm, Snapshot, Staleness, StatusProbe, Submit, Walk};
use crate::research::{CallScope, Precedent, Query, ResearchConfig};

const SEARCH_URL: &str = "https://scon.stj.jus.br/SCON/";

const RESULTS_BODY: &str = "#corpopaginajurisprudencia";

const STATUS_MESSAGE: &str = "div.erroMensagem";

const FORM: SearchForm = SearchForm {
    advanced_toggle: Some("#idMostrarPesquisaAvancada"),
    overlay: None,
    input: "#ementa",
    submit: Submit::Key("Enter"),
    ready: Ready::Visible(RESULTS_BODY),
    challenge: Some(StatusProbe::ignoring_case(STATUS_MESSAGE, "captcha")),
};

const LISTING: Listing = Listing {
    results: "textarea[id^=textSemformatacao]",
    no_results: StatusProbe::exact(STATUS_MESSAGE, "Nenhum documento encontrado!"),
};

// Past the last page the anchor is not rendered at all
const NEXT: NextPage = NextPage {
    control: "a.iconeProximaPagina",
    staleness: Staleness::LoadEvent,
    settle: Some(Ready::Visible(RESULTS_BODY)),
};

#[derive(Debug, Clone, Copy, Default)]
pub struct StjAdapter;

impl CourtAdapter for StjAdapter {
    const COURT: Court = Court::Stj;

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
        let fields = match walk.advance(query.page_number(), &LISTING, &NEXT, first)? {
            Snapshot::Empty => Vec::new(),
            Snapshot::Results(fields) => fields,
        };

        let mut texts = Vec::with_capacity(fields.len());
        for field in &fields {
            let text = field
                .text_content()
                .map_err(|e| walk.malfunction(format!("reading a summary: {}", e)))?;
            texts.push(text);
        }

        let precedents = precedents_from_texts(scope, texts, Precedent::new)?;
        walk.finish();
        Ok(precedents)
    }
}
