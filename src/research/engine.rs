//! The search walk shared by every court adapter.
//!
//! A [`Walk`] drives one page through
//!
//! ```text
//! NotStarted -> Searching -> PageReady(1) -> PageReady(2) -> ... -> PageReady(n) -> Done
//! ```
//!
//! and lands in `Failed` from any of them. Adapters describe their site with [`SearchForm`],
//! [`Listing`] and [`NextPage`] and keep only their extraction logic.
//!
//! Zero matches are only reported when the site says so: an empty result list must come with a
//! status element carrying the court's no-results marker. Anything else is a malfunction.

use crate::browser::{ElementHandle, ElementState, Navigation, Page, WaitUntil};
use crate::courts::Court;
use crate::error::{BrowserError, Diagnostics, ResearchError, ResearchResult};
use crate::research::{CallScope, ResearchConfig};
use rand::Rng;
use std::time::Duration;

/// Longest page snapshot kept in diagnostics, in characters
const SNAPSHOT_LIMIT: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    NotStarted,
    Searching,
    PageReady { page: u32 },
    Done,
    Failed,
}

/// How the search is triggered once the text is typed
#[derive(Debug, Clone, Copy)]
pub enum Submit {
    /// Press a key inside the search input
    Key(&'static str),
    /// Click a button
    Click(&'static str),
}

/// What signals that the results (or the lack of them) are on screen
///
/// Either way the walk then waits for the first result, the status message or (while searching)
/// the challenge message to show, whichever comes first.
#[derive(Debug, Clone, Copy)]
pub enum Ready {
    /// An element became visible, waited for up to the default timeout
    Visible(&'static str),
    /// A loading indicator went away, waited for up to the spinner timeout
    Hidden(&'static str),
}

/// A status element whose text is matched against a marker
#[derive(Debug, Clone, Copy)]
pub struct StatusProbe {
    pub selector: &'static str,
    pub marker: &'static str,
    pub ignore_case: bool,
}

impl StatusProbe {
    pub const fn exact(selector: &'static str, marker: &'static str) -> Self {
        Self {
            selector,
            marker,
            ignore_case: false,
        }
    }

    pub const fn ignoring_case(selector: &'static str, marker: &'static str) -> Self {
        Self {
            selector,
            marker,
            ignore_case: true,
        }
    }

    fn matches(&self, text: &str) -> bool {
        if self.ignore_case {
            text.to_lowercase().contains(&self.marker.to_lowercase())
        } else {
            text.contains(self.marker)
        }
    }
}

/// An overlay (cookie banner, notice) that may or may not show up
#[derive(Debug, Clone, Copy)]
pub struct Dismiss {
    pub selector: &'static str,
    /// Only click candidates whose text contains this
    pub text: Option<&'static str>,
}

/// The site's search form
#[derive(Debug, Clone, Copy)]
pub struct SearchForm {
    /// Control that switches the form to advanced mode
    pub advanced_toggle: Option<&'static str>,
    pub overlay: Option<Dismiss>,
    pub input: &'static str,
    pub submit: Submit,
    pub ready: Ready,
    /// Message shown when the site rejected the request as automated
    pub challenge: Option<StatusProbe>,
}

/// Where results and the no-results message live
#[derive(Debug, Clone, Copy)]
pub struct Listing {
    pub results: &'static str,
    pub no_results: StatusProbe,
}

/// Signal that the previous results page is gone after clicking "next"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// The click triggers a full page load
    LoadEvent,
    /// The page re-renders in place; the first previous result leaves the document
    Detached,
}

#[derive(Debug, Clone, Copy)]
pub struct NextPage {
    pub control: &'static str,
    pub staleness: Staleness,
    /// Extra readiness wait once the old results are gone
    pub settle: Option<Ready>,
}

/// The result elements of the current page
#[derive(Debug)]
pub enum Snapshot<E> {
    /// The site reported zero matches
    Empty,
    Results(Vec<E>),
}

impl<E> Snapshot<E> {
    pub fn len(&self) -> usize {
        match self {
            Snapshot::Empty => 0,
            Snapshot::Results(results) => results.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of one submission attempt
enum Settled {
    Ready,
    Challenged(String),
}

/// One pagination walk over one page
pub struct Walk<'a, P: Page> {
    page: &'a P,
    scope: &'a CallScope,
    config: &'a ResearchConfig,
    state: WalkState,
    current_page: u32,
    transitions: u32,
    navigation: Option<Navigation>,
}

impl<'a, P: Page> Walk<'a, P> {
    pub fn new(page: &'a P, scope: &'a CallScope, config: &'a ResearchConfig) -> Self {
        Self {
            page,
            scope,
            config,
            state: WalkState::NotStarted,
            current_page: 0,
            transitions: 0,
            navigation: None,
        }
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    /// "Next page" transitions performed so far
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    fn court(&self) -> Court {
        self.scope.court()
    }

    /// Navigate to the search entry point
    pub fn open(&mut self, url: &str, wait: WaitUntil) -> ResearchResult<()> {
        self.scope.debug(format_args!("Opening {}", url));

        let navigation = self
            .page
            .navigate(url, wait)
            .map_err(|e| self.browser_failure("navigation failed", e))?;

        let error_status = navigation.is_error_status();
        let status = navigation.status;
        self.navigation = Some(navigation);

        if error_status {
            let reason = format!("the search page answered with HTTP {}", status.unwrap_or_default());
            return Err(self.malfunction(reason));
        }

        self.state = WalkState::Searching;
        Ok(())
    }

    /// Fill and submit the search form, then wait for the first results page
    ///
    /// When the site answers with an anti-automation challenge only the submission is repeated,
    /// up to `challenge_attempts` times in total.
    pub fn search(&mut self, form: &SearchForm, listing: &Listing, text: &str) -> ResearchResult<()> {
        if let Some(toggle) = form.advanced_toggle {
            let control = self.first(toggle, "advanced search toggle")?;
            control.click().map_err(|e| self.browser_failure("advanced search toggle", e))?;
        }

        if let Some(overlay) = &form.overlay {
            self.dismiss(overlay);
        }

        let attempts = self.config.challenge_attempts.max(1);
        let mut last_challenge = String::new();

        for attempt in 1..=attempts {
            let stale = match &form.challenge {
                Some(probe) if attempt > 1 => self.page.locate(probe.selector).unwrap_or_default(),
                _ => Vec::new(),
            };

            self.submit(form, text)?;

            // The previous challenge message must not be read as this attempt's answer
            if let Some(old) = stale.first() {
                if let Err(e) = old.wait_until(ElementState::Detached, self.config.default_timeout) {
                    self.scope.debug(format_args!("The previous challenge message stayed: {}", e));
                }
            }

            match self.settle(form, listing)? {
                Settled::Ready => {
                    self.current_page = 1;
                    self.state = WalkState::PageReady { page: 1 };
                    self.scope.debug(format_args!("First results page ready after {} attempt(s)", attempt));
                    return Ok(());
                }
                Settled::Challenged(message) => {
                    self.scope.warn(format_args!(
                        "Anti-automation challenge on attempt {}/{}: {}",
                        attempt, attempts, message
                    ));
                    last_challenge = message;
                    if attempt < attempts {
                        std::thread::sleep(self.backoff());
                    }
                }
            }
        }

        Err(self.malfunction(format!(
            "anti-automation challenge persisted after {} attempts: {}",
            attempts, last_challenge
        )))
    }

    /// Classify what the current page shows
    pub fn collect(&mut self, listing: &Listing) -> ResearchResult<Snapshot<P::Element>> {
        let results = self
            .page
            .locate(listing.results)
            .map_err(|e| self.browser_failure("locating results", e))?;

        self.scope.debug(format_args!(
            "Found {} result elements on page {}",
            results.len(),
            self.current_page
        ));

        if !results.is_empty() {
            return Ok(Snapshot::Results(results));
        }

        let statuses = self
            .page
            .locate(listing.no_results.selector)
            .map_err(|e| self.browser_failure("locating the status message", e))?;

        if statuses.is_empty() {
            return Err(self.malfunction("the page shows neither results nor a status message"));
        }

        let mut seen = Vec::new();
        for status in &statuses {
            let text = status
                .text_content()
                .map_err(|e| self.browser_failure("reading the status message", e))?
                .unwrap_or_default();
            if listing.no_results.matches(&text) {
                self.scope.info(format_args!("The court reported no matching precedents"));
                return Ok(Snapshot::Empty);
            }
            seen.push(text.trim().to_string());
        }

        Err(self.malfunction(format!(
            "no results and an unrecognised status message: {:?}",
            seen.join(" | ")
        )))
    }

    /// Click "next" until the requested page is displayed, returning its results
    ///
    /// An empty first page is returned as is: there is nothing to page through. Running out of
    /// "next" controls before `target` is a [`ResearchError::PageOutOfRange`].
    pub fn advance(
        &mut self,
        target: u32,
        listing: &Listing,
        next: &NextPage,
        snapshot: Snapshot<P::Element>,
    ) -> ResearchResult<Snapshot<P::Element>> {
        let mut snapshot = snapshot;

        while self.current_page < target {
            let previous = match snapshot {
                Snapshot::Empty => return Ok(Snapshot::Empty),
                Snapshot::Results(previous) => previous,
            };

            let control = self
                .page
                .locate(next.control)
                .map_err(|e| self.browser_failure("locating the next page control", e))?
                .into_iter()
                .next();

            let Some(control) = control else {
                let available = self.current_page;
                return Err(self.out_of_range(target, available));
            };

            control.click().map_err(|e| self.browser_failure("clicking next page", e))?;

            let timeout = self.config.default_timeout;
            if next.staleness == Staleness::LoadEvent {
                self.page
                    .wait_for_load(timeout)
                    .map_err(|e| self.browser_failure("waiting for the next page to load", e))?;
            }
            // A full load replaces the document too, so the old results detach in both cases
            if let Some(first) = previous.first() {
                first
                    .wait_until(ElementState::Detached, timeout)
                    .map_err(|e| self.browser_failure("waiting for the previous results to go away", e))?;
            }

            self.wait_ready(next.settle, listing, None)
                .map_err(|e| self.browser_failure("waiting for the next page to settle", e))?;

            self.transitions += 1;
            self.current_page += 1;
            self.state = WalkState::PageReady {
                page: self.current_page,
            };
            self.scope.debug(format_args!("Moved to results page {}", self.current_page));

            snapshot = self.collect(listing)?;
        }

        Ok(snapshot)
    }

    /// Record that `page` was reached directly (sites that paginate through the URL)
    pub fn landed_on(&mut self, page: u32) {
        self.current_page = page;
        self.state = WalkState::PageReady { page };
    }

    pub fn finish(&mut self) {
        self.state = WalkState::Done;
    }

    /// Fail the walk because `requested` lies past the last page, `available`
    pub fn out_of_range(&mut self, requested: u32, available: u32) -> ResearchError {
        self.state = WalkState::Failed;
        self.scope.warn(format_args!(
            "Requested page {} but the results end at page {}",
            requested, available
        ));
        ResearchError::PageOutOfRange {
            court: self.court(),
            requested,
            available,
        }
    }

    /// Fail the walk with a malfunction carrying the page's diagnostics
    pub fn malfunction(&mut self, reason: impl Into<String>) -> ResearchError {
        self.state = WalkState::Failed;
        ResearchError::malfunction(self.court(), reason).with_diagnostics(self.diagnostics())
    }

    fn browser_failure(&mut self, during: &str, error: BrowserError) -> ResearchError {
        self.malfunction(format!("{}: {}", during, error))
    }

    fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            url: Some(self.page.url()),
            status: self.navigation.as_ref().and_then(|n| n.status),
            snapshot: self.page.content().ok().map(|html| snapshot_text(&html)),
        }
    }

    fn first(&mut self, selector: &str, what: &str) -> ResearchResult<P::Element> {
        let found = self
            .page
            .locate(selector)
            .map_err(|e| self.browser_failure(what, e))?
            .into_iter()
            .next();

        match found {
            Some(element) => Ok(element),
            None => Err(self.malfunction(format!("{} ({}) is missing", what, selector))),
        }
    }

    fn submit(&mut self, form: &SearchForm, text: &str) -> ResearchResult<()> {
        let input = self.first(form.input, "search input")?;
        input.fill(text).map_err(|e| self.browser_failure("typing the search text", e))?;

        match form.submit {
            Submit::Key(key) => input.press(key).map_err(|e| self.browser_failure("submitting the search", e)),
            Submit::Click(selector) => {
                let button = self.first(selector, "search button")?;
                button.click().map_err(|e| self.browser_failure("submitting the search", e))
            }
        }
    }

    fn settle(&mut self, form: &SearchForm, listing: &Listing) -> ResearchResult<Settled> {
        let ready = self.wait_ready(Some(form.ready), listing, form.challenge.as_ref());

        if let Some(probe) = &form.challenge {
            if let Some(message) = self.probe(probe) {
                return Ok(Settled::Challenged(message));
            }
        }

        match ready {
            Ok(()) => Ok(Settled::Ready),
            Err(e) => Err(self.browser_failure("waiting for the results", e)),
        }
    }

    /// Wait out the loading indicator, then for the first of the page's answers to show up
    fn wait_ready(
        &self,
        ready: Option<Ready>,
        listing: &Listing,
        challenge: Option<&StatusProbe>,
    ) -> crate::error::Result<()> {
        let mut signals = Vec::with_capacity(4);
        match ready {
            Some(Ready::Visible(selector)) => signals.push(selector),
            Some(Ready::Hidden(spinner)) => {
                self.page
                    .wait_for(spinner, ElementState::Hidden, self.config.spinner_timeout)?;
            }
            None => {}
        }

        let answers = [Some(listing.results), Some(listing.no_results.selector), challenge.map(|c| c.selector)];
        for selector in answers.into_iter().flatten() {
            if !signals.contains(&selector) {
                signals.push(selector);
            }
        }

        let shown = self.page.wait_for_any(&signals, self.config.default_timeout)?;
        if let Some(selector) = signals.get(shown) {
            self.scope.debug(format_args!("Page answered with '{}'", selector));
        }
        Ok(())
    }

    /// Text of the first element under the probe's selector that carries its marker
    fn probe(&self, probe: &StatusProbe) -> Option<String> {
        let candidates = self.page.locate(probe.selector).ok()?;
        candidates
            .iter()
            .filter_map(|el| el.text_content().ok().flatten())
            .find(|text| probe.matches(text))
            .map(|text| text.trim().to_string())
    }

    fn dismiss(&self, overlay: &Dismiss) {
        if let Err(e) = self
            .page
            .wait_for(overlay.selector, ElementState::Visible, self.config.overlay_timeout)
        {
            self.scope.debug(format_args!("No overlay to dismiss: {}", e));
            return;
        }

        let candidates = self.page.locate(overlay.selector).unwrap_or_default();
        let target = candidates.iter().find(|el| match overlay.text {
            Some(text) => el
                .text_content()
                .ok()
                .flatten()
                .is_some_and(|content| content.contains(text)),
            None => true,
        });

        if let Some(control) = target {
            match control.click() {
                Ok(()) => self.scope.debug(format_args!("Dismissed overlay")),
                Err(e) => self.scope.debug(format_args!("Overlay click ignored: {}", e)),
            }
        }
    }

    fn backoff(&self) -> Duration {
        let jitter_ms = self.config.challenge_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        self.config.challenge_backoff + jitter
    }
}

/// Page HTML rendered to text and cut to [`SNAPSHOT_LIMIT`] characters
fn snapshot_text(html: &str) -> String {
    let text = html2md::parse_html(html);
    match text.char_indices().nth(SNAPSHOT_LIMIT) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakeDom, FakePage, FakeNode};
    use crate::research::Query;
    use std::cell::Cell;
    use std::rc::Rc;

    const FORM: SearchForm = SearchForm {
        advanced_toggle: None,
        overlay: None,
        input: "#q",
        submit: Submit::Key("Enter"),
        ready: Ready::Visible("#body"),
        challenge: Some(StatusProbe::ignoring_case("#msg", "captcha")),
    };

    const LISTING: Listing = Listing {
        results: ".hit",
        no_results: StatusProbe::exact("#msg", "Nada encontrado"),
    };

    const NEXT: NextPage = NextPage {
        control: "a.next",
        staleness: Staleness::Detached,
        settle: None,
    };

    fn config() -> ResearchConfig {
        ResearchConfig::default().challenge_backoff(Duration::ZERO, Duration::ZERO)
    }

    fn scope() -> CallScope {
        CallScope::new(Court::Stj, &Query::new("fraude execução", 1).unwrap())
    }

    /// A site with `pages` result pages behind an input; `challenges` submissions fail first
    fn site(pages: Vec<Vec<&'static str>>, challenges: usize) -> FakePage {
        let page = FakePage::new();
        page.on_navigate(|dom: &mut FakeDom| dom.add("#q", FakeNode::new("")));

        let total = pages.len();
        let first = pages.first().cloned();
        let mut remaining_challenges = challenges;
        page.on_press("#q", move |dom: &mut FakeDom| {
            dom.remove("#msg");
            if remaining_challenges > 0 {
                remaining_challenges -= 1;
                dom.add("#msg", FakeNode::new("Falha na validação do reCAPTCHA"));
                return;
            }
            dom.add("#body", FakeNode::new(""));
            match &first {
                Some(hits) => {
                    dom.add_texts(".hit", hits);
                    if total > 1 {
                        dom.add("a.next", FakeNode::new("Próxima"));
                    }
                }
                None => dom.add("#msg", FakeNode::new("Nada encontrado para a pesquisa")),
            }
        });

        let mut current = 0;
        page.on_click("a.next", move |dom: &mut FakeDom| {
            current += 1;
            dom.remove(".hit");
            dom.add_texts(".hit", &pages[current]);
            if current + 1 == total {
                dom.remove("a.next");
            }
        });

        page
    }

    fn walk_to(page: &FakePage, target: u32) -> (ResearchResult<Vec<String>>, WalkState, u32) {
        let scope = scope();
        let config = config();
        let mut walk = Walk::new(page, &scope, &config);

        let result = (|| -> ResearchResult<Vec<String>> {
            walk.open("https://example.test/", WaitUntil::Load)?;
            walk.search(&FORM, &LISTING, "fraude execução")?;
            let first = walk.collect(&LISTING)?;
            let snapshot = walk.advance(target, &LISTING, &NEXT, first)?;
            walk.finish();
            Ok(match snapshot {
                Snapshot::Empty => Vec::new(),
                Snapshot::Results(hits) => hits
                    .iter()
                    .filter_map(|hit| hit.text_content().unwrap())
                    .collect(),
            })
        })();

        (result, walk.state(), walk.transitions())
    }

    #[test]
    fn test_walk_returns_first_page() {
        let page = site(vec![vec!["a1", "a2"], vec!["b1"]], 0);
        let (result, state, transitions) = walk_to(&page, 1);

        assert_eq!(result.unwrap(), vec!["a1", "a2"]);
        assert_eq!(state, WalkState::Done);
        assert_eq!(transitions, 0);
        assert_eq!(page.journal().clicks_on("a.next"), 0);
    }

    #[test]
    fn test_walk_performs_n_minus_one_transitions() {
        for target in 1..=4u32 {
            let page = site(vec![vec!["p1"], vec!["p2"], vec!["p3"], vec!["p4"]], 0);
            let (result, _, transitions) = walk_to(&page, target);

            assert_eq!(result.unwrap(), vec![format!("p{}", target)]);
            assert_eq!(transitions, target - 1);
            assert_eq!(page.journal().clicks_on("a.next"), (target - 1) as usize);
        }
    }

    #[test]
    fn test_walk_past_last_page_fails() {
        let page = site(vec![vec!["only"]], 0);
        let (result, state, _) = walk_to(&page, 2);

        match result.unwrap_err() {
            ResearchError::PageOutOfRange {
                requested, available, ..
            } => {
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("Expected PageOutOfRange, got {:?}", other),
        }
        assert_eq!(state, WalkState::Failed);
    }

    #[test]
    fn test_walk_reports_positive_empty() {
        let page = site(vec![], 0);
        let (result, state, _) = walk_to(&page, 1);

        assert!(result.unwrap().is_empty());
        assert_eq!(state, WalkState::Done);
    }

    #[test]
    fn test_empty_first_page_short_circuits_pagination() {
        let page = site(vec![], 0);
        let (result, _, transitions) = walk_to(&page, 3);

        assert!(result.unwrap().is_empty());
        assert_eq!(transitions, 0);
    }

    #[test]
    fn test_challenge_retried_then_succeeds() {
        let page = site(vec![vec!["a1"]], 1);
        let (result, _, _) = walk_to(&page, 1);

        assert_eq!(result.unwrap(), vec!["a1"]);
        let journal = page.journal();
        // Only the submission is repeated, the page is loaded once
        assert_eq!(journal.navigations.len(), 1);
        assert_eq!(journal.presses.len(), 2);
        assert_eq!(journal.fills.len(), 2);
    }

    #[test]
    fn test_challenge_exhausts_attempts() {
        let page = site(vec![vec!["a1"]], 5);
        let (result, state, _) = walk_to(&page, 1);

        match result.unwrap_err() {
            ResearchError::ServiceMalfunction { reason, .. } => assert!(reason.contains("challenge")),
            other => panic!("Expected malfunction, got {:?}", other),
        }
        assert_eq!(state, WalkState::Failed);
        assert_eq!(page.journal().presses.len(), 3);
    }

    #[test]
    fn test_challenge_attempts_are_configurable() {
        let page = site(vec![vec!["a1"]], 4);
        let scope = scope();
        let config = config().challenge_attempts(5);
        let mut walk = Walk::new(&page, &scope, &config);

        walk.open("https://example.test/", WaitUntil::Load).unwrap();
        walk.search(&FORM, &LISTING, "fraude").unwrap();

        assert_eq!(walk.state(), WalkState::PageReady { page: 1 });
        assert_eq!(page.journal().presses.len(), 5);
    }

    #[test]
    fn test_missing_results_and_status_is_malfunction() {
        let page = FakePage::new();
        page.on_navigate(|dom: &mut FakeDom| dom.add("#q", FakeNode::new("")));
        page.on_press("#q", |dom: &mut FakeDom| dom.add("#body", FakeNode::new("")));

        let (result, state, _) = walk_to(&page, 1);

        match result.unwrap_err() {
            ResearchError::ServiceMalfunction { reason, diagnostics, .. } => {
                assert!(reason.contains("neither results nor a status message"));
                assert_eq!(diagnostics.url.as_deref(), Some("https://example.test/"));
                assert_eq!(diagnostics.status, Some(200));
                assert!(diagnostics.snapshot.is_some());
            }
            other => panic!("Expected malfunction, got {:?}", other),
        }
        assert_eq!(state, WalkState::Failed);
    }

    #[test]
    fn test_unrecognised_status_is_malfunction() {
        let page = FakePage::new();
        page.on_navigate(|dom: &mut FakeDom| dom.add("#q", FakeNode::new("")));
        page.on_press("#q", |dom: &mut FakeDom| {
            dom.add("#body", FakeNode::new(""));
            dom.add("#msg", FakeNode::new("Serviço temporariamente indisponível"));
        });

        let (result, _, _) = walk_to(&page, 1);

        match result.unwrap_err() {
            ResearchError::ServiceMalfunction { reason, .. } => assert!(reason.contains("indisponível")),
            other => panic!("Expected malfunction, got {:?}", other),
        }
    }

    #[test]
    fn test_error_status_fails_before_searching() {
        let page = site(vec![vec!["a1"]], 0).with_status(Some(503));
        let (result, _, _) = walk_to(&page, 1);

        match result.unwrap_err() {
            ResearchError::ServiceMalfunction { reason, diagnostics, .. } => {
                assert!(reason.contains("503"));
                assert_eq!(diagnostics.status, Some(503));
            }
            other => panic!("Expected malfunction, got {:?}", other),
        }
        assert!(page.journal().fills.is_empty());
    }

    #[test]
    fn test_results_never_ready_is_malfunction() {
        let page = FakePage::new();
        page.on_navigate(|dom: &mut FakeDom| dom.add("#q", FakeNode::new("")));

        let (result, _, _) = walk_to(&page, 1);

        match result.unwrap_err() {
            ResearchError::ServiceMalfunction { reason, .. } => assert!(reason.contains("waiting for the results")),
            other => panic!("Expected malfunction, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_input_is_malfunction() {
        let page = FakePage::new();
        let (result, _, _) = walk_to(&page, 1);

        match result.unwrap_err() {
            ResearchError::ServiceMalfunction { reason, .. } => assert!(reason.contains("search input")),
            other => panic!("Expected malfunction, got {:?}", other),
        }
    }

    #[test]
    fn test_next_click_that_changes_nothing_is_malfunction() {
        let page = site(vec![vec!["a1"], vec!["b1"]], 0);
        // Swallow the click: the first page never goes away
        let stuck = FakePage::new();
        stuck.on_navigate(|dom: &mut FakeDom| dom.add("#q", FakeNode::new("")));
        stuck.on_press("#q", |dom: &mut FakeDom| {
            dom.add("#body", FakeNode::new(""));
            dom.add_texts(".hit", &["a1"]);
            dom.add("a.next", FakeNode::new("Próxima"));
        });

        let (result, state, transitions) = walk_to(&stuck, 2);

        match result.unwrap_err() {
            ResearchError::ServiceMalfunction { reason, .. } => assert!(reason.contains("previous results")),
            other => panic!("Expected malfunction, got {:?}", other),
        }
        assert_eq!(state, WalkState::Failed);
        assert_eq!(transitions, 0);
        assert_eq!(walk_to(&page, 2).0.unwrap(), vec!["b1"]);
    }

    #[test]
    fn test_challenged_attempts_never_wait_out_a_timeout() {
        let page = site(vec![vec!["a1"]], 2);
        let (result, _, _) = walk_to(&page, 1);

        assert_eq!(result.unwrap(), vec!["a1"]);
        let journal = page.journal();
        assert_eq!(journal.presses.len(), 3);
        assert!(journal.expired.is_empty(), "waits ran to their deadline: {:?}", journal.expired);
    }

    #[test]
    fn test_results_rendered_after_the_wait_began() {
        let submitted = Rc::new(Cell::new(false));
        let page = FakePage::new();
        page.on_navigate(|dom: &mut FakeDom| dom.add("#q", FakeNode::new("")));
        let flag = submitted.clone();
        page.on_press("#q", move |_: &mut FakeDom| flag.set(true));
        page.on_poll(move |dom: &mut FakeDom| {
            if submitted.get() {
                dom.remove(".hit");
                dom.add_texts(".hit", &["late"]);
            }
        });

        let (result, state, _) = walk_to(&page, 1);

        assert_eq!(result.unwrap(), vec!["late"]);
        assert_eq!(state, WalkState::Done);
    }

    #[test]
    fn test_no_results_message_ends_the_wait() {
        let page = FakePage::new();
        page.on_navigate(|dom: &mut FakeDom| dom.add("#q", FakeNode::new("")));
        page.on_press("#q", |dom: &mut FakeDom| dom.add("#msg", FakeNode::new("Nada encontrado")));

        let (result, _, _) = walk_to(&page, 1);

        assert!(result.unwrap().is_empty());
        assert!(page.journal().expired.is_empty());
    }

    #[test]
    fn test_out_of_range_fails_the_walk() {
        let page = FakePage::new();
        let scope = scope();
        let config = config();
        let mut walk = Walk::new(&page, &scope, &config);
        walk.landed_on(4);

        let err = walk.out_of_range(4, 2);

        assert!(matches!(
            err,
            ResearchError::PageOutOfRange {
                court: Court::Stj,
                requested: 4,
                available: 2
            }
        ));
        assert_eq!(walk.state(), WalkState::Failed);
    }

    #[test]
    fn test_snapshot_text_is_truncated() {
        let html = format!("<html><body><p>{}</p></body></html>", "ç".repeat(SNAPSHOT_LIMIT * 2));
        let text = snapshot_text(&html);
        assert!(text.chars().count() <= SNAPSHOT_LIMIT + 1);
        assert!(text.ends_with('…'));
    }
}
