//! Scripted in-memory page for unit tests.
//!
//! Elements live in a flat list keyed by the exact selector the code under test queries. Tests
//! script a site by reacting to navigations, clicks and key presses, and afterwards inspect the
//! [`Journal`] to see what the engine did.
//!
//! Content that a real site renders asynchronously is scripted with [`FakePage::on_poll`]: it only
//! shows up once the code under test waits for something that is not there yet.

use crate::browser::page::{Clipboard, ElementHandle, ElementState, Navigation, Page, WaitUntil};
use crate::error::{BrowserError, Result};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

pub(crate) struct FakeNode {
    text: Option<String>,
    visible: Cell<bool>,
    attached: Cell<bool>,
    copies: Option<String>,
    children: Vec<(String, Rc<FakeNode>)>,
}

impl FakeNode {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            visible: Cell::new(true),
            attached: Cell::new(true),
            copies: None,
            children: Vec::new(),
        }
    }

    /// A node whose `textContent` is null
    pub(crate) fn empty() -> Self {
        Self { text: None, ..Self::new("") }
    }

    pub(crate) fn hidden(self) -> Self {
        self.visible.set(false);
        self
    }

    /// Clicking this node puts `text` on the clipboard
    pub(crate) fn copies(mut self, text: impl Into<String>) -> Self {
        self.copies = Some(text.into());
        self
    }

    pub(crate) fn child(mut self, selector: &str, node: FakeNode) -> Self {
        self.children.push((selector.to_string(), Rc::new(node)));
        self
    }
}

/// Mutable document state handed to reactions
#[derive(Default)]
pub(crate) struct FakeDom {
    nodes: Vec<(String, Rc<FakeNode>)>,
    clipboard: Option<String>,
}

impl FakeDom {
    pub(crate) fn add(&mut self, selector: &str, node: FakeNode) {
        self.nodes.push((selector.to_string(), Rc::new(node)));
    }

    /// Add one plain text node per entry
    pub(crate) fn add_texts(&mut self, selector: &str, texts: &[&str]) {
        for text in texts {
            self.add(selector, FakeNode::new(*text));
        }
    }

    /// Detach and drop every node under `selector`
    pub(crate) fn remove(&mut self, selector: &str) {
        self.nodes.retain(|(key, node)| {
            if key == selector {
                node.attached.set(false);
                false
            } else {
                true
            }
        });
    }

    /// Drop everything, as a full page load does
    pub(crate) fn reset(&mut self) {
        for (_, node) in self.nodes.drain(..) {
            node.attached.set(false);
        }
    }
}

/// Everything the page was asked to do
#[derive(Debug, Default, Clone)]
pub(crate) struct Journal {
    pub navigations: Vec<String>,
    pub clicks: Vec<String>,
    pub presses: Vec<(String, String)>,
    pub fills: Vec<(String, String)>,
    pub clipboard_reads: usize,
    pub loads_awaited: usize,
    /// Waits that would have blocked until their deadline
    pub expired: Vec<String>,
}

impl Journal {
    pub(crate) fn clicks_on(&self, selector: &str) -> usize {
        self.clicks.iter().filter(|s| *s == selector).count()
    }
}

#[derive(PartialEq)]
enum Trigger {
    Navigate,
    Click(String),
    Press(String),
    Poll,
}

type Reaction = Box<dyn FnMut(&mut FakeDom)>;

#[derive(Default)]
struct PageState {
    dom: RefCell<FakeDom>,
    reactions: RefCell<Vec<(Trigger, Reaction)>>,
    journal: RefCell<Journal>,
    clipboard_granted: Cell<bool>,
    status: Cell<Option<u16>>,
    url: RefCell<String>,
}

impl PageState {
    fn fire(&self, trigger: Trigger) {
        let mut reactions = self.reactions.borrow_mut();
        let mut dom = self.dom.borrow_mut();
        for (_, reaction) in reactions.iter_mut().filter(|(t, _)| *t == trigger) {
            reaction(&mut dom);
        }
    }
}

#[derive(Clone)]
pub(crate) struct FakeElement {
    selector: String,
    node: Rc<FakeNode>,
    state: Rc<PageState>,
}

impl ElementHandle for FakeElement {
    fn click(&self) -> Result<()> {
        if !self.node.attached.get() {
            return Err(BrowserError::ElementNotFound(format!("'{}' is detached", self.selector)));
        }
        self.state.journal.borrow_mut().clicks.push(self.selector.clone());
        if let Some(text) = &self.node.copies {
            self.state.dom.borrow_mut().clipboard = Some(text.clone());
        }
        self.state.fire(Trigger::Click(self.selector.clone()));
        Ok(())
    }

    fn fill(&self, text: &str) -> Result<()> {
        self.state
            .journal
            .borrow_mut()
            .fills
            .push((self.selector.clone(), text.to_string()));
        Ok(())
    }

    fn press(&self, key: &str) -> Result<()> {
        self.state
            .journal
            .borrow_mut()
            .presses
            .push((self.selector.clone(), key.to_string()));
        self.state.fire(Trigger::Press(self.selector.clone()));
        Ok(())
    }

    fn text_content(&self) -> Result<Option<String>> {
        Ok(self.node.text.clone())
    }

    fn is_visible(&self) -> Result<bool> {
        Ok(self.node.attached.get() && self.node.visible.get())
    }

    fn is_attached(&self) -> Result<bool> {
        Ok(self.node.attached.get())
    }

    fn wait_until(&self, state: ElementState, _timeout: Duration) -> Result<()> {
        let reached = match state {
            ElementState::Visible => self.is_visible()?,
            ElementState::Hidden => !self.is_visible()?,
            ElementState::Detached => !self.is_attached()?,
        };
        if reached {
            Ok(())
        } else {
            let message = format!("'{}' never became {:?}", self.selector, state);
            self.state.journal.borrow_mut().expired.push(message.clone());
            Err(BrowserError::Timeout(message))
        }
    }

    fn locate(&self, selector: &str) -> Result<Vec<Self>> {
        Ok(self
            .node
            .children
            .iter()
            .filter(|(key, node)| key == selector && node.attached.get())
            .map(|(key, node)| FakeElement {
                selector: key.clone(),
                node: node.clone(),
                state: self.state.clone(),
            })
            .collect())
    }
}

/// A page whose behaviour is scripted by the test
#[derive(Default)]
pub(crate) struct FakePage {
    state: Rc<PageState>,
}

impl FakePage {
    pub(crate) fn new() -> Self {
        let page = Self::default();
        page.state.status.set(Some(200));
        page
    }

    pub(crate) fn with_status(self, status: Option<u16>) -> Self {
        self.state.status.set(status);
        self
    }

    pub(crate) fn on_navigate(&self, reaction: impl FnMut(&mut FakeDom) + 'static) {
        self.state
            .reactions
            .borrow_mut()
            .push((Trigger::Navigate, Box::new(reaction)));
    }

    pub(crate) fn on_click(&self, selector: &str, reaction: impl FnMut(&mut FakeDom) + 'static) {
        self.state
            .reactions
            .borrow_mut()
            .push((Trigger::Click(selector.to_string()), Box::new(reaction)));
    }

    pub(crate) fn on_press(&self, selector: &str, reaction: impl FnMut(&mut FakeDom) + 'static) {
        self.state
            .reactions
            .borrow_mut()
            .push((Trigger::Press(selector.to_string()), Box::new(reaction)));
    }

    /// React the first time a wait is not satisfied straight away
    pub(crate) fn on_poll(&self, reaction: impl FnMut(&mut FakeDom) + 'static) {
        self.state.reactions.borrow_mut().push((Trigger::Poll, Box::new(reaction)));
    }

    pub(crate) fn journal(&self) -> Journal {
        self.state.journal.borrow().clone()
    }

    fn matching(&self, selector: &str) -> Vec<FakeElement> {
        self.state
            .dom
            .borrow()
            .nodes
            .iter()
            .filter(|(key, node)| key == selector && node.attached.get())
            .map(|(key, node)| FakeElement {
                selector: key.clone(),
                node: node.clone(),
                state: self.state.clone(),
            })
            .collect()
    }

    fn any_visible(&self, selector: &str) -> bool {
        self.matching(selector).iter().any(|el| el.node.visible.get())
    }

    fn reached(&self, selector: &str, state: ElementState) -> bool {
        match state {
            ElementState::Visible => self.any_visible(selector),
            ElementState::Hidden => !self.any_visible(selector),
            ElementState::Detached => self.matching(selector).is_empty(),
        }
    }

    /// Check `condition`, give pending renders one chance, check again
    fn poll<T>(&self, condition: impl Fn() -> Option<T>, expired: impl FnOnce() -> String) -> Result<T> {
        if let Some(value) = condition() {
            return Ok(value);
        }
        self.state.fire(Trigger::Poll);
        if let Some(value) = condition() {
            return Ok(value);
        }
        let message = expired();
        self.state.journal.borrow_mut().expired.push(message.clone());
        Err(BrowserError::Timeout(message))
    }
}

impl Page for FakePage {
    type Element = FakeElement;

    fn navigate(&self, url: &str, _wait: WaitUntil) -> Result<Navigation> {
        self.state.journal.borrow_mut().navigations.push(url.to_string());
        *self.state.url.borrow_mut() = url.to_string();
        self.state.dom.borrow_mut().reset();
        self.state.fire(Trigger::Navigate);

        Ok(Navigation {
            url: url.to_string(),
            status: self.state.status.get(),
        })
    }

    fn locate(&self, selector: &str) -> Result<Vec<FakeElement>> {
        Ok(self.matching(selector))
    }

    fn wait_for(&self, selector: &str, state: ElementState, _timeout: Duration) -> Result<()> {
        self.poll(
            || self.reached(selector, state).then_some(()),
            || format!("'{}' never became {:?}", selector, state),
        )
    }

    fn wait_for_any(&self, selectors: &[&str], _timeout: Duration) -> Result<usize> {
        self.poll(
            || selectors.iter().position(|selector| self.any_visible(selector)),
            || format!("none of {:?} became visible", selectors),
        )
    }

    fn wait_for_load(&self, _timeout: Duration) -> Result<()> {
        self.state.journal.borrow_mut().loads_awaited += 1;
        Ok(())
    }

    fn url(&self) -> String {
        self.state.url.borrow().clone()
    }

    fn content(&self) -> Result<String> {
        let dom = self.state.dom.borrow();
        let body: String = dom
            .nodes
            .iter()
            .filter_map(|(_, node)| node.text.as_deref())
            .map(|text| format!("<p>{}</p>", text))
            .collect();
        Ok(format!("<html><body>{}</body></html>", body))
    }

    fn set_default_timeout(&self, _timeout: Duration) {}
}

impl Clipboard for FakePage {
    fn grant_read(&self) -> Result<()> {
        self.state.clipboard_granted.set(true);
        Ok(())
    }

    fn read_text(&self) -> Result<Option<String>> {
        self.state.journal.borrow_mut().clipboard_reads += 1;
        if !self.state.clipboard_granted.get() {
            return Err(BrowserError::EvaluationFailed("clipboard read denied".to_string()));
        }
        Ok(self.state.dom.borrow().clipboard.clone())
    }
}
