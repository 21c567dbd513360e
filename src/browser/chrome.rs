use crate::browser::page::{Clipboard, ElementHandle, ElementState, Navigation, Page, WaitUntil};
use crate::error::{BrowserError, Result};
use headless_chrome::browser::tab::NoElementFound;
use headless_chrome::protocol::cdp::Browser::{GrantPermissions, PermissionType};
use headless_chrome::protocol::cdp::DOM::NodeId;
use headless_chrome::util::Wait;
use headless_chrome::{Element, Tab};
use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;

/// Interval between two checks of a polled condition
const POLL_INTERVAL: Duration = Duration::from_millis(100);

const TEXT_CONTENT_JS: &str = "function() { return this.textContent; }";

const IS_CONNECTED_JS: &str = "function() { return this.isConnected; }";

const IS_VISIBLE_JS: &str = r#"
    function() {
        if (!this.isConnected) return false;
        const style = window.getComputedStyle(this);
        if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') {
            return false;
        }
        const rect = this.getBoundingClientRect();
        return rect.width > 0 && rect.height > 0;
    }
"#;

const CLEAR_VALUE_JS: &str = "function() { this.value = ''; }";

const RESPONSE_STATUS_JS: &str = r#"
    (function() {
        const entry = performance.getEntriesByType('navigation')[0];
        return entry && entry.responseStatus ? entry.responseStatus : null;
    })()
"#;

const RESOURCE_COUNT_JS: &str = "performance.getEntriesByType('resource').length";

/// An element on a [`ChromePage`], addressed by DOM node id
#[derive(Clone)]
pub struct ChromeElement {
    tab: Arc<Tab>,
    node_id: NodeId,
}

impl ChromeElement {
    fn resolve(&self) -> Result<Element<'_>> {
        Element::new(&self.tab, self.node_id)
            .map_err(|e| BrowserError::ElementNotFound(format!("Node {} is gone: {}", self.node_id, e)))
    }

    fn eval_bool(&self, function: &str) -> Result<bool> {
        let element = self.resolve()?;
        let result = element
            .call_js_fn(function, vec![], false)
            .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;
        Ok(result.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }
}

impl ElementHandle for ChromeElement {
    fn click(&self) -> Result<()> {
        self.resolve()?
            .click()
            .map_err(|e| BrowserError::InteractionFailed(format!("click: {}", e)))?;
        Ok(())
    }

    fn fill(&self, text: &str) -> Result<()> {
        let element = self.resolve()?;
        element
            .call_js_fn(CLEAR_VALUE_JS, vec![], false)
            .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;
        element
            .type_into(text)
            .map_err(|e| BrowserError::InteractionFailed(format!("type: {}", e)))?;
        Ok(())
    }

    fn press(&self, key: &str) -> Result<()> {
        self.resolve()?
            .focus()
            .map_err(|e| BrowserError::InteractionFailed(format!("focus: {}", e)))?;
        self.tab
            .press_key(key)
            .map_err(|e| BrowserError::InteractionFailed(format!("press {}: {}", key, e)))?;
        Ok(())
    }

    fn text_content(&self) -> Result<Option<String>> {
        let result = self
            .resolve()?
            .call_js_fn(TEXT_CONTENT_JS, vec![], false)
            .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;
        Ok(result.value.and_then(|v| v.as_str().map(str::to_string)))
    }

    fn is_visible(&self) -> Result<bool> {
        self.eval_bool(IS_VISIBLE_JS)
    }

    fn is_attached(&self) -> Result<bool> {
        // A node id that no longer resolves belongs to a replaced document
        if Element::new(&self.tab, self.node_id).is_err() {
            return Ok(false);
        }
        self.eval_bool(IS_CONNECTED_JS)
    }

    fn wait_until(&self, state: ElementState, timeout: Duration) -> Result<()> {
        Wait::new(timeout, POLL_INTERVAL)
            .until(|| {
                let reached = match state {
                    ElementState::Visible => self.is_visible().unwrap_or(false),
                    ElementState::Hidden => !self.is_visible().unwrap_or(false),
                    ElementState::Detached => !self.is_attached().unwrap_or(false),
                };
                reached.then_some(())
            })
            .map_err(|_| BrowserError::Timeout(format!("node {} never became {:?} within {:?}", self.node_id, state, timeout)))
    }

    fn locate(&self, selector: &str) -> Result<Vec<Self>> {
        let element = self.resolve()?;
        let found = match element.find_elements(selector) {
            Ok(found) => found,
            Err(e) if e.downcast_ref::<NoElementFound>().is_some() => return Ok(Vec::new()),
            Err(e) => return Err(BrowserError::ElementNotFound(format!("'{}': {}", selector, e))),
        };

        Ok(found
            .into_iter()
            .map(|child| ChromeElement {
                tab: self.tab.clone(),
                node_id: child.node_id,
            })
            .collect())
    }
}

/// A Chrome tab driven through the DevTools protocol
pub struct ChromePage {
    tab: Arc<Tab>,
    default_timeout: Cell<Duration>,
    network_idle_quiet: Duration,
}

impl ChromePage {
    pub fn new(tab: Arc<Tab>) -> Self {
        let default_timeout = Duration::from_secs(10);
        tab.set_default_timeout(default_timeout);
        Self {
            tab,
            default_timeout: Cell::new(default_timeout),
            network_idle_quiet: Duration::from_millis(500),
        }
    }

    /// Quiet window after which the network counts as idle
    pub fn network_idle_quiet(mut self, quiet: Duration) -> Self {
        self.network_idle_quiet = quiet;
        self
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    fn evaluate(&self, expression: &str, await_promise: bool) -> Result<Option<serde_json::Value>> {
        let result = self
            .tab
            .evaluate(expression, await_promise)
            .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;
        Ok(result.value)
    }

    fn response_status(&self) -> Option<u16> {
        match self.evaluate(RESPONSE_STATUS_JS, false) {
            Ok(value) => value.and_then(|v| v.as_u64()).and_then(|s| u16::try_from(s).ok()),
            Err(e) => {
                log::debug!("Could not read the response status: {}", e);
                None
            }
        }
    }

    fn wait_for_network_idle(&self) -> Result<()> {
        let mut last_count: Option<u64> = None;
        Wait::new(self.default_timeout.get(), self.network_idle_quiet)
            .until(|| {
                let count = self.evaluate(RESOURCE_COUNT_JS, false).ok().flatten()?.as_u64()?;
                if last_count == Some(count) {
                    return Some(());
                }
                last_count = Some(count);
                None
            })
            .map_err(|_| BrowserError::Timeout(format!("network never went idle on {}", self.tab.get_url())))
    }

    fn any_visible(&self, selector: &str) -> bool {
        self.locate(selector)
            .map(|found| found.iter().any(|el| el.is_visible().unwrap_or(false)))
            .unwrap_or(false)
    }
}

impl Page for ChromePage {
    type Element = ChromeElement;

    fn navigate(&self, url: &str, wait: WaitUntil) -> Result<Navigation> {
        self.tab
            .navigate_to(url)
            .map_err(|e| BrowserError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| BrowserError::NavigationFailed(format!("Navigation to {} did not complete: {}", url, e)))?;

        if wait == WaitUntil::NetworkIdle {
            self.wait_for_network_idle()?;
        }

        Ok(Navigation {
            url: self.tab.get_url(),
            status: self.response_status(),
        })
    }

    fn locate(&self, selector: &str) -> Result<Vec<ChromeElement>> {
        let found = match self.tab.find_elements(selector) {
            Ok(found) => found,
            Err(e) if e.downcast_ref::<NoElementFound>().is_some() => return Ok(Vec::new()),
            Err(e) => return Err(BrowserError::ElementNotFound(format!("'{}': {}", selector, e))),
        };

        Ok(found
            .into_iter()
            .map(|element| ChromeElement {
                tab: self.tab.clone(),
                node_id: element.node_id,
            })
            .collect())
    }

    fn wait_for(&self, selector: &str, state: ElementState, timeout: Duration) -> Result<()> {
        Wait::new(timeout, POLL_INTERVAL)
            .until(|| {
                let reached = match state {
                    ElementState::Visible => self.any_visible(selector),
                    ElementState::Hidden => !self.any_visible(selector),
                    ElementState::Detached => self.locate(selector).map(|found| found.is_empty()).unwrap_or(false),
                };
                reached.then_some(())
            })
            .map_err(|_| BrowserError::Timeout(format!("'{}' never became {:?} within {:?}", selector, state, timeout)))
    }

    fn wait_for_any(&self, selectors: &[&str], timeout: Duration) -> Result<usize> {
        Wait::new(timeout, POLL_INTERVAL)
            .until(|| selectors.iter().position(|selector| self.any_visible(selector)))
            .map_err(|_| BrowserError::Timeout(format!("none of {:?} became visible within {:?}", selectors, timeout)))
    }

    fn wait_for_load(&self, timeout: Duration) -> Result<()> {
        self.tab.set_default_timeout(timeout);
        let waited = self.tab.wait_until_navigated().map(|_| ());
        self.tab.set_default_timeout(self.default_timeout.get());

        waited.map_err(|e| BrowserError::Timeout(format!("page load did not happen within {:?}: {}", timeout, e)))
    }

    fn url(&self) -> String {
        self.tab.get_url()
    }

    fn content(&self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| BrowserError::EvaluationFailed(format!("Failed to read page content: {}", e)))
    }

    fn set_default_timeout(&self, timeout: Duration) {
        self.default_timeout.set(timeout);
        self.tab.set_default_timeout(timeout);
    }
}

impl Clipboard for ChromePage {
    fn grant_read(&self) -> Result<()> {
        let grant = GrantPermissions {
            permissions: vec![PermissionType::ClipboardReadWrite, PermissionType::ClipboardSanitizedWrite],
            origin: None,
            browser_context_id: None,
        };

        self.tab
            .call_method(grant)
            .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to grant clipboard access: {}", e)))?;

        // navigator.clipboard only answers a focused document
        self.tab
            .activate()
            .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to focus tab: {}", e)))?;

        Ok(())
    }

    fn read_text(&self) -> Result<Option<String>> {
        let value = self.evaluate("navigator.clipboard.readText()", true)?;
        Ok(value.and_then(|v| v.as_str().map(str::to_string)))
    }
}
