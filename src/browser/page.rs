//! The page abstraction the research engine drives.
//!
//! A [`Page`] is one navigable browser page. Court adapters only ever talk to these traits, so the
//! real Chrome implementation ([`crate::browser::ChromePage`]) and the scripted page used in tests
//! are interchangeable.

use crate::error::Result;
use std::time::Duration;

/// When a navigation is considered finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// The document's load event fired
    Load,
    /// The load event fired and no new network requests started during a quiet window.
    /// Needed by sites that render their results asynchronously after the document loads.
    NetworkIdle,
}

/// State an element (or a selector) is waited into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    Visible,
    /// Not rendered, or not present at all
    Hidden,
    /// No longer part of the document
    Detached,
}

/// Outcome of a navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// URL after redirects
    pub url: String,

    /// HTTP status of the main document, if the browser exposed it
    pub status: Option<u16>,
}

impl Navigation {
    pub fn is_error_status(&self) -> bool {
        self.status.is_some_and(|status| status >= 400)
    }
}

/// A handle to one element found on a [`Page`]
pub trait ElementHandle: Sized {
    fn click(&self) -> Result<()>;

    /// Replace the element's value with `text`
    fn fill(&self, text: &str) -> Result<()>;

    /// Focus the element and press a key, e.g. `"Enter"`
    fn press(&self, key: &str) -> Result<()>;

    /// The DOM `textContent`; `None` when the node has none
    fn text_content(&self) -> Result<Option<String>>;

    fn is_visible(&self) -> Result<bool>;

    /// Whether the node is still connected to the document
    fn is_attached(&self) -> Result<bool>;

    /// Block until the element reaches `state`, failing with [`BrowserError::Timeout`] after `timeout`
    ///
    /// [`BrowserError::Timeout`]: crate::error::BrowserError::Timeout
    fn wait_until(&self, state: ElementState, timeout: Duration) -> Result<()>;

    /// Descendants matching `selector`
    fn locate(&self, selector: &str) -> Result<Vec<Self>>;
}

/// A navigable browser page
pub trait Page {
    type Element: ElementHandle;

    fn navigate(&self, url: &str, wait: WaitUntil) -> Result<Navigation>;

    /// All elements matching `selector`, in document order
    fn locate(&self, selector: &str) -> Result<Vec<Self::Element>>;

    /// Block until some element matching `selector` reaches `state`. `Hidden` and `Detached` are
    /// also satisfied when nothing matches.
    fn wait_for(&self, selector: &str, state: ElementState, timeout: Duration) -> Result<()>;

    /// Block until an element under any of `selectors` is visible and return the index of the
    /// selector that matched first
    fn wait_for_any(&self, selectors: &[&str], timeout: Duration) -> Result<usize>;

    /// Block until the page fires its load event (after a click that navigates)
    fn wait_for_load(&self, timeout: Duration) -> Result<()>;

    fn url(&self) -> String;

    /// The current document's HTML
    fn content(&self) -> Result<String>;

    /// Timeout applied to operations that do not take one explicitly
    fn set_default_timeout(&self, timeout: Duration);
}

/// Clipboard access, for sites that only hand out text through a "copy" button
pub trait Clipboard {
    /// Allow the page to read the clipboard. Must be called before [`Clipboard::read_text`].
    fn grant_read(&self) -> Result<()>;

    fn read_text(&self) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_error_status() {
        let ok = Navigation {
            url: "https://scon.stj.jus.br/SCON/".to_string(),
            status: Some(200),
        };
        let failed = Navigation {
            status: Some(503),
            ..ok.clone()
        };
        let unknown = Navigation { status: None, ..ok.clone() };

        assert!(!ok.is_error_status());
        assert!(failed.is_error_status());
        assert!(!unknown.is_error_status());
    }
}
