//! Browser management: launching Chrome, opening pages, and the page abstraction research runs on

pub mod chrome;
pub mod config;
pub mod page;
pub mod session;

#[cfg(test)]
pub(crate) mod fake;

pub use chrome::{ChromeElement, ChromePage};
pub use config::{ConnectionOptions, LaunchOptions};
pub use page::{Clipboard, ElementHandle, ElementState, Navigation, Page, WaitUntil};
pub use session::BrowserSession;
