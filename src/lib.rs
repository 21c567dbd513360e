//! # brlaw-mcp
//!
//! Legal research on the Brazilian superior courts for AI agents. Each court's public case-law
//! search is driven through a real Chrome instance over the Chrome DevTools Protocol (CDP), and
//! the decision summaries (ementas) on the requested results page come back as records.
//!
//! ## Supported courts
//!
//! - **STJ**, Superior Tribunal de Justiça: summaries read from the results page, paged by clicking
//! - **TST**, Tribunal Superior do Trabalho: multi-paragraph summaries behind a loading spinner
//! - **STF**, Supremo Tribunal Federal: paged through the URL, summaries copied to the clipboard
//!
//! ## MCP Server
//!
//! The recommended way to use this library is via the Model Context Protocol (MCP) server, which
//! exposes one research tool per court:
//!
//! ```bash
//! # Run headless browser over stdio
//! cargo run --bin brlaw-mcp-server
//!
//! # Visible browser, debug logs, streamable HTTP on port 3000
//! cargo run --bin brlaw-mcp-server -- --headed -vv --transport http
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use brlaw_mcp::{BrowserSession, Court, LaunchOptions, Researcher};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let session = BrowserSession::launch(LaunchOptions::default())?;
//! let page = session.open_page()?;
//!
//! let findings = Researcher::default().research(&page, Court::Stj, "fraude execução", 1)?;
//! for precedent in findings.precedents() {
//!     println!("{}", precedent.summary());
//! }
//!
//! BrowserSession::close_page(page.tab())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`browser`]: Browser session management and the page abstraction research runs on
//! - [`research`]: Queries, precedent records, the shared search walk and the orchestrator
//! - [`courts`]: One adapter per court
//! - [`error`]: Error types and result aliases
//! - [`mcp`]: **Model Context Protocol server** (requires `mcp-handler` feature)

pub mod browser;
pub mod courts;
pub mod error;
pub mod research;

#[cfg(feature = "mcp-handler")]
pub mod mcp;

pub use browser::{BrowserSession, ChromePage, ConnectionOptions, LaunchOptions};
pub use courts::Court;
pub use error::{BrowserError, ResearchError, ResearchResult, Result};
pub use research::{Findings, Precedent, Query, ResearchConfig, Researcher, NO_RESULTS_MESSAGE};

#[cfg(feature = "mcp-handler")]
pub use mcp::LegalResearchServer;
#[cfg(feature = "mcp-handler")]
pub use rmcp::ServiceExt;
