//! Browser seam
//!
//! The crawl engine never talks to a browser directly; it drives the traits
//! below. An adapter (CDP, WebDriver, or a test double) implements them and
//! is handed to the engine as a [`BrowserPool`].
//!
//! # Hook-script contract
//!
//! [`Page::find_navigations`] is backed by instrumentation the adapter
//! injects into every page. The engine relies on the following observable
//! contract, not on how the adapter implements it:
//!
//! - Navigation sinks are recorded into the page: `history.pushState`,
//!   `history.replaceState`, `window.open`, `hashchange` targets, `fetch`
//!   request URLs, `WebSocket` and `EventSource` connection URLs.
//! - Elements with captured click listeners are reported with enough of a
//!   descriptor (XPath, CSS selector, attributes, text) to be re-resolved.
//! - Anchor elements with an `href` are reported even without listeners.
//!
//! Each reported candidate becomes an [`Action`] tagged with its
//! [`NavigationSource`](crate::types::NavigationSource); `origin_id` is left
//! empty and filled in by the crawl loop.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::types::Action;

/// Errors surfaced by a browser adapter, classified so the crawl loop can
/// decide between skipping an action and aborting the crawl.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("element not visible")]
    ElementNotVisible,
    #[error("navigation failed: {0}")]
    NavigationFailed(String),
    #[error("no navigation possible from the current state")]
    NoNavigationPossible,
    #[error("retry budget exceeded: {0}")]
    MaxSleep(String),
    #[error("element covered by an overlay")]
    Covered,
    #[error("element has a zero-area bounding box")]
    InvisibleShape,
    #[error("browser call timed out after {0:?}")]
    Timeout(Duration),
    #[error("crawl cancelled")]
    Cancelled,
    #[error("{0}")]
    Site(String),
}

impl BrowserError {
    /// Errors that fail a single action without ending the crawl.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, BrowserError::Cancelled)
    }
}

/// One element resolved on a live page
#[async_trait]
pub trait PageElement: Send + Sync {
    async fn scroll_into_view(&self) -> Result<(), BrowserError>;

    async fn visible(&self) -> Result<bool, BrowserError>;

    /// Whether the element can receive pointer events at its center.
    /// Returns [`BrowserError::Covered`] when an overlay blocks the point.
    async fn interactable(&self) -> Result<bool, BrowserError>;

    /// Dispatch a left mouse click at the element's center.
    async fn click(&self) -> Result<(), BrowserError>;

    /// Type text into the element.
    async fn type_text(&self, text: &str) -> Result<(), BrowserError>;

    /// Select an option of a `<select>` element by its visible text.
    async fn select_by_text(&self, value: &str) -> Result<(), BrowserError>;

    /// Select an option of a `<select>` element by CSS selector.
    async fn select_by_css(&self, selector: &str) -> Result<(), BrowserError>;

    async fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError>;

    async fn text(&self) -> Result<String, BrowserError>;

    async fn tag_name(&self) -> Result<String, BrowserError>;

    /// Resolve descendant elements by CSS selector.
    async fn elements(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, BrowserError>;
}

/// One browser page borrowed from the pool
#[async_trait]
pub trait Page: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    async fn current_url(&self) -> Result<String, BrowserError>;

    /// Serialized outer HTML of the current document.
    async fn content(&self) -> Result<String, BrowserError>;

    /// Block until the page looks settled: document ready, a network-idle
    /// window elapsed, and animation frames stabilized.
    async fn wait_load_heuristics(&self) -> Result<(), BrowserError>;

    async fn element_by_xpath(&self, xpath: &str) -> Result<Box<dyn PageElement>, BrowserError>;

    /// Candidate navigations observed on the current page per the hook-script
    /// contract above.
    async fn find_navigations(&self) -> Result<Vec<Action>, BrowserError>;

    /// PNG screenshot of the current viewport.
    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError>;
}

/// Pool of browser pages shared across crawlers. The pool must serialize
/// access to each page internally; the engine borrows one page per action.
#[async_trait]
pub trait BrowserPool: Send + Sync {
    async fn get_page(&self) -> Result<Arc<dyn Page>, BrowserError>;

    async fn put_page(&self, page: Arc<dyn Page>);
}
