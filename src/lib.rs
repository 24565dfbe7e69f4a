//! Statecrawl: state-aware headless crawl engine
//!
//! Discovers web application state by replaying user-like actions against a
//! real browser instead of fetching URLs, featuring:
//! - Action queue with origin-state reconstruction before every interaction
//! - Multi-pass DOM/text normalization producing stable page fingerprints
//! - SimHash oracle for near-duplicate page-state detection
//! - Append-only crawl graph of page states linked by actions
//! - Failure-classified control loop bounded by wall clock and failure budget
//!
//! The browser itself is reached through the narrow traits in [`browser`];
//! a host supplies a [`browser::BrowserPool`] adapter and calls
//! [`crawler::Crawler::crawl`] once per seed URL.

pub mod browser;
pub mod crawler;
pub mod graph;
pub mod normalize;
pub mod output;
pub mod types;
pub mod util;

pub use crawler::{Crawler, CrawlerConfig};
pub use types::*;
