//! Normalization pipeline producing stable page fingerprints
//!
//! A rendered DOM carries cosmetic noise: encoding differences, volatile
//! tokens (timestamps, session identifiers, prices), and whitespace that
//! varies between renders. The pipeline erases that noise so two renders of
//! the same application state hash to the same fingerprint.
//!
//! Components:
//! - [`normalize_document`]: lowercasing, escape/entity/URL decoding,
//!   whitespace collapse
//! - [`DomNormalizer`]: strips text content from structural elements
//! - [`TextNormalizer`]: regex-driven erasure of volatile tokens
//! - [`SimhashOracle`]: near-duplicate detection over the results

mod document;
mod dom;
mod simhash;
mod text;

pub use document::normalize_document;
pub use dom::DomNormalizer;
pub use simhash::{simhash, SimhashOracle, DEFAULT_MAX_DISTANCE};
pub use text::{TextNormalizer, DATE_TIME_PATTERNS, DEFAULT_TEXT_PATTERNS};

use thiserror::Error;

/// Errors constructing the normalization pipeline
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid text pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid structural selector: {0}")]
    Selector(String),
}

/// Full normalization pipeline over raw page HTML
pub struct Normalizer {
    dom: DomNormalizer,
    text: TextNormalizer,
}

impl Normalizer {
    pub fn new() -> Result<Self, NormalizeError> {
        Ok(Self {
            dom: DomNormalizer::new()?,
            text: TextNormalizer::new()?,
        })
    }

    /// Normalize page content by running, in order: document pass, DOM
    /// normalizer, document pass, text normalizer, document pass.
    ///
    /// The first document pass canonicalizes encodings so the DOM parser sees
    /// predictable input; the middle pass re-canonicalizes whitespace
    /// introduced by HTML serialization; the final pass collapses the residue
    /// left by text erasure.
    pub fn apply(&self, content: &str) -> String {
        let first = normalize_document(content);
        let stripped = self.dom.apply(&first);
        let second = normalize_document(&stripped);
        let erased = self.text.apply(&second);
        normalize_document(&erased)
    }
}
