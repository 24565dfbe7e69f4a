//! Structural DOM normalization

use scraper::{Html, Node, Selector};

use super::NormalizeError;

/// Tags whose direct text-node children are stripped before fingerprinting
const STRUCTURAL_TAGS: &str = "h1, h2, h3, h4, h5, h6, p, span, div, td, th, li, a";

/// Removes volatile text content from structural elements
pub struct DomNormalizer {
    structural: Selector,
}

impl DomNormalizer {
    pub fn new() -> Result<Self, NormalizeError> {
        let structural = Selector::parse(STRUCTURAL_TAGS)
            .map_err(|e| NormalizeError::Selector(e.to_string()))?;
        Ok(Self { structural })
    }

    /// Remove the direct text-node children of every structural element and
    /// serialize the document back to HTML. Descendant elements keep their
    /// own text until their tag is visited.
    pub fn apply(&self, html: &str) -> String {
        let mut document = Html::parse_document(html);

        let mut doomed = Vec::new();
        for element in document.select(&self.structural) {
            for child in element.children() {
                if matches!(child.value(), Node::Text(_)) {
                    doomed.push(child.id());
                }
            }
        }
        for id in doomed {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }

        document.root_element().html()
    }
}
