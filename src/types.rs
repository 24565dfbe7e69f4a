//! Core types for the statecrawl engine

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

use crate::util::{normalize_url, truncate_for_display};

/// Fingerprint string identifying a page state
pub type StateId = String;

/// Sentinel fingerprint for the blank state installed before the loop starts
pub const EMPTY_PAGE: &str = "EMPTY_PAGE";

/// Compute the collision-resistant fingerprint of normalized page content
/// (64-character SHA256 hex string)
pub fn fingerprint(content: &str) -> StateId {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// What the crawler does to a browser page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Navigate the page to a URL
    LoadUrl,
    /// Left-click an element resolved by XPath
    LeftClick,
    /// Left-click with a press-and-hold dispatch
    LeftClickDown,
    /// Fill and submit a form
    FillForm,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoadUrl => "load_url",
            Self::LeftClick => "left_click",
            Self::LeftClickDown => "left_click_down",
            Self::FillForm => "fill_form",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a candidate navigation was observed by the page-side hook script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationSource {
    /// Anchor element with an href
    Anchor,
    /// `history.pushState` call
    HistoryPushState,
    /// `history.replaceState` call
    HistoryReplaceState,
    /// `window.open` call
    WindowOpen,
    /// `hashchange` event target
    HashChange,
    /// `fetch` request URL
    Fetch,
    /// WebSocket connection URL
    WebSocket,
    /// EventSource connection URL
    EventSource,
    /// Element with a captured click listener
    EventListener,
}

/// Descriptor of a DOM node captured from a live page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HTMLElement {
    pub tag_name: String,
    pub id: String,
    pub classes: Vec<String>,
    /// First 100 bytes of the element's outer HTML
    pub outer_html: String,
    pub xpath: String,
    pub css_selector: String,
    pub attributes: BTreeMap<String, String>,
    /// Trimmed text content
    pub text_content: String,
    pub hidden: bool,
    pub name: String,
    /// Value of the `type` attribute, for inputs and buttons
    pub input_type: String,
    pub value: String,
}

/// A form captured from a live page, elements in DOM order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HTMLForm {
    pub elements: Vec<HTMLElement>,
}

/// One unit of work the crawler performs on a browser page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Action {
    pub action_type: ActionType,
    /// URL for [`ActionType::LoadUrl`] actions
    pub input: String,
    /// Target element for click actions
    pub element: Option<HTMLElement>,
    /// Form descriptor for [`ActionType::FillForm`] actions
    pub form: Option<HTMLForm>,
    pub depth: usize,
    /// Fingerprint of the page state this action must be performed from
    pub origin_id: StateId,
    pub source: Option<NavigationSource>,
}

impl Default for Action {
    fn default() -> Self {
        Self {
            action_type: ActionType::LoadUrl,
            input: String::new(),
            element: None,
            form: None,
            depth: 0,
            origin_id: String::new(),
            source: None,
        }
    }
}

impl Action {
    /// Seed action: load a URL starting from the blank state
    pub fn load_url(url: &str) -> Self {
        Self {
            action_type: ActionType::LoadUrl,
            input: url.to_string(),
            depth: 0,
            origin_id: EMPTY_PAGE.to_string(),
            ..Self::default()
        }
    }

    /// Stable digest of `(type, normalized input or selector, origin)` used
    /// for process-wide deduplication of discovered actions.
    pub fn hash(&self) -> String {
        let target = match self.action_type {
            ActionType::LoadUrl => Url::parse(&self.input)
                .map(|u| normalize_url(&u))
                .unwrap_or_else(|_| self.input.to_lowercase()),
            ActionType::LeftClick | ActionType::LeftClickDown => self
                .element
                .as_ref()
                .map(|e| e.xpath.clone())
                .unwrap_or_default(),
            ActionType::FillForm => self
                .form
                .as_ref()
                .map(|f| {
                    f.elements
                        .iter()
                        .map(|e| e.xpath.as_str())
                        .collect::<Vec<_>>()
                        .join(",")
                })
                .unwrap_or_default(),
        };

        let mut hasher = Sha256::new();
        hasher.update(self.action_type.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(target.as_bytes());
        hasher.update(b"|");
        hasher.update(self.origin_id.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match self.action_type {
            ActionType::LoadUrl => self.input.as_str(),
            _ => self
                .element
                .as_ref()
                .map(|e| e.xpath.as_str())
                .unwrap_or(""),
        };
        write!(
            f,
            "{} {} (depth {}, origin {})",
            self.action_type,
            truncate_for_display(target, 120),
            self.depth,
            truncate_for_display(&self.origin_id, 8),
        )
    }
}

/// A crawler-visible identity of a rendered DOM
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageState {
    /// Fingerprint of the normalized DOM
    pub unique_id: StateId,
    pub url: String,
    pub depth: usize,
    /// Fingerprint of the preceding state
    pub origin_id: StateId,
    /// The normalized DOM string `unique_id` was computed over
    pub dom: String,
    /// Locality-sensitive fingerprint for near-duplicate detection
    pub simhash: u64,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            unique_id: String::new(),
            url: String::new(),
            depth: 0,
            origin_id: String::new(),
            dom: String::new(),
            simhash: 0,
        }
    }
}

impl PageState {
    /// The blank root state every crawl graph starts from
    pub fn empty_page() -> Self {
        Self {
            unique_id: EMPTY_PAGE.to_string(),
            url: "about:blank".to_string(),
            ..Self::default()
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (depth {})",
            truncate_for_display(&self.unique_id, 8),
            truncate_for_display(&self.url, 120),
            self.depth,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(xpath: &str, href: &str) -> Action {
        Action {
            action_type: ActionType::LeftClick,
            element: Some(HTMLElement {
                tag_name: "A".to_string(),
                xpath: xpath.to_string(),
                attributes: BTreeMap::from([("href".to_string(), href.to_string())]),
                ..HTMLElement::default()
            }),
            source: Some(NavigationSource::Anchor),
            ..Action::default()
        }
    }

    #[test]
    fn test_action_hash_stable() {
        let a = anchor("/html/body/a[1]", "/same");
        let b = anchor("/html/body/a[1]", "/same");
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_action_hash_distinguishes_targets() {
        let a = anchor("/html/body/a[1]", "/one");
        let b = anchor("/html/body/a[2]", "/two");
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_action_hash_distinguishes_origins() {
        let mut a = anchor("/html/body/a[1]", "/same");
        let mut b = anchor("/html/body/a[1]", "/same");
        a.origin_id = "state-one".to_string();
        b.origin_id = "state-two".to_string();
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_load_url_hash_ignores_tracking_params() {
        let a = Action::load_url("https://example.com/page?utm_source=mail&x=1");
        let b = Action::load_url("https://example.com/page?x=1#frag");
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_load_url_seed_shape() {
        let seed = Action::load_url("https://example.com/");
        assert_eq!(seed.depth, 0);
        assert_eq!(seed.origin_id, EMPTY_PAGE);
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
        assert_eq!(fingerprint("abc").len(), 64);
    }
}
