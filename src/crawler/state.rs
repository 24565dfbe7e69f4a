//! Page state capture

use tokio_util::sync::CancellationToken;

use crate::browser::Page;
use crate::normalize::simhash;
use crate::types::{fingerprint, Action, ActionType, PageState, StateId};

use super::{CrawlError, Crawler};

impl Crawler {
    /// Fingerprint of the page currently displayed, computed over the same
    /// normalization pipeline that builds page states.
    pub(crate) async fn page_hash(
        &self,
        page: &dyn Page,
        cancel: &CancellationToken,
    ) -> Result<StateId, CrawlError> {
        let content = self.bounded(cancel, page.content()).await?;
        let normalized = self.normalizer.apply(&content);
        Ok(fingerprint(&normalized))
    }

    /// Capture the page state produced by `action`: current URL, normalized
    /// DOM, fingerprint, and simhash. Click and form actions deepen the
    /// state; a URL load keeps the depth of the action that queued it.
    pub(crate) async fn build_page_state(
        &self,
        action: &Action,
        page: &dyn Page,
        cancel: &CancellationToken,
    ) -> Result<PageState, CrawlError> {
        let url = self.bounded(cancel, page.current_url()).await?;
        let content = self.bounded(cancel, page.content()).await?;

        let normalized = self.normalizer.apply(&content);
        let unique_id = fingerprint(&normalized);
        let simhash = simhash(&normalized);

        let depth = match action.action_type {
            ActionType::LoadUrl => action.depth,
            _ => action.depth + 1,
        };

        Ok(PageState {
            unique_id,
            url,
            depth,
            origin_id: String::new(),
            dom: normalized,
            simhash,
        })
    }
}
