//! Origin reconstruction
//!
//! Browser pages are stateful: the same click from a different starting
//! state produces different results. Before a queued action runs, the
//! browser must display the state the action was discovered from. When it
//! does not, the recorded action path from the graph is replayed to get
//! there.

use tokio_util::sync::CancellationToken;

use tracing::debug;

use crate::browser::Page;
use crate::types::{Action, EMPTY_PAGE};

use super::{CrawlError, Crawler};

impl Crawler {
    /// Replay the shortest recorded action path to `action.origin_id` and
    /// verify the fingerprint afterwards. The current state is preferred as
    /// the replay source when a forward path from it exists; otherwise the
    /// replay restarts from the blank root. Divergence fails the outer
    /// action.
    pub(crate) async fn reconstruct_origin(
        &self,
        action: &Action,
        page: &dyn Page,
        current_hash: &str,
        cancel: &CancellationToken,
    ) -> Result<String, CrawlError> {
        debug!(
            from = %current_hash,
            to = %action.origin_id,
            "navigating back to origin state"
        );

        let path = if self.graph.contains(current_hash) {
            self.graph
                .shortest_path(current_hash, &action.origin_id)
                .or_else(|| self.graph.shortest_path(EMPTY_PAGE, &action.origin_id))
        } else {
            self.graph.shortest_path(EMPTY_PAGE, &action.origin_id)
        };

        let path = match path {
            Some(path) => path,
            None => {
                return Err(CrawlError::OriginMismatch {
                    expected: action.origin_id.clone(),
                    actual: current_hash.to_string(),
                })
            }
        };

        for step in &path {
            debug!(step = %step, "replaying action");
            self.execute_action(step, page, cancel).await?;
        }

        let reached = self.page_hash(page, cancel).await?;
        if reached != action.origin_id {
            return Err(CrawlError::OriginMismatch {
                expected: action.origin_id.clone(),
                actual: reached,
            });
        }
        Ok(reached)
    }
}
