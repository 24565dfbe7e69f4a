//! Single-action execution against a live page

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::browser::{BrowserError, Page};
use crate::types::{Action, ActionType};

use super::{CrawlError, Crawler};

impl Crawler {
    /// Bound a browser call by the per-action timeout and the crawl-wide
    /// cancellation scope.
    pub(crate) async fn bounded<T>(
        &self,
        cancel: &CancellationToken,
        call: impl Future<Output = Result<T, BrowserError>>,
    ) -> Result<T, BrowserError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(BrowserError::Cancelled),
            outcome = tokio::time::timeout(self.config.page_max_timeout, call) => match outcome {
                Ok(result) => result,
                Err(_) => Err(BrowserError::Timeout(self.config.page_max_timeout)),
            }
        }
    }

    /// Perform one action on the page, dispatching by action type.
    pub(crate) async fn execute_action(
        &self,
        action: &Action,
        page: &dyn Page,
        cancel: &CancellationToken,
    ) -> Result<(), CrawlError> {
        match action.action_type {
            ActionType::LoadUrl => {
                self.bounded(cancel, page.navigate(&action.input)).await?;
                self.bounded(cancel, page.wait_load_heuristics()).await?;
            }
            ActionType::FillForm => {
                let form = match &action.form {
                    Some(form) => form,
                    None => return Ok(()),
                };
                self.process_form(page, form, cancel).await?;
            }
            ActionType::LeftClick | ActionType::LeftClickDown => {
                let descriptor = match &action.element {
                    Some(element) => element,
                    None => {
                        return Err(
                            BrowserError::Site("click action without an element".to_string())
                                .into(),
                        )
                    }
                };

                let element = self
                    .bounded(cancel, page.element_by_xpath(&descriptor.xpath))
                    .await?;

                self.bounded(cancel, element.scroll_into_view()).await?;

                if !self.bounded(cancel, element.visible()).await? {
                    return Err(BrowserError::ElementNotVisible.into());
                }

                match self.bounded(cancel, element.interactable()).await {
                    Ok(true) => {}
                    Ok(false) | Err(BrowserError::Covered) => {
                        return Err(BrowserError::ElementNotVisible.into())
                    }
                    Err(err) => return Err(err.into()),
                }

                self.bounded(cancel, element.click()).await?;
                self.bounded(cancel, page.wait_load_heuristics()).await?;
            }
        }
        Ok(())
    }
}
