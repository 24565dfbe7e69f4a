//! Action-driven crawl engine
//!
//! The engine owns a FIFO of pending actions, a crawl graph of discovered
//! page states, and the dedup sets that keep exploration finite. Each loop
//! iteration dequeues one action, re-establishes the browser on the action's
//! origin state, executes it, fingerprints the resulting page, and enqueues
//! the navigations harvested from it.
//!
//! Error handling is classification-driven: per-action browser failures
//! (hidden elements, covered elements, navigation errors, timeouts) are
//! absorbed by a consecutive-failure budget, while cancellation and
//! bookkeeping corruption end the crawl.

mod diagnostics;
mod executor;
mod formfill;
mod origin;
mod queue;
mod state;

pub use diagnostics::{DiagnosticsError, DiagnosticsWriter, FsDiagnostics};
pub use formfill::{
    DefaultFillSuggester, FillSuggester, FormField, FormInput, FormSelect, FormTextArea,
    SelectOption,
};
pub use queue::{ActionQueue, QueueError};

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use regex::Regex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::browser::{BrowserError, BrowserPool, Page};
use crate::graph::{CrawlGraph, GraphError};
use crate::normalize::{NormalizeError, Normalizer, SimhashOracle, DEFAULT_MAX_DISTANCE};
use crate::output::{NavigationRecord, OutputWriter};
use crate::types::{Action, ActionType, HTMLElement, PageState, StateId, EMPTY_PAGE};

/// Decides whether a post-action URL is worth harvesting navigations from
pub type ScopeValidator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Configuration for one crawler instance
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// 0 = unbounded; otherwise actions deeper than this are dropped
    pub max_depth: usize,
    /// Wall-clock cap per seed; `None` = unbounded
    pub max_crawl_duration: Option<Duration>,
    /// 0 = unbounded; otherwise stop after this many consecutive failures
    pub max_failure_count: usize,
    /// Per-browser-call timeout
    pub page_max_timeout: Duration,
    /// Enable the form fill planner
    pub automatic_form_fill: bool,
    /// Forwarded to the browser adapter
    pub cookie_consent_bypass: bool,
    /// Hamming threshold for the near-duplicate oracle
    pub simhash_max_distance: u32,
    /// Write diagnostic artifacts
    pub enable_diagnostics: bool,
    /// Override the stamped diagnostics directory
    pub diagnostics_dir: Option<PathBuf>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 0,
            max_crawl_duration: None,
            max_failure_count: 0,
            page_max_timeout: Duration::from_secs(30),
            automatic_form_fill: false,
            cookie_consent_bypass: true,
            simhash_max_distance: DEFAULT_MAX_DISTANCE,
            enable_diagnostics: false,
            diagnostics_dir: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error("origin reconstruction ended on {actual} instead of {expected}")]
    OriginMismatch { expected: StateId, actual: StateId },
    #[error("no more actions to crawl")]
    NoMoreActions,
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Diagnostics(#[from] DiagnosticsError),
    #[error("browser pool: {0}")]
    Pool(String),
}

impl CrawlError {
    /// Failures absorbed by the consecutive-failure budget.
    fn is_recoverable(&self) -> bool {
        match self {
            CrawlError::Browser(err) => err.is_recoverable(),
            CrawlError::OriginMismatch { .. } => true,
            _ => false,
        }
    }
}

static RE_LOGOUT: OnceLock<Regex> = OnceLock::new();

fn re_logout() -> &'static Regex {
    RE_LOGOUT.get_or_init(|| {
        Regex::new(
            r"(?i)(log[\s-]?out|sign[\s-]?out|signout|deconnexion|cerrar[\s-]?sesion|sair|abmelden|uitloggen|ausloggen|exit|disconnect|terminate|end[\s-]?session|salir|desconectar|afmelden|wyloguj|logout|sign[\s-]?off)",
        )
        .unwrap()
    })
}

/// Clicking a logout control would tear down the session every other queued
/// action depends on.
fn is_logout_control(element: &HTMLElement) -> bool {
    let href = element
        .attributes
        .get("href")
        .map(String::as_str)
        .unwrap_or("");
    re_logout().is_match(&element.text_content) || re_logout().is_match(href)
}

/// State-aware crawler driving a browser through user-like actions
pub struct Crawler {
    config: CrawlerConfig,
    pool: Arc<dyn BrowserPool>,
    normalizer: Normalizer,
    scope_validator: Option<ScopeValidator>,
    suggester: Arc<dyn FillSuggester>,
    output: Option<Arc<dyn OutputWriter>>,
    diagnostics: Option<Box<dyn DiagnosticsWriter>>,

    queue: ActionQueue,
    graph: CrawlGraph,
    oracle: SimhashOracle,
    unique_actions: HashSet<String>,
}

impl Crawler {
    pub fn new(config: CrawlerConfig, pool: Arc<dyn BrowserPool>) -> Result<Self, CrawlError> {
        let normalizer = Normalizer::new()?;

        let diagnostics: Option<Box<dyn DiagnosticsWriter>> = if config.enable_diagnostics {
            let writer = FsDiagnostics::create(config.diagnostics_dir.clone())?;
            info!(directory = %writer.dir().display(), "diagnostics enabled");
            Some(Box::new(writer))
        } else {
            None
        };

        let oracle = SimhashOracle::new(config.simhash_max_distance);
        Ok(Self {
            config,
            pool,
            normalizer,
            scope_validator: None,
            suggester: Arc::new(DefaultFillSuggester),
            output: None,
            diagnostics,
            queue: ActionQueue::new(),
            graph: CrawlGraph::new(),
            oracle,
            unique_actions: HashSet::new(),
        })
    }

    pub fn with_scope_validator(mut self, validator: ScopeValidator) -> Self {
        self.scope_validator = Some(validator);
        self
    }

    pub fn with_fill_suggester(mut self, suggester: Arc<dyn FillSuggester>) -> Self {
        self.suggester = suggester;
        self
    }

    pub fn with_output_writer(mut self, writer: Arc<dyn OutputWriter>) -> Self {
        self.output = Some(writer);
        self
    }

    pub fn with_diagnostics_writer(mut self, writer: Box<dyn DiagnosticsWriter>) -> Self {
        self.diagnostics = Some(writer);
        self
    }

    /// The crawl graph built by the most recent [`Crawler::crawl`] call.
    pub fn graph(&self) -> &CrawlGraph {
        &self.graph
    }

    /// Crawl one seed URL to completion. Returns `Ok` when the queue drains,
    /// the crawl deadline elapses, or the failure budget is exhausted; only
    /// unclassified errors surface as `Err`.
    pub async fn crawl(&mut self, seed: &str) -> Result<(), CrawlError> {
        self.queue = ActionQueue::new();
        self.graph = CrawlGraph::new();

        self.graph.add_root(PageState::empty_page());
        self.queue.offer(Action::load_url(seed));

        let cancel = CancellationToken::new();
        let deadline = self.config.max_crawl_duration.map(|d| Instant::now() + d);
        if let Some(limit) = self.config.max_crawl_duration {
            let deadline_cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(limit) => deadline_cancel.cancel(),
                    _ = deadline_cancel.cancelled() => {}
                }
            });
        }
        let _guard = cancel.clone().drop_guard();

        let outcome = self.crawl_loop(&cancel, deadline).await;

        if let Some(diag) = &self.diagnostics {
            if let Err(err) = diag.write_graph(&self.graph) {
                warn!(error = %err, "failed to export crawl graph");
            }
        }
        if let Err(err) = &outcome {
            if let Some(output) = &self.output {
                let _ = output.write_err(err);
            }
        }
        outcome
    }

    async fn crawl_loop(
        &mut self,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<(), CrawlError> {
        let mut consecutive_failures = 0usize;

        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                debug!("max crawl duration reached, stopping crawl");
                return Ok(());
            }
            if self.config.max_failure_count > 0
                && consecutive_failures >= self.config.max_failure_count
            {
                warn!(
                    failures = consecutive_failures,
                    max_allowed = self.config.max_failure_count,
                    remaining_actions = self.queue.size(),
                    "too many consecutive failures, stopping crawl"
                );
                return Ok(());
            }

            let action = match self.queue.get() {
                Ok(action) => action,
                Err(QueueError::NoElements) => {
                    debug!("no more actions to process");
                    return Ok(());
                }
            };

            if self.config.max_depth > 0 && action.depth > self.config.max_depth {
                continue;
            }

            let page = self
                .pool
                .get_page()
                .await
                .map_err(|err| CrawlError::Pool(err.to_string()))?;

            debug!(action = %action, "processing action");

            let result = self.crawl_fn(&action, page.as_ref(), cancel).await;
            self.pool.put_page(page).await;

            match result {
                Ok(()) => consecutive_failures = 0,
                Err(CrawlError::NoMoreActions) => {
                    debug!("no more actions to crawl");
                    return Ok(());
                }
                Err(err) if err.is_recoverable() => {
                    debug!(action = %action, error = %err, "skipping action");
                    consecutive_failures += 1;
                }
                Err(CrawlError::Browser(BrowserError::Cancelled))
                    if deadline.is_some_and(|d| Instant::now() >= d) =>
                {
                    debug!("max crawl duration reached, stopping crawl");
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn crawl_fn(
        &mut self,
        action: &Action,
        page: &dyn Page,
        cancel: &CancellationToken,
    ) -> Result<(), CrawlError> {
        let mut current_hash = self.page_hash(page, cancel).await?;

        debug!(
            current_page_hash = %current_hash,
            action_origin_id = %action.origin_id,
            "processing action - current state"
        );

        if action.action_type == ActionType::LoadUrl && action.origin_id == EMPTY_PAGE {
            // A seed load re-establishes state wholesale; the page it starts
            // from is irrelevant
            current_hash = EMPTY_PAGE.to_string();
        } else if !action.origin_id.is_empty() && action.origin_id != current_hash {
            current_hash = self
                .reconstruct_origin(action, page, &current_hash, cancel)
                .await?;
        }

        if let Some(diag) = &self.diagnostics {
            diag.log_action(action)?;
        }

        self.execute_action(action, page, cancel).await?;

        let mut page_state = self.build_page_state(action, page, cancel).await?;
        page_state.origin_id = current_hash;

        if let Some(diag) = &self.diagnostics {
            diag.log_page_state(&page_state)?;
        }

        let near_duplicate = self.oracle.query(page_state.simhash);
        self.oracle.add(page_state.simhash);

        // Out-of-scope states still enter the graph: the action produced a
        // reachable state even if its navigations are not worth harvesting
        if let Some(validate) = &self.scope_validator {
            if !validate(&page_state.url) {
                debug!(
                    url = %page_state.url,
                    "current page out of scope, skipping navigation collection"
                );
                self.graph.add_page_state(page_state, action.clone())?;
                if self.queue.size() == 0 {
                    return Err(CrawlError::NoMoreActions);
                }
                return Ok(());
            }
        }

        let navigations = if near_duplicate {
            debug!(state = %page_state, "near-duplicate page state, skipping navigation collection");
            Vec::new()
        } else {
            self.bounded(cancel, page.find_navigations()).await?
        };
        let found = navigations.len();

        if let Some(diag) = &self.diagnostics {
            match self.bounded(cancel, page.screenshot()).await {
                Ok(png) => {
                    if let Err(err) = diag.log_screenshot(&page_state.unique_id, &png) {
                        warn!(error = %err, "failed to log page state screenshot");
                    }
                }
                Err(err) => warn!(error = %err, "failed to take screenshot"),
            }
            if let Err(err) = diag.log_navigations(&page_state.unique_id, &navigations) {
                warn!(error = %err, "failed to log navigations");
            }
        }

        for mut nav in navigations {
            let action_hash = nav.hash();
            if !self.unique_actions.insert(action_hash) {
                continue;
            }
            if let Some(element) = &nav.element {
                if is_logout_control(element) {
                    debug!(
                        href = element.attributes.get("href").map(String::as_str).unwrap_or(""),
                        "skipping logout control"
                    );
                    continue;
                }
            }
            nav.origin_id = page_state.unique_id.clone();
            nav.depth = action.depth + 1;

            debug!(navigation = %nav, "got new navigation");
            if let Some(output) = &self.output {
                if let Err(err) = output.write(&NavigationRecord::from_action(&nav)) {
                    debug!(error = %err, "failed to write navigation record");
                }
            }
            self.queue.offer(nav);
        }

        self.graph.add_page_state(page_state, action.clone())?;

        if found == 0 && self.queue.size() == 0 {
            return Err(CrawlError::NoMoreActions);
        }
        Ok(())
    }
}
