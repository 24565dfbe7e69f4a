//! Diagnostic artifact persistence
//!
//! When diagnostics are enabled the crawler records every executed action,
//! every page state, the navigations harvested from each state, per-state
//! screenshots, and a DOT export of the crawl graph on completion.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::graph::CrawlGraph;
use crate::types::{Action, PageState};

#[derive(Debug, Error)]
pub enum DiagnosticsError {
    #[error("failed to write diagnostics artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode diagnostics record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Sink for per-crawl diagnostic artifacts
pub trait DiagnosticsWriter: Send + Sync {
    fn log_action(&self, action: &Action) -> Result<(), DiagnosticsError>;

    fn log_page_state(&self, state: &PageState) -> Result<(), DiagnosticsError>;

    fn log_screenshot(&self, state_id: &str, png: &[u8]) -> Result<(), DiagnosticsError>;

    fn log_navigations(&self, state_id: &str, navigations: &[Action])
        -> Result<(), DiagnosticsError>;

    fn write_graph(&self, graph: &CrawlGraph) -> Result<(), DiagnosticsError>;
}

/// Filesystem diagnostics writer producing a stamped artifact directory
pub struct FsDiagnostics {
    dir: PathBuf,
}

impl FsDiagnostics {
    /// Create the artifact directory. With no override, a
    /// `statecrawl-diagnostics-<RFC3339>` directory is created under the
    /// current working directory.
    pub fn create(dir: Option<PathBuf>) -> Result<Self, DiagnosticsError> {
        let dir = dir.unwrap_or_else(|| {
            PathBuf::from(format!(
                "statecrawl-diagnostics-{}",
                Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
            ))
        });
        fs::create_dir_all(dir.join("screenshots"))?;
        fs::create_dir_all(dir.join("navigations"))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn append_jsonl<T: Serialize>(&self, name: &str, record: &T) -> Result<(), DiagnosticsError> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(name))?;
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl DiagnosticsWriter for FsDiagnostics {
    fn log_action(&self, action: &Action) -> Result<(), DiagnosticsError> {
        self.append_jsonl("actions.jsonl", action)
    }

    fn log_page_state(&self, state: &PageState) -> Result<(), DiagnosticsError> {
        self.append_jsonl("page-states.jsonl", state)
    }

    fn log_screenshot(&self, state_id: &str, png: &[u8]) -> Result<(), DiagnosticsError> {
        let path = self.dir.join("screenshots").join(format!("{}.png", state_id));
        fs::write(path, png)?;
        Ok(())
    }

    fn log_navigations(
        &self,
        state_id: &str,
        navigations: &[Action],
    ) -> Result<(), DiagnosticsError> {
        let path = self
            .dir
            .join("navigations")
            .join(format!("{}.json", state_id));
        fs::write(path, serde_json::to_vec_pretty(navigations)?)?;
        Ok(())
    }

    fn write_graph(&self, graph: &CrawlGraph) -> Result<(), DiagnosticsError> {
        fs::write(self.dir.join("crawl-graph.dot"), graph.to_dot())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, PageState, EMPTY_PAGE};

    #[test]
    fn test_artifacts_written() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("diag");
        let writer = FsDiagnostics::create(Some(dir.clone())).unwrap();

        writer.log_action(&Action::load_url("https://example.com")).unwrap();
        writer.log_action(&Action::load_url("https://example.com/2")).unwrap();
        writer
            .log_page_state(&PageState {
                unique_id: "abc".to_string(),
                url: "https://example.com".to_string(),
                origin_id: EMPTY_PAGE.to_string(),
                ..PageState::default()
            })
            .unwrap();
        writer.log_screenshot("abc", b"\x89PNG").unwrap();
        writer.log_navigations("abc", &[Action::load_url("https://example.com/next")]).unwrap();

        let mut graph = CrawlGraph::new();
        graph.add_root(PageState::empty_page());
        writer.write_graph(&graph).unwrap();

        let actions = std::fs::read_to_string(dir.join("actions.jsonl")).unwrap();
        assert_eq!(actions.lines().count(), 2);
        assert!(dir.join("screenshots/abc.png").exists());
        assert!(dir.join("navigations/abc.json").exists());
        let dot = std::fs::read_to_string(dir.join("crawl-graph.dot")).unwrap();
        assert!(dot.contains("digraph crawl"));
    }
}
