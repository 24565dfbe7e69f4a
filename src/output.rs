//! Output records for discovered navigations

use serde::Serialize;
use std::io;
use std::io::Write;
use std::sync::Mutex;

use crate::types::{Action, ActionType, NavigationSource};

/// One navigation accepted into the crawl queue
#[derive(Debug, Clone, Serialize)]
pub struct NavigationRecord {
    pub action: ActionType,
    /// URL for load actions, XPath for interactions
    pub target: String,
    pub depth: usize,
    pub origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<NavigationSource>,
}

impl NavigationRecord {
    pub fn from_action(action: &Action) -> Self {
        let target = match action.action_type {
            ActionType::LoadUrl => action.input.clone(),
            _ => action
                .element
                .as_ref()
                .map(|e| e.xpath.clone())
                .unwrap_or_default(),
        };
        Self {
            action: action.action_type,
            target,
            depth: action.depth,
            origin: action.origin_id.clone(),
            source: action.source,
        }
    }
}

/// Sink for crawl results
pub trait OutputWriter: Send + Sync {
    fn write(&self, record: &NavigationRecord) -> io::Result<()>;

    fn write_err(&self, err: &dyn std::error::Error) -> io::Result<()>;
}

/// JSON-lines writer over any sink
pub struct JsonLinesWriter<W: Write + Send> {
    sink: Mutex<W>,
}

impl<W: Write + Send> JsonLinesWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }
}

impl<W: Write + Send> OutputWriter for JsonLinesWriter<W> {
    fn write(&self, record: &NavigationRecord) -> io::Result<()> {
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| io::Error::other("output sink poisoned"))?;
        serde_json::to_writer(&mut *sink, record)?;
        writeln!(sink)
    }

    fn write_err(&self, err: &dyn std::error::Error) -> io::Result<()> {
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| io::Error::other("output sink poisoned"))?;
        serde_json::to_writer(&mut *sink, &serde_json::json!({ "error": err.to_string() }))?;
        writeln!(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Action;

    #[test]
    fn test_json_lines_output() {
        let writer = JsonLinesWriter::new(Vec::new());
        let mut action = Action::load_url("https://example.com/next");
        action.depth = 1;
        action.origin_id = "abc".to_string();
        writer
            .write(&NavigationRecord::from_action(&action))
            .unwrap();

        let buffer = writer.sink.into_inner().unwrap();
        let line = String::from_utf8(buffer).unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["action"], "load_url");
        assert_eq!(value["target"], "https://example.com/next");
        assert_eq!(value["depth"], 1);
    }
}
