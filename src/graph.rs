//! Append-only crawl graph
//!
//! Nodes are page states keyed by fingerprint; edges carry the action that
//! moved the browser from one state to the next. The graph serves two
//! consumers: origin reconstruction, which replays the shortest action path
//! back to a recorded state, and diagnostics, which exports the whole graph
//! in DOT form.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Write as _;

use thiserror::Error;

use crate::types::{Action, PageState, StateId, EMPTY_PAGE};
use crate::util::truncate_for_display;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("origin state {0} is not present in the graph")]
    UnknownOrigin(StateId),
}

/// An action-labelled transition between two page states
#[derive(Debug, Clone)]
pub struct CrawlEdge {
    pub from: StateId,
    pub to: StateId,
    pub action: Action,
}

/// Directed graph of page states linked by actions
#[derive(Debug, Default)]
pub struct CrawlGraph {
    states: HashMap<StateId, PageState>,
    edges: HashMap<StateId, Vec<CrawlEdge>>,
    /// Insertion order, for deterministic exports
    order: Vec<StateId>,
}

impl CrawlGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a root state with no incoming edge. Called once per crawl with
    /// the [`EMPTY_PAGE`] sentinel before the loop starts.
    pub fn add_root(&mut self, state: PageState) {
        if !self.states.contains_key(&state.unique_id) {
            self.order.push(state.unique_id.clone());
            self.states.insert(state.unique_id.clone(), state);
        }
    }

    /// Record a state reached by performing `via` from `state.origin_id`.
    /// The first occurrence of a state is kept; later arrivals only add a new
    /// incoming edge.
    pub fn add_page_state(&mut self, state: PageState, via: Action) -> Result<(), GraphError> {
        if !self.states.contains_key(&state.origin_id) {
            return Err(GraphError::UnknownOrigin(state.origin_id));
        }

        let edge = CrawlEdge {
            from: state.origin_id.clone(),
            to: state.unique_id.clone(),
            action: via,
        };
        if !self.states.contains_key(&state.unique_id) {
            self.order.push(state.unique_id.clone());
            self.states.insert(state.unique_id.clone(), state);
        }
        self.edges.entry(edge.from.clone()).or_default().push(edge);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.states.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&PageState> {
        self.states.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.states.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Shortest action path from `from` to `to`, breadth-first over edges.
    /// Returns an empty path when the endpoints coincide and `None` when no
    /// path exists.
    pub fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<Action>> {
        if !self.states.contains_key(from) || !self.states.contains_key(to) {
            return None;
        }
        if from == to {
            return Some(Vec::new());
        }

        let mut visited: HashSet<&str> = HashSet::from([from]);
        let mut queue: VecDeque<&str> = VecDeque::from([from]);
        let mut came_by: HashMap<&str, &CrawlEdge> = HashMap::new();

        while let Some(current) = queue.pop_front() {
            let Some(outgoing) = self.edges.get(current) else {
                continue;
            };
            for edge in outgoing {
                if !visited.insert(edge.to.as_str()) {
                    continue;
                }
                came_by.insert(edge.to.as_str(), edge);
                if edge.to == to {
                    let mut path = Vec::new();
                    let mut cursor = to;
                    while cursor != from {
                        let edge = came_by[cursor];
                        path.push(edge.action.clone());
                        cursor = edge.from.as_str();
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(edge.to.as_str());
            }
        }
        None
    }

    /// True iff every node is reachable from the [`EMPTY_PAGE`] root.
    pub fn is_connected(&self) -> bool {
        self.order
            .iter()
            .all(|id| id == EMPTY_PAGE || self.shortest_path(EMPTY_PAGE, id).is_some())
    }

    /// Export the graph in DOT form for diagnostics.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph crawl {\n");
        for id in &self.order {
            if let Some(state) = self.states.get(id) {
                let label = if id == EMPTY_PAGE {
                    EMPTY_PAGE.to_string()
                } else {
                    format!(
                        "{} {} (depth {})",
                        truncate_for_display(id, 8),
                        truncate_for_display(&state.url, 60),
                        state.depth
                    )
                };
                let _ = writeln!(
                    out,
                    "  \"{}\" [label=\"{}\"];",
                    escape_dot(id),
                    escape_dot(&label)
                );
            }
        }
        for id in &self.order {
            if let Some(edges) = self.edges.get(id) {
                for edge in edges {
                    let _ = writeln!(
                        out,
                        "  \"{}\" -> \"{}\" [label=\"{}\"];",
                        escape_dot(&edge.from),
                        escape_dot(&edge.to),
                        edge.action.action_type
                    );
                }
            }
        }
        out.push_str("}\n");
        out
    }
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
