//! Save and load explored transition graphs.
//!
//! Configurations are exported in their display form: a graph file is meant
//! for inspection and for diffing runs, not for resuming an exploration.
//! Graphs are written as pretty JSON or as Graphviz DOT.

use std::collections::HashSet;
use std::fmt::{self, Write as _};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use snafu::Snafu;
use statespace_core::Frame;

use crate::record::TransitionGraphRecord;

/// Errors from graph export operations.
#[derive(Debug, Snafu)]
pub enum ExportError {
    #[snafu(display("I/O error"), context(false))]
    Io { source: std::io::Error },

    #[snafu(display("JSON error"), context(false))]
    Json { source: serde_json::Error },
}

/// A node of an exported graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeExport {
    pub id: usize,
    pub state: String,
    /// Processes that are definitely ready in this configuration.
    pub ready: Vec<String>,
    pub stopped: bool,
}

/// An edge of an exported graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeExport {
    pub source: usize,
    pub target: usize,
    pub info: String,
}

/// Serializable snapshot of a [`TransitionGraphRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<NodeExport>,
    pub edges: Vec<EdgeExport>,
}

impl GraphExport {
    /// Snapshot of `record`, rendering each edge's info with `Debug`.
    pub fn from_record<F, I>(record: &TransitionGraphRecord<F, I>) -> Self
    where
        F: Frame,
        I: Clone + fmt::Debug,
    {
        let nodes = record
            .nodes()
            .iter()
            .enumerate()
            .map(|(id, state)| NodeExport {
                id,
                state: state.to_string(),
                ready: state
                    .ready_processes()
                    .iter()
                    .map(|p| p.to_string())
                    .collect(),
                stopped: state.global().is_simulation_stopped(),
            })
            .collect();
        let edges = record
            .edges()
            .into_iter()
            .map(|edge| EdgeExport {
                source: edge.source,
                target: edge.target,
                info: format!("{:?}", edge.info),
            })
            .collect();
        Self { nodes, edges }
    }

    /// Nodes without outgoing edges.
    pub fn terminal_nodes(&self) -> Vec<usize> {
        let sources: HashSet<usize> = self.edges.iter().map(|edge| edge.source).collect();
        self.nodes
            .iter()
            .map(|node| node.id)
            .filter(|id| !sources.contains(id))
            .collect()
    }

    /// Graphviz rendering. Terminal nodes are drawn as double circles.
    pub fn to_dot(&self) -> String {
        let terminal: HashSet<usize> = self.terminal_nodes().into_iter().collect();
        let mut output = String::new();

        output.push_str("digraph statespace {\n");
        output.push_str("  node [shape=circle];\n");
        for node in &self.nodes {
            let shape = if terminal.contains(&node.id) {
                ", shape=doublecircle"
            } else {
                ""
            };
            let _ = writeln!(
                output,
                "  n{} [label=\"{}\", tooltip=\"{}\"{}];",
                node.id,
                node.id,
                escape(&node.state),
                shape
            );
        }
        for edge in &self.edges {
            let _ = writeln!(
                output,
                "  n{} -> n{} [label=\"{}\"];",
                edge.source,
                edge.target,
                escape(&edge.info)
            );
        }
        output.push_str("}\n");

        output
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Save a graph to a JSON file.
pub fn save_graph(graph: &GraphExport, path: &Path) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(graph)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load a graph from a JSON file.
pub fn load_graph(path: &Path) -> Result<GraphExport, ExportError> {
    let json = fs::read_to_string(path)?;
    let graph = serde_json::from_str(&json)?;
    Ok(graph)
}

/// Save a graph in Graphviz DOT format.
pub fn save_dot(graph: &GraphExport, path: &Path) -> Result<(), ExportError> {
    fs::write(path, graph.to_dot())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{counters, terminated, with_counter};
    use statespace_core::{ExplorationRecord, Frozen};
    use tempfile::TempDir;

    fn sample_record() -> TransitionGraphRecord<u32, &'static str> {
        let start = counters(&[("p", 0)]);
        let record = TransitionGraphRecord::new();
        let s0 = Frozen::new(start.clone());
        let s1 = Frozen::new(with_counter(&start, "p", 1));
        let s2 = Frozen::new(terminated(&s1, "p"));
        record.exploration_made(&s0, &s1, &"tick");
        record.exploration_made(&s1, &s2, &"exit \"now\"");
        record
    }

    #[test]
    fn test_export_from_record() {
        let graph = GraphExport::from_record(&sample_record());
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.nodes[0].ready, vec!["p".to_string()]);
        assert!(graph.nodes[2].ready.is_empty());
        assert_eq!(graph.edges[0].info, "\"tick\"");
        assert_eq!(graph.terminal_nodes(), vec![2]);
    }

    #[test]
    fn test_save_and_load_graph() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graph.json");
        let graph = GraphExport::from_record(&sample_record());

        save_graph(&graph, &path).unwrap();
        let loaded = load_graph(&path).unwrap();

        assert_eq!(loaded, graph);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = load_graph(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(ExportError::Io { .. })));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_graph(&path), Err(ExportError::Json { .. })));
    }

    #[test]
    fn test_dot_rendering() {
        let graph = GraphExport::from_record(&sample_record());
        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph statespace {"));
        assert!(dot.contains("n0 -> n1"));
        assert!(dot.contains("n2 [label=\"2\""));
        assert!(dot.contains("shape=doublecircle"));
        // Quotes inside labels are escaped.
        assert!(dot.contains("exit \\\\\\\"now\\\\\\\""));
    }

    #[test]
    fn test_save_dot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graph.dot");
        save_dot(&GraphExport::from_record(&sample_record()), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("}\n"));
    }
}
