//! Exploration records: sinks for discovered edges.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use statespace_core::{Configuration, ExplorationRecord, Frame, Frozen};

/// Index of a node in a [`TransitionGraphRecord`].
pub type NodeId = usize;

/// A recorded edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge<I> {
    pub source: NodeId,
    pub target: NodeId,
    pub info: I,
}

struct Graph<F, I> {
    ids: HashMap<Frozen<Configuration<F>>, NodeId>,
    nodes: Vec<Frozen<Configuration<F>>>,
    edges: Vec<Edge<I>>,
}

impl<F: Frame, I> Graph<F, I> {
    fn node_id(&mut self, state: &Frozen<Configuration<F>>) -> NodeId {
        if let Some(&id) = self.ids.get(state) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(state.clone());
        self.ids.insert(state.clone(), id);
        id
    }
}

/// Builds the explored transition graph.
///
/// Nodes get sequential ids in the order they are first reported. Every
/// reported edge is kept, so an edge discovered twice appears twice.
/// Safe to share between the workers of the concurrent engine.
pub struct TransitionGraphRecord<F, I> {
    graph: Mutex<Graph<F, I>>,
}

impl<F: Frame, I> TransitionGraphRecord<F, I> {
    pub fn new() -> Self {
        Self {
            graph: Mutex::new(Graph {
                ids: HashMap::new(),
                nodes: Vec::new(),
                edges: Vec::new(),
            }),
        }
    }

    fn graph(&self) -> MutexGuard<'_, Graph<F, I>> {
        self.graph.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `state` as a node without an edge, e.g. an initial
    /// configuration that may have no successors.
    pub fn add_node(&self, state: &Frozen<Configuration<F>>) -> NodeId {
        self.graph().node_id(state)
    }

    pub fn node_count(&self) -> usize {
        self.graph().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph().edges.len()
    }

    /// Number of distinct `(source, target)` pairs.
    pub fn distinct_edge_count(&self) -> usize {
        self.graph()
            .edges
            .iter()
            .map(|edge| (edge.source, edge.target))
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn node(&self, id: NodeId) -> Option<Frozen<Configuration<F>>> {
        self.graph().nodes.get(id).cloned()
    }

    pub fn node_id(&self, state: &Configuration<F>) -> Option<NodeId> {
        self.graph().ids.get(state).copied()
    }

    pub fn nodes(&self) -> Vec<Frozen<Configuration<F>>> {
        self.graph().nodes.clone()
    }

    /// Targets of the edges leaving `id`, in recording order.
    pub fn successors(&self, id: NodeId) -> Vec<NodeId> {
        self.graph()
            .edges
            .iter()
            .filter(|edge| edge.source == id)
            .map(|edge| edge.target)
            .collect()
    }

    /// Nodes without outgoing edges.
    pub fn terminal_nodes(&self) -> Vec<NodeId> {
        let graph = self.graph();
        let sources: HashSet<NodeId> = graph.edges.iter().map(|edge| edge.source).collect();
        (0..graph.nodes.len())
            .filter(|id| !sources.contains(id))
            .collect()
    }
}

impl<F: Frame, I: Clone> TransitionGraphRecord<F, I> {
    pub fn edges(&self) -> Vec<Edge<I>> {
        self.graph().edges.clone()
    }
}

impl<F: Frame, I: fmt::Debug> TransitionGraphRecord<F, I> {
    /// One `(source, target, info)` rendering per recorded edge.
    ///
    /// Independent of node numbering, so records of different runs over
    /// the same model can be compared.
    pub fn edge_multiset(&self) -> Vec<(String, String, String)> {
        let graph = self.graph();
        graph
            .edges
            .iter()
            .map(|edge| {
                (
                    graph.nodes[edge.source].to_string(),
                    graph.nodes[edge.target].to_string(),
                    format!("{:?}", edge.info),
                )
            })
            .collect()
    }
}

impl<F: Frame, I> Default for TransitionGraphRecord<F, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Frame, I: Clone> ExplorationRecord<F, I> for TransitionGraphRecord<F, I> {
    fn exploration_made(
        &self,
        from: &Frozen<Configuration<F>>,
        to: &Frozen<Configuration<F>>,
        info: &I,
    ) {
        let mut graph = self.graph();
        let source = graph.node_id(from);
        let target = graph.node_id(to);
        graph.edges.push(Edge {
            source,
            target,
            info: info.clone(),
        });
    }
}

/// Counts edges without keeping them.
#[derive(Debug, Default)]
pub struct CountingRecord {
    edges: AtomicUsize,
}

impl CountingRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edges(&self) -> usize {
        self.edges.load(Ordering::Relaxed)
    }
}

impl<F, I> ExplorationRecord<F, I> for CountingRecord {
    fn exploration_made(
        &self,
        _from: &Frozen<Configuration<F>>,
        _to: &Frozen<Configuration<F>>,
        _info: &I,
    ) {
        self.edges.fetch_add(1, Ordering::Relaxed);
    }
}

/// Discards every edge.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecord;

impl<F, I> ExplorationRecord<F, I> for NullRecord {
    fn exploration_made(
        &self,
        _from: &Frozen<Configuration<F>>,
        _to: &Frozen<Configuration<F>>,
        _info: &I,
    ) {
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{counters, with_counter};
    use statespace_core::NoInformation;
    use std::sync::Arc;
    use std::thread;

    fn state(value: u32) -> Frozen<Configuration<u32>> {
        Frozen::new(with_counter(&counters(&[("p", 0)]), "p", value))
    }

    #[test]
    fn test_graph_assigns_ids_on_first_sight() {
        let record = TransitionGraphRecord::new();
        record.exploration_made(&state(0), &state(1), &"a");
        record.exploration_made(&state(1), &state(2), &"b");
        record.exploration_made(&state(0), &state(1), &"a");

        assert_eq!(record.node_count(), 3);
        assert_eq!(record.edge_count(), 3);
        assert_eq!(record.distinct_edge_count(), 2);
        assert_eq!(record.node_id(&state(2)), Some(2));
        assert_eq!(record.successors(0), vec![1, 1]);
        assert_eq!(record.terminal_nodes(), vec![2]);
        assert_eq!(record.node(1).as_deref(), Some(&*state(1)));
    }

    #[test]
    fn test_seeded_node_without_edges_is_terminal() {
        let record: TransitionGraphRecord<u32, &str> = TransitionGraphRecord::new();
        assert_eq!(record.add_node(&state(0)), 0);
        assert_eq!(record.node_count(), 1);
        assert_eq!(record.terminal_nodes(), vec![0]);

        record.exploration_made(&state(0), &state(1), &"a");
        assert_eq!(record.add_node(&state(0)), 0);
        assert_eq!(record.node_count(), 2);
        assert_eq!(record.terminal_nodes(), vec![1]);
    }

    #[test]
    fn test_graph_edge_multiset_is_order_independent() {
        let a = TransitionGraphRecord::new();
        a.exploration_made(&state(0), &state(1), &NoInformation);
        a.exploration_made(&state(1), &state(2), &NoInformation);

        let b = TransitionGraphRecord::new();
        b.exploration_made(&state(1), &state(2), &NoInformation);
        b.exploration_made(&state(0), &state(1), &NoInformation);

        let mut edges_a = a.edge_multiset();
        let mut edges_b = b.edge_multiset();
        assert_ne!(a.edges(), b.edges());
        edges_a.sort();
        edges_b.sort();
        assert_eq!(edges_a, edges_b);
    }

    #[test]
    fn test_graph_record_from_many_threads() {
        let record = Arc::new(TransitionGraphRecord::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let record = Arc::clone(&record);
                thread::spawn(move || {
                    for i in 0..25 {
                        record.exploration_made(&state(i), &state(i + 1), &t);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(record.edge_count(), 100);
        assert_eq!(record.node_count(), 26);
        assert_eq!(record.distinct_edge_count(), 25);
    }

    #[test]
    fn test_counting_record() {
        let record = CountingRecord::new();
        record.exploration_made(&state(0), &state(1), &NoInformation);
        record.exploration_made(&state(0), &state(1), &NoInformation);
        assert_eq!(record.edges(), 2);
    }
}
