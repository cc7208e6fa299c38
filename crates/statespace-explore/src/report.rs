//! Format exploration reports for human consumption.

use std::time::Duration;

use statespace_core::Frame;

use crate::config::EngineKind;
use crate::engine::Exploration;
use crate::record::TransitionGraphRecord;

/// Summary of one exploration run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorationReport {
    pub engine: EngineKind,
    /// Worker threads; 1 for the sequential engine.
    pub threads: usize,
    pub explored_states: usize,
    pub pending_states: usize,
    pub done: bool,
    pub aborted: bool,
    pub elapsed: Duration,
    /// Statistics from a transition graph, when one was recorded.
    pub graph: Option<GraphStats>,
}

/// Statistics of a recorded transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub distinct_edges: usize,
    pub terminal_nodes: usize,
}

impl GraphStats {
    /// Configurations only count as nodes once an edge touches them or
    /// they were seeded with [`TransitionGraphRecord::add_node`].
    pub fn from_record<F: Frame, I>(record: &TransitionGraphRecord<F, I>) -> Self {
        Self {
            nodes: record.node_count(),
            edges: record.edge_count(),
            distinct_edges: record.distinct_edge_count(),
            terminal_nodes: record.terminal_nodes().len(),
        }
    }
}

impl ExplorationReport {
    /// Collects the monitoring counters of a finished run.
    pub fn from_run(
        exploration: &impl Exploration,
        engine: EngineKind,
        threads: usize,
        elapsed: Duration,
    ) -> Self {
        Self {
            engine,
            threads,
            explored_states: exploration.num_explored_states(),
            pending_states: exploration.num_pending_states(),
            done: exploration.is_done(),
            aborted: exploration.is_aborted(),
            elapsed,
            graph: None,
        }
    }

    pub fn with_graph(mut self, stats: GraphStats) -> Self {
        self.graph = Some(stats);
        self
    }

    /// Explored states per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.explored_states as f64 / secs
        } else {
            0.0
        }
    }
}

/// Format an exploration report for human consumption.
pub fn format_report(report: &ExplorationReport) -> String {
    let mut output = String::new();

    output.push_str("═══════════════════════════════════════════════════════════════════════\n");
    output.push_str("  State Space Exploration Report\n");
    output.push_str("═══════════════════════════════════════════════════════════════════════\n\n");

    let status = if report.done {
        "complete"
    } else if report.aborted {
        "aborted"
    } else {
        "incomplete"
    };
    output.push_str(&format!("Status:                 {}\n", status));
    output.push_str(&format!("Engine:                 {}\n", report.engine));
    if report.engine == EngineKind::Concurrent {
        output.push_str(&format!("Worker threads:         {}\n", report.threads));
    }
    output.push_str(&format!("Explored states:        {}\n", report.explored_states));
    if report.pending_states > 0 {
        output.push_str(&format!("Pending states:         {}\n", report.pending_states));
    }
    output.push_str(&format!("Elapsed:                {:.2?}\n", report.elapsed));
    output.push_str(&format!(
        "Throughput:             {:.0} states/s\n",
        report.throughput()
    ));
    output.push('\n');

    if let Some(graph) = &report.graph {
        output.push_str("─── Transition Graph ──────────────────────────────────────────────────\n");
        output.push_str(&format!("Nodes:                  {}\n", graph.nodes));
        output.push_str(&format!("Recorded edges:         {}\n", graph.edges));
        output.push_str(&format!("Distinct edges:         {}\n", graph.distinct_edges));
        output.push_str(&format!("Terminal states:        {}\n", graph.terminal_nodes));
        if graph.edges > 0 {
            output.push_str(&format!(
                "Duplicate edge ratio:   {:.2}\n",
                1.0 - graph.distinct_edges as f64 / graph.edges as f64
            ));
        }
        output.push('\n');
    }

    output.push_str("═══════════════════════════════════════════════════════════════════════\n");

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ExplorationReport {
        ExplorationReport {
            engine: EngineKind::Sequential,
            threads: 1,
            explored_states: 25,
            pending_states: 0,
            done: true,
            aborted: false,
            elapsed: Duration::from_millis(500),
            graph: None,
        }
    }

    #[test]
    fn test_format_report_complete() {
        let formatted = format_report(&report());
        assert!(formatted.contains("Status:                 complete"));
        assert!(formatted.contains("Engine:                 sequential"));
        assert!(formatted.contains("Explored states:        25"));
        assert!(formatted.contains("Throughput:             50 states/s"));
        assert!(!formatted.contains("Worker threads"));
        assert!(!formatted.contains("Transition Graph"));
    }

    #[test]
    fn test_format_report_aborted_concurrent_with_graph() {
        let report = ExplorationReport {
            engine: EngineKind::Concurrent,
            threads: 8,
            pending_states: 3,
            done: false,
            aborted: true,
            ..report()
        }
        .with_graph(GraphStats {
            nodes: 25,
            edges: 40,
            distinct_edges: 30,
            terminal_nodes: 1,
        });

        let formatted = format_report(&report);
        assert!(formatted.contains("Status:                 aborted"));
        assert!(formatted.contains("Worker threads:         8"));
        assert!(formatted.contains("Pending states:         3"));
        assert!(formatted.contains("Recorded edges:         40"));
        assert!(formatted.contains("Duplicate edge ratio:   0.25"));
    }

    #[test]
    fn test_graph_stats_count_seeded_initial_state() {
        use crate::testing::counters;
        use statespace_core::Frozen;

        let record: TransitionGraphRecord<u32, &str> = TransitionGraphRecord::new();
        record.add_node(&Frozen::new(counters(&[("p", 0)])));
        assert_eq!(
            GraphStats::from_record(&record),
            GraphStats {
                nodes: 1,
                edges: 0,
                distinct_edges: 0,
                terminal_nodes: 1,
            }
        );
    }

    #[test]
    fn test_throughput_zero_elapsed() {
        let report = ExplorationReport {
            elapsed: Duration::ZERO,
            ..report()
        };
        assert_eq!(report.throughput(), 0.0);
    }
}
