//! Exhaustive state-space exploration engines.
//!
//! Starting from a set of initial configurations, an engine repeatedly asks
//! the [`Scheduler`](statespace_core::Scheduler) and its processes which
//! configurations can follow, reports every discovered edge to an
//! [`ExplorationRecord`](statespace_core::ExplorationRecord), and continues
//! until no unexplored configuration remains. Every reachable configuration
//! is explored exactly once.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Explorer                             │
//! │                                                              │
//! │   worklist ──► explored set ──► exploration_step             │
//! │      ▲          (dedup)            │                         │
//! │      │                             ├─► Scheduler             │
//! │      │                             │     can_end_evaluation  │
//! │      │                             │     end_evaluation      │
//! │      │                             │     ready_processes     │
//! │      │                             ├─► AnalyzedProcess       │
//! │      │                             │     make_step           │
//! │      │                             ▼                         │
//! │      └──────── successors ◄── transitions ──► record         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`sequential`] engine runs this loop on the caller's thread. The
//! [`concurrent`] engine runs it on N workers that share the worklist and
//! detect termination through an outstanding-work counter.
//!
//! # Module Structure
//!
//! - [`engine`]: step logic and the `Exploration` monitoring trait
//! - [`sequential`]: single-threaded engine
//! - [`concurrent`]: worker-pool engine
//! - [`explorer`]: engine selection from an `ExplorerConfig`
//! - [`config`]: explorer configuration
//! - [`record`]: transition graph and counting records
//! - [`export`]: JSON and DOT graph export
//! - [`report`]: run summaries

pub mod concurrent;
pub mod config;
pub mod engine;
pub mod error;
pub mod explorer;
pub mod export;
pub mod record;
pub mod report;
pub mod sequential;

#[cfg(test)]
mod testing;

pub use concurrent::ConcurrentExploration;
pub use config::{EngineKind, ExplorerConfig, WorklistOrder};
pub use engine::Exploration;
pub use error::ExploreError;
pub use explorer::Explorer;
pub use export::{load_graph, save_dot, save_graph, ExportError, GraphExport};
pub use record::{CountingRecord, NullRecord, TransitionGraphRecord};
pub use report::{format_report, ExplorationReport, GraphStats};
pub use sequential::SequentialExploration;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_defaults() {
        assert_eq!(ExplorerConfig::default().engine, EngineKind::Sequential);
        assert_eq!(CountingRecord::new().edges(), 0);
        let graph = GraphExport::default();
        assert!(graph.nodes.is_empty() && graph.edges.is_empty());
    }
}
