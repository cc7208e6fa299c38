//! Explorer configuration.

use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ExploreError;

/// Which engine runs the exploration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Single worklist on the caller's thread.
    #[default]
    Sequential,
    /// Fixed pool of worker threads sharing a blocking worklist.
    Concurrent,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Sequential => f.write_str("sequential"),
            EngineKind::Concurrent => f.write_str("concurrent"),
        }
    }
}

impl FromStr for EngineKind {
    type Err = ExploreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" | "seq" => Ok(EngineKind::Sequential),
            "concurrent" | "parallel" | "par" => Ok(EngineKind::Concurrent),
            other => Err(ExploreError::Config(format!(
                "unknown engine '{other}', use 'sequential' or 'concurrent'"
            ))),
        }
    }
}

/// Pop order of the sequential worklist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorklistOrder {
    /// Breadth-first discovery order.
    #[default]
    Fifo,
    /// Depth-first discovery order.
    Lifo,
}

impl FromStr for WorklistOrder {
    type Err = ExploreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fifo" | "bfs" => Ok(WorklistOrder::Fifo),
            "lifo" | "dfs" => Ok(WorklistOrder::Lifo),
            other => Err(ExploreError::Config(format!(
                "unknown worklist order '{other}', use 'fifo' or 'lifo'"
            ))),
        }
    }
}

/// Configuration for an exploration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Engine to build.
    pub engine: EngineKind,
    /// Worker threads for the concurrent engine.
    pub threads: usize,
    /// How long an idle worker waits on the worklist before re-checking
    /// whether work is outstanding.
    pub poll_timeout: Duration,
    /// Pop order of the sequential engine.
    pub order: WorklistOrder,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Sequential,
            threads: default_threads(),
            poll_timeout: Duration::from_secs(1),
            order: WorklistOrder::Fifo,
        }
    }
}

impl ExplorerConfig {
    pub fn validate(&self) -> Result<(), ExploreError> {
        if self.threads == 0 {
            return Err(ExploreError::Config(
                "at least one worker thread is required".to_string(),
            ));
        }
        if self.poll_timeout.is_zero() {
            return Err(ExploreError::Config(
                "poll timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Available hardware parallelism, at least 1.
pub fn default_threads() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
