//! Engine selection from an [`ExplorerConfig`].

use std::time::Instant;

use log::info;
use statespace_core::{
    Configuration, ExplorationHandle, ExplorationRecord, Frozen, Scheduler,
};

use crate::concurrent::ConcurrentExploration;
use crate::config::{EngineKind, ExplorerConfig};
use crate::engine::Exploration;
use crate::error::ExploreError;
use crate::report::ExplorationReport;
use crate::sequential::SequentialExploration;

/// Either engine, chosen at runtime.
pub enum Explorer<S: Scheduler, R> {
    Sequential(SequentialExploration<S, R>),
    Concurrent(ConcurrentExploration<S, R>),
}

impl<S, R> Explorer<S, R>
where
    S: Scheduler,
    R: ExplorationRecord<S::Frame, S::Info>,
{
    /// Builds the engine named by `config` after validating it.
    pub fn new(
        config: &ExplorerConfig,
        scheduler: S,
        record: R,
        initial: impl IntoIterator<Item = Configuration<S::Frame>>,
    ) -> Result<Self, ExploreError> {
        config.validate()?;
        let explorer = match config.engine {
            EngineKind::Sequential => Explorer::Sequential(
                SequentialExploration::new(scheduler, record, initial).with_order(config.order),
            ),
            EngineKind::Concurrent => Explorer::Concurrent(
                ConcurrentExploration::new(scheduler, record, initial, config.threads)
                    .with_poll_timeout(config.poll_timeout),
            ),
        };
        Ok(explorer)
    }

    pub fn engine(&self) -> EngineKind {
        match self {
            Explorer::Sequential(_) => EngineKind::Sequential,
            Explorer::Concurrent(_) => EngineKind::Concurrent,
        }
    }

    pub fn threads(&self) -> usize {
        match self {
            Explorer::Sequential(_) => 1,
            Explorer::Concurrent(engine) => engine.threads(),
        }
    }

    pub fn record(&self) -> &R {
        match self {
            Explorer::Sequential(engine) => engine.record(),
            Explorer::Concurrent(engine) => engine.record(),
        }
    }
}

impl<S, R> Explorer<S, R>
where
    S: Scheduler + Sync,
    R: ExplorationRecord<S::Frame, S::Info> + Sync,
{
    /// Runs the exploration and summarizes it.
    pub fn run_with_report(&self) -> Result<ExplorationReport, ExploreError> {
        let start = Instant::now();
        self.run()?;
        let report = ExplorationReport::from_run(self, self.engine(), self.threads(), start.elapsed());
        info!(
            "Explored {} states with the {} engine",
            report.explored_states, report.engine
        );
        Ok(report)
    }
}

impl<S, R> Exploration for Explorer<S, R>
where
    S: Scheduler + Sync,
    R: ExplorationRecord<S::Frame, S::Info> + Sync,
{
    type Frame = S::Frame;

    fn run(&self) -> Result<(), ExploreError> {
        match self {
            Explorer::Sequential(engine) => engine.run(),
            Explorer::Concurrent(engine) => engine.run(),
        }
    }

    fn handle(&self) -> &ExplorationHandle {
        match self {
            Explorer::Sequential(engine) => engine.handle(),
            Explorer::Concurrent(engine) => engine.handle(),
        }
    }

    fn num_pending_states(&self) -> usize {
        match self {
            Explorer::Sequential(engine) => engine.num_pending_states(),
            Explorer::Concurrent(engine) => engine.num_pending_states(),
        }
    }

    fn num_explored_states(&self) -> usize {
        match self {
            Explorer::Sequential(engine) => engine.num_explored_states(),
            Explorer::Concurrent(engine) => engine.num_explored_states(),
        }
    }

    fn explored_states(&self) -> Vec<Frozen<Configuration<S::Frame>>> {
        match self {
            Explorer::Sequential(engine) => engine.explored_states(),
            Explorer::Concurrent(engine) => engine.explored_states(),
        }
    }

    fn abort(&self) {
        match self {
            Explorer::Sequential(engine) => engine.abort(),
            Explorer::Concurrent(engine) => engine.abort(),
        }
    }
}
