//! Step logic shared by the sequential and concurrent engines.
//!
//! One exploration step asks the scheduler whether the evaluation phase can
//! end and, if so, for the configurations after time or delta advancement.
//! It then asks every possibly-ready process for its successor
//! configurations. Each transition is reported to the record immediately;
//! the resulting configurations are handed to the engine's worklist sink.

use log::trace;
use statespace_core::{
    AnalyzedProcess, Configuration, ExplorationHandle, ExplorationRecord, Frozen, Scheduler,
    StepError, Transition,
};

use crate::error::ExploreError;

/// A locked configuration of scheduler `S`.
pub type StateOf<S> = Frozen<Configuration<<S as Scheduler>::Frame>>;

/// A transition of scheduler `S`.
pub type TransitionOf<S> = Transition<<S as Scheduler>::Frame, <S as Scheduler>::Info>;

/// Run control and progress monitoring common to both engines.
///
/// Every method except [`Exploration::run`] may be called from any thread
/// while a run is in progress.
pub trait Exploration {
    type Frame: statespace_core::Frame;

    /// Explores until no unexplored configuration remains or the
    /// exploration is aborted.
    ///
    /// # Panics
    ///
    /// Panics when called a second time on the same engine.
    fn run(&self) -> Result<(), ExploreError>;

    fn handle(&self) -> &ExplorationHandle;

    /// Work not yet explored. A progress estimate only.
    fn num_pending_states(&self) -> usize;

    fn num_explored_states(&self) -> usize;

    /// Snapshot of the configurations explored so far.
    fn explored_states(&self) -> Vec<Frozen<Configuration<Self::Frame>>>;

    fn is_done(&self) -> bool {
        self.handle().is_done()
    }

    fn is_aborted(&self) -> bool {
        self.handle().is_aborted()
    }

    fn abort(&self) {
        self.handle().abort();
    }
}

/// Borrowed collaborators for running exploration steps.
pub(crate) struct StepContext<'a, S, R> {
    pub scheduler: &'a S,
    pub record: &'a R,
    pub handle: &'a ExplorationHandle,
}

impl<S, R> StepContext<'_, S, R>
where
    S: Scheduler,
    R: ExplorationRecord<S::Frame, S::Info>,
{
    /// Explores `state` and returns the number of transitions produced.
    ///
    /// Resulting configurations are appended to `successors`, duplicates
    /// included.
    ///
    /// # Panics
    ///
    /// Panics if a ready process produces no transition.
    pub(crate) fn exploration_step(
        &self,
        state: &StateOf<S>,
        successors: &mut impl Extend<StateOf<S>>,
    ) -> Result<usize, StepError> {
        let mut produced = 0;

        if self.scheduler.can_end_evaluation(state, self.handle)? {
            let transitions = self.scheduler.end_evaluation(state, self.handle)?;
            if transitions.is_empty() {
                trace!("simulation terminated in {state}");
            }
            produced += self.handle_exploration(state, transitions, successors);
        }

        for process in self.scheduler.ready_processes(state, self.handle)? {
            let transitions = process.make_step(state, self.handle)?;
            assert!(
                !transitions.is_empty(),
                "process {} is ready but produced no transitions",
                process.id()
            );
            produced += self.handle_exploration(state, transitions, successors);
        }

        Ok(produced)
    }

    fn handle_exploration(
        &self,
        from: &StateOf<S>,
        transitions: Vec<TransitionOf<S>>,
        successors: &mut impl Extend<StateOf<S>>,
    ) -> usize {
        let count = transitions.len();
        successors.extend(transitions.into_iter().map(|transition| {
            let (to, info) = transition.into_parts();
            self.record.exploration_made(from, &to, &info);
            to
        }));
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TransitionGraphRecord;
    use crate::testing::{branching_model, counters, handshake_model, Label, TestScheduler};
    use statespace_core::Lockable;

    fn step(
        scheduler: &TestScheduler,
        record: &TransitionGraphRecord<u32, Label>,
        state: &StateOf<TestScheduler>,
    ) -> (usize, Vec<StateOf<TestScheduler>>) {
        let handle = ExplorationHandle::new();
        let context = StepContext {
            scheduler,
            record,
            handle: &handle,
        };
        let mut successors = Vec::new();
        let produced = context.exploration_step(state, &mut successors).unwrap();
        (produced, successors)
    }

    #[test]
    fn test_step_collects_every_ready_process() {
        let scheduler = branching_model(3);
        let record = TransitionGraphRecord::new();
        let initial = Frozen::new(counters(&[("p", 0), ("q", 0)]));

        let (produced, successors) = step(&scheduler, &record, &initial);
        // Two branches for each of the two processes.
        assert_eq!(produced, 4);
        assert_eq!(successors.len(), 4);
        assert_eq!(record.edge_count(), 4);
        assert!(successors.iter().all(|s| s.is_locked()));
    }

    #[test]
    fn test_step_ends_evaluation_when_nothing_is_ready() {
        let scheduler = handshake_model();
        let record = TransitionGraphRecord::new();
        let initial = Frozen::new(scheduler.initial());

        let (_, successors) = step(&scheduler, &record, &initial);
        assert_eq!(successors.len(), 1);

        // Both processes terminated: the scheduler reports the end of the
        // simulation with an empty set.
        let (produced, rest) = step(&scheduler, &record, &successors[0]);
        assert_eq!(produced, 0);
        assert!(rest.is_empty());
        assert_eq!(record.edge_count(), 1);
    }

    #[test]
    #[should_panic(expected = "produced no transitions")]
    fn test_step_panics_on_empty_process_step() {
        let scheduler = TestScheduler::new().with_process("p", |_, _| Ok(Vec::new()));
        let record = TransitionGraphRecord::new();
        step(&scheduler, &record, &Frozen::new(counters(&[("p", 0)])));
    }
}
