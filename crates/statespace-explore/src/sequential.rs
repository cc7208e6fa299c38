//! Single-threaded exploration engine.
//!
//! A worklist plus a set of explored configurations. The worklist does not
//! deduplicate pending entries: a configuration reached over several edges
//! may be queued several times, and all but the first pop are skipped when
//! they fail to insert into the explored set.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use log::{info, trace, warn};
use statespace_core::{
    Configuration, ExplorationHandle, ExplorationRecord, Frozen, Scheduler, StepError,
};

use crate::config::WorklistOrder;
use crate::engine::{Exploration, StateOf, StepContext};
use crate::error::ExploreError;

struct Worklist<T> {
    explored: HashSet<T>,
    pending: VecDeque<T>,
}

/// Explores on the caller's thread.
pub struct SequentialExploration<S: Scheduler, R> {
    scheduler: S,
    record: R,
    handle: ExplorationHandle,
    order: WorklistOrder,
    worklist: Mutex<Worklist<StateOf<S>>>,
    started: AtomicBool,
    num_explored: AtomicUsize,
    num_pending: AtomicUsize,
}

impl<S, R> SequentialExploration<S, R>
where
    S: Scheduler,
    R: ExplorationRecord<S::Frame, S::Info>,
{
    /// Locks the initial configurations and queues them.
    pub fn new(
        scheduler: S,
        record: R,
        initial: impl IntoIterator<Item = Configuration<S::Frame>>,
    ) -> Self {
        let pending: VecDeque<StateOf<S>> = initial.into_iter().map(Frozen::new).collect();
        let num_pending = AtomicUsize::new(pending.len());
        Self {
            scheduler,
            record,
            handle: ExplorationHandle::new(),
            order: WorklistOrder::Fifo,
            worklist: Mutex::new(Worklist {
                explored: HashSet::new(),
                pending,
            }),
            started: AtomicBool::new(false),
            num_explored: AtomicUsize::new(0),
            num_pending,
        }
    }

    pub fn with_order(mut self, order: WorklistOrder) -> Self {
        self.order = order;
        self
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    fn worklist(&self) -> MutexGuard<'_, Worklist<StateOf<S>>> {
        self.worklist.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pops pending entries until one is new, and marks it explored.
    fn next_unexplored(&self) -> Option<StateOf<S>> {
        let mut worklist = self.worklist();
        let next = loop {
            let state = match self.order {
                WorklistOrder::Fifo => worklist.pending.pop_front(),
                WorklistOrder::Lifo => worklist.pending.pop_back(),
            };
            match state {
                Some(state) if worklist.explored.insert(state.clone()) => break Some(state),
                Some(_) => continue,
                None => break None,
            }
        };
        self.num_explored
            .store(worklist.explored.len(), Ordering::SeqCst);
        self.num_pending
            .store(worklist.pending.len(), Ordering::SeqCst);
        next
    }

    fn publish(&self, successors: Vec<StateOf<S>>) {
        let mut worklist = self.worklist();
        worklist.pending.extend(successors);
        self.num_pending
            .store(worklist.pending.len(), Ordering::SeqCst);
    }
}

impl<S, R> Exploration for SequentialExploration<S, R>
where
    S: Scheduler,
    R: ExplorationRecord<S::Frame, S::Info>,
{
    type Frame = S::Frame;

    fn run(&self) -> Result<(), ExploreError> {
        assert!(
            !self.started.swap(true, Ordering::SeqCst),
            "exploration has already been started"
        );
        info!(
            "Starting sequential exploration ({} initial configurations, {:?} order)",
            self.num_pending_states(),
            self.order
        );
        let start = Instant::now();
        let context = StepContext {
            scheduler: &self.scheduler,
            record: &self.record,
            handle: &self.handle,
        };

        let mut successors = Vec::new();
        while !self.handle.is_aborted() {
            let Some(state) = self.next_unexplored() else {
                break;
            };
            trace!("exploring {state}");

            match context.exploration_step(&state, &mut successors) {
                Ok(_) => {}
                Err(StepError::Aborted) => {
                    self.handle.abort();
                    break;
                }
                Err(e) => {
                    warn!("Exploration failed after {} states: {e}", self.num_explored_states());
                    return Err(ExploreError::Step(e));
                }
            }
            self.publish(std::mem::take(&mut successors));
        }

        if self.handle.is_aborted() {
            warn!(
                "Exploration aborted after {} states ({} pending)",
                self.num_explored_states(),
                self.num_pending_states()
            );
        } else {
            self.handle.mark_done();
            info!(
                "Exploration complete: {} states in {:.2?}",
                self.num_explored_states(),
                start.elapsed()
            );
        }
        Ok(())
    }

    fn handle(&self) -> &ExplorationHandle {
        &self.handle
    }

    fn num_pending_states(&self) -> usize {
        self.num_pending.load(Ordering::SeqCst)
    }

    fn num_explored_states(&self) -> usize {
        self.num_explored.load(Ordering::SeqCst)
    }

    fn explored_states(&self) -> Vec<Frozen<Configuration<S::Frame>>> {
        self.worklist().explored.iter().cloned().collect()
    }
}
