//! Multi-threaded exploration engine.
//!
//! N workers share a blocking worklist and a concurrent explored set.
//! Termination is detected without a coordinator through the `outstanding`
//! counter: the number of worklist items that have been queued but not yet
//! fully processed.
//!
//! # Worker protocol
//!
//! 1. Exit if the exploration was aborted.
//! 2. Wait for an item, a wake-up, or the poll timeout. Without an item,
//!    re-read `outstanding`.
//! 3. An item that is already explored consumes one unit of `outstanding`.
//! 4. A new item is explored with successors staged in a worker-local
//!    buffer. `outstanding` grows by `produced - 1` *before* the staged
//!    successors are published, so no worker can observe zero while work
//!    is about to appear.
//! 5. A worker that sees `outstanding <= 0` wakes all others and exits.
//! 6. A collaborator failure aborts the run: the first failure is kept,
//!    later ones are discarded, and all workers are woken.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicIsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use dashmap::DashSet;
use log::{debug, info, trace, warn};
use statespace_core::{
    Configuration, ExplorationHandle, ExplorationRecord, Frozen, Scheduler, StepError,
};

use crate::config::default_threads;
use crate::engine::{Exploration, StateOf, StepContext};
use crate::error::ExploreError;

/// First fatal failure raised by any worker.
enum Failure {
    Step { worker: usize, source: StepError },
    Panic { worker: usize, payload: Box<dyn Any + Send> },
}

/// Explores on a fixed pool of worker threads.
pub struct ConcurrentExploration<S: Scheduler, R> {
    scheduler: S,
    record: R,
    handle: ExplorationHandle,
    threads: usize,
    poll_timeout: Duration,
    explored: DashSet<StateOf<S>>,
    worklist_tx: Sender<StateOf<S>>,
    worklist_rx: Receiver<StateOf<S>>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
    outstanding: AtomicIsize,
    started: AtomicBool,
    failure: Mutex<Option<Failure>>,
}

impl<S, R> ConcurrentExploration<S, R>
where
    S: Scheduler,
    R: ExplorationRecord<S::Frame, S::Info>,
{
    /// Locks and queues the initial configurations.
    ///
    /// # Panics
    ///
    /// Panics if `threads` is zero.
    pub fn new(
        scheduler: S,
        record: R,
        initial: impl IntoIterator<Item = Configuration<S::Frame>>,
        threads: usize,
    ) -> Self {
        assert!(threads >= 1, "at least one worker thread is required");

        let (worklist_tx, worklist_rx) = unbounded();
        // One pending token per worker is enough to reach every parked one.
        let (wake_tx, wake_rx) = bounded(threads);
        let mut queued = 0;
        for state in initial {
            // Both ends are owned here, so the send cannot fail.
            let _ = worklist_tx.send(Frozen::new(state));
            queued += 1;
        }

        Self {
            scheduler,
            record,
            handle: ExplorationHandle::new(),
            threads,
            poll_timeout: Duration::from_secs(1),
            explored: DashSet::new(),
            worklist_tx,
            worklist_rx,
            wake_tx,
            wake_rx,
            outstanding: AtomicIsize::new(queued),
            started: AtomicBool::new(false),
            failure: Mutex::new(None),
        }
    }

    /// One worker per available hardware thread.
    pub fn with_default_threads(
        scheduler: S,
        record: R,
        initial: impl IntoIterator<Item = Configuration<S::Frame>>,
    ) -> Self {
        Self::new(scheduler, record, initial, default_threads())
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    /// Wakes every worker out of its poll.
    fn interrupt_all(&self) {
        for _ in 0..self.threads {
            if self.wake_tx.try_send(()).is_err() {
                break;
            }
        }
    }

    fn fail(&self, failure: Failure) {
        self.handle.abort();
        {
            let mut slot = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                *slot = Some(failure);
            } else {
                debug!("discarding secondary worker failure");
            }
        }
        self.interrupt_all();
    }
}

impl<S, R> ConcurrentExploration<S, R>
where
    S: Scheduler + Sync,
    R: ExplorationRecord<S::Frame, S::Info> + Sync,
{
    fn worker_loop(&self, worker: usize) {
        debug!("worker {worker} started");
        let context = StepContext {
            scheduler: &self.scheduler,
            record: &self.record,
            handle: &self.handle,
        };
        let mut staged = Vec::new();
        let mut explored = 0usize;

        loop {
            if self.handle.is_aborted() {
                debug!("worker {worker} stopping: exploration aborted");
                return;
            }

            let outstanding = select! {
                recv(self.worklist_rx) -> item => match item {
                    Ok(state) => match self.process(worker, &context, state, &mut staged) {
                        Ok(Some(outstanding)) => {
                            explored += 1;
                            outstanding
                        }
                        Ok(None) => self.outstanding.fetch_sub(1, Ordering::SeqCst) - 1,
                        Err(failure) => {
                            self.fail(failure);
                            return;
                        }
                    },
                    Err(_) => self.outstanding.load(Ordering::SeqCst),
                },
                recv(self.wake_rx) -> _ => self.outstanding.load(Ordering::SeqCst),
                default(self.poll_timeout) => self.outstanding.load(Ordering::SeqCst),
            };

            if outstanding <= 0 {
                debug!("worker {worker} finished after exploring {explored} states");
                self.interrupt_all();
                return;
            }
        }
    }

    /// Explores `state` if it is new. Returns the updated outstanding count,
    /// or `None` for an already explored configuration.
    fn process(
        &self,
        worker: usize,
        context: &StepContext<'_, S, R>,
        state: StateOf<S>,
        staged: &mut Vec<StateOf<S>>,
    ) -> Result<Option<isize>, Failure> {
        if !self.explored.insert(state.clone()) {
            return Ok(None);
        }
        trace!("worker {worker} exploring {state}");

        let step = panic::catch_unwind(AssertUnwindSafe(|| {
            context.exploration_step(&state, staged)
        }));
        let produced = match step {
            Ok(Ok(produced)) => produced,
            Ok(Err(StepError::Aborted)) => {
                staged.clear();
                self.handle.abort();
                self.interrupt_all();
                return Ok(Some(self.outstanding.load(Ordering::SeqCst)));
            }
            Ok(Err(source)) => {
                staged.clear();
                warn!("worker {worker} failed: {source}");
                return Err(Failure::Step { worker, source });
            }
            Err(payload) => {
                staged.clear();
                warn!("worker {worker} panicked while exploring {state}");
                return Err(Failure::Panic { worker, payload });
            }
        };

        let delta = produced as isize - 1;
        let outstanding = self.outstanding.fetch_add(delta, Ordering::SeqCst) + delta;
        for successor in staged.drain(..) {
            let _ = self.worklist_tx.send(successor);
        }
        Ok(Some(outstanding))
    }
}

impl<S, R> Exploration for ConcurrentExploration<S, R>
where
    S: Scheduler + Sync,
    R: ExplorationRecord<S::Frame, S::Info> + Sync,
{
    type Frame = S::Frame;

    /// Runs the workers to completion and joins them.
    ///
    /// Returns the first collaborator failure raised by any worker, wrapped
    /// in [`ExploreError::Worker`]. A worker panic is resumed on the calling
    /// thread once all workers have exited.
    fn run(&self) -> Result<(), ExploreError> {
        assert!(
            !self.started.swap(true, Ordering::SeqCst),
            "exploration has already been started"
        );
        info!(
            "Starting concurrent exploration ({} workers, {} initial configurations)",
            self.threads,
            self.num_pending_states()
        );
        let start = Instant::now();

        let spawned = thread::scope(|scope| {
            for worker in 0..self.threads {
                let spawn = thread::Builder::new()
                    .name(format!("explore-worker-{worker}"))
                    .spawn_scoped(scope, move || self.worker_loop(worker));
                if let Err(e) = spawn {
                    self.handle.abort();
                    self.interrupt_all();
                    return Err(ExploreError::Spawn(e));
                }
            }
            Ok(())
        });

        let failure = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match failure {
            Some(Failure::Step { worker, source }) => {
                warn!(
                    "Exploration failed after {} states in {:.2?}",
                    self.num_explored_states(),
                    start.elapsed()
                );
                return Err(ExploreError::Worker { worker, source });
            }
            Some(Failure::Panic { worker, payload }) => {
                warn!("re-raising panic from worker {worker}");
                panic::resume_unwind(payload);
            }
            None => {}
        }
        spawned?;

        if self.handle.is_aborted() {
            warn!(
                "Exploration aborted after {} states ({} outstanding)",
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
        self.outstanding.load(Ordering::SeqCst).max(0) as usize
    }

    fn num_explored_states(&self) -> usize {
        self.explored.len()
    }

    fn explored_states(&self) -> Vec<Frozen<Configuration<S::Frame>>> {
        self.explored.iter().map(|state| state.key().clone()).collect()
    }

    fn abort(&self) {
        self.handle.abort();
        self.interrupt_all();
    }
}
