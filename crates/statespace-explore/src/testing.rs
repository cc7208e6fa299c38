//! Synthetic collaborators for engine tests.
//!
//! Every process keeps a single counter frame. Models are small enough that
//! their reachable configurations can be counted by hand.

use statespace_core::{
    AnalyzedProcess, Configuration, EventBlocker, EventId, ExplorationHandle, GlobalState,
    Lockable, ProcessId, ProcessState, Scheduler, StepError, Transition, WaitMode,
};

pub(crate) type Label = &'static str;

type StepFn = dyn Fn(&Configuration<u32>, &ExplorationHandle) -> Result<Vec<Transition<u32, Label>>, StepError>
    + Send
    + Sync;

pub(crate) struct TestProcess {
    id: ProcessId,
    step: Box<StepFn>,
}

impl AnalyzedProcess for TestProcess {
    type Frame = u32;
    type Info = Label;

    fn id(&self) -> &ProcessId {
        &self.id
    }

    fn make_step(
        &self,
        state: &Configuration<u32>,
        handle: &ExplorationHandle,
    ) -> Result<Vec<Transition<u32, Label>>, StepError> {
        (self.step)(state, handle)
    }
}

/// Runs ready processes; the simulation ends once none is ready.
pub(crate) struct TestScheduler {
    processes: Vec<TestProcess>,
    initial: Option<Configuration<u32>>,
}

impl TestScheduler {
    pub(crate) fn new() -> Self {
        Self {
            processes: Vec::new(),
            initial: None,
        }
    }

    pub(crate) fn with_process(
        mut self,
        name: &str,
        step: impl Fn(&Configuration<u32>, &ExplorationHandle) -> Result<Vec<Transition<u32, Label>>, StepError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.processes.push(TestProcess {
            id: ProcessId::from(name),
            step: Box::new(step),
        });
        self
    }

    pub(crate) fn with_initial(mut self, initial: Configuration<u32>) -> Self {
        self.initial = Some(initial);
        self
    }

    /// The configured initial state, or every process ready at 0.
    pub(crate) fn initial(&self) -> Configuration<u32> {
        match &self.initial {
            Some(initial) => initial.unlocked_clone(),
            None => {
                let names: Vec<(&str, u32)> =
                    self.processes.iter().map(|p| (p.id.as_str(), 0)).collect();
                counters(&names)
            }
        }
    }
}

impl Scheduler for TestScheduler {
    type Frame = u32;
    type Info = Label;
    type Process = TestProcess;

    fn can_end_evaluation(
        &self,
        state: &Configuration<u32>,
        _handle: &ExplorationHandle,
    ) -> Result<bool, StepError> {
        Ok(state.ready_processes().is_empty())
    }

    fn end_evaluation(
        &self,
        _state: &Configuration<u32>,
        _handle: &ExplorationHandle,
    ) -> Result<Vec<Transition<u32, Label>>, StepError> {
        Ok(Vec::new())
    }

    fn ready_processes(
        &self,
        state: &Configuration<u32>,
        _handle: &ExplorationHandle,
    ) -> Result<Vec<&TestProcess>, StepError> {
        Ok(self
            .processes
            .iter()
            .filter(|p| state.process(&p.id).is_some_and(|s| s.is_ready()))
            .collect())
    }
}

/// Every named process ready with the given counter.
pub(crate) fn counters(values: &[(&str, u32)]) -> Configuration<u32> {
    let mut config = Configuration::new(GlobalState::new());
    for (name, value) in values {
        config.insert_process(ProcessId::from(*name), ProcessState::ready(vec![*value]));
    }
    config
}

pub(crate) fn counter(state: &Configuration<u32>, name: &str) -> u32 {
    state
        .process(&ProcessId::from(name))
        .and_then(|s| s.call_stack().first().copied())
        .unwrap_or_default()
}

pub(crate) fn with_counter(state: &Configuration<u32>, name: &str, value: u32) -> Configuration<u32> {
    let mut next = state.unlocked_clone();
    if let Some(process) = next.process_mut(&ProcessId::from(name)) {
        process.call_stack_mut()[0] = value;
    }
    next
}

pub(crate) fn terminated(state: &Configuration<u32>, name: &str) -> Configuration<u32> {
    let mut next = state.unlocked_clone();
    if let Some(process) = next.process_mut(&ProcessId::from(name)) {
        process.terminate();
    }
    next
}

/// Each process counts up by one or two until `limit`, then terminates.
///
/// Reachable configurations: `(limit + 2) ^ names.len()`.
pub(crate) fn branching_model_with(names: &[&'static str], limit: u32) -> TestScheduler {
    let mut scheduler = TestScheduler::new();
    for &name in names {
        scheduler = scheduler.with_process(name, move |state, _| {
            let value = counter(state, name);
            if value >= limit {
                return Ok(vec![Transition::new(terminated(state, name), "exit")]);
            }
            Ok(vec![
                Transition::new(with_counter(state, name, (value + 1).min(limit)), "inc1"),
                Transition::new(with_counter(state, name, (value + 2).min(limit)), "inc2"),
            ])
        });
    }
    scheduler
}

pub(crate) fn branching_model(limit: u32) -> TestScheduler {
    branching_model_with(&["p", "q"], limit)
}

/// A producer notifies `E`; the consumer waiting on it finishes when woken.
pub(crate) fn handshake_model() -> TestScheduler {
    let mut initial = counters(&[("producer", 0), ("consumer", 0)]);
    if let Some(consumer) = initial.process_mut(&ProcessId::from("consumer")) {
        consumer.set_blocker(Some(
            EventBlocker::new([EventId::from("E")], WaitMode::AllOf, None).into(),
        ));
    }

    TestScheduler::new()
        .with_process("producer", |state, _| {
            let mut next = terminated(state, "producer");
            let consumer = ProcessId::from("consumer");
            let woken = next
                .process(&consumer)
                .and_then(|s| s.blocker())
                .and_then(|b| b.as_event())
                .is_some_and(|b| b.waits_on(&EventId::from("E")));
            if woken {
                if let Some(process) = next.process_mut(&consumer) {
                    process.terminate();
                }
            }
            Ok(vec![Transition::new(next, "notify E")])
        })
        .with_process("consumer", |state, _| {
            Ok(vec![Transition::new(terminated(state, "consumer"), "exit")])
        })
        .with_initial(initial)
}

/// A single process that requests an abort on every step.
pub(crate) fn aborting_model() -> TestScheduler {
    TestScheduler::new().with_process("p", |state, handle| {
        handle.abort();
        let value = counter(state, "p");
        Ok(vec![Transition::new(with_counter(state, "p", value + 1), "tick")])
    })
}

/// Counts to `limit` but cannot decide how to continue at `fail_at`.
pub(crate) fn failing_model(limit: u32, fail_at: u32) -> TestScheduler {
    TestScheduler::new().with_process("p", move |state, _| {
        let value = counter(state, "p");
        if value == fail_at {
            return Err(StepError::InsufficientPrecision(format!(
                "undetermined branch at {value}"
            )));
        }
        if value >= limit {
            return Ok(vec![Transition::new(terminated(state, "p"), "exit")]);
        }
        Ok(vec![Transition::new(with_counter(state, "p", value + 1), "tick")])
    })
}
