//! Delta-cycle scheduler for scripted models.
//!
//! An evaluation phase ends when no process is definitely ready. The
//! scheduler then runs the update phase and advances the simulation:
//!
//! 1. requested updates are cleared and their update events are
//!    delta-notified;
//! 2. if any event or process timer is `Δ`, a delta cycle fires them;
//! 3. otherwise time moves to the earliest pending `Real` timer, firing
//!    everything due at that time and shortening the rest;
//! 4. with nothing pending the simulation is over along this path.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::{debug, info};
use statespace_core::{
    AnalyzedProcess, Blocker, Configuration, ExplorationHandle, GlobalState, Lockable, ProcessId,
    ProcessState, Scheduler, StepError, TimeError, TimedBlocker, Transition,
};

use crate::error::ModelError;
use crate::frame::ScriptFrame;
use crate::info::{Actor, StepInfo};
use crate::model::{Model, ProcessKind};
use crate::process::ScriptProcess;
use crate::semantics::{
    expire_timers, is_maybe_ready, is_stopped_immediately, sensitivity_blocker, terminate,
    wake_waiters, ScriptConfiguration,
};

/// Implements [`Scheduler`] for a validated [`Model`].
#[derive(Debug, Clone)]
pub struct ScriptScheduler {
    model: Arc<Model>,
    processes: Vec<ScriptProcess>,
}

impl ScriptScheduler {
    /// # Panics
    ///
    /// Panics if `model` has two processes with the same name; use
    /// [`ScriptScheduler::from_model`] for unvalidated input.
    pub fn new(model: Model) -> Self {
        let model = Arc::new(model);
        let processes = (0..model.processes.len())
            .map(|index| ScriptProcess::new(Arc::clone(&model), index))
            .collect::<Vec<_>>();
        let names: BTreeSet<&ProcessId> = processes.iter().map(|p| p.id()).collect();
        assert_eq!(names.len(), processes.len(), "process names must be unique");
        Self { model, processes }
    }

    /// Validates `model` before building the scheduler.
    pub fn from_model(model: Model) -> Result<Self, ModelError> {
        model.validate()?;
        info!(
            "Loaded model with {} processes and {} functions",
            model.processes.len(),
            model.functions.len()
        );
        Ok(Self::new(model))
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn processes(&self) -> &[ScriptProcess] {
        &self.processes
    }

    pub fn process(&self, id: &ProcessId) -> Option<&ScriptProcess> {
        self.processes.iter().find(|p| p.id() == id)
    }

    /// Threads start ready. Methods start ready unless they wait for their
    /// sensitivity first.
    pub fn initial_configuration(&self) -> ScriptConfiguration {
        let mut processes = BTreeMap::new();
        for spec in &self.model.processes {
            let (blocker, stack) = match spec.kind {
                ProcessKind::Method if spec.dont_initialize => {
                    match sensitivity_blocker(&spec.sensitivity) {
                        Some(blocker) => (Some(blocker), vec![ScriptFrame::body(0)]),
                        // Nothing can ever trigger it.
                        None => (Some(Blocker::Terminated), Vec::new()),
                    }
                }
                _ => (None, vec![ScriptFrame::body(0)]),
            };
            processes.insert(
                ProcessId::new(spec.name.as_str()),
                ProcessState::new(blocker, stack),
            );
        }
        Configuration::with_processes(GlobalState::new(), processes)
    }

    fn is_definitely_ready(&self, state: &ScriptConfiguration) -> bool {
        state.processes().values().any(ProcessState::is_ready)
    }

    /// Terminates every process after a stop and drops what is left.
    fn finish_stopped(&self, state: &ScriptConfiguration) -> Option<(ScriptConfiguration, StepInfo)> {
        let mut next = state.unlocked_clone();
        for (_, process) in next.processes_mut() {
            if !process.is_terminated() {
                terminate(process);
            }
        }
        next.global_mut().pending_events_mut().clear();
        next.global_mut().take_requested_updates();
        (next != *state).then(|| (next, StepInfo::new(Actor::Scheduler)))
    }

    /// Clears requested updates and delta-notifies their update events.
    fn update_phase(&self, next: &mut ScriptConfiguration, info: &mut StepInfo) {
        if next.global().requested_updates().is_empty() {
            return;
        }
        let updates = next.global_mut().take_requested_updates();
        for instance in &updates {
            if let Some(event) = self.model.update_events.get(instance) {
                if !self.model.is_abstracted(event) {
                    next.global_mut().notify_after(event.clone(), TimedBlocker::Delta);
                }
            }
        }
        debug!("update phase ran {} updates", updates.len());
        info.updates.extend(updates);
    }

    /// Earliest timer among pending events and blocked processes.
    fn earliest_timer(next: &ScriptConfiguration) -> Option<TimedBlocker> {
        let events = next.global().pending_events().values().copied();
        let processes = next
            .processes()
            .values()
            .filter_map(|state| state.blocker().and_then(|b| b.timer()));
        events.chain(processes).min()
    }

    fn advance(
        &self,
        next: &mut ScriptConfiguration,
        timer: TimedBlocker,
        info: &mut StepInfo,
    ) -> Result<(), StepError> {
        let mut fired = BTreeSet::new();
        let mut remaining = BTreeMap::new();
        for (event, pending) in std::mem::take(next.global_mut().pending_events_mut()) {
            let rest = match timer {
                TimedBlocker::Delta if pending.is_delta() => None,
                TimedBlocker::Delta => Some(pending),
                TimedBlocker::Real(elapsed) => pending.elapse(elapsed).map_err(time_error)?,
            };
            match rest {
                None => {
                    fired.insert(event);
                }
                Some(rest) => {
                    remaining.insert(event, rest);
                }
            }
        }
        *next.global_mut().pending_events_mut() = remaining;

        wake_waiters(next, &fired, &mut info.woken);
        expire_timers(next, timer, &mut info.woken).map_err(time_error)?;

        debug!(
            "advanced by {timer}: fired {} events, woke {} processes",
            fired.len(),
            info.woken.len()
        );
        info.advance = Some(timer);
        info.notified.extend(fired);
        Ok(())
    }
}

fn time_error(err: TimeError) -> StepError {
    StepError::Model(format!("timer arithmetic failed: {err}"))
}

impl Scheduler for ScriptScheduler {
    type Frame = ScriptFrame;
    type Info = StepInfo;
    type Process = ScriptProcess;

    fn can_end_evaluation(
        &self,
        state: &ScriptConfiguration,
        handle: &ExplorationHandle,
    ) -> Result<bool, StepError> {
        handle.check_aborted()?;
        Ok(!is_stopped_immediately(&self.model, state) && !self.is_definitely_ready(state))
    }

    fn end_evaluation(
        &self,
        state: &ScriptConfiguration,
        handle: &ExplorationHandle,
    ) -> Result<Vec<Transition<ScriptFrame, StepInfo>>, StepError> {
        handle.check_aborted()?;

        if state.global().is_simulation_stopped() {
            return Ok(self
                .finish_stopped(state)
                .map(|(next, info)| Transition::new(next, info))
                .into_iter()
                .collect());
        }

        let mut next = state.unlocked_clone();
        let mut info = StepInfo::new(Actor::Scheduler);
        self.update_phase(&mut next, &mut info);

        match Self::earliest_timer(&next) {
            Some(timer) => self.advance(&mut next, timer, &mut info)?,
            None if next != *state => {}
            None => return Ok(Vec::new()),
        }
        Ok(vec![Transition::new(next, info)])
    }

    fn ready_processes(
        &self,
        state: &ScriptConfiguration,
        handle: &ExplorationHandle,
    ) -> Result<Vec<&ScriptProcess>, StepError> {
        handle.check_aborted()?;
        if is_stopped_immediately(&self.model, state) {
            return Ok(Vec::new());
        }
        Ok(self
            .processes
            .iter()
            .filter(|process| {
                state.process(process.id()).is_some_and(|s| match s.blocker() {
                    None => true,
                    Some(blocker) => is_maybe_ready(&self.model, blocker),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statespace_core::{EventBlocker, EventId, Frozen, InstanceId, SimTime};

    fn scheduler(json: &str) -> ScriptScheduler {
        ScriptScheduler::from_model(Model::from_json(json).unwrap()).unwrap()
    }

    fn end(scheduler: &ScriptScheduler, state: &ScriptConfiguration) -> Vec<Transition<ScriptFrame, StepInfo>> {
        let handle = ExplorationHandle::new();
        assert!(scheduler.can_end_evaluation(state, &handle).unwrap());
        scheduler.end_evaluation(state, &handle).unwrap()
    }

    fn ns(n: u64) -> TimedBlocker {
        TimedBlocker::Real(SimTime::from_femtos(n * 1_000_000))
    }

    fn blocked(config: &mut ScriptConfiguration, name: &str, blocker: Blocker) {
        config
            .process_mut(&ProcessId::from(name))
            .unwrap()
            .set_blocker(Some(blocker));
    }

    #[test]
    fn test_initial_configuration() {
        let scheduler = scheduler(
            r#"{ "processes": [
                { "name": "t", "body": [] },
                { "name": "m", "kind": "method", "sensitivity": ["clk"], "dont_initialize": true, "body": [] },
                { "name": "n", "kind": "method", "dont_initialize": true, "body": [] }
            ] }"#,
        );
        let initial = scheduler.initial_configuration();
        assert_eq!(initial.ready_processes(), vec![ProcessId::from("t")]);
        assert_eq!(
            initial.process(&ProcessId::from("m")).unwrap().to_string(),
            "Wait clk at [body@0]"
        );
        assert!(initial.process(&ProcessId::from("n")).unwrap().is_terminated());
    }

    #[test]
    fn test_cannot_end_while_ready() {
        let scheduler = scheduler(r#"{ "processes": [ { "name": "t", "body": [] } ] }"#);
        let handle = ExplorationHandle::new();
        let initial = scheduler.initial_configuration();
        assert!(!scheduler.can_end_evaluation(&initial, &handle).unwrap());
        assert_eq!(scheduler.ready_processes(&initial, &handle).unwrap().len(), 1);
    }

    #[test]
    fn test_delta_cycle_fires_delta_events_first() {
        let scheduler = scheduler(
            r#"{ "processes": [
                { "name": "a", "body": [] },
                { "name": "b", "body": [] }
            ] }"#,
        );
        let mut state = scheduler.initial_configuration();
        blocked(&mut state, "a", EventBlocker::new([EventId::from("e")], Default::default(), None).into());
        blocked(&mut state, "b", ns(3).into());
        state.global_mut().notify_after(EventId::from("e"), TimedBlocker::Delta);

        let transitions = end(&scheduler, &state);
        assert_eq!(transitions.len(), 1);
        let next = transitions[0].configuration();
        assert!(next.process(&ProcessId::from("a")).unwrap().is_ready());
        assert_eq!(next.process(&ProcessId::from("b")).unwrap().blocker().unwrap().timer(), Some(ns(3)));
        assert!(next.global().pending_events().is_empty());
        assert_eq!(transitions[0].info().advance, Some(TimedBlocker::Delta));
    }

    #[test]
    fn test_time_advances_to_earliest_timer() {
        let scheduler = scheduler(
            r#"{ "processes": [
                { "name": "a", "body": [] },
                { "name": "b", "body": [] }
            ] }"#,
        );
        let mut state = scheduler.initial_configuration();
        blocked(&mut state, "a", ns(2).into());
        blocked(&mut state, "b", ns(5).into());
        state.global_mut().notify_after(EventId::from("e"), ns(4));

        let transitions = end(&scheduler, &state);
        let next = transitions[0].configuration();
        assert!(next.process(&ProcessId::from("a")).unwrap().is_ready());
        assert_eq!(next.process(&ProcessId::from("b")).unwrap().blocker().unwrap().timer(), Some(ns(3)));
        assert_eq!(next.global().pending_event(&EventId::from("e")), Some(ns(2)));
        assert_eq!(transitions[0].info().advance, Some(ns(2)));
    }

    #[test]
    fn test_nothing_pending_ends_simulation() {
        let scheduler = scheduler(r#"{ "processes": [ { "name": "a", "body": [] } ] }"#);
        let mut state = scheduler.initial_configuration();
        blocked(&mut state, "a", Blocker::Terminated);
        let state = Frozen::new(state);

        assert!(end(&scheduler, &state).is_empty());
    }

    #[test]
    fn test_update_phase_notifies_update_event() {
        let scheduler = scheduler(
            r#"{
                "update_events": { "sig": "sig_changed" },
                "processes": [ { "name": "a", "body": [] } ]
            }"#,
        );
        let mut state = scheduler.initial_configuration();
        blocked(
            &mut state,
            "a",
            EventBlocker::new([EventId::from("sig_changed")], Default::default(), None).into(),
        );
        state.global_mut().request_update("sig".into());

        let transitions = end(&scheduler, &state);
        let next = transitions[0].configuration();
        assert!(next.global().requested_updates().is_empty());
        assert!(next.process(&ProcessId::from("a")).unwrap().is_ready());
        assert!(transitions[0].info().updates.contains(&InstanceId::from("sig")));
    }

    #[test]
    fn test_update_without_event_is_a_final_step() {
        let scheduler = scheduler(r#"{ "processes": [ { "name": "a", "body": [] } ] }"#);
        let mut state = scheduler.initial_configuration();
        blocked(&mut state, "a", Blocker::Terminated);
        state.global_mut().request_update("sig".into());

        let transitions = end(&scheduler, &state);
        assert_eq!(transitions.len(), 1);
        let next = transitions[0].configuration();
        assert!(end(&scheduler, next).is_empty());
    }

    #[test]
    fn test_stopped_simulation_terminates_everything() {
        let scheduler = scheduler(
            r#"{ "stop_mode": "finish_delta", "processes": [ { "name": "a", "body": [] } ] }"#,
        );
        let mut state = scheduler.initial_configuration();
        blocked(
            &mut state,
            "a",
            EventBlocker::new([EventId::from("e")], Default::default(), None).into(),
        );
        state.global_mut().set_simulation_stopped(true);

        let transitions = end(&scheduler, &state);
        assert_eq!(transitions.len(), 1);
        let next = transitions[0].configuration();
        assert!(next.process(&ProcessId::from("a")).unwrap().is_terminated());
        assert!(end(&scheduler, next).is_empty());
    }

    #[test]
    fn test_immediate_stop_has_no_successors() {
        let scheduler = scheduler(r#"{ "processes": [ { "name": "a", "body": [] } ] }"#);
        let handle = ExplorationHandle::new();
        let mut state = scheduler.initial_configuration();
        state.global_mut().set_simulation_stopped(true);

        assert!(!scheduler.can_end_evaluation(&state, &handle).unwrap());
        assert!(scheduler.ready_processes(&state, &handle).unwrap().is_empty());
    }

    #[test]
    fn test_abstracted_waiter_is_maybe_ready() {
        let scheduler = scheduler(
            r#"{ "abstracted_events": ["irq"], "processes": [ { "name": "a", "body": [] } ] }"#,
        );
        let handle = ExplorationHandle::new();
        let mut state = scheduler.initial_configuration();
        blocked(
            &mut state,
            "a",
            EventBlocker::new([EventId::from("irq")], Default::default(), None).into(),
        );

        assert!(scheduler.can_end_evaluation(&state, &handle).unwrap());
        assert_eq!(scheduler.ready_processes(&state, &handle).unwrap().len(), 1);
    }
}
