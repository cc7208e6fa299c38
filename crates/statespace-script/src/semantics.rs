//! Event and stop semantics shared by processes and the scheduler.

use std::collections::BTreeSet;

use log::debug;
use statespace_core::{
    Blocker, Configuration, EventBlocker, EventId, ProcessId, TimedBlocker, WaitMode,
};

use crate::frame::ScriptFrame;
use crate::info::StepInfo;
use crate::model::{Delay, Model, StopMode};

pub(crate) type ScriptConfiguration = Configuration<ScriptFrame>;

/// Whether the abstraction cannot rule out that `blocker` was satisfied.
pub(crate) fn is_maybe_ready(model: &Model, blocker: &Blocker) -> bool {
    let Some(wait) = blocker.as_event() else {
        return false;
    };
    let mut abstracted = wait.events().iter().map(|event| model.is_abstracted(event));
    match wait.mode() {
        WaitMode::AnyOf => abstracted.any(|a| a),
        WaitMode::AllOf => abstracted.all(|a| a),
    }
}

pub(crate) fn is_stopped_immediately(model: &Model, config: &ScriptConfiguration) -> bool {
    config.global().is_simulation_stopped() && model.stop_mode == StopMode::FinishImmediate
}

/// Notifies `event`, immediately or after `delay`.
pub(crate) fn notify(
    model: &Model,
    config: &mut ScriptConfiguration,
    event: &EventId,
    delay: Delay,
    info: &mut StepInfo,
) {
    if model.is_abstracted(event) || is_stopped_immediately(model, config) {
        return;
    }
    match delay.timer() {
        Some(timer) => {
            // Nothing fires after a stop.
            if config.global().is_simulation_stopped() {
                return;
            }
            config.global_mut().notify_after(event.clone(), timer);
        }
        None => {
            if config.global().pending_event(event).is_some() {
                config.global_mut().cancel_event(event);
            }
            let fired = BTreeSet::from([event.clone()]);
            wake_waiters(config, &fired, &mut info.woken);
        }
    }
    info.notified.insert(event.clone());
}

/// Wakes every process whose event wait is satisfied by `fired`.
///
/// Any-of waiters become ready. All-of waiters drop the fired events and
/// become ready once nothing is left to wait for. Waking discards the
/// timeout.
pub(crate) fn wake_waiters(
    config: &mut ScriptConfiguration,
    fired: &BTreeSet<EventId>,
    woken: &mut BTreeSet<ProcessId>,
) {
    let affected: Vec<ProcessId> = config
        .processes()
        .iter()
        .filter(|(_, state)| {
            state
                .blocker()
                .and_then(Blocker::as_event)
                .is_some_and(|wait| wait.events().iter().any(|e| fired.contains(e)))
        })
        .map(|(id, _)| id.clone())
        .collect();

    for id in affected {
        let Some(state) = config.process_mut(&id) else {
            continue;
        };
        let Some(wait) = state.blocker().and_then(Blocker::as_event).cloned() else {
            continue;
        };
        let remaining: Vec<EventId> = match wait.mode() {
            WaitMode::AnyOf => Vec::new(),
            WaitMode::AllOf => wait
                .events()
                .iter()
                .filter(|e| !fired.contains(*e))
                .cloned()
                .collect(),
        };
        if remaining.is_empty() {
            state.set_blocker(None);
            woken.insert(id);
        } else {
            state.set_blocker(Some(Blocker::Event(wait.with_events(remaining))));
        }
    }
}

/// Makes every process whose timer equals `expired` ready and subtracts
/// `expired` from the remaining timers. `Delta` expires only delta timers.
pub(crate) fn expire_timers(
    config: &mut ScriptConfiguration,
    expired: TimedBlocker,
    woken: &mut BTreeSet<ProcessId>,
) -> Result<(), statespace_core::TimeError> {
    let timed: Vec<(ProcessId, TimedBlocker)> = config
        .processes()
        .iter()
        .filter(|(_, state)| !state.is_ready())
        .filter_map(|(id, state)| state.blocker()?.timer().map(|t| (id.clone(), t)))
        .collect();

    for (id, timer) in timed {
        let rest = match expired {
            TimedBlocker::Delta if timer.is_delta() => None,
            TimedBlocker::Delta => continue,
            TimedBlocker::Real(elapsed) => timer.elapse(elapsed)?,
        };
        let Some(state) = config.process_mut(&id) else {
            continue;
        };
        let Some(blocker) = state.blocker().cloned() else {
            continue;
        };
        match (blocker, rest) {
            (_, None) => {
                state.set_blocker(None);
                woken.insert(id);
            }
            (Blocker::Event(wait), Some(rest)) => {
                state.set_blocker(Some(Blocker::Event(wait.with_timeout(Some(rest)))));
            }
            (_, Some(rest)) => state.set_blocker(Some(Blocker::Timed(rest))),
        }
    }
    Ok(())
}

/// Sets the stop flag, drops pending notifications and terminates the
/// processes the stop mode says cannot continue.
pub(crate) fn stop_simulation(model: &Model, config: &mut ScriptConfiguration) {
    debug!("simulation stop requested ({:?})", model.stop_mode);
    config.global_mut().set_simulation_stopped(true);
    config.global_mut().pending_events_mut().clear();

    for (_, state) in config.processes_mut() {
        let keep = match model.stop_mode {
            StopMode::FinishImmediate => false,
            StopMode::FinishDelta => {
                state.is_ready() || state.blocker().and_then(Blocker::as_event).is_some()
            }
        };
        if !keep && !state.is_terminated() {
            terminate(state);
        }
    }
}

pub(crate) fn terminate(state: &mut statespace_core::ProcessState<ScriptFrame>) {
    state.terminate();
    state.call_stack_mut().clear();
}

/// The blocker of a method waiting on its static sensitivity.
pub(crate) fn sensitivity_blocker(sensitivity: &[EventId]) -> Option<Blocker> {
    if sensitivity.is_empty() {
        None
    } else {
        Some(Blocker::Event(EventBlocker::new(
            sensitivity.iter().cloned(),
            WaitMode::AnyOf,
            None,
        )))
    }
}
