//! What a process is waiting for.
//!
//! A ready process has no blocker at all (`Option<Blocker>::None`); the
//! variants here cover event waits, timed waits and termination.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ids::EventId;
use crate::time::{SimTime, TimeError};

/// A delay: one delta cycle, or a positive amount of simulated time.
///
/// Ordered so that `Delta` comes before every `Real` duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimedBlocker {
    Delta,
    Real(SimTime),
}

impl TimedBlocker {
    /// A zero duration is a delta delay.
    pub fn from_duration(duration: SimTime) -> Self {
        if duration.is_zero() {
            TimedBlocker::Delta
        } else {
            TimedBlocker::Real(duration)
        }
    }

    pub fn is_delta(self) -> bool {
        matches!(self, TimedBlocker::Delta)
    }

    /// Remaining duration; zero for `Delta`.
    pub fn duration(self) -> SimTime {
        match self {
            TimedBlocker::Delta => SimTime::ZERO,
            TimedBlocker::Real(duration) => duration,
        }
    }

    /// The timer after `elapsed` time has passed, or `None` if it expired.
    pub fn elapse(self, elapsed: SimTime) -> Result<Option<TimedBlocker>, TimeError> {
        match self {
            TimedBlocker::Delta => Ok(None),
            TimedBlocker::Real(duration) => {
                let rest = duration.checked_sub(elapsed)?;
                Ok((!rest.is_zero()).then_some(TimedBlocker::Real(rest)))
            }
        }
    }
}

impl fmt::Display for TimedBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimedBlocker::Delta => f.write_str("Δ"),
            TimedBlocker::Real(duration) => write!(f, "{duration}"),
        }
    }
}

/// How a multi-event wait is satisfied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaitMode {
    /// Any one of the events wakes the process.
    #[default]
    #[serde(rename = "any")]
    AnyOf,
    /// Every event must have been notified.
    #[serde(rename = "all")]
    AllOf,
}

/// Wait on a non-empty set of events, optionally bounded by a timeout.
#[derive(Debug, Clone)]
pub struct EventBlocker {
    events: BTreeSet<EventId>,
    mode: WaitMode,
    timeout: Option<TimedBlocker>,
}

impl EventBlocker {
    /// # Panics
    ///
    /// Panics if `events` is empty.
    pub fn new(
        events: impl IntoIterator<Item = EventId>,
        mode: WaitMode,
        timeout: Option<TimedBlocker>,
    ) -> Self {
        let events: BTreeSet<EventId> = events.into_iter().collect();
        assert!(!events.is_empty(), "an event blocker needs at least one event");
        Self {
            events,
            mode,
            timeout,
        }
    }

    pub fn events(&self) -> &BTreeSet<EventId> {
        &self.events
    }

    pub fn mode(&self) -> WaitMode {
        self.mode
    }

    pub fn timeout(&self) -> Option<TimedBlocker> {
        self.timeout
    }

    pub fn waits_on(&self, event: &EventId) -> bool {
        self.events.contains(event)
    }

    /// Same mode and timeout, different events.
    pub fn with_events(&self, events: impl IntoIterator<Item = EventId>) -> Self {
        Self::new(events, self.mode, self.timeout)
    }

    /// Same events and mode, different timeout.
    pub fn with_timeout(&self, timeout: Option<TimedBlocker>) -> Self {
        Self {
            events: self.events.clone(),
            mode: self.mode,
            timeout,
        }
    }

    // The mode is irrelevant for a single event.
    fn effective_mode(&self) -> WaitMode {
        if self.events.len() > 1 {
            self.mode
        } else {
            WaitMode::AnyOf
        }
    }
}

impl PartialEq for EventBlocker {
    fn eq(&self, other: &Self) -> bool {
        self.events == other.events
            && self.timeout == other.timeout
            && self.effective_mode() == other.effective_mode()
    }
}

impl Eq for EventBlocker {}

impl Hash for EventBlocker {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.events.hash(state);
        self.timeout.hash(state);
        self.effective_mode().hash(state);
    }
}

impl fmt::Display for EventBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = match self.effective_mode() {
            WaitMode::AnyOf => "|",
            WaitMode::AllOf => "&",
        };
        for (i, event) in self.events.iter().enumerate() {
            if i > 0 {
                f.write_str(separator)?;
            }
            write!(f, "{event}")?;
        }
        if let Some(timeout) = self.timeout {
            write!(f, " Timeout {timeout}")?;
        }
        Ok(())
    }
}

/// Why a process is not ready.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Blocker {
    Event(EventBlocker),
    Timed(TimedBlocker),
    /// Absorbing: a terminated process never becomes ready again.
    Terminated,
}

impl Blocker {
    /// The timer that can wake the process, if any.
    pub fn timer(&self) -> Option<TimedBlocker> {
        match self {
            Blocker::Event(blocker) => blocker.timeout(),
            Blocker::Timed(timer) => Some(*timer),
            Blocker::Terminated => None,
        }
    }

    pub fn as_event(&self) -> Option<&EventBlocker> {
        match self {
            Blocker::Event(blocker) => Some(blocker),
            _ => None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, Blocker::Terminated)
    }
}

impl From<EventBlocker> for Blocker {
    fn from(blocker: EventBlocker) -> Self {
        Blocker::Event(blocker)
    }
}

impl From<TimedBlocker> for Blocker {
    fn from(timer: TimedBlocker) -> Self {
        Blocker::Timed(timer)
    }
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blocker::Event(blocker) => write!(f, "{blocker}"),
            Blocker::Timed(timer) => write!(f, "{timer}"),
            Blocker::Terminated => f.write_str("DONE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lockable::hash_of;
    use crate::time::TimeUnit;

    fn ns(amount: u64) -> SimTime {
        SimTime::new(amount, TimeUnit::Ns).unwrap()
    }

    #[test]
    fn test_delta_orders_before_real() {
        assert!(TimedBlocker::Delta < TimedBlocker::Real(SimTime::from_femtos(1)));
        assert!(TimedBlocker::Real(ns(1)) < TimedBlocker::Real(ns(2)));
        assert_eq!(
            [TimedBlocker::Real(ns(3)), TimedBlocker::Delta].iter().min(),
            Some(&TimedBlocker::Delta)
        );
    }

    #[test]
    fn test_from_duration_zero_is_delta() {
        assert_eq!(TimedBlocker::from_duration(SimTime::ZERO), TimedBlocker::Delta);
        assert_eq!(TimedBlocker::from_duration(ns(5)), TimedBlocker::Real(ns(5)));
    }

    #[test]
    fn test_elapse() {
        let timer = TimedBlocker::Real(ns(10));
        assert_eq!(timer.elapse(ns(4)).unwrap(), Some(TimedBlocker::Real(ns(6))));
        assert_eq!(timer.elapse(ns(10)).unwrap(), None);
        assert!(timer.elapse(ns(11)).is_err());
        assert_eq!(TimedBlocker::Delta.elapse(ns(1)).unwrap(), None);
    }

    #[test]
    fn test_single_event_ignores_mode() {
        let any = EventBlocker::new([EventId::from("e")], WaitMode::AnyOf, None);
        let all = EventBlocker::new([EventId::from("e")], WaitMode::AllOf, None);
        assert_eq!(any, all);
        assert_eq!(hash_of(&any), hash_of(&all));
    }

    #[test]
    fn test_multi_event_mode_matters() {
        let events = [EventId::from("a"), EventId::from("b")];
        let any = EventBlocker::new(events.clone(), WaitMode::AnyOf, None);
        let all = EventBlocker::new(events, WaitMode::AllOf, None);
        assert_ne!(any, all);
        assert_eq!(any.to_string(), "a|b");
        assert_eq!(all.to_string(), "a&b");
    }

    #[test]
    #[should_panic(expected = "at least one event")]
    fn test_empty_event_blocker_panics() {
        EventBlocker::new(Vec::new(), WaitMode::AnyOf, None);
    }

    #[test]
    fn test_display() {
        let blocker = EventBlocker::new(
            [EventId::from("e")],
            WaitMode::AnyOf,
            Some(TimedBlocker::Real(ns(5))),
        );
        assert_eq!(Blocker::from(blocker).to_string(), "e Timeout 5ns");
        assert_eq!(Blocker::Timed(TimedBlocker::Delta).to_string(), "Δ");
        assert_eq!(Blocker::Terminated.to_string(), "DONE");
    }

    #[test]
    fn test_timer() {
        let blocker = EventBlocker::new([EventId::from("e")], WaitMode::AnyOf, None);
        assert_eq!(Blocker::from(blocker.clone()).timer(), None);
        assert_eq!(
            Blocker::from(blocker.with_timeout(Some(TimedBlocker::Delta))).timer(),
            Some(TimedBlocker::Delta)
        );
        assert_eq!(Blocker::Terminated.timer(), None);
    }
}
