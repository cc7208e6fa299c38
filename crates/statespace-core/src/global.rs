//! Global simulation state shared by all processes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::blocker::TimedBlocker;
use crate::ids::{EventId, InstanceId};
use crate::lockable::{hash_of, require_unlocked, HashCache, Lockable, MemoHash};

/// Pending event notifications, requested channel updates and the stop flag.
///
/// An event missing from the pending map is not pending; that is distinct
/// from an event pending with a delta delay.
#[derive(Clone, Default)]
pub struct GlobalState {
    pending_events: BTreeMap<EventId, TimedBlocker>,
    requested_updates: BTreeSet<InstanceId>,
    simulation_stopped: bool,
    locked: bool,
    hash: HashCache,
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_events(&self) -> &BTreeMap<EventId, TimedBlocker> {
        &self.pending_events
    }

    pub fn pending_event(&self, event: &EventId) -> Option<TimedBlocker> {
        self.pending_events.get(event).copied()
    }

    pub fn requested_updates(&self) -> &BTreeSet<InstanceId> {
        &self.requested_updates
    }

    pub fn is_simulation_stopped(&self) -> bool {
        self.simulation_stopped
    }

    /// Schedules `event` after `timer`. An already pending notification
    /// that fires earlier wins.
    pub fn notify_after(&mut self, event: EventId, timer: TimedBlocker) {
        self.touch();
        self.pending_events
            .entry(event)
            .and_modify(|pending| *pending = (*pending).min(timer))
            .or_insert(timer);
    }

    /// Removes a pending notification.
    pub fn cancel_event(&mut self, event: &EventId) -> Option<TimedBlocker> {
        self.touch();
        self.pending_events.remove(event)
    }

    pub fn pending_events_mut(&mut self) -> &mut BTreeMap<EventId, TimedBlocker> {
        self.touch();
        &mut self.pending_events
    }

    /// Returns `true` if the instance had not requested an update yet.
    pub fn request_update(&mut self, instance: InstanceId) -> bool {
        self.touch();
        self.requested_updates.insert(instance)
    }

    /// Clears the requested updates and returns them.
    pub fn take_requested_updates(&mut self) -> BTreeSet<InstanceId> {
        self.touch();
        std::mem::take(&mut self.requested_updates)
    }

    pub fn set_simulation_stopped(&mut self, stopped: bool) {
        self.touch();
        self.simulation_stopped = stopped;
    }

    fn touch(&mut self) {
        require_unlocked(self.locked);
        self.hash.invalidate();
    }
}

impl Lockable for GlobalState {
    fn is_locked(&self) -> bool {
        self.locked
    }

    fn lock(&mut self) -> bool {
        if self.locked {
            return false;
        }
        self.memo_hash();
        self.locked = true;
        true
    }

    fn unlocked_clone(&self) -> Self {
        Self {
            locked: false,
            ..self.clone()
        }
    }
}

impl MemoHash for GlobalState {
    fn memo_hash(&self) -> u64 {
        self.hash.get_or_compute(|| {
            let hash = hash_of(&self.pending_events)
                .wrapping_mul(31)
                .wrapping_add(hash_of(&self.requested_updates));
            if self.simulation_stopped {
                !hash
            } else {
                hash
            }
        })
    }
}

impl PartialEq for GlobalState {
    fn eq(&self, other: &Self) -> bool {
        self.simulation_stopped == other.simulation_stopped
            && self.pending_events == other.pending_events
            && self.requested_updates == other.requested_updates
    }
}

impl Eq for GlobalState {}

impl Hash for GlobalState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.memo_hash());
    }
}

impl fmt::Debug for GlobalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalState")
            .field("pending_events", &self.pending_events)
            .field("requested_updates", &self.requested_updates)
            .field("simulation_stopped", &self.simulation_stopped)
            .field("locked", &self.locked)
            .finish()
    }
}

impl fmt::Display for GlobalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{events: {")?;
        for (i, (event, timer)) in self.pending_events.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{event}: {timer}")?;
        }
        f.write_str("}, updates: {")?;
        for (i, instance) in self.requested_updates.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{instance}")?;
        }
        f.write_str("}")?;
        if self.simulation_stopped {
            f.write_str(", stopped")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{SimTime, TimeUnit};

    fn real(ns: u64) -> TimedBlocker {
        TimedBlocker::Real(SimTime::new(ns, TimeUnit::Ns).unwrap())
    }

    #[test]
    fn test_notify_keeps_earliest() {
        let mut global = GlobalState::new();
        let e = EventId::from("e");
        global.notify_after(e.clone(), real(10));
        global.notify_after(e.clone(), real(20));
        assert_eq!(global.pending_event(&e), Some(real(10)));
        global.notify_after(e.clone(), TimedBlocker::Delta);
        assert_eq!(global.pending_event(&e), Some(TimedBlocker::Delta));
        assert_eq!(global.cancel_event(&e), Some(TimedBlocker::Delta));
        assert_eq!(global.pending_event(&e), None);
    }

    #[test]
    fn test_take_requested_updates() {
        let mut global = GlobalState::new();
        assert!(global.request_update(InstanceId::from("sig")));
        assert!(!global.request_update(InstanceId::from("sig")));
        let updates = global.take_requested_updates();
        assert_eq!(updates.len(), 1);
        assert!(global.requested_updates().is_empty());
    }

    #[test]
    fn test_stopped_changes_equality_and_hash() {
        let running = GlobalState::new();
        let mut stopped = GlobalState::new();
        stopped.set_simulation_stopped(true);
        assert_ne!(running, stopped);
        assert_eq!(stopped.memo_hash(), !running.memo_hash());
    }

    #[test]
    fn test_equal_states_hash_equal() {
        let mut a = GlobalState::new();
        let mut b = GlobalState::new();
        a.notify_after(EventId::from("x"), real(1));
        a.notify_after(EventId::from("y"), TimedBlocker::Delta);
        b.notify_after(EventId::from("y"), TimedBlocker::Delta);
        b.notify_after(EventId::from("x"), real(1));
        assert_eq!(a, b);
        assert_eq!(a.memo_hash(), b.memo_hash());
    }

    #[test]
    #[should_panic(expected = "locked state cannot be modified")]
    fn test_locked_request_update_panics() {
        let mut global = GlobalState::new();
        global.lock();
        global.request_update(InstanceId::from("sig"));
    }

    #[test]
    fn test_display() {
        let mut global = GlobalState::new();
        global.notify_after(EventId::from("e"), TimedBlocker::Delta);
        global.set_simulation_stopped(true);
        assert_eq!(global.to_string(), "{events: {e: Δ}, updates: {}, stopped}");
    }
}
