//! Edge payload of scripted models.

use std::collections::BTreeSet;
use std::fmt;

use statespace_core::{Composable, EventId, InstanceId, ProcessId, TimedBlocker};

/// Who took a transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Actor {
    /// The scheduler's update and advancement phase.
    Scheduler,
    Process(ProcessId),
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Scheduler => f.write_str("scheduler"),
            Actor::Process(id) => write!(f, "{id}"),
        }
    }
}

/// What happened along one edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepInfo {
    pub actor: Actor,
    /// Delta cycle or time step taken by the scheduler.
    pub advance: Option<TimedBlocker>,
    /// Events notified by the step or fired by the scheduler.
    pub notified: BTreeSet<EventId>,
    /// Processes that became ready.
    pub woken: BTreeSet<ProcessId>,
    /// Updates requested by a process or run by the scheduler.
    pub updates: BTreeSet<InstanceId>,
}

impl StepInfo {
    pub fn new(actor: Actor) -> Self {
        Self {
            actor,
            advance: None,
            notified: BTreeSet::new(),
            woken: BTreeSet::new(),
            updates: BTreeSet::new(),
        }
    }
}

impl Composable for StepInfo {
    /// Branches of one step merge into the union of what they did.
    fn compose(mut self, other: Self) -> Self {
        self.notified.extend(other.notified);
        self.woken.extend(other.woken);
        self.updates.extend(other.updates);
        if self.advance.is_none() {
            self.advance = other.advance;
        }
        self
    }
}

impl fmt::Display for StepInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.actor)?;
        if let Some(advance) = self.advance {
            write!(f, " +{advance}")?;
        }
        let mut list = |label: &str, items: Vec<String>| -> fmt::Result {
            if items.is_empty() {
                Ok(())
            } else {
                write!(f, " {label}:{}", items.join(","))
            }
        };
        list("notify", self.notified.iter().map(ToString::to_string).collect())?;
        list("wake", self.woken.iter().map(ToString::to_string).collect())?;
        list("update", self.updates.iter().map(ToString::to_string).collect())
    }
}
