//! The vertex type of the explored state graph.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::global::GlobalState;
use crate::ids::ProcessId;
use crate::lockable::{hash_of, require_unlocked, HashCache, Lockable, MemoHash};
use crate::process::{Frame, ProcessState};

/// Global state plus the state of every process.
///
/// Collaborators build configurations mutably and lock them before they are
/// handed back to an engine. Locking cascades into the global state and each
/// process state, and the engines only ever store locked configurations.
///
/// # Example
///
/// ```
/// use statespace_core::{Configuration, GlobalState, Lockable, ProcessId, ProcessState};
///
/// let mut config: Configuration<u32> = Configuration::new(GlobalState::new());
/// config.insert_process(ProcessId::from("p"), ProcessState::ready(vec![0]));
/// assert_eq!(config.ready_processes(), vec![ProcessId::from("p")]);
///
/// config.lock();
/// assert!(config.global().is_locked());
/// ```
#[derive(Clone)]
pub struct Configuration<F> {
    global: GlobalState,
    processes: BTreeMap<ProcessId, ProcessState<F>>,
    locked: bool,
    hash: HashCache,
}

impl<F: Frame> Configuration<F> {
    /// A configuration without processes.
    pub fn new(global: GlobalState) -> Self {
        Self::with_processes(global, BTreeMap::new())
    }

    pub fn with_processes(
        global: GlobalState,
        processes: BTreeMap<ProcessId, ProcessState<F>>,
    ) -> Self {
        Self {
            global,
            processes,
            locked: false,
            hash: HashCache::default(),
        }
    }

    pub fn global(&self) -> &GlobalState {
        &self.global
    }

    pub fn processes(&self) -> &BTreeMap<ProcessId, ProcessState<F>> {
        &self.processes
    }

    pub fn process(&self, id: &ProcessId) -> Option<&ProcessState<F>> {
        self.processes.get(id)
    }

    /// Processes that are definitely ready, in id order.
    pub fn ready_processes(&self) -> Vec<ProcessId> {
        self.processes
            .iter()
            .filter(|(_, state)| state.is_ready())
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn global_mut(&mut self) -> &mut GlobalState {
        self.touch();
        &mut self.global
    }

    pub fn process_mut(&mut self, id: &ProcessId) -> Option<&mut ProcessState<F>> {
        self.touch();
        self.processes.get_mut(id)
    }

    /// Mutable access to every process state.
    pub fn processes_mut(&mut self) -> impl Iterator<Item = (&ProcessId, &mut ProcessState<F>)> {
        self.touch();
        self.processes.iter_mut()
    }

    pub fn insert_process(
        &mut self,
        id: ProcessId,
        state: ProcessState<F>,
    ) -> Option<ProcessState<F>> {
        self.touch();
        self.processes.insert(id, state)
    }

    fn touch(&mut self) {
        require_unlocked(self.locked);
        self.hash.invalidate();
    }
}

impl<F: Frame> Lockable for Configuration<F> {
    fn is_locked(&self) -> bool {
        self.locked
    }

    fn lock(&mut self) -> bool {
        if self.locked {
            return false;
        }
        self.global.lock();
        for state in self.processes.values_mut() {
            state.lock();
        }
        self.memo_hash();
        self.locked = true;
        true
    }

    fn unlocked_clone(&self) -> Self {
        Self {
            global: self.global.unlocked_clone(),
            processes: self
                .processes
                .iter()
                .map(|(id, state)| (id.clone(), state.unlocked_clone()))
                .collect(),
            locked: false,
            hash: self.hash.clone(),
        }
    }
}

impl<F: Frame> MemoHash for Configuration<F> {
    fn memo_hash(&self) -> u64 {
        self.hash.get_or_compute(|| {
            self.processes.iter().fold(
                self.global.memo_hash().wrapping_mul(31),
                |acc, (id, state)| acc.wrapping_add(hash_of(id).wrapping_mul(state.memo_hash())),
            )
        })
    }
}

impl<F: Frame> PartialEq for Configuration<F> {
    fn eq(&self, other: &Self) -> bool {
        self.global == other.global && self.processes == other.processes
    }
}

impl<F: Frame> Eq for Configuration<F> {}

impl<F: Frame> Hash for Configuration<F> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.memo_hash());
    }
}

impl<F: Frame> fmt::Debug for Configuration<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("global", &self.global)
            .field("processes", &self.processes)
            .field("locked", &self.locked)
            .finish()
    }
}

impl<F: Frame> fmt::Display for Configuration<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(GlobalState: {} ProcessStates: {{", self.global)?;
        for (i, (id, state)) in self.processes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}: {state}")?;
        }
        f.write_str("})")
    }
}
