//! Per-process state: blocker plus interpreter call stack.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::blocker::Blocker;
use crate::lockable::{hash_of, require_unlocked, HashCache, Lockable, MemoHash};

/// An interpreter stack frame. Its contents are owned by the process
/// implementation; the model only clones, compares and hashes it.
pub trait Frame: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> Frame for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// State of a single process.
#[derive(Clone)]
pub struct ProcessState<F> {
    blocker: Option<Blocker>,
    call_stack: Vec<F>,
    locked: bool,
    hash: HashCache,
}

impl<F: Frame> ProcessState<F> {
    pub fn new(blocker: Option<Blocker>, call_stack: Vec<F>) -> Self {
        Self {
            blocker,
            call_stack,
            locked: false,
            hash: HashCache::default(),
        }
    }

    /// A ready process at the given stack.
    pub fn ready(call_stack: Vec<F>) -> Self {
        Self::new(None, call_stack)
    }

    pub fn blocker(&self) -> Option<&Blocker> {
        self.blocker.as_ref()
    }

    pub fn call_stack(&self) -> &[F] {
        &self.call_stack
    }

    pub fn is_ready(&self) -> bool {
        self.blocker.is_none()
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.blocker, Some(Blocker::Terminated))
    }

    pub fn set_blocker(&mut self, blocker: Option<Blocker>) {
        self.touch();
        self.blocker = blocker;
    }

    pub fn terminate(&mut self) {
        self.set_blocker(Some(Blocker::Terminated));
    }

    pub fn call_stack_mut(&mut self) -> &mut Vec<F> {
        self.touch();
        &mut self.call_stack
    }

    fn touch(&mut self) {
        require_unlocked(self.locked);
        self.hash.invalidate();
    }
}

impl<F: Frame> Lockable for ProcessState<F> {
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
            blocker: self.blocker.clone(),
            call_stack: self.call_stack.clone(),
            locked: false,
            hash: self.hash.clone(),
        }
    }
}

impl<F: Frame> MemoHash for ProcessState<F> {
    fn memo_hash(&self) -> u64 {
        self.hash
            .get_or_compute(|| hash_of(&(&self.blocker, &self.call_stack)))
    }
}

impl<F: Frame> PartialEq for ProcessState<F> {
    fn eq(&self, other: &Self) -> bool {
        self.blocker == other.blocker && self.call_stack == other.call_stack
    }
}

impl<F: Frame> Eq for ProcessState<F> {}

impl<F: Frame> Hash for ProcessState<F> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.memo_hash());
    }
}

impl<F: Frame> fmt::Debug for ProcessState<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessState")
            .field("blocker", &self.blocker)
            .field("call_stack", &self.call_stack)
            .field("locked", &self.locked)
            .finish()
    }
}

impl<F: Frame> fmt::Display for ProcessState<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.blocker {
            None => f.write_str("Ready")?,
            Some(Blocker::Terminated) => f.write_str("Done")?,
            Some(blocker) => write!(f, "Wait {blocker}")?,
        }
        write!(f, " at {:?}", self.call_stack)
    }
}
