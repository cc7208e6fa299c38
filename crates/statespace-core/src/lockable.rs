//! Freeze discipline for values that are built mutably and then shared.
//!
//! Configurations are assembled by collaborators through ordinary mutation
//! and then locked before they are handed to an engine. Locking is
//! irreversible, cascades into owned sub-values and forces the memoized hash
//! into its cache, so that any number of threads can hash and compare a
//! locked value without synchronization.
//!
//! [`Frozen`] is the shared handle the engines store: building one locks the
//! value, after which it is only reachable through `&T`.

use std::borrow::Borrow;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A value that is mutable until locked and immutable afterwards.
///
/// Implementations panic from every mutator once [`Lockable::lock`] has been
/// called. A locked value is never unlocked again; [`Lockable::unlocked_clone`]
/// is the only way to get a mutable copy.
pub trait Lockable: Sized {
    /// Whether the value has been locked.
    fn is_locked(&self) -> bool;

    /// Locks the value and every owned lockable sub-value.
    ///
    /// Returns `true` if this call performed the transition, `false` if the
    /// value was already locked.
    fn lock(&mut self) -> bool;

    /// Deep, unlocked copy, regardless of the current lock state.
    fn unlocked_clone(&self) -> Self;

    /// Returns `self` if it is still mutable, otherwise an unlocked copy.
    fn unlocked_version(self) -> Self {
        if self.is_locked() {
            self.unlocked_clone()
        } else {
            self
        }
    }
}

/// A value with a lazily computed, cached hash code.
pub trait MemoHash {
    /// Hash of the value, computed on first use and cached until the next
    /// mutation. Always served from the cache once the value is locked.
    fn memo_hash(&self) -> u64;
}

/// Panics if `locked` is set. Every mutator calls this first.
#[track_caller]
pub(crate) fn require_unlocked(locked: bool) {
    assert!(!locked, "locked state cannot be modified");
}

/// Deterministic hash of any `Hash` value.
pub fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Cached hash slot shared by the model types.
#[derive(Debug, Default)]
pub(crate) struct HashCache {
    value: AtomicU64,
    precomputed: AtomicBool,
}

impl HashCache {
    pub(crate) fn get_or_compute(&self, compute: impl FnOnce() -> u64) -> u64 {
        if self.precomputed.load(Ordering::Acquire) {
            return self.value.load(Ordering::Relaxed);
        }
        // Racing readers of an unlocked value compute the same number.
        let hash = compute();
        self.value.store(hash, Ordering::Relaxed);
        self.precomputed.store(true, Ordering::Release);
        hash
    }

    pub(crate) fn invalidate(&mut self) {
        *self.precomputed.get_mut() = false;
    }

    #[cfg(test)]
    pub(crate) fn is_precomputed(&self) -> bool {
        self.precomputed.load(Ordering::Acquire)
    }
}

impl Clone for HashCache {
    fn clone(&self) -> Self {
        let precomputed = self.precomputed.load(Ordering::Acquire);
        Self {
            value: AtomicU64::new(self.value.load(Ordering::Relaxed)),
            precomputed: AtomicBool::new(precomputed),
        }
    }
}

/// A locked value behind shared ownership.
///
/// This is the form in which configurations live in worklists, explored sets
/// and records. Cloning is a reference-count bump.
pub struct Frozen<T>(Arc<T>);

impl<T: Lockable> Frozen<T> {
    /// Locks `value` and moves it behind shared ownership.
    pub fn new(mut value: T) -> Self {
        value.lock();
        Self(Arc::new(value))
    }

    /// Mutable copy of the shared value.
    pub fn thaw(&self) -> T {
        self.0.unlocked_clone()
    }
}

impl<T> Frozen<T> {
    /// Whether both handles share the same allocation.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.0, &other.0)
    }
}

impl<T> Clone for Frozen<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for Frozen<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> AsRef<T> for Frozen<T> {
    fn as_ref(&self) -> &T {
        &self.0
    }
}

// Hash and equality delegate to `T`, so lookups by `&T` are consistent.
impl<T> Borrow<T> for Frozen<T> {
    fn borrow(&self) -> &T {
        &self.0
    }
}

impl<T: PartialEq> PartialEq for Frozen<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || *self.0 == *other.0
    }
}

impl<T: Eq> Eq for Frozen<T> {}

impl<T: Hash> Hash for Frozen<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (*self.0).hash(state);
    }
}

impl<T: fmt::Debug> fmt::Debug for Frozen<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl<T: fmt::Display> fmt::Display for Frozen<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}
