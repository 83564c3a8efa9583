//! One test-and-set spinlock per vertex.
//!
//! Algorithms that update a vertex's state from several threads (e.g. relaxing the
//! distance of a shared neighbour) take that vertex's lock around the update. Locks
//! are a single byte each and are never held across a blocking call, so spinning
//! with a yielding backoff is cheaper than parking.

use core::sync::atomic::{AtomicBool, Ordering};
use std::fmt;

use crossbeam_utils::Backoff;

use crate::{alloc::ParallelVector, error::Result};

/// A dense array of per-vertex spinlocks.
pub struct VertexLocks {
    flags: ParallelVector<AtomicBool>,
}

impl VertexLocks {
    /// Creates `num_vertices` unlocked locks.
    ///
    /// # Errors
    /// [`OlapError::AllocationFailed`](crate::OlapError::AllocationFailed) if the
    /// flag array cannot be mapped.
    pub fn new(num_vertices: usize) -> Result<Self> {
        if num_vertices == 0 {
            return Ok(Self::empty());
        }
        Ok(Self {
            flags: ParallelVector::with_len(num_vertices, num_vertices)?,
        })
    }

    pub(crate) const fn empty() -> Self {
        Self {
            flags: ParallelVector::new(),
        }
    }

    /// Number of locks.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Returns `true` if there are no locks.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Spins until the lock of `vertex` is acquired.
    ///
    /// Not re-entrant: acquiring a lock the current thread already holds never returns.
    ///
    /// # Panics
    /// Panics if `vertex >= len()`.
    #[inline]
    pub fn acquire(&self, vertex: usize) {
        let flag = &self.flags[vertex];
        let backoff = Backoff::new();
        loop {
            while flag.load(Ordering::Relaxed) {
                backoff.snooze();
            }
            if !flag.swap(true, Ordering::Acquire) {
                return;
            }
        }
    }

    /// Acquires the lock of `vertex` if it is free, without waiting.
    ///
    /// # Panics
    /// Panics if `vertex >= len()`.
    #[inline]
    pub fn try_acquire(&self, vertex: usize) -> bool {
        !self.flags[vertex].swap(true, Ordering::Acquire)
    }

    /// Releases the lock of `vertex`.
    ///
    /// Releasing a lock the caller does not hold unlocks it for its holder too.
    ///
    /// # Panics
    /// Panics if `vertex >= len()`.
    #[inline]
    pub fn release(&self, vertex: usize) {
        self.flags[vertex].store(false, Ordering::Release);
    }

    /// Returns whether the lock of `vertex` is currently held by anyone.
    pub fn is_locked(&self, vertex: usize) -> bool {
        self.flags[vertex].load(Ordering::Relaxed)
    }

    /// Acquires the lock of `vertex` and returns a guard that releases it on drop.
    ///
    /// # Panics
    /// Panics if `vertex >= len()`.
    pub fn guard(&self, vertex: usize) -> VertexLockGuard<'_> {
        self.acquire(vertex);
        VertexLockGuard {
            locks: self,
            vertex,
        }
    }
}

impl fmt::Debug for VertexLocks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexLocks").field("len", &self.len()).finish()
    }
}

/// Holds one vertex lock until dropped.
#[must_use = "the vertex is unlocked as soon as the guard is dropped"]
pub struct VertexLockGuard<'a> {
    locks: &'a VertexLocks,
    vertex: usize,
}

impl VertexLockGuard<'_> {
    /// The locked vertex.
    pub fn vertex(&self) -> usize {
        self.vertex
    }
}

impl Drop for VertexLockGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(self.vertex);
    }
}
