//! Work-stealing vertex traversals.
//!
//! Both primitives run on the graph's worker and share one scheduler
//! ([`crate::concurrency::steal`]): ids are claimed in batches of 64, so a batch of
//! `process_vertex_active` is exactly one word of the frontier bitset.

use core::{ops::Add, sync::atomic::Ordering};

use num_traits::Zero;

use super::OlapGraph;
use crate::{
    concurrency::{
        atomic::{ParallelBitset, WORD_BITS},
        steal::{reduce_stealing, BATCH},
    },
    error::Result,
    graph::edge::EdgeData,
};

const _: () = assert!(BATCH == WORD_BITS);

impl<E: EdgeData> OlapGraph<E> {
    /// Applies `work` to every vertex in `[lower, upper)` exactly once and folds the
    /// results with `reduce`, starting from `zero`.
    ///
    /// `zero` must be an identity of `reduce`: it seeds every thread's partial result.
    /// Visiting order is unspecified. `work` may write per-vertex state of the vertex
    /// it is given without synchronization; state shared between vertices needs
    /// atomics or [`OlapGraph::guard_vertex_lock`].
    ///
    /// # Errors
    /// [`OlapError::TaskKilled`](crate::OlapError::TaskKilled) if the task monitor
    /// requests cancellation, [`OlapError::NestedDelegate`](crate::OlapError::NestedDelegate)
    /// when called from inside `work` of another traversal on the same worker.
    ///
    /// # Panics
    /// A panic inside `work` or `reduce` is resumed on the calling thread.
    pub fn process_vertex_in_range<R, W, F>(
        &self,
        work: W,
        lower: usize,
        upper: usize,
        zero: R,
        reduce: F,
    ) -> Result<R>
    where
        R: Clone + Send + Sync,
        W: Fn(usize) -> R + Sync,
        F: Fn(R, R) -> R + Sync,
    {
        let killed = || self.check_kill_this_task();
        self.worker.delegate(|pool| {
            reduce_stealing(pool, lower, upper, &zero, &reduce, &killed, |acc, batch| {
                batch.fold(acc, |acc, v| reduce(acc, work(v)))
            })
        })?
    }

    /// [`OlapGraph::process_vertex_in_range`] summing the results.
    ///
    /// # Errors
    /// As [`OlapGraph::process_vertex_in_range`].
    pub fn process_vertex_in_range_sum<R, W>(&self, work: W, lower: usize, upper: usize) -> Result<R>
    where
        R: Zero + Add<Output = R> + Clone + Send + Sync,
        W: Fn(usize) -> R + Sync,
    {
        self.process_vertex_in_range(work, lower, upper, R::zero(), |a, b| a + b)
    }

    /// [`OlapGraph::process_vertex_in_range`] with an algorithm context handed to `work`.
    ///
    /// # Errors
    /// As [`OlapGraph::process_vertex_in_range`].
    pub fn process_vertex_in_range_with<A, R, W, F>(
        &self,
        work: W,
        algorithm: &A,
        lower: usize,
        upper: usize,
        zero: R,
        reduce: F,
    ) -> Result<R>
    where
        A: Sync + ?Sized,
        R: Clone + Send + Sync,
        W: Fn(&A, usize) -> R + Sync,
        F: Fn(R, R) -> R + Sync,
    {
        self.process_vertex_in_range(|v| work(algorithm, v), lower, upper, zero, reduce)
    }

    /// Applies `work` to every vertex in `active` exactly once and folds the results.
    ///
    /// Words of the bitset are the unit of stealing; empty words cost one load.
    ///
    /// # Errors
    /// As [`OlapGraph::process_vertex_in_range`].
    ///
    /// # Panics
    /// A panic inside `work` or `reduce` is resumed on the calling thread.
    pub fn process_vertex_active<R, W, F>(
        &self,
        work: W,
        active: &ParallelBitset,
        zero: R,
        reduce: F,
    ) -> Result<R>
    where
        R: Clone + Send + Sync,
        W: Fn(usize) -> R + Sync,
        F: Fn(R, R) -> R + Sync,
    {
        let words = active.words();
        let killed = || self.check_kill_this_task();
        self.worker.delegate(|pool| {
            reduce_stealing(pool, 0, active.size(), &zero, &reduce, &killed, |mut acc, batch| {
                debug_assert_eq!(batch.start % WORD_BITS, 0);
                let mut bits = words[batch.start / WORD_BITS].load(Ordering::Relaxed);
                while bits != 0 {
                    let v = batch.start + bits.trailing_zeros() as usize;
                    acc = reduce(acc, work(v));
                    bits &= bits - 1;
                }
                acc
            })
        })?
    }

    /// [`OlapGraph::process_vertex_active`] summing the results.
    ///
    /// # Errors
    /// As [`OlapGraph::process_vertex_in_range`].
    pub fn process_vertex_active_sum<R, W>(&self, work: W, active: &ParallelBitset) -> Result<R>
    where
        R: Zero + Add<Output = R> + Clone + Send + Sync,
        W: Fn(usize) -> R + Sync,
    {
        self.process_vertex_active(work, active, R::zero(), |a, b| a + b)
    }

    /// [`OlapGraph::process_vertex_active`] with an algorithm context handed to `work`.
    ///
    /// # Errors
    /// As [`OlapGraph::process_vertex_in_range`].
    pub fn process_vertex_active_with<A, R, W, F>(
        &self,
        work: W,
        algorithm: &A,
        active: &ParallelBitset,
        zero: R,
        reduce: F,
    ) -> Result<R>
    where
        A: Sync + ?Sized,
        R: Clone + Send + Sync,
        W: Fn(&A, usize) -> R + Sync,
        F: Fn(R, R) -> R + Sync,
    {
        self.process_vertex_active(|v| work(algorithm, v), active, zero, reduce)
    }
}
