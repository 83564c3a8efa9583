//! Work-stealing partition of a vertex range.
//!
//! The range `[lower, upper)` is cut into one contiguous chunk per pool thread
//! (a multiple of [`BATCH`] each; the last chunk absorbs the remainder). Every thread
//! claims batches of 64 ids from its own chunk with `fetch_add`; once it is dry it
//! marks itself as stealing and claims from the other chunks round-robin. Because
//! each claim is a single atomic add on the victim's cursor, every id in the range
//! is handed out exactly once.

use core::{
    cmp,
    ops::Range,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use crossbeam_utils::CachePadded;
use rayon::ThreadPool;
use tracing::debug;

use crate::error::{OlapError, Result};

/// Number of ids claimed per atomic operation.
pub const BATCH: usize = 64;

struct Cursor {
    curr: AtomicUsize,
    end: usize,
    stealing: AtomicBool,
}

/// Per-thread cursors over a split vertex range.
pub(crate) struct Partition {
    cursors: Vec<CachePadded<Cursor>>,
}

impl Partition {
    pub(crate) fn new(lower: usize, upper: usize, threads: usize) -> Self {
        let threads = threads.max(1);
        let span = upper.saturating_sub(lower);
        let chunk = span / threads / BATCH * BATCH;
        let cursors = (0..threads)
            .map(|i| {
                let start = lower + i * chunk;
                let end = if i + 1 == threads { upper.max(start) } else { start + chunk };
                CachePadded::new(Cursor {
                    curr: AtomicUsize::new(start),
                    end,
                    stealing: AtomicBool::new(false),
                })
            })
            .collect();
        Self { cursors }
    }

    #[cfg(test)]
    pub(crate) fn chunk(&self, thread: usize) -> Range<usize> {
        let c = &self.cursors[thread];
        c.curr.load(Ordering::Relaxed)..c.end
    }

    fn threads(&self) -> usize {
        self.cursors.len()
    }

    /// Claims the next batch from `thread`'s chunk.
    #[inline]
    fn claim(&self, thread: usize) -> Option<Range<usize>> {
        let cursor = &self.cursors[thread];
        let start = cursor.curr.fetch_add(BATCH, Ordering::Relaxed);
        if start >= cursor.end {
            None
        } else {
            Some(start..cmp::min(start + BATCH, cursor.end))
        }
    }
}

/// Folds `batch` over every id of `[lower, upper)` on all threads of `pool`, then
/// combines the per-thread partials with `reduce`, starting from `zero`.
///
/// `killed` is polled before each batch; once it reports `true` every thread stops
/// claiming and the call returns [`OlapError::TaskKilled`]. It is polled once more
/// after the region, so a kill that arrives after the last batch is still reported.
pub(crate) fn reduce_stealing<R, F, K, B>(
    pool: &ThreadPool,
    lower: usize,
    upper: usize,
    zero: &R,
    reduce: &F,
    killed: &K,
    batch: B,
) -> Result<R>
where
    R: Clone + Send + Sync,
    F: Fn(R, R) -> R + Sync,
    K: Fn() -> bool + Sync,
    B: Fn(R, Range<usize>) -> R + Sync,
{
    let partition = Partition::new(lower, upper, pool.current_num_threads());
    let threads = partition.threads();
    let aborted = AtomicBool::new(false);

    let partials: Vec<R> = pool.broadcast(|ctx| {
        let me = ctx.index() % threads;
        let mut acc = zero.clone();
        'victims: for offset in 0..threads {
            let victim = (me + offset) % threads;
            if offset > 0 && partition.cursors[victim].stealing.load(Ordering::Relaxed) {
                continue;
            }
            while let Some(range) = partition.claim(victim) {
                if aborted.load(Ordering::Relaxed) || killed() {
                    aborted.store(true, Ordering::Relaxed);
                    break 'victims;
                }
                acc = batch(acc, range);
            }
            if offset == 0 {
                partition.cursors[me].stealing.store(true, Ordering::Relaxed);
            }
        }
        acc
    });

    if aborted.load(Ordering::Relaxed) || killed() {
        debug!(lower, upper, "parallel traversal killed");
        return Err(OlapError::TaskKilled);
    }
    Ok(partials
        .into_iter()
        .fold(zero.clone(), |acc, partial| reduce(acc, partial)))
}
