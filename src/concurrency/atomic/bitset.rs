//! Word-packed atomic vertex subsets.
//!
//! This is the frontier representation used by `process_vertex_active`: one bit per
//! vertex, 64 per word, set concurrently with `fetch_or`.

use core::sync::atomic::{AtomicU64, Ordering};
use std::{fmt, sync::Arc};

use rayon::prelude::*;

use crate::{
    alloc::ParallelVector,
    concurrency::worker::Worker,
    error::{OlapError, Result},
};

/// Bits per storage word.
pub const WORD_BITS: usize = u64::BITS as usize;

/// A fixed-size set of vertex ids backed by atomic 64-bit words.
///
/// Storage holds `ceil(size / 64) + 1` words. Bits at positions `>= size` are always zero.
pub struct ParallelBitset {
    size: usize,
    words: ParallelVector<AtomicU64>,
    worker: Arc<Worker>,
}

impl ParallelBitset {
    /// Creates an empty set over `[0, size)` that clears and fills through the shared worker.
    ///
    /// # Errors
    /// Allocation errors, or errors starting the shared worker.
    pub fn new(size: usize) -> Result<Self> {
        Self::with_worker(size, Worker::shared()?)
    }

    /// Creates an empty set over `[0, size)` using `worker` for bulk operations.
    ///
    /// # Errors
    /// [`OlapError::AllocationFailed`] if the word array cannot be mapped.
    pub fn with_worker(size: usize, worker: Arc<Worker>) -> Result<Self> {
        let len = size.div_ceil(WORD_BITS) + 1;
        let words = ParallelVector::with_len(len, len)?;
        Ok(Self { size, words, worker })
    }

    /// Number of addressable bits.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// The storage words; bit `i` lives in word `i / 64` at position `i % 64`.
    #[inline]
    pub fn words(&self) -> &[AtomicU64] {
        self.words.as_slice()
    }

    /// Returns whether `i` is in the set.
    ///
    /// # Panics
    /// Panics if `i >= size()`.
    #[inline]
    pub fn has(&self, i: usize) -> bool {
        assert!(i < self.size, "bit {i} out of range for size {}", self.size);
        let (word, mask) = bit_word_mask(i);
        self.words[word].load(Ordering::Relaxed) & mask != 0
    }

    /// Inserts `i`, returning `true` iff this call changed the bit from 0 to 1.
    ///
    /// When many threads add the same bit concurrently, exactly one of them sees `true`.
    ///
    /// # Panics
    /// Panics if `i >= size()`.
    #[inline]
    pub fn add(&self, i: usize) -> bool {
        assert!(i < self.size, "bit {i} out of range for size {}", self.size);
        let (word, mask) = bit_word_mask(i);
        self.words[word].fetch_or(mask, Ordering::AcqRel) & mask == 0
    }

    /// Number of bits set.
    pub fn count(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    /// Removes every element, in parallel.
    ///
    /// # Errors
    /// [`OlapError::NestedDelegate`] when called from inside a delegated region.
    pub fn clear(&mut self) -> Result<()> {
        let words = self.words.as_mut_slice();
        self.worker.delegate(move |pool| {
            pool.install(|| words.par_iter_mut().for_each(|w| *w.get_mut() = 0));
        })
    }

    /// Inserts every id in `[0, size)`, in parallel.
    ///
    /// # Errors
    /// [`OlapError::NestedDelegate`] when called from inside a delegated region.
    pub fn fill(&mut self) -> Result<()> {
        let full = self.size / WORD_BITS;
        let tail = tail_mask(self.size);
        let words = self.words.as_mut_slice();
        self.worker.delegate(move |pool| {
            pool.install(|| {
                words.par_iter_mut().enumerate().for_each(|(i, w)| {
                    *w.get_mut() = match i.cmp(&full) {
                        core::cmp::Ordering::Less => u64::MAX,
                        core::cmp::Ordering::Equal => tail,
                        core::cmp::Ordering::Greater => 0,
                    };
                });
            });
        })
    }

    /// Exchanges contents with `other` in O(1).
    ///
    /// # Errors
    /// [`OlapError::BitsetSizeMismatch`] if the sizes differ; neither set changes.
    pub fn swap(&mut self, other: &mut ParallelBitset) -> Result<()> {
        if self.size != other.size {
            return Err(OlapError::BitsetSizeMismatch {
                left: self.size,
                right: other.size,
            });
        }
        self.words.swap(&mut other.words);
        Ok(())
    }
}

impl fmt::Debug for ParallelBitset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelBitset")
            .field("size", &self.size)
            .field("count", &self.count())
            .finish()
    }
}

#[inline(always)]
fn bit_word_mask(bit: usize) -> (usize, u64) {
    (bit / WORD_BITS, 1u64 << (bit % WORD_BITS))
}

/// Mask of the valid bits in word `size / 64`.
#[inline]
fn tail_mask(size: usize) -> u64 {
    let rem = size % WORD_BITS;
    if rem == 0 {
        0
    } else {
        (1u64 << rem) - 1
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::config::EngineConfig;

    fn worker() -> Arc<Worker> {
        Arc::new(Worker::new(&EngineConfig::default().with_threads(3)).unwrap())
    }

    #[test]
    fn add_reports_the_first_insertion() {
        let set = ParallelBitset::with_worker(100, worker()).unwrap();
        assert!(!set.has(63));
        assert!(set.add(63));
        assert!(!set.add(63));
        assert!(set.has(63));
        assert!(!set.has(64));
        assert_eq!(set.count(), 1);
    }

    #[test]
    fn word_count_includes_the_spare_word() {
        assert_eq!(ParallelBitset::with_worker(0, worker()).unwrap().words().len(), 1);
        assert_eq!(ParallelBitset::with_worker(64, worker()).unwrap().words().len(), 2);
        assert_eq!(ParallelBitset::with_worker(65, worker()).unwrap().words().len(), 3);
    }

    #[test]
    fn fill_sets_exactly_the_valid_bits() {
        for size in [1, 63, 64, 65, 130, 1000] {
            let mut set = ParallelBitset::with_worker(size, worker()).unwrap();
            set.fill().unwrap();
            assert_eq!(set.count(), size, "size {size}");
            assert!((0..size).all(|i| set.has(i)));
            set.clear().unwrap();
            assert_eq!(set.count(), 0);
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn has_checks_bounds() {
        let set = ParallelBitset::with_worker(10, worker()).unwrap();
        set.has(10);
    }

    #[test]
    fn swap_requires_equal_sizes() {
        let w = worker();
        let mut a = ParallelBitset::with_worker(10, Arc::clone(&w)).unwrap();
        let mut b = ParallelBitset::with_worker(10, Arc::clone(&w)).unwrap();
        let mut c = ParallelBitset::with_worker(11, w).unwrap();
        a.add(3);
        b.add(7);
        a.swap(&mut b).unwrap();
        assert!(a.has(7) && !a.has(3));
        assert!(b.has(3) && !b.has(7));
        assert!(matches!(
            a.swap(&mut c),
            Err(OlapError::BitsetSizeMismatch { left: 10, right: 11 })
        ));
        assert!(a.has(7));
    }

    #[test]
    fn concurrent_adds_have_one_winner_per_bit() {
        let set = ParallelBitset::with_worker(256, worker()).unwrap();
        let wins: usize = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| (0..256).filter(|&i| set.add(i)).count()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });
        assert_eq!(wins, 256);
        assert_eq!(set.count(), 256);
    }
}
