//! Lock-free atomic structures shared by parallel traversals.

/// Word-packed atomic vertex subsets.
pub mod bitset;

pub use bitset::{ParallelBitset, WORD_BITS};
