//! Memory primitives.
//!
//! - [`region`]: raw anonymous mappings (mmap / VirtualAlloc).
//! - [`parallel_vector`]: [`ParallelVector<T>`], the typed array every vertex and
//!   edge buffer in the engine is built on.

pub mod parallel_vector;
pub mod region;

pub use parallel_vector::{Appender, ParallelVector, SyncSlots};
pub use region::{align_up, PAGE_SIZE};
