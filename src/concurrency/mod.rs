//! Concurrency primitives for parallel graph computation.
//!
//! Parallelism never starts implicitly: every data-parallel loop in the crate runs
//! inside a region delegated to a [`Worker`], which owns the only compute pool.
//! Inside such a region, vertices are partitioned by the work-stealing scheduler in
//! [`steal`], and user code coordinates per-vertex updates with [`VertexLocks`].

pub mod atomic;
pub mod steal;
pub mod vertex_lock;
pub mod worker;

pub use atomic::ParallelBitset;
pub use vertex_lock::{VertexLockGuard, VertexLocks};
pub use worker::Worker;
