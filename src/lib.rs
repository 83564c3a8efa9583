//! # `halo-olap` - Parallel Graph Analytics Engine
//!
//! An in-memory engine for vertex-centric graph analytics (PageRank, WCC, SSSP,
//! Louvain, triangle counting, ...). The engine holds a static graph in compressed
//! sparse row (CSR) form and runs parallel computations over it; algorithms are
//! consumers of the API and live outside this crate.
//!
//! ## Layers
//!
//! 1. **Memory primitives** ([`alloc`]):
//!    - [`ParallelVector<T>`]: typed arrays backed by anonymous memory mappings,
//!      with lock-free atomic append through an [`Appender`].
//!
//! 2. **Concurrency primitives** ([`concurrency`]):
//!    - [`ParallelBitset`]: word-packed atomic frontier sets.
//!    - [`Worker`]: the single delegate thread every parallel region is routed through.
//!    - [`VertexLocks`]: one test-and-set spinlock per vertex, with RAII guards.
//!
//! 3. **Graph** ([`graph`]):
//!    - [`OlapGraph<E>`]: dual (out/in) CSR construction under three
//!      [`EdgeDirectionPolicy`] variants, plus the work-stealing traversal primitives
//!      `process_vertex_in_range` and `process_vertex_active`.
//!
//! ## Example
//!
//! ```rust
//! use halo_olap::{EdgeDirectionPolicy, EdgeUnit, Empty, OlapGraph};
//!
//! # fn main() -> halo_olap::Result<()> {
//! let edges: Vec<EdgeUnit<Empty>> = (0..4).map(|v| EdgeUnit::new(v, v + 1, Empty)).collect();
//!
//! let mut graph = OlapGraph::<Empty>::new()?;
//! graph.load_from_array(&edges, 5, EdgeDirectionPolicy::DualDirection)?;
//!
//! let total_degree: usize = graph.process_vertex_in_range_sum(|v| graph.out_degree(v), 0, 5)?;
//! assert_eq!(total_degree, graph.num_edges());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod alloc;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod graph;

pub use alloc::{Appender, ParallelVector, SyncSlots};
pub use concurrency::atomic::ParallelBitset;
pub use concurrency::vertex_lock::{VertexLockGuard, VertexLocks};
pub use concurrency::worker::Worker;
pub use config::EngineConfig;
pub use error::{OlapError, Result};
pub use graph::{
    AdjList, AdjUnit, EdgeData, EdgeDirectionPolicy, EdgeUnit, Empty, OlapGraph, TaskMonitor,
    MAX_NUM_EDGES,
};

// Compile-time layout checks for the types shared with edge importers.
const _: () = {
    use core::mem;

    // Unweighted graphs pay nothing for edge data.
    assert!(mem::size_of::<Empty>() == 0);
    assert!(mem::size_of::<AdjUnit<Empty>>() == mem::size_of::<usize>());

    // Edge records are packed: two u64 endpoints followed by the payload.
    assert!(mem::size_of::<EdgeUnit<Empty>>() == 16);
    assert!(mem::size_of::<EdgeUnit<f64>>() == 24);
    assert!(mem::size_of::<EdgeUnit<u32>>() == 20);
    assert!(mem::align_of::<EdgeUnit<f64>>() == 1);
};
