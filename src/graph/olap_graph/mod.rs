//! A static directed graph in CSR form, built once and traversed in parallel.
//!
//! Memory layout (per materialized direction):
//! - `degree`: `n` counters
//! - `index`: `n + 1` offsets; the adjacency of `v` is `edges[index[v]..index[v + 1]]`
//! - `edges`: `m` (or `2m` under [`EdgeDirectionPolicy::MakeSymmetric`]) [`AdjUnit`]s
//!
//! Under [`EdgeDirectionPolicy::DualDirection`] a second, incoming CSR is kept; under
//! the symmetric policies in-queries read the outgoing CSR.
//!
//! Adjacency lists are in construction order, which depends on thread scheduling.
//! Algorithms that need sorted neighbours sort them through
//! [`OlapGraph::out_edges_mut`] / [`OlapGraph::in_edges_mut`].

mod construct;
mod traversal;

#[cfg(test)]
mod tests;

use core::{
    mem,
    ops::Range,
    sync::atomic::{AtomicUsize, Ordering},
};
use std::{fmt, sync::Arc};

use tracing::info;

use crate::{
    alloc::ParallelVector,
    concurrency::{
        atomic::ParallelBitset,
        vertex_lock::{VertexLockGuard, VertexLocks},
        worker::Worker,
    },
    config::EngineConfig,
    error::{OlapError, Result},
    graph::edge::{AdjList, AdjUnit, EdgeData, EdgeDirectionPolicy, Empty, TaskMonitor},
};

/// One direction of adjacency in CSR form.
pub(crate) struct Csr<E> {
    pub(crate) degree: ParallelVector<AtomicUsize>,
    pub(crate) index: ParallelVector<AtomicUsize>,
    pub(crate) edges: ParallelVector<AdjUnit<E>>,
}

impl<E> Csr<E> {
    pub(crate) const fn empty() -> Self {
        Self {
            degree: ParallelVector::new(),
            index: ParallelVector::new(),
            edges: ParallelVector::new(),
        }
    }

    /// Zeroed degree/index arrays for `num_vertices` and room for `slots` entries.
    pub(crate) fn with_shape(num_vertices: usize, slots: usize) -> Result<Self> {
        Ok(Self {
            degree: ParallelVector::with_len(num_vertices, num_vertices)?,
            index: ParallelVector::with_len(num_vertices + 1, num_vertices + 1)?,
            edges: ParallelVector::with_capacity(slots)?,
        })
    }

    #[inline]
    fn degree(&self, v: usize) -> usize {
        self.degree[v].load(Ordering::Relaxed)
    }

    #[inline]
    fn range(&self, v: usize) -> Range<usize> {
        self.index[v].load(Ordering::Relaxed)..self.index[v + 1].load(Ordering::Relaxed)
    }

    #[inline]
    fn adj(&self, v: usize) -> &[AdjUnit<E>] {
        &self.edges.as_slice()[self.range(v)]
    }

    #[inline]
    fn adj_mut(&mut self, v: usize) -> &mut [AdjUnit<E>] {
        let range = self.range(v);
        &mut self.edges.as_mut_slice()[range]
    }
}

/// A static graph with per-vertex locks and work-stealing traversal.
///
/// ### Performance Characteristics
/// | Operation | Complexity | Notes |
/// |-----------|------------|-------|
/// | `load_from_array` | \(O((n + m) / p + n)\) | two parallel passes over the edges, sequential prefix sum |
/// | `out_degree` / `in_degree` | \(O(1)\) | |
/// | `out_edges` / `in_edges` | \(O(1)\) | borrowed slice of the adjacency buffer |
/// | `transpose` | \(O(1)\) | swaps buffer handles |
/// | `process_vertex_in_range` | \(O((upper - lower) / p)\) | plus stealing overhead |
/// | `process_vertex_active` | \(O(n / 64p + \lvert S \rvert / p)\) | cost follows words touched, not ids |
pub struct OlapGraph<E: EdgeData = Empty> {
    num_vertices: usize,
    num_edges: usize,
    policy: EdgeDirectionPolicy,
    out: Csr<E>,
    inc: Csr<E>,
    locks: VertexLocks,
    worker: Arc<Worker>,
    max_num_edges: usize,
    monitor: Option<Arc<dyn TaskMonitor>>,
}

impl<E: EdgeData> OlapGraph<E> {
    /// Creates an empty graph that runs its parallel regions on the shared worker.
    ///
    /// # Errors
    /// Errors starting the shared worker.
    pub fn new() -> Result<Self> {
        Ok(Self::with_worker(Worker::shared()?))
    }

    /// Creates an empty graph with its own worker built from `config`.
    ///
    /// # Errors
    /// As [`Worker::new`].
    pub fn with_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self::with_worker(Arc::new(Worker::new(config)?)))
    }

    /// Creates an empty graph that runs its parallel regions on `worker`.
    pub fn with_worker(worker: Arc<Worker>) -> Self {
        let max_num_edges = worker.config().max_num_edges;
        Self {
            num_vertices: 0,
            num_edges: 0,
            policy: EdgeDirectionPolicy::default(),
            out: Csr::empty(),
            inc: Csr::empty(),
            locks: VertexLocks::empty(),
            worker,
            max_num_edges,
            monitor: None,
        }
    }

    /// Fixes the vertex count. Allowed while unset, or again with the same value.
    ///
    /// # Errors
    /// [`OlapError::VertexCountAlreadySet`] if a different count was already set.
    pub fn set_num_vertices(&mut self, num_vertices: usize) -> Result<()> {
        if self.num_vertices != 0 && self.num_vertices != num_vertices {
            return Err(OlapError::VertexCountAlreadySet {
                current: self.num_vertices,
                requested: num_vertices,
            });
        }
        if self.num_vertices != num_vertices {
            info!("set |V| to {num_vertices}");
        }
        self.num_vertices = num_vertices;
        Ok(())
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    /// Number of stored edges (twice the input under [`EdgeDirectionPolicy::MakeSymmetric`]).
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// The policy used by the last load.
    #[inline]
    pub fn edge_direction_policy(&self) -> EdgeDirectionPolicy {
        self.policy
    }

    /// Bytes of payload per edge; 0 for [`Empty`].
    #[inline]
    pub fn edge_data_size(&self) -> usize {
        mem::size_of::<E>()
    }

    /// The worker this graph delegates to.
    pub fn worker(&self) -> &Arc<Worker> {
        &self.worker
    }

    fn incoming(&self) -> &Csr<E> {
        if self.policy.is_dual() {
            &self.inc
        } else {
            &self.out
        }
    }

    /// Out-degree of `v`.
    ///
    /// # Panics
    /// Panics if `v >= num_vertices()` or the graph is not loaded.
    #[inline]
    pub fn out_degree(&self, v: usize) -> usize {
        self.out.degree(v)
    }

    /// In-degree of `v`; equals the out-degree under the symmetric policies.
    ///
    /// # Panics
    /// Panics if `v >= num_vertices()` or the graph is not loaded.
    #[inline]
    pub fn in_degree(&self, v: usize) -> usize {
        self.incoming().degree(v)
    }

    /// Outgoing adjacency of `v`.
    ///
    /// # Panics
    /// Panics if `v >= num_vertices()` or the graph is not loaded.
    #[inline]
    pub fn out_edges(&self, v: usize) -> AdjList<'_, E> {
        AdjList::new(self.out.adj(v))
    }

    /// Incoming adjacency of `v`; the outgoing adjacency under the symmetric policies.
    ///
    /// # Panics
    /// Panics if `v >= num_vertices()` or the graph is not loaded.
    #[inline]
    pub fn in_edges(&self, v: usize) -> AdjList<'_, E> {
        AdjList::new(self.incoming().adj(v))
    }

    /// Mutable outgoing adjacency of `v`, e.g. for sorting by neighbour.
    ///
    /// # Panics
    /// Panics if `v >= num_vertices()` or the graph is not loaded.
    pub fn out_edges_mut(&mut self, v: usize) -> &mut [AdjUnit<E>] {
        self.out.adj_mut(v)
    }

    /// Mutable incoming adjacency of `v`; the outgoing adjacency under the symmetric policies.
    ///
    /// # Panics
    /// Panics if `v >= num_vertices()` or the graph is not loaded.
    pub fn in_edges_mut(&mut self, v: usize) -> &mut [AdjUnit<E>] {
        if self.policy.is_dual() {
            self.inc.adj_mut(v)
        } else {
            self.out.adj_mut(v)
        }
    }

    /// Swaps outgoing and incoming adjacency in O(1).
    ///
    /// A no-op unless the graph was loaded with [`EdgeDirectionPolicy::DualDirection`].
    pub fn transpose(&mut self) {
        if self.policy.is_dual() {
            mem::swap(&mut self.out, &mut self.inc);
        }
    }

    /// A default-initialized array with one slot per vertex.
    ///
    /// # Errors
    /// [`OlapError::InvalidCapacity`] before the vertex count is set, or allocation errors.
    pub fn alloc_vertex_array<T: Default>(&self) -> Result<ParallelVector<T>> {
        ParallelVector::with_len(self.num_vertices, self.num_vertices)
    }

    /// An empty vertex subset sized to the graph, bound to the graph's worker.
    ///
    /// # Errors
    /// Allocation errors.
    pub fn alloc_vertex_subset(&self) -> Result<ParallelBitset> {
        ParallelBitset::with_worker(self.num_vertices, Arc::clone(&self.worker))
    }

    /// Spins until the lock of `v` is held.
    ///
    /// # Panics
    /// Panics if `v >= num_vertices()` or the graph is not loaded.
    #[inline]
    pub fn acquire_vertex_lock(&self, v: usize) {
        self.locks.acquire(v);
    }

    /// Releases the lock of `v`.
    ///
    /// # Panics
    /// Panics if `v >= num_vertices()` or the graph is not loaded.
    #[inline]
    pub fn release_vertex_lock(&self, v: usize) {
        self.locks.release(v);
    }

    /// Locks `v` until the returned guard is dropped.
    ///
    /// # Panics
    /// Panics if `v >= num_vertices()` or the graph is not loaded.
    #[inline]
    pub fn guard_vertex_lock(&self, v: usize) -> VertexLockGuard<'_> {
        self.locks.guard(v)
    }

    /// Installs the cancellation source polled by the traversal primitives.
    pub fn set_task_monitor(&mut self, monitor: Arc<dyn TaskMonitor>) {
        self.monitor = Some(monitor);
    }

    /// Removes the cancellation source.
    pub fn clear_task_monitor(&mut self) {
        self.monitor = None;
    }

    /// Returns `true` if the installed monitor asks the running task to stop.
    #[inline]
    pub fn check_kill_this_task(&self) -> bool {
        self.monitor
            .as_ref()
            .is_some_and(|m| m.check_kill_this_task())
    }

    /// Sparse/dense frontier heuristic: `true` when the active vertices' out-degrees
    /// sum to less than 1/20 of all edges.
    ///
    /// # Errors
    /// As [`OlapGraph::process_vertex_active`].
    pub fn if_sparse(&self, active: &ParallelBitset) -> Result<bool> {
        let active_edges: usize = self.process_vertex_active_sum(|v| self.out_degree(v), active)?;
        Ok(active_edges < self.num_edges / 20)
    }
}

impl<E: EdgeData> fmt::Debug for OlapGraph<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OlapGraph")
            .field("num_vertices", &self.num_vertices)
            .field("num_edges", &self.num_edges)
            .field("policy", &self.policy)
            .field("edge_data_size", &self.edge_data_size())
            .finish_non_exhaustive()
    }
}
