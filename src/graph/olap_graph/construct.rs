//! Parallel two-pass CSR construction.
//!
//! 1. Degree pass: one atomic increment per edge endpoint.
//! 2. Prefix sum: `index[v]` becomes the first slot of `v`.
//! 3. Slot pass: each edge claims a slot with `fetch_add` on `index[src]`, which
//!    leaves `index[v]` pointing one past the last slot of `v`.
//! 4. Shift: `index` moves right by one and `index[0] = 0`, restoring the offsets.

use core::{
    mem,
    sync::atomic::{AtomicUsize, Ordering},
};
use std::{sync::Arc, time::Instant};

use rayon::prelude::*;
use tracing::{info, instrument};
use zerocopy::FromBytes;

use super::{Csr, OlapGraph};
use crate::{
    alloc::{ParallelVector, SyncSlots},
    concurrency::vertex_lock::VertexLocks,
    error::{OlapError, Result},
    graph::edge::{AdjUnit, EdgeData, EdgeDirectionPolicy, EdgeUnit},
};

/// Vertex id as an index. Ids are checked against |V| before any pass uses them.
#[inline(always)]
#[allow(clippy::cast_possible_truncation)]
fn vid(id: u64) -> usize {
    id as usize
}

impl<E: EdgeData> OlapGraph<E> {
    /// Builds the graph from an edge list over `num_vertices` vertices.
    ///
    /// The vertex count is set by this call if it was unset; loading again with the
    /// same count replaces the previous edges.
    ///
    /// # Errors
    /// - [`OlapError::EmptyGraph`] if `num_vertices` or `edges` is empty
    /// - [`OlapError::TooManyEdges`] if `edges` exceeds the configured limit
    /// - [`OlapError::VertexOutOfRange`] if an endpoint is `>= num_vertices`
    /// - [`OlapError::VertexCountAlreadySet`] if a different count was set before
    /// - allocation errors, or [`OlapError::NestedDelegate`] when called from a delegated region
    #[instrument(level = "debug", skip(self, edges), fields(num_edges = edges.len()))]
    pub fn load_from_array(
        &mut self,
        edges: &[EdgeUnit<E>],
        num_vertices: usize,
        policy: EdgeDirectionPolicy,
    ) -> Result<()> {
        let num_edges = edges.len();
        if num_vertices == 0 || num_edges == 0 {
            return Err(OlapError::EmptyGraph {
                vertices: num_vertices,
                edges: num_edges,
            });
        }
        if num_edges > self.max_num_edges {
            return Err(OlapError::TooManyEdges {
                edges: num_edges,
                max: self.max_num_edges,
            });
        }
        if self.num_vertices != 0 && self.num_vertices != num_vertices {
            return Err(OlapError::VertexCountAlreadySet {
                current: self.num_vertices,
                requested: num_vertices,
            });
        }

        let started = Instant::now();
        let worker = Arc::clone(&self.worker);

        let limit = num_vertices as u64;
        let out_of_range = worker.delegate(|pool| {
            pool.install(|| {
                edges
                    .par_iter()
                    .find_map_any(|e| [e.src(), e.dst()].into_iter().find(|&id| id >= limit))
            })
        })?;
        if let Some(vertex) = out_of_range {
            return Err(OlapError::VertexOutOfRange {
                vertex,
                num_vertices,
            });
        }

        self.set_num_vertices(num_vertices)?;
        self.locks = VertexLocks::new(num_vertices)?;

        let slots = match policy {
            EdgeDirectionPolicy::MakeSymmetric => num_edges * 2,
            EdgeDirectionPolicy::DualDirection | EdgeDirectionPolicy::InputSymmetric => num_edges,
        };
        let mut out = Csr::with_shape(num_vertices, slots)?;
        let mut inc = if policy.is_dual() {
            Csr::with_shape(num_vertices, num_edges)?
        } else {
            Csr::empty()
        };

        {
            let (out, inc) = (&mut out, &mut inc);
            worker.delegate(move |pool| pool.install(move || build(edges, policy, out, inc)))?;
        }

        self.out = out;
        self.inc = inc;
        self.num_edges = slots;
        self.policy = policy;

        info!(
            vertices = num_vertices,
            edges = slots,
            ?policy,
            elapsed = ?started.elapsed(),
            "CSR preprocessing finished"
        );
        Ok(())
    }

    /// Builds the graph from a raw buffer of `num_edges` packed [`EdgeUnit<E>`] records.
    ///
    /// # Errors
    /// [`OlapError::EdgeBufferMismatch`] if `bytes` is not exactly `num_edges` records,
    /// plus everything [`OlapGraph::load_from_array`] reports.
    pub fn load_from_bytes(
        &mut self,
        bytes: &[u8],
        num_vertices: usize,
        num_edges: usize,
        policy: EdgeDirectionPolicy,
    ) -> Result<()>
    where
        E: FromBytes,
    {
        let expected = num_edges.saturating_mul(mem::size_of::<EdgeUnit<E>>());
        let mismatch = OlapError::EdgeBufferMismatch {
            expected,
            actual: bytes.len(),
        };
        if bytes.len() != expected {
            return Err(mismatch);
        }
        let edges = EdgeUnit::<E>::slice_from(bytes).ok_or(mismatch)?;
        self.load_from_array(edges, num_vertices, policy)
    }

    /// Largest endpoint id in `edges`, or `None` for an empty list.
    ///
    /// Used to size graphs whose input does not state a vertex count
    /// (`num_vertices = max + 1`).
    ///
    /// # Errors
    /// [`OlapError::NestedDelegate`] when called from a delegated region.
    pub fn max_vertex_id(&self, edges: &[EdgeUnit<E>]) -> Result<Option<u64>> {
        self.worker.delegate(|pool| {
            pool.install(|| edges.par_iter().map(|e| e.src().max(e.dst())).max())
        })
    }
}

/// Runs the degree, prefix, slot and shift phases. Must run inside the worker's pool.
fn build<E: EdgeData>(
    edges: &[EdgeUnit<E>],
    policy: EdgeDirectionPolicy,
    out: &mut Csr<E>,
    inc: &mut Csr<E>,
) {
    edges.par_iter().for_each(|e| {
        let (src, dst) = (vid(e.src()), vid(e.dst()));
        match policy {
            EdgeDirectionPolicy::DualDirection => {
                out.degree[src].fetch_add(1, Ordering::Relaxed);
                inc.degree[dst].fetch_add(1, Ordering::Relaxed);
            }
            EdgeDirectionPolicy::MakeSymmetric => {
                out.degree[src].fetch_add(1, Ordering::Relaxed);
                out.degree[dst].fetch_add(1, Ordering::Relaxed);
            }
            EdgeDirectionPolicy::InputSymmetric => {
                out.degree[src].fetch_add(1, Ordering::Relaxed);
            }
        }
    });

    prefix_sum(&mut out.degree, &mut out.index);
    if policy.is_dual() {
        prefix_sum(&mut inc.degree, &mut inc.index);
    }

    {
        let (out_index, out_slots) = (&out.index, out.edges.as_sync_slots());
        let (in_index, in_slots) = (&inc.index, inc.edges.as_sync_slots());
        edges.par_iter().for_each(|e| {
            let (src, dst, data) = (vid(e.src()), vid(e.dst()), e.edge_data());
            match policy {
                EdgeDirectionPolicy::DualDirection => {
                    place(out_index, &out_slots, src, dst, data);
                    place(in_index, &in_slots, dst, src, data);
                }
                EdgeDirectionPolicy::MakeSymmetric => {
                    place(out_index, &out_slots, src, dst, data);
                    place(out_index, &out_slots, dst, src, data);
                }
                EdgeDirectionPolicy::InputSymmetric => {
                    place(out_index, &out_slots, src, dst, data);
                }
            }
        });
    }

    finish(out);
    if policy.is_dual() {
        finish(inc);
    }
}

/// Claims the next slot of `from` and writes the entry `from -> to` into it.
#[inline(always)]
fn place<E>(
    index: &ParallelVector<AtomicUsize>,
    slots: &SyncSlots<'_, AdjUnit<E>>,
    from: usize,
    to: usize,
    edge_data: E,
) {
    let slot = index[from].fetch_add(1, Ordering::Relaxed);
    // SAFETY: `fetch_add` hands out each slot of `from`'s range once, and the
    // ranges of all vertices tile `[0, capacity)` (degrees were counted from the same edges).
    unsafe {
        slots.write(
            slot,
            AdjUnit {
                neighbour: to,
                edge_data,
            },
        );
    }
}

/// `index[v] = degree[0] + .. + degree[v - 1]` for `v < n`.
fn prefix_sum(degree: &mut ParallelVector<AtomicUsize>, index: &mut ParallelVector<AtomicUsize>) {
    let mut offset = 0;
    for (d, i) in degree.iter_mut().zip(index.iter_mut()) {
        *i.get_mut() = offset;
        offset += *d.get_mut();
    }
}

/// Shifts the post-claim cursors right by one so that `index[v]..index[v + 1]` is
/// the range of `v`, and marks every claimed slot live.
fn finish<E>(csr: &mut Csr<E>) {
    let index = csr.index.as_mut_slice();
    for v in (1..index.len()).rev() {
        let end_of_prev = *index[v - 1].get_mut();
        *index[v].get_mut() = end_of_prev;
    }
    if let Some(first) = index.first_mut() {
        *first.get_mut() = 0;
    }
    let total = index.last_mut().map_or(0, |last| *last.get_mut());
    debug_assert_eq!(total, csr.edges.capacity());
    // SAFETY: the slot pass wrote every entry in `[0, total)`.
    unsafe { csr.edges.set_len(total) };
}
