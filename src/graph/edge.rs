//! Edge records, adjacency entries and construction policies.

use core::{fmt, ops::Index, slice};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use zerocopy::{FromBytes, FromZeroes};

/// Largest edge list accepted by default.
pub const MAX_NUM_EDGES: usize = 1 << 36;

/// Edge payload for unweighted graphs. Occupies no memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, FromZeroes, FromBytes)]
#[repr(C)]
pub struct Empty;

/// Types usable as per-edge data.
pub trait EdgeData: Copy + Send + Sync + 'static {}

impl<T: Copy + Send + Sync + 'static> EdgeData for T {}

/// One input edge: `src -> dst` carrying `edge_data`.
///
/// The layout is packed so that a raw importer buffer of records can be viewed
/// in place: 8 bytes `src`, 8 bytes `dst`, then `size_of::<E>()` bytes of payload.
#[derive(FromZeroes, FromBytes)]
#[repr(C, packed)]
pub struct EdgeUnit<E> {
    /// Source vertex id.
    pub src: u64,
    /// Destination vertex id.
    pub dst: u64,
    /// Payload.
    pub edge_data: E,
}

impl<E> EdgeUnit<E> {
    /// Creates an edge record.
    pub const fn new(src: u64, dst: u64, edge_data: E) -> Self {
        Self { src, dst, edge_data }
    }

    /// Source vertex id.
    #[inline(always)]
    pub fn src(&self) -> u64 {
        self.src
    }

    /// Destination vertex id.
    #[inline(always)]
    pub fn dst(&self) -> u64 {
        self.dst
    }
}

impl<E: Copy> EdgeUnit<E> {
    /// Payload, by value (fields of a packed record cannot be borrowed).
    #[inline(always)]
    pub fn edge_data(&self) -> E {
        self.edge_data
    }
}

impl<E: Copy> Clone for EdgeUnit<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: Copy> Copy for EdgeUnit<E> {}

impl<E: Copy + fmt::Debug> fmt::Debug for EdgeUnit<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (src, dst, data) = (self.src, self.dst, self.edge_data);
        f.debug_struct("EdgeUnit")
            .field("src", &src)
            .field("dst", &dst)
            .field("edge_data", &data)
            .finish()
    }
}

/// One adjacency entry: the neighbour at the other end and the edge payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct AdjUnit<E> {
    /// Vertex at the other end of the edge.
    pub neighbour: usize,
    /// Payload.
    pub edge_data: E,
}

/// A contiguous run of adjacency entries of one vertex.
#[derive(Clone, Copy)]
pub struct AdjList<'a, E> {
    units: &'a [AdjUnit<E>],
}

impl<'a, E> AdjList<'a, E> {
    pub(crate) fn new(units: &'a [AdjUnit<E>]) -> Self {
        Self { units }
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns `true` for a vertex without edges in this direction.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Entries in stored order.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'a, AdjUnit<E>> {
        self.units.iter()
    }

    /// Neighbour ids in stored order.
    pub fn neighbours(&self) -> impl Iterator<Item = usize> + 'a {
        self.units.iter().map(|u| u.neighbour)
    }

    /// The underlying slice.
    #[inline]
    pub fn as_slice(&self) -> &'a [AdjUnit<E>] {
        self.units
    }
}

impl<E> Index<usize> for AdjList<'_, E> {
    type Output = AdjUnit<E>;

    fn index(&self, index: usize) -> &AdjUnit<E> {
        &self.units[index]
    }
}

impl<'a, E> IntoIterator for AdjList<'a, E> {
    type Item = &'a AdjUnit<E>;
    type IntoIter = slice::Iter<'a, AdjUnit<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}

impl<E: fmt::Debug> fmt::Debug for AdjList<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.units).finish()
    }
}

/// How the input edge list is turned into out/in adjacency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeDirectionPolicy {
    /// Keep edges as given; build both out- and in-adjacency.
    #[default]
    DualDirection,
    /// Insert every edge in both directions; out- and in-adjacency coincide.
    MakeSymmetric,
    /// The input already lists both directions; only out-adjacency is built.
    InputSymmetric,
}

impl EdgeDirectionPolicy {
    /// Returns `true` if in-adjacency is stored separately from out-adjacency.
    pub fn is_dual(self) -> bool {
        self == EdgeDirectionPolicy::DualDirection
    }
}

/// Cancellation source polled by parallel traversals.
pub trait TaskMonitor: Send + Sync {
    /// Returns `true` once the running task should stop.
    fn check_kill_this_task(&self) -> bool;
}

impl TaskMonitor for AtomicBool {
    fn check_kill_this_task(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}
