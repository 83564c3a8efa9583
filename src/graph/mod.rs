//! Static directed graphs for parallel analytics.
//!
//! - [`edge`]: input records ([`EdgeUnit`]), adjacency entries ([`AdjUnit`], [`AdjList`])
//!   and the [`EdgeDirectionPolicy`] that decides which adjacency is materialized.
//! - [`olap_graph`]: the CSR graph itself, its parallel construction and the
//!   work-stealing traversal primitives.

pub mod edge;
pub mod olap_graph;

pub use edge::{
    AdjList, AdjUnit, EdgeData, EdgeDirectionPolicy, EdgeUnit, Empty, TaskMonitor, MAX_NUM_EDGES,
};
pub use olap_graph::OlapGraph;
