//! Error type shared by the whole engine.
//!
//! Every failure is local and synchronous. Configuration and capacity errors signal
//! misuse of the API and have no retry semantics; [`OlapError::TaskKilled`] is the
//! one condition a task-tracking layer should treat as "aborted by request".

/// Errors produced by the graph engine and its primitives.
#[derive(thiserror::Error, Debug)]
pub enum OlapError {
    /// A buffer was constructed or reallocated with zero capacity.
    #[error("capacity cannot be 0")]
    InvalidCapacity,

    /// `realloc` was asked to shrink the backing storage.
    #[error("the new capacity {requested} is smaller than the current one ({current})")]
    CapacityShrink {
        /// Capacity before the call.
        current: usize,
        /// Requested capacity.
        requested: usize,
    },

    /// `resize` was asked to shrink the live element range.
    #[error("the new size {requested} is smaller than the current one ({current})")]
    SizeShrink {
        /// Length before the call.
        current: usize,
        /// Requested length.
        requested: usize,
    },

    /// An append or resize would exceed the reserved capacity.
    #[error("out of capacity: requested {requested} elements, capacity is {capacity}")]
    CapacityExceeded {
        /// Reserved capacity.
        capacity: usize,
        /// Length the operation would have produced.
        requested: usize,
    },

    /// The operating system refused to map the backing region.
    #[error("memory allocation of {bytes} bytes failed")]
    AllocationFailed {
        /// Size of the failed mapping in bytes.
        bytes: usize,
    },

    /// The vertex count was already fixed to a different value.
    #[error("|V| can only be set before loading (already {current}, requested {requested})")]
    VertexCountAlreadySet {
        /// Vertex count currently set.
        current: usize,
        /// Vertex count requested by the caller.
        requested: usize,
    },

    /// Construction was attempted with no vertices or no edges.
    #[error("cannot construct an empty graph (|V| = {vertices}, |E| = {edges})")]
    EmptyGraph {
        /// Vertex count given.
        vertices: usize,
        /// Edge count given.
        edges: usize,
    },

    /// The edge list is larger than the configured limit.
    #[error("{edges} edges exceed the limit of {max}")]
    TooManyEdges {
        /// Edge count given.
        edges: usize,
        /// Configured maximum.
        max: usize,
    },

    /// An edge endpoint is not a valid vertex id.
    #[error("vertex {vertex} is out of range for |V| = {num_vertices}")]
    VertexOutOfRange {
        /// Offending endpoint.
        vertex: u64,
        /// Vertex count of the graph.
        num_vertices: usize,
    },

    /// A raw edge buffer does not hold exactly the announced number of records.
    #[error("edge buffer holds {actual} bytes, expected {expected}")]
    EdgeBufferMismatch {
        /// Byte length implied by the edge count.
        expected: usize,
        /// Byte length received.
        actual: usize,
    },

    /// Two bitsets of different sizes were swapped.
    #[error("cannot swap bitsets of different sizes ({left} vs {right})")]
    BitsetSizeMismatch {
        /// Size of the receiver.
        left: usize,
        /// Size of the argument.
        right: usize,
    },

    /// The task monitor requested cancellation during a traversal.
    #[error("task killed")]
    TaskKilled,

    /// `Worker::delegate` was called from inside a delegated region.
    #[error("delegate cannot be nested inside a delegated region")]
    NestedDelegate,

    /// A configuration value is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A JSON configuration document could not be parsed.
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The fork-join pool could not be built.
    #[error("thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The delegate thread could not be spawned.
    #[error("spawn: {0}")]
    Spawn(#[from] std::io::Error),
}

impl OlapError {
    /// Returns `true` if this error reports a cancelled traversal rather than a failure.
    pub fn is_task_killed(&self) -> bool {
        matches!(self, OlapError::TaskKilled)
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, OlapError>;
