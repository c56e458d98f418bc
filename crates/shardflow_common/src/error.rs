use thiserror::Error;

use crate::unit::TargetId;

/// Convenience alias for `Result<T, ShardFlowError>`.
pub type FlowResult<T> = Result<T, ShardFlowError>;

/// Top-level error type that all layer-specific errors convert into.
#[derive(Error, Debug)]
pub enum ShardFlowError {
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("Pagination error: {0}")]
    Pagination(#[from] PaginationError),

    /// Should never occur — indicates a kernel bug, not bad input.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Per-unit statement execution errors.
///
/// Under the collect policy these stay attached to their unit slot;
/// under fail-fast the first one (in unit order) governs the group.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Unit execution failed on {target}: {message}")]
    UnitFailed { target: TargetId, message: String },

    #[error("Execution callback panicked on {target}")]
    WorkerPanicked { target: TargetId },

    #[error("Batch result shape mismatch on {target}: {detail}")]
    BatchResultShape { target: TargetId, detail: String },
}

/// Result-merge errors. `UnsortedInput` is a routing/rewrite bug:
/// a streaming strategy was selected for input that was not pre-sorted.
/// It must surface, never degrade into a wrong answer.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Input stream {unit_index} is not sorted by the merge key")]
    UnsortedInput { unit_index: usize },

    #[error("Column index {index} out of bounds (row width {width})")]
    ColumnOutOfBounds { index: usize, width: usize },

    #[error("Cursor is not positioned on a row")]
    NoCurrentRow,

    #[error("{func} aggregation requires derived count/sum columns")]
    MissingDerivedColumns { func: &'static str },
}

/// Pagination argument errors, rejected before any unit executes.
#[derive(Error, Debug)]
pub enum PaginationError {
    #[error("Negative pagination offset: {0}")]
    NegativeOffset(i64),

    #[error("Negative pagination row count: {0}")]
    NegativeRowCount(i64),

    #[error("Pagination parameter {index} is missing or not an integer")]
    UnresolvedParameter { index: usize },
}
