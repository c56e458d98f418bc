//! Result-merge engine for the shardflow kernel.
//!
//! Takes the per-unit result cursors of one fanned-out statement and
//! presents them as a single logical cursor:
//!   - strategy selection over the statement context (`engine`)
//!   - iterator, stream order-by, stream group-by and memory group-by
//!     merged results
//!   - aggregation units for re-merging partial COUNT/SUM/MIN/MAX/AVG
//!   - pagination decorators restoring the logical window

pub mod aggregation;
pub mod engine;
pub mod groupby_memory;
pub mod groupby_stream;
pub mod iterator;
pub mod merged;
pub mod orderby;
pub mod pagination;


pub use aggregation::AggregationUnit;
pub use engine::{merge, needs_materialization, select_kind, MergeKind};
pub use groupby_memory::GroupByMemoryMergedResult;
pub use groupby_stream::GroupByStreamMergedResult;
pub use iterator::IteratorMergedResult;
pub use merged::{MaterializedMergedResult, MergedResult};
pub use orderby::OrderByStreamMergedResult;
pub use pagination::{
    decorate, LimitDecoratorMergedResult, RowNumberDecoratorMergedResult,
    TopAndRowNumberDecoratorMergedResult,
};
