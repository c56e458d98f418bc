//! Shared leaf crate of the shardflow kernel: scalar values, rows,
//! result cursors, statement context and the error taxonomy.
//!
//! Nothing here talks to a database — these are the types routing hands
//! the kernel and the contracts the kernel exposes back to callers.

pub mod datum;
pub mod error;
pub mod result;
pub mod statement;
pub mod unit;

#[cfg(test)]
mod tests;

pub use datum::{
    cmp_datum, compare_datums, datum_add, decimal_to_string, encode_datum_key, DataType, Datum,
    OwnedRow,
};
pub use error::{ExecutionError, FlowResult, MergeError, PaginationError, ShardFlowError};
pub use result::{materialize, Column, MemoryQueryResult, QueryResult};
pub use statement::{
    compare_by_items, AggregationType, AvgDerived, OrderByItem, OrderDirection, PaginationKind,
    PaginationSpec, PaginationValue, Projection, ResolvedPagination, StatementContext,
};
pub use unit::{BatchRouteUnit, ExecutionUnit, TargetId};
