//! Merge strategy selection and entry point.
//!
//! Strategy is a pure function of the statement context and the number
//! of routed units, decided before any unit executes so routing can pick
//! streaming or buffered fetch per unit up front.

use shardflow_common::error::FlowResult;
use shardflow_common::result::QueryResult;
use shardflow_common::statement::StatementContext;
use tracing::debug;

use crate::groupby_memory::GroupByMemoryMergedResult;
use crate::groupby_stream::GroupByStreamMergedResult;
use crate::iterator::IteratorMergedResult;
use crate::merged::MergedResult;
use crate::orderby::OrderByStreamMergedResult;
use crate::pagination::decorate;

/// The closed set of merge strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    Iterator,
    StreamOrderBy,
    StreamGroupBy,
    MemoryGroupBy,
}

/// Pick the strategy for a statement routed to `input_count` units.
///
/// A single unit always merges with the pass-through iterator: its SQL
/// went out unrewritten, so grouping, ordering and pagination were
/// already applied exactly by the backend.
pub fn select_kind(context: &StatementContext, input_count: usize) -> MergeKind {
    if input_count <= 1 {
        return MergeKind::Iterator;
    }
    if !context.group_by.is_empty() {
        if context.group_by_is_order_by_prefix() {
            MergeKind::StreamGroupBy
        } else {
            MergeKind::MemoryGroupBy
        }
    } else if context.has_aggregation() {
        // Aggregation without GROUP BY: one implicit group, merged in
        // memory.
        MergeKind::MemoryGroupBy
    } else if !context.order_by.is_empty() {
        MergeKind::StreamOrderBy
    } else {
        MergeKind::Iterator
    }
}

/// True when every unit result must be buffered before merging, either
/// because routing demanded it or because the strategy drains all inputs
/// in one pass anyway.
pub fn needs_materialization(context: &StatementContext, input_count: usize) -> bool {
    context.force_materialization
        || select_kind(context, input_count) == MergeKind::MemoryGroupBy
}

/// Merge the per-unit results of one statement into a single cursor,
/// applying the pagination window when the statement carries one.
pub fn merge(
    context: &StatementContext,
    results: Vec<Box<dyn QueryResult>>,
) -> FlowResult<Box<dyn MergedResult>> {
    let single_unit = results.len() <= 1;
    let kind = select_kind(context, results.len());
    debug!(?kind, inputs = results.len(), "merging unit results");
    let merged: Box<dyn MergedResult> = match kind {
        MergeKind::Iterator => Box::new(IteratorMergedResult::new(results)),
        MergeKind::StreamOrderBy => Box::new(OrderByStreamMergedResult::new(
            context.order_by.clone(),
            results,
        )?),
        MergeKind::StreamGroupBy => Box::new(GroupByStreamMergedResult::new(context, results)?),
        MergeKind::MemoryGroupBy => Box::new(GroupByMemoryMergedResult::new(context, results)?),
    };
    if single_unit {
        // The backend already applied the window; decorating again
        // would apply it twice.
        return Ok(merged);
    }
    match &context.pagination {
        Some(spec) => {
            let resolved = spec.resolve(&context.parameters)?;
            if resolved.is_noop() {
                Ok(merged)
            } else {
                decorate(spec.kind, merged, resolved)
            }
        }
        None => Ok(merged),
    }
}
