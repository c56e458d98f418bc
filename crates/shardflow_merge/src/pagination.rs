//! Pagination decorators: wrap any merged result with the skip/bound
//! window of the logical statement.
//!
//! Units execute with rewritten (widened) pagination so every logically
//! visible row reaches the merge; the decorator restores the logical
//! window on the merged stream. One decorator per dialect encoding, all
//! sharing the same bounded-cursor core; the split mirrors how the
//! rewriter differs per dialect, not a behavioral difference here.

use shardflow_common::datum::Datum;
use shardflow_common::error::FlowResult;
use shardflow_common::statement::{PaginationKind, ResolvedPagination};

use crate::merged::MergedResult;

struct BoundedCursor {
    inner: Box<dyn MergedResult>,
    row_count: Option<u64>,
    emitted: u64,
    exhausted: bool,
}

impl BoundedCursor {
    fn new(mut inner: Box<dyn MergedResult>, resolved: ResolvedPagination) -> FlowResult<Self> {
        let mut exhausted = false;
        // Skip the offset rows up front; an offset past the end is an
        // empty result, not an error.
        for _ in 0..resolved.offset {
            if !inner.next()? {
                exhausted = true;
                break;
            }
        }
        Ok(Self {
            inner,
            row_count: resolved.row_count,
            emitted: 0,
            exhausted,
        })
    }

    fn next(&mut self) -> FlowResult<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if let Some(bound) = self.row_count {
            if self.emitted >= bound {
                self.exhausted = true;
                return Ok(false);
            }
        }
        if self.inner.next()? {
            self.emitted += 1;
            Ok(true)
        } else {
            self.exhausted = true;
            Ok(false)
        }
    }

    fn value(&mut self, column_index: usize) -> FlowResult<Datum> {
        self.inner.value(column_index)
    }
}

macro_rules! pagination_decorator {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub struct $name {
            cursor: BoundedCursor,
        }

        impl $name {
            pub fn new(
                inner: Box<dyn MergedResult>,
                resolved: ResolvedPagination,
            ) -> FlowResult<Self> {
                Ok(Self {
                    cursor: BoundedCursor::new(inner, resolved)?,
                })
            }
        }

        impl MergedResult for $name {
            fn next(&mut self) -> FlowResult<bool> {
                self.cursor.next()
            }

            fn value(&mut self, column_index: usize) -> FlowResult<Datum> {
                self.cursor.value(column_index)
            }
        }
    };
}

pagination_decorator!(
    /// MySQL/PostgreSQL `LIMIT offset, count` window.
    LimitDecoratorMergedResult
);
pagination_decorator!(
    /// Oracle `ROWNUM` predicate window.
    RowNumberDecoratorMergedResult
);
pagination_decorator!(
    /// SQL Server `TOP` + `ROW_NUMBER()` window.
    TopAndRowNumberDecoratorMergedResult
);

/// Wrap `inner` in the decorator for the statement's dialect encoding.
pub fn decorate(
    kind: PaginationKind,
    inner: Box<dyn MergedResult>,
    resolved: ResolvedPagination,
) -> FlowResult<Box<dyn MergedResult>> {
    Ok(match kind {
        PaginationKind::Limit => Box::new(LimitDecoratorMergedResult::new(inner, resolved)?),
        PaginationKind::RowNumber => {
            Box::new(RowNumberDecoratorMergedResult::new(inner, resolved)?)
        }
        PaginationKind::TopAndRowNumber => {
            Box::new(TopAndRowNumberDecoratorMergedResult::new(inner, resolved)?)
        }
    })
}
