//! Per-statement context handed to the kernel by routing: grouping,
//! ordering, projections and pagination of the logical SQL statement.
//!
//! Everything here is read-only during execution and merge. Strategy
//! selection is expressed over closed enums — never over type identity.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::datum::{cmp_datum, Datum};
use crate::error::PaginationError;

/// Sort direction of one group-by / order-by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// One ordering key: a 0-based result column index plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderByItem {
    pub column_index: usize,
    pub direction: OrderDirection,
}

impl OrderByItem {
    pub fn asc(column_index: usize) -> Self {
        Self {
            column_index,
            direction: OrderDirection::Asc,
        }
    }

    pub fn desc(column_index: usize) -> Self {
        Self {
            column_index,
            direction: OrderDirection::Desc,
        }
    }
}

/// Compare two rows by a list of ordering keys, honoring per-key
/// direction. Missing columns sort first, like NULL.
pub fn compare_by_items(a: &[Datum], b: &[Datum], items: &[OrderByItem]) -> Ordering {
    for item in items {
        let av = a.get(item.column_index).unwrap_or(&Datum::Null);
        let bv = b.get(item.column_index).unwrap_or(&Datum::Null);
        let ord = match item.direction {
            OrderDirection::Asc => cmp_datum(av, bv),
            OrderDirection::Desc => cmp_datum(bv, av),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Aggregation function of a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationType {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregationType {
    pub fn name(&self) -> &'static str {
        match self {
            AggregationType::Count => "COUNT",
            AggregationType::Sum => "SUM",
            AggregationType::Min => "MIN",
            AggregationType::Max => "MAX",
            AggregationType::Avg => "AVG",
        }
    }
}

/// Derived column positions the rewriter appends for AVG: per-unit AVG
/// values cannot be merged, so each unit ships partial COUNT and SUM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvgDerived {
    pub count_index: usize,
    pub sum_index: usize,
}

/// One projected output column of the logical statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    /// Plain column passthrough.
    Column { column_index: usize },
    /// Aggregation result at `column_index`; `alias` is the label the
    /// caller sees. AVG requires `derived`.
    Aggregation {
        func: AggregationType,
        column_index: usize,
        alias: Option<String>,
        derived: Option<AvgDerived>,
    },
}

impl Projection {
    pub fn column(column_index: usize) -> Self {
        Projection::Column { column_index }
    }

    pub fn aggregation(func: AggregationType, column_index: usize) -> Self {
        Projection::Aggregation {
            func,
            column_index,
            alias: None,
            derived: None,
        }
    }

    pub fn avg(column_index: usize, count_index: usize, sum_index: usize) -> Self {
        Projection::Aggregation {
            func: AggregationType::Avg,
            column_index,
            alias: None,
            derived: Some(AvgDerived {
                count_index,
                sum_index,
            }),
        }
    }

    pub fn is_aggregation(&self) -> bool {
        matches!(self, Projection::Aggregation { .. })
    }
}

/// Pagination dialect encoding, a closed enum:
/// - `Limit`: MySQL/PostgreSQL `LIMIT offset, count`
/// - `RowNumber`: Oracle `ROWNUM` predicate form
/// - `TopAndRowNumber`: SQL Server `TOP` + `ROW_NUMBER()` form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaginationKind {
    Limit,
    RowNumber,
    TopAndRowNumber,
}

/// An offset or row-count value: a literal from the SQL text, or a
/// parameter marker resolved against the logical parameter list at
/// execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaginationValue {
    Literal(i64),
    Parameter(usize),
}

impl PaginationValue {
    fn resolve(&self, parameters: &[Datum]) -> Result<i64, PaginationError> {
        match self {
            PaginationValue::Literal(v) => Ok(*v),
            PaginationValue::Parameter(index) => parameters
                .get(*index)
                .and_then(Datum::as_i64)
                .ok_or(PaginationError::UnresolvedParameter { index: *index }),
        }
    }
}

/// Pagination of the logical statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationSpec {
    pub offset: Option<PaginationValue>,
    pub row_count: Option<PaginationValue>,
    pub kind: PaginationKind,
}

impl PaginationSpec {
    pub fn limit(offset: i64, row_count: i64) -> Self {
        Self {
            offset: Some(PaginationValue::Literal(offset)),
            row_count: Some(PaginationValue::Literal(row_count)),
            kind: PaginationKind::Limit,
        }
    }

    /// Resolve marker-bound values against the logical parameter list and
    /// validate signs. Called before any unit executes.
    pub fn resolve(&self, parameters: &[Datum]) -> Result<ResolvedPagination, PaginationError> {
        let offset = match &self.offset {
            Some(v) => {
                let n = v.resolve(parameters)?;
                if n < 0 {
                    return Err(PaginationError::NegativeOffset(n));
                }
                n as u64
            }
            None => 0,
        };
        let row_count = match &self.row_count {
            Some(v) => {
                let n = v.resolve(parameters)?;
                if n < 0 {
                    return Err(PaginationError::NegativeRowCount(n));
                }
                Some(n as u64)
            }
            None => None,
        };
        Ok(ResolvedPagination { offset, row_count })
    }
}

/// Pagination with all values resolved to concrete numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPagination {
    pub offset: u64,
    /// `None` means offset-only: no upper bound.
    pub row_count: Option<u64>,
}

impl ResolvedPagination {
    /// True when decoration would change nothing (no skip, no bound).
    pub fn is_noop(&self) -> bool {
        self.offset == 0 && self.row_count.is_none()
    }
}

/// Read-only description of the logical statement, produced by the
/// SQL-analysis/routing layers and consumed by the merge engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementContext {
    pub group_by: Vec<OrderByItem>,
    pub order_by: Vec<OrderByItem>,
    pub projections: Vec<Projection>,
    pub pagination: Option<PaginationSpec>,
    /// Logical statement parameters; pagination markers resolve against
    /// these.
    pub parameters: Vec<Datum>,
    /// Routing may force buffered fetch regardless of merge strategy
    /// (e.g. when the physical connection must be released early).
    pub force_materialization: bool,
}

impl StatementContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group_by(mut self, items: Vec<OrderByItem>) -> Self {
        self.group_by = items;
        self
    }

    pub fn with_order_by(mut self, items: Vec<OrderByItem>) -> Self {
        self.order_by = items;
        self
    }

    pub fn with_projections(mut self, projections: Vec<Projection>) -> Self {
        self.projections = projections;
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationSpec) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<Datum>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn has_aggregation(&self) -> bool {
        self.projections.iter().any(Projection::is_aggregation)
    }

    /// True when every group-by key prefix-matches the order-by keys at
    /// the same position with the same direction — the precondition for
    /// streaming group-by (rows arrive globally sorted by group key).
    pub fn group_by_is_order_by_prefix(&self) -> bool {
        !self.group_by.is_empty()
            && self.group_by.len() <= self.order_by.len()
            && self
                .group_by
                .iter()
                .zip(self.order_by.iter())
                .all(|(g, o)| g == o)
    }
}
