//! The merged-result cursor contract.
//!
//! Every merge strategy and pagination decorator presents the same
//! forward-only cursor the per-unit `QueryResult`s do, so callers walk a
//! merged result exactly like a single-unit one.

use shardflow_common::datum::Datum;
use shardflow_common::error::{FlowResult, MergeError};

/// A forward-only cursor over the merged rows of all units. Starts
/// before the first row, like `QueryResult`.
pub trait MergedResult: Send {
    fn next(&mut self) -> FlowResult<bool>;

    fn value(&mut self, column_index: usize) -> FlowResult<Datum>;
}

impl std::fmt::Debug for dyn MergedResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MergedResult")
    }
}

/// Merged result backed by fully computed rows. The memory group-by
/// strategy produces one of these after its single pass over the inputs.
pub struct MaterializedMergedResult {
    rows: Vec<Vec<Datum>>,
    cursor: Option<usize>,
}

impl MaterializedMergedResult {
    pub fn new(rows: Vec<Vec<Datum>>) -> Self {
        Self { rows, cursor: None }
    }
}

impl MergedResult for MaterializedMergedResult {
    fn next(&mut self) -> FlowResult<bool> {
        let next = match self.cursor {
            None => 0,
            Some(i) => i + 1,
        };
        if next < self.rows.len() {
            self.cursor = Some(next);
            Ok(true)
        } else {
            self.cursor = Some(self.rows.len());
            Ok(false)
        }
    }

    fn value(&mut self, column_index: usize) -> FlowResult<Datum> {
        let row = self
            .cursor
            .and_then(|i| self.rows.get(i))
            .ok_or(MergeError::NoCurrentRow)?;
        match row.get(column_index) {
            Some(v) => Ok(v.clone()),
            None => Err(MergeError::ColumnOutOfBounds {
                index: column_index,
                width: row.len(),
            }
            .into()),
        }
    }
}
