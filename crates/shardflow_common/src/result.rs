//! The forward-only result cursor contract shared by every layer.
//!
//! Two physical representations exist:
//! - streaming: backed by a live driver cursor; must be drained before
//!   the physical connection is reused
//! - memory (`MemoryQueryResult`): fully buffered, safe to hold across
//!   merge steps
//!
//! The merge strategy dictates which one a unit execution must produce.

use serde::{Deserialize, Serialize};

use crate::datum::{DataType, Datum, OwnedRow};
use crate::error::{FlowResult, MergeError};

/// Result-set column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: Option<DataType>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: Option<DataType>) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A forward-only cursor over one unit's rows. Starts before the first
/// row; `next` advances and reports whether a row is available; `value`
/// reads a 0-based column of the current row.
pub trait QueryResult: Send {
    fn columns(&self) -> &[Column];

    fn next(&mut self) -> FlowResult<bool>;

    fn value(&mut self, column_index: usize) -> FlowResult<Datum>;

    fn column_count(&self) -> usize {
        self.columns().len()
    }
}

/// Fully buffered query result. Doubles as the test vehicle for the
/// merge layer.
#[derive(Debug, Clone)]
pub struct MemoryQueryResult {
    columns: Vec<Column>,
    rows: Vec<OwnedRow>,
    /// Index of the current row; `None` before the first `next`.
    cursor: Option<usize>,
}

impl MemoryQueryResult {
    pub fn new(columns: Vec<Column>, rows: Vec<OwnedRow>) -> Self {
        Self {
            columns,
            rows,
            cursor: None,
        }
    }

    /// Build from bare value rows, synthesizing column metadata.
    pub fn from_rows(width: usize, rows: Vec<Vec<Datum>>) -> Self {
        let columns = (0..width)
            .map(|i| Column::new(format!("col_{}", i), None))
            .collect();
        Self::new(columns, rows.into_iter().map(OwnedRow::new).collect())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn current(&self) -> FlowResult<&OwnedRow> {
        let idx = self.cursor.ok_or(MergeError::NoCurrentRow)?;
        self.rows.get(idx).ok_or_else(|| MergeError::NoCurrentRow.into())
    }
}

impl QueryResult for MemoryQueryResult {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn next(&mut self) -> FlowResult<bool> {
        let next = match self.cursor {
            None => 0,
            Some(i) => i + 1,
        };
        if next < self.rows.len() {
            self.cursor = Some(next);
            Ok(true)
        } else {
            // Park past the end so repeated calls stay exhausted.
            self.cursor = Some(self.rows.len());
            Ok(false)
        }
    }

    fn value(&mut self, column_index: usize) -> FlowResult<Datum> {
        let row = self.current()?;
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

/// Drain any query result into a buffered one, releasing the underlying
/// cursor (and with it the physical connection) as soon as this returns.
pub fn materialize(mut source: Box<dyn QueryResult>) -> FlowResult<MemoryQueryResult> {
    let columns = source.columns().to_vec();
    let width = columns.len();
    let mut rows = Vec::new();
    while source.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(source.value(i)?);
        }
        rows.push(OwnedRow::new(values));
    }
    Ok(MemoryQueryResult::new(columns, rows))
}
