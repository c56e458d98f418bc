//! Stream order-by merge: k-way heap merge of per-unit cursors that are
//! each already sorted by the order-by keys.
//!
//! Holds one row per unit at a time. Each cursor's sort key is checked
//! against its predecessor on every advance; a unit whose rows go
//! backwards violates the pushed-down ORDER BY contract and fails the
//! merge rather than silently producing misordered output.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

use shardflow_common::datum::{cmp_datum, Datum};
use shardflow_common::error::{FlowResult, MergeError};
use shardflow_common::result::{Column, QueryResult};
use shardflow_common::statement::{OrderByItem, OrderDirection};

use crate::merged::MergedResult;

struct UnitCursor {
    result: Box<dyn QueryResult>,
    unit_index: usize,
    /// Sort key of the current row, in order-by item order.
    key: Vec<Datum>,
    started: bool,
}

impl UnitCursor {
    /// Advance to the next row and refresh the sort key, verifying the
    /// unit's own ordering along the way.
    fn advance(&mut self, order_by: &[OrderByItem]) -> FlowResult<bool> {
        if !self.result.next()? {
            return Ok(false);
        }
        let mut key = Vec::with_capacity(order_by.len());
        for item in order_by {
            key.push(self.result.value(item.column_index)?);
        }
        if self.started && cmp_keys(&self.key, &key, order_by) == Ordering::Greater {
            return Err(MergeError::UnsortedInput {
                unit_index: self.unit_index,
            }
            .into());
        }
        self.started = true;
        self.key = key;
        Ok(true)
    }
}

/// Keys are already extracted in item order, so compare positionally.
fn cmp_keys(a: &[Datum], b: &[Datum], order_by: &[OrderByItem]) -> Ordering {
    for (i, item) in order_by.iter().enumerate() {
        let av = a.get(i).unwrap_or(&Datum::Null);
        let bv = b.get(i).unwrap_or(&Datum::Null);
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

struct HeapEntry {
    cursor: UnitCursor,
    order_by: Arc<[OrderByItem]>,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Key order first; unit index breaks ties so equal keys come
        // out in unit order, deterministically.
        cmp_keys(&self.cursor.key, &other.cursor.key, &self.order_by)
            .then_with(|| self.cursor.unit_index.cmp(&other.cursor.unit_index))
    }
}

pub struct OrderByStreamMergedResult {
    heap: BinaryHeap<Reverse<HeapEntry>>,
    current: Option<HeapEntry>,
    order_by: Arc<[OrderByItem]>,
    columns: Vec<Column>,
}

impl OrderByStreamMergedResult {
    pub fn new(
        order_by: Vec<OrderByItem>,
        results: Vec<Box<dyn QueryResult>>,
    ) -> FlowResult<Self> {
        let order_by: Arc<[OrderByItem]> = order_by.into();
        let columns = results
            .first()
            .map(|r| r.columns().to_vec())
            .unwrap_or_default();
        let mut heap = BinaryHeap::with_capacity(results.len());
        for (unit_index, result) in results.into_iter().enumerate() {
            let mut cursor = UnitCursor {
                result,
                unit_index,
                key: Vec::new(),
                started: false,
            };
            if cursor.advance(&order_by)? {
                heap.push(Reverse(HeapEntry {
                    cursor,
                    order_by: Arc::clone(&order_by),
                }));
            }
        }
        Ok(Self {
            heap,
            current: None,
            order_by,
            columns,
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Sort key of the current row, in order-by item order.
    pub(crate) fn current_sort_key(&self) -> Option<&[Datum]> {
        self.current.as_ref().map(|e| e.cursor.key.as_slice())
    }

    /// Snapshot of the current row's first `width` columns.
    pub(crate) fn current_row(&mut self, width: usize) -> FlowResult<Vec<Datum>> {
        let mut row = Vec::with_capacity(width);
        for i in 0..width {
            row.push(self.value(i)?);
        }
        Ok(row)
    }
}

impl MergedResult for OrderByStreamMergedResult {
    fn next(&mut self) -> FlowResult<bool> {
        if let Some(mut entry) = self.current.take() {
            if entry.cursor.advance(&self.order_by)? {
                self.heap.push(Reverse(entry));
            }
        }
        self.current = self.heap.pop().map(|Reverse(entry)| entry);
        Ok(self.current.is_some())
    }

    fn value(&mut self, column_index: usize) -> FlowResult<Datum> {
        match &mut self.current {
            Some(entry) => entry.cursor.result.value(column_index),
            None => Err(MergeError::NoCurrentRow.into()),
        }
    }
}
