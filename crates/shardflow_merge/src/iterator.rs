//! Iterator (concatenation) merge: walk each unit's rows to exhaustion
//! in unit order. Used when no cross-unit reordering or re-aggregation
//! is needed, and as the pass-through for single-unit routes.

use shardflow_common::datum::Datum;
use shardflow_common::error::{FlowResult, MergeError};
use shardflow_common::result::QueryResult;

use crate::merged::MergedResult;

pub struct IteratorMergedResult {
    results: Vec<Box<dyn QueryResult>>,
    current: usize,
}

impl IteratorMergedResult {
    pub fn new(results: Vec<Box<dyn QueryResult>>) -> Self {
        Self {
            results,
            current: 0,
        }
    }
}

impl MergedResult for IteratorMergedResult {
    fn next(&mut self) -> FlowResult<bool> {
        while let Some(result) = self.results.get_mut(self.current) {
            if result.next()? {
                return Ok(true);
            }
            self.current += 1;
        }
        Ok(false)
    }

    fn value(&mut self, column_index: usize) -> FlowResult<Datum> {
        match self.results.get_mut(self.current) {
            Some(result) => result.value(column_index),
            None => Err(MergeError::NoCurrentRow.into()),
        }
    }
}
