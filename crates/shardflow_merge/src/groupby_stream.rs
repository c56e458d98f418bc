//! Stream group-by merge: consume the order-by stream and fold runs of
//! equal group keys into one output row.
//!
//! Valid only when the group-by keys prefix-match the order-by keys —
//! then all rows of one group arrive consecutively from the k-way merge
//! and one group is buffered at a time.

use shardflow_common::datum::Datum;
use shardflow_common::error::{FlowResult, MergeError};
use shardflow_common::result::QueryResult;
use shardflow_common::statement::{Projection, StatementContext};

use crate::aggregation::bind_aggregations;
use crate::merged::MergedResult;
use crate::orderby::OrderByStreamMergedResult;

pub struct GroupByStreamMergedResult {
    stream: OrderByStreamMergedResult,
    group_key_len: usize,
    projections: Vec<Projection>,
    width: usize,
    current_row: Vec<Datum>,
    positioned: bool,
    /// The stream already sits on the first row of the next group.
    pending: bool,
}

impl GroupByStreamMergedResult {
    pub fn new(
        context: &StatementContext,
        results: Vec<Box<dyn QueryResult>>,
    ) -> FlowResult<Self> {
        // Surface unmergeable AVG before any row is pulled.
        bind_aggregations(&context.projections)?;
        let stream = OrderByStreamMergedResult::new(context.order_by.clone(), results)?;
        let width = stream.columns().len();
        Ok(Self {
            stream,
            group_key_len: context.group_by.len(),
            projections: context.projections.clone(),
            width,
            current_row: Vec::new(),
            positioned: false,
            pending: false,
        })
    }

    fn group_key(&self) -> Option<Vec<Datum>> {
        // Group-by keys are an order-by prefix, so the group key is the
        // leading slice of the sort key.
        self.stream
            .current_sort_key()
            .map(|key| key[..self.group_key_len.min(key.len())].to_vec())
    }
}

impl MergedResult for GroupByStreamMergedResult {
    fn next(&mut self) -> FlowResult<bool> {
        if self.pending {
            self.pending = false;
        } else if !self.stream.next()? {
            self.positioned = false;
            return Ok(false);
        }

        let key = self.group_key().ok_or(MergeError::NoCurrentRow)?;
        // First row of the group doubles as the template for the
        // non-aggregated columns.
        let mut row = self.stream.current_row(self.width)?;
        let mut bindings = bind_aggregations(&self.projections)?;
        for binding in &mut bindings {
            binding.feed(&row);
        }
        loop {
            if !self.stream.next()? {
                break;
            }
            if self.group_key().as_deref() != Some(key.as_slice()) {
                self.pending = true;
                break;
            }
            let partial = self.stream.current_row(self.width)?;
            for binding in &mut bindings {
                binding.feed(&partial);
            }
        }
        for binding in &bindings {
            if binding.column_index < row.len() {
                row[binding.column_index] = binding.result();
            }
        }
        self.current_row = row;
        self.positioned = true;
        Ok(true)
    }

    fn value(&mut self, column_index: usize) -> FlowResult<Datum> {
        if !self.positioned {
            return Err(MergeError::NoCurrentRow.into());
        }
        match self.current_row.get(column_index) {
            Some(v) => Ok(v.clone()),
            None => Err(MergeError::ColumnOutOfBounds {
                index: column_index,
                width: self.current_row.len(),
            }
            .into()),
        }
    }
}
