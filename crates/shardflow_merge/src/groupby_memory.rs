//! Memory group-by merge: drain every unit, bucket rows by an encoded
//! group key, re-aggregate per bucket, then sort by order-by if present.
//!
//! Handles the cases streaming cannot: group-by keys that do not match
//! the pushed-down sort order, and aggregation-only statements (empty
//! group-by folds everything into one implicit group). Memory cost is
//! one slot per distinct group, not per input row.

use std::collections::HashMap;

use shardflow_common::datum::{encode_datum_key, Datum};
use shardflow_common::error::FlowResult;
use shardflow_common::result::QueryResult;
use shardflow_common::statement::{
    compare_by_items, AggregationType, Projection, StatementContext,
};

use crate::aggregation::{bind_aggregations, AggBinding};
use crate::merged::{MaterializedMergedResult, MergedResult};

struct GroupState {
    /// First row seen for the group; non-aggregated columns pass through
    /// from here.
    template: Vec<Datum>,
    bindings: Vec<AggBinding>,
}

pub struct GroupByMemoryMergedResult {
    inner: MaterializedMergedResult,
}

impl GroupByMemoryMergedResult {
    pub fn new(
        context: &StatementContext,
        results: Vec<Box<dyn QueryResult>>,
    ) -> FlowResult<Self> {
        // First-seen order, then an explicit sort below if ordering was
        // requested.
        let mut groups: Vec<GroupState> = Vec::new();
        let mut index: HashMap<Vec<u8>, usize> = HashMap::new();

        let overall_width = results.first().map_or(0, |r| r.column_count());
        for mut result in results {
            let width = result.column_count();
            while result.next()? {
                let mut row = Vec::with_capacity(width);
                for i in 0..width {
                    row.push(result.value(i)?);
                }
                let mut key = Vec::new();
                for item in &context.group_by {
                    encode_datum_key(&mut key, row.get(item.column_index).unwrap_or(&Datum::Null));
                }
                // Empty group-by leaves the key empty: one implicit
                // group, the aggregation-only case.
                let slot = match index.get(&key) {
                    Some(&slot) => slot,
                    None => {
                        let slot = groups.len();
                        index.insert(key, slot);
                        groups.push(GroupState {
                            template: row.clone(),
                            bindings: bind_aggregations(&context.projections)?,
                        });
                        slot
                    }
                };
                let group = &mut groups[slot];
                for binding in &mut group.bindings {
                    binding.feed(&row);
                }
            }
        }

        let mut rows: Vec<Vec<Datum>> = groups
            .into_iter()
            .map(|GroupState { template, bindings }| {
                let mut row = template;
                for binding in &bindings {
                    if binding.column_index < row.len() {
                        row[binding.column_index] = binding.result();
                    }
                }
                row
            })
            .collect();
        if rows.is_empty() && context.group_by.is_empty() && context.has_aggregation() {
            // A scalar aggregate over zero input rows still yields one
            // row: COUNT is 0, every other aggregate NULL.
            let mut row = vec![Datum::Null; overall_width];
            for projection in &context.projections {
                if let Projection::Aggregation {
                    func: AggregationType::Count,
                    column_index,
                    ..
                } = projection
                {
                    if let Some(slot) = row.get_mut(*column_index) {
                        *slot = Datum::Int64(0);
                    }
                }
            }
            rows.push(row);
        }
        if !context.order_by.is_empty() {
            rows.sort_by(|a, b| compare_by_items(a, b, &context.order_by));
        }
        Ok(Self {
            inner: MaterializedMergedResult::new(rows),
        })
    }
}

impl MergedResult for GroupByMemoryMergedResult {
    fn next(&mut self) -> FlowResult<bool> {
        self.inner.next()
    }

    fn value(&mut self, column_index: usize) -> FlowResult<Datum> {
        self.inner.value(column_index)
    }
}
