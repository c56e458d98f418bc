//! The statement driver: the kernel's outward face.
//!
//! One logical statement in, one logical answer out. The driver opens a
//! physical statement per routed unit through the injected factory,
//! fans the executions out, and hands query results to the merge
//! engine. Physical statements are dropped as soon as their unit's work
//! is done or failed, success and failure alike.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use shardflow_common::error::{FlowResult, ShardFlowError};
use shardflow_common::result::{materialize, QueryResult};
use shardflow_common::statement::StatementContext;
use shardflow_common::unit::{ExecutionUnit, TargetId};
use shardflow_executor::batch::BatchAccumulator;
use shardflow_executor::executor::{ExecutionGroupContext, FanoutConfig, FanoutExecutor};
use shardflow_executor::statement::{StatementFactory, StatementOutcome};
use shardflow_merge::engine::{merge, needs_materialization};
use shardflow_merge::merged::MergedResult;

pub struct StatementDriver {
    executor: FanoutExecutor,
    factory: Arc<dyn StatementFactory>,
}

impl StatementDriver {
    pub fn new(config: FanoutConfig, factory: Arc<dyn StatementFactory>) -> Self {
        Self {
            executor: FanoutExecutor::new(config),
            factory,
        }
    }

    /// Execute a routed query and merge the per-unit results into one
    /// cursor.
    ///
    /// Pagination arguments are validated before any unit runs, so bad
    /// input never costs a fan-out. When the merge strategy (or
    /// routing) demands buffered fetch, each unit's rows are drained on
    /// its own execution thread and the physical statement released
    /// there; otherwise live cursors are handed to the merge.
    pub fn execute_query(
        &self,
        ctx: &ExecutionGroupContext,
        statement: &StatementContext,
        units: &[ExecutionUnit],
    ) -> FlowResult<Box<dyn MergedResult>> {
        if let Some(spec) = &statement.pagination {
            spec.resolve(&statement.parameters)?;
        }
        let buffered = needs_materialization(statement, units.len());
        debug!(
            group_id = ctx.group_id,
            units = units.len(),
            buffered,
            "executing query"
        );
        let results: Vec<Box<dyn QueryResult>> =
            self.executor.run(ctx, units, |_, unit| {
                let mut physical = self.factory.open(unit)?;
                match physical.execute()? {
                    StatementOutcome::Rows(rows) => {
                        if buffered {
                            Ok(Box::new(materialize(rows)?) as Box<dyn QueryResult>)
                        } else {
                            Ok(rows)
                        }
                    }
                    StatementOutcome::UpdateCount(_) => Err(ShardFlowError::Internal(format!(
                        "query on {} produced an update count",
                        unit.target
                    ))),
                }
            })?;
        merge(statement, results)
    }

    /// Execute a routed DML statement and sum the per-unit affected-row
    /// counts.
    pub fn execute_update(
        &self,
        ctx: &ExecutionGroupContext,
        units: &[ExecutionUnit],
    ) -> FlowResult<u64> {
        let counts = self.executor.run(ctx, units, |_, unit| {
            let mut physical = self.factory.open(unit)?;
            match physical.execute()? {
                StatementOutcome::UpdateCount(count) => Ok(count),
                StatementOutcome::Rows(_) => Err(ShardFlowError::Internal(format!(
                    "update on {} produced a row set",
                    unit.target
                ))),
            }
        })?;
        Ok(counts.into_iter().sum())
    }

    /// Execute a batched DML statement: one physical batch per unit,
    /// reduced back to one count per logical `add_batch` call.
    pub fn execute_batch(
        &self,
        ctx: &ExecutionGroupContext,
        accumulator: &BatchAccumulator,
        units: &[ExecutionUnit],
    ) -> FlowResult<Vec<i64>> {
        let per_unit = self.executor.run(ctx, units, |_, unit| {
            let mut physical = self.factory.open(unit)?;
            let counts = physical.execute_batch()?;
            Ok((unit.target.clone(), counts))
        })?;
        let per_target: HashMap<TargetId, Vec<i64>> = per_unit.into_iter().collect();
        accumulator.accumulate(&per_target)
    }
}
