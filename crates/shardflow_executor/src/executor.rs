//! Concurrent statement fan-out.
//!
//! Given N execution units and a per-unit callback, `FanoutExecutor`
//! runs every callback and returns the results in input-unit order,
//! regardless of completion order:
//!   - unit 0 runs on the invoking thread (no pool cost for the
//!     always-present first unit, forward progress guaranteed)
//!   - units 1..N are drained from a shared queue by at most
//!     `max_workers` scoped worker threads
//!   - callbacks targeting the same physical connection are serialized
//!     through a per-target mutex registry
//!
//! Every callback runs to completion even when one fails; the failure
//! policy (fail-fast vs collect) is applied to the collected results
//! afterwards, so no physical statement is ever abandoned. No retries
//! happen at this layer.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;

use shardflow_common::error::{ExecutionError, FlowResult, ShardFlowError};
use shardflow_common::unit::{ExecutionUnit, TargetId};

use crate::events::{ExecutionListener, UnitExecutionEvent, UnitOutcome};

/// Global monotonic fan-out group id counter.
static GLOBAL_GROUP_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a new unique group id.
pub fn next_group_id() -> u64 {
    GLOBAL_GROUP_ID.fetch_add(1, Ordering::Relaxed)
}

/// Fan-out executor configuration.
#[derive(Debug, Clone)]
pub struct FanoutConfig {
    /// Worker-pool bound for units beyond the first. 0 = fully serial
    /// on the invoking thread.
    pub max_workers: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self { max_workers: 8 }
    }
}

impl FanoutConfig {
    /// Serial execution: every unit runs on the invoking thread.
    pub fn serial() -> Self {
        Self { max_workers: 0 }
    }
}

/// Explicit per-group context threaded through the executor and every
/// callback. Replaces any ambient/thread-local state: the listener list
/// and group identity travel as a value.
pub struct ExecutionGroupContext {
    pub group_id: u64,
    pub listeners: Vec<Arc<dyn ExecutionListener>>,
}

impl ExecutionGroupContext {
    pub fn new() -> Self {
        Self {
            group_id: next_group_id(),
            listeners: Vec::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn ExecutionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    fn notify_start(&self, unit_index: usize, unit: &ExecutionUnit) {
        if self.listeners.is_empty() {
            return;
        }
        let event = UnitExecutionEvent {
            group_id: self.group_id,
            unit_index,
            target: &unit.target,
            sql: &unit.sql,
            parameters: &unit.parameters,
            outcome: None,
            elapsed: Duration::ZERO,
        };
        for listener in &self.listeners {
            listener.on_execution_start(&event);
        }
    }

    fn notify_finish(
        &self,
        unit_index: usize,
        unit: &ExecutionUnit,
        outcome: UnitOutcome,
        elapsed: Duration,
    ) {
        if self.listeners.is_empty() {
            return;
        }
        let event = UnitExecutionEvent {
            group_id: self.group_id,
            unit_index,
            target: &unit.target,
            sql: &unit.sql,
            parameters: &unit.parameters,
            outcome: Some(outcome),
            elapsed,
        };
        for listener in &self.listeners {
            listener.on_execution_finish(&event);
        }
    }
}

impl Default for ExecutionGroupContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The fan-out executor. Long-lived: one per data-source group, so the
/// connection-exclusivity registry survives across statements.
pub struct FanoutExecutor {
    config: FanoutConfig,
    /// Per-target mutexes serializing callbacks that share a physical
    /// connection, even when scheduled on different workers.
    connection_locks: DashMap<TargetId, Arc<Mutex<()>>>,
}

impl FanoutExecutor {
    pub fn new(config: FanoutConfig) -> Self {
        Self {
            config,
            connection_locks: DashMap::new(),
        }
    }

    /// Fail-fast execution: runs every callback to completion, then
    /// returns either all results in input order or the first error in
    /// unit order.
    pub fn run<T, F>(
        &self,
        ctx: &ExecutionGroupContext,
        units: &[ExecutionUnit],
        callback: F,
    ) -> FlowResult<Vec<T>>
    where
        T: Send,
        F: Fn(usize, &ExecutionUnit) -> FlowResult<T> + Send + Sync,
    {
        let results = self.run_all(ctx, units, &callback);
        let mut values = Vec::with_capacity(results.len());
        let mut governing: Option<ShardFlowError> = None;
        for result in results {
            match result {
                Ok(value) => values.push(value),
                Err(err) => {
                    if governing.is_none() {
                        governing = Some(err);
                    }
                }
            }
        }
        match governing {
            Some(err) => Err(err),
            None => Ok(values),
        }
    }

    /// Collect execution: every unit's result or error stays attached
    /// to its input slot; the caller decides disposition.
    pub fn run_collect<T, F>(
        &self,
        ctx: &ExecutionGroupContext,
        units: &[ExecutionUnit],
        callback: F,
    ) -> Vec<FlowResult<T>>
    where
        T: Send,
        F: Fn(usize, &ExecutionUnit) -> FlowResult<T> + Send + Sync,
    {
        self.run_all(ctx, units, &callback)
    }

    fn run_all<T, F>(
        &self,
        ctx: &ExecutionGroupContext,
        units: &[ExecutionUnit],
        callback: &F,
    ) -> Vec<FlowResult<T>>
    where
        T: Send,
        F: Fn(usize, &ExecutionUnit) -> FlowResult<T> + Send + Sync,
    {
        let n = units.len();
        if n == 0 {
            return Vec::new();
        }

        let slots: Mutex<Vec<Option<FlowResult<T>>>> =
            Mutex::new((0..n).map(|_| None).collect());
        let queue: Mutex<VecDeque<usize>> = Mutex::new((1..n).collect());
        let workers = self.config.max_workers.min(n.saturating_sub(1));

        tracing::debug!(
            group_id = ctx.group_id,
            units = n,
            workers,
            "fan-out group start"
        );

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    s.spawn(|| loop {
                        let idx = queue.lock().pop_front();
                        let Some(idx) = idx else { break };
                        let result = self.run_one(ctx, idx, &units[idx], callback);
                        slots.lock()[idx] = Some(result);
                    })
                })
                .collect();

            let first = self.run_one(ctx, 0, &units[0], callback);
            slots.lock()[0] = Some(first);

            if workers == 0 {
                // Serial config: the invoking thread drains the rest.
                loop {
                    let idx = queue.lock().pop_front();
                    let Some(idx) = idx else { break };
                    let result = self.run_one(ctx, idx, &units[idx], callback);
                    slots.lock()[idx] = Some(result);
                }
            }

            for handle in handles {
                // Workers catch callback panics themselves; a join error
                // here would be an executor bug, surfaced via the empty
                // slot below.
                let _ = handle.join();
            }
        });

        slots
            .into_inner()
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| {
                slot.unwrap_or_else(|| {
                    Err(ExecutionError::WorkerPanicked {
                        target: units[idx].target.clone(),
                    }
                    .into())
                })
            })
            .collect()
    }

    fn run_one<T, F>(
        &self,
        ctx: &ExecutionGroupContext,
        unit_index: usize,
        unit: &ExecutionUnit,
        callback: &F,
    ) -> FlowResult<T>
    where
        F: Fn(usize, &ExecutionUnit) -> FlowResult<T>,
    {
        let lock = self.connection_lock(&unit.target);
        let _guard = lock.lock();

        ctx.notify_start(unit_index, unit);
        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| callback(unit_index, unit)));
        let elapsed = started.elapsed();

        match outcome {
            Ok(Ok(value)) => {
                ctx.notify_finish(unit_index, unit, UnitOutcome::Succeeded, elapsed);
                Ok(value)
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    group_id = ctx.group_id,
                    target = %unit.target,
                    error = %err,
                    "unit execution failed"
                );
                ctx.notify_finish(
                    unit_index,
                    unit,
                    UnitOutcome::Failed {
                        message: err.to_string(),
                    },
                    elapsed,
                );
                Err(err)
            }
            Err(_) => {
                let err: ShardFlowError = ExecutionError::WorkerPanicked {
                    target: unit.target.clone(),
                }
                .into();
                tracing::warn!(
                    group_id = ctx.group_id,
                    target = %unit.target,
                    "unit execution callback panicked"
                );
                ctx.notify_finish(
                    unit_index,
                    unit,
                    UnitOutcome::Failed {
                        message: err.to_string(),
                    },
                    elapsed,
                );
                Err(err)
            }
        }
    }

    fn connection_lock(&self, target: &TargetId) -> Arc<Mutex<()>> {
        self.connection_locks
            .entry(target.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
