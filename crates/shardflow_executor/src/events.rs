//! Execution-event instrumentation.
//!
//! Observers are an explicit, caller-supplied list injected through
//! `ExecutionGroupContext` — there is no global event bus. Notification
//! is pure: listeners see every unit start and finish but cannot affect
//! control flow, ordering or results.

use std::time::Duration;

use shardflow_common::datum::Datum;
use shardflow_common::unit::TargetId;

/// Outcome carried by a finish event.
#[derive(Debug, Clone)]
pub enum UnitOutcome {
    Succeeded,
    Failed { message: String },
}

/// Snapshot of one unit execution, emitted before and after the
/// callback runs.
#[derive(Debug)]
pub struct UnitExecutionEvent<'a> {
    /// Monotonic id of the fan-out group this unit belongs to.
    pub group_id: u64,
    /// Position of the unit in the input list.
    pub unit_index: usize,
    pub target: &'a TargetId,
    pub sql: &'a str,
    pub parameters: &'a [Datum],
    /// `None` on the start event.
    pub outcome: Option<UnitOutcome>,
    /// Wall-clock duration; zero on the start event.
    pub elapsed: Duration,
}

/// Read-only observer of unit executions. Implementations must not
/// block for long: they run inline on the executing thread.
pub trait ExecutionListener: Send + Sync {
    fn on_execution_start(&self, event: &UnitExecutionEvent<'_>);

    fn on_execution_finish(&self, event: &UnitExecutionEvent<'_>);
}
