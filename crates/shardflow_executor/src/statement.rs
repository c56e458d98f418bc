//! Seams toward the connection layer.
//!
//! The kernel opens a physical statement per unit through a
//! caller-supplied factory and executes it; pool sizing, retries and
//! connection lifecycle stay on the other side of these traits. A
//! statement is released (dropped) when its unit's work is done or
//! failed.

use shardflow_common::error::FlowResult;
use shardflow_common::result::QueryResult;
use shardflow_common::unit::ExecutionUnit;

/// What one physical statement execution produced.
pub enum StatementOutcome {
    Rows(Box<dyn QueryResult>),
    UpdateCount(u64),
}

/// One opened statement on a physical connection.
pub trait PhysicalStatement: Send {
    fn execute(&mut self) -> FlowResult<StatementOutcome>;

    /// Execute the statement's accumulated batch, returning per-entry
    /// counts in physical batch order.
    fn execute_batch(&mut self) -> FlowResult<Vec<i64>>;
}

/// Connection-layer factory the kernel calls once per unit.
pub trait StatementFactory: Send + Sync {
    fn open(&self, unit: &ExecutionUnit) -> FlowResult<Box<dyn PhysicalStatement>>;
}
