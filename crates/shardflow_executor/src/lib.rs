//! Concurrent fan-out execution for the shardflow kernel.
//!
//! Provides:
//!   - `FanoutExecutor`: bounded-parallelism per-unit callback execution
//!     with input-order results and connection exclusivity
//!   - `BatchAccumulator`: logical↔physical batch index mapping and
//!     update-count reduction for batched DML
//!   - `ExecutionListener`: injected execution-event observers
//!   - `PhysicalStatement`/`StatementFactory`: the connection-layer seam

pub mod batch;
pub mod events;
pub mod executor;
pub mod statement;

#[cfg(test)]
mod tests;

pub use batch::{BatchAccumulationMode, BatchAccumulator};
pub use events::{ExecutionListener, UnitExecutionEvent, UnitOutcome};
pub use executor::{next_group_id, ExecutionGroupContext, FanoutConfig, FanoutExecutor};
pub use statement::{PhysicalStatement, StatementFactory, StatementOutcome};
