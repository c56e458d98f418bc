use std::fmt;

use serde::{Deserialize, Serialize};

use crate::datum::Datum;

/// Identity of the physical data source a unit executes against.
///
/// The kernel never sees pool handles, so the routing target is also the
/// connection-exclusivity key: two units with the same `TargetId` are
/// never executed concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(pub String);

impl TargetId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One physical statement execution produced by routing: target data
/// source, rewritten SQL, bound parameters. Immutable once built; the
/// kernel reads it, never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionUnit {
    pub target: TargetId,
    pub sql: String,
    pub parameters: Vec<Datum>,
}

impl ExecutionUnit {
    pub fn new(target: impl Into<TargetId>, sql: impl Into<String>, parameters: Vec<Datum>) -> Self {
        Self {
            target: target.into(),
            sql: sql.into(),
            parameters,
        }
    }
}

impl From<String> for TargetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Per-unit snapshot of a batched DML mapping: which logical `add_batch`
/// calls were folded into this unit's physical statement, in physical
/// batch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRouteUnit {
    pub target: TargetId,
    pub logical_call_indices: Vec<usize>,
}
