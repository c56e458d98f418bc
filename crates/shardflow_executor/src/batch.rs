//! Batched DML accumulation.
//!
//! When several logical `add_batch` calls fold into one physical
//! statement per unit, the accumulator records which logical call landed
//! at which physical batch position, and reduces the per-unit result
//! arrays back into one logical array after execution.
//!
//! One accumulator serves exactly one logical batch; the `&mut self` API
//! makes the single-writer constraint structural.

use std::collections::HashMap;

use shardflow_common::error::{ExecutionError, FlowResult};
use shardflow_common::unit::{BatchRouteUnit, TargetId};

/// How overlapping per-unit batch counts reduce into one logical entry.
///
/// `Sum` is the general contract (each physical entry is an affected-row
/// count). Some drivers return a sentinel success code per entry instead,
/// which makes summation wrong — those dialects declare `LastWriteWins`.
/// This is a declared input, never inferred from a database name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAccumulationMode {
    Sum,
    LastWriteWins,
}

#[derive(Debug, Default)]
struct UnitBatch {
    /// Logical call index folded into each physical batch position, in
    /// physical order.
    logical_calls: Vec<usize>,
}

/// Maps logical batch calls to per-unit physical positions and reduces
/// physical results back to logical ones.
#[derive(Debug)]
pub struct BatchAccumulator {
    mode: BatchAccumulationMode,
    logical_calls: usize,
    /// Insertion-ordered so `LastWriteWins` is deterministic.
    units: Vec<(TargetId, UnitBatch)>,
    index: HashMap<TargetId, usize>,
}

impl BatchAccumulator {
    pub fn new(mode: BatchAccumulationMode) -> Self {
        Self {
            mode,
            logical_calls: 0,
            units: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Record one logical `add_batch` call touching the given targets.
    /// The first touch of a unit within the call appends a new physical
    /// position; repeated touches within the same call reuse it.
    pub fn add_batch<I>(&mut self, targets: I)
    where
        I: IntoIterator<Item = TargetId>,
    {
        let call = self.logical_calls;
        self.logical_calls += 1;
        for target in targets {
            let slot = match self.index.get(&target) {
                Some(&slot) => slot,
                None => {
                    let slot = self.units.len();
                    self.index.insert(target.clone(), slot);
                    self.units.push((target, UnitBatch::default()));
                    slot
                }
            };
            let unit = &mut self.units[slot].1;
            if unit.logical_calls.last() != Some(&call) {
                unit.logical_calls.push(call);
            }
        }
    }

    /// Number of logical `add_batch` calls recorded so far.
    pub fn logical_call_count(&self) -> usize {
        self.logical_calls
    }

    /// Snapshot of the per-unit mapping, in unit insertion order.
    pub fn route_units(&self) -> Vec<BatchRouteUnit> {
        self.units
            .iter()
            .map(|(target, unit)| BatchRouteUnit {
                target: target.clone(),
                logical_call_indices: unit.logical_calls.clone(),
            })
            .collect()
    }

    /// Reduce per-unit physical batch results into one logical array of
    /// length `logical_call_count()`. Logical calls no unit touched
    /// reduce to 0.
    pub fn accumulate(
        &self,
        per_unit: &HashMap<TargetId, Vec<i64>>,
    ) -> FlowResult<Vec<i64>> {
        let mut logical = vec![0i64; self.logical_calls];
        for (target, unit) in &self.units {
            let physical = per_unit.get(target).ok_or_else(|| {
                ExecutionError::BatchResultShape {
                    target: target.clone(),
                    detail: "missing physical batch result".to_string(),
                }
            })?;
            if physical.len() != unit.logical_calls.len() {
                return Err(ExecutionError::BatchResultShape {
                    target: target.clone(),
                    detail: format!(
                        "expected {} entries, got {}",
                        unit.logical_calls.len(),
                        physical.len()
                    ),
                }
                .into());
            }
            for (position, &call) in unit.logical_calls.iter().enumerate() {
                match self.mode {
                    BatchAccumulationMode::Sum => logical[call] += physical[position],
                    BatchAccumulationMode::LastWriteWins => logical[call] = physical[position],
                }
            }
        }
        Ok(logical)
    }
}
