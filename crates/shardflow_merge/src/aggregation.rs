//! Aggregation units: re-aggregate partial per-unit results into the
//! logical value.
//!
//! COUNT and SUM partials add; MIN/MAX partials compare; AVG cannot be
//! merged from per-unit averages at all, so it reads the derived COUNT
//! and SUM columns the rewriter appends and divides at the end.

use std::cmp::Ordering;

use shardflow_common::datum::{cmp_datum, datum_add, Datum};
use shardflow_common::error::{FlowResult, MergeError};
use shardflow_common::statement::{AggregationType, Projection};

/// One in-flight aggregation. `merge` is fed the relevant column values
/// of each partial row; `result` yields the final datum.
pub trait AggregationUnit: Send {
    fn merge(&mut self, values: &[Datum]);

    fn result(&self) -> Datum;
}

/// Additive aggregation (COUNT, SUM). NULL partials are skipped; a
/// group whose partials were all NULL yields NULL, per SQL semantics.
struct Accumulator {
    total: Datum,
}

impl AggregationUnit for Accumulator {
    fn merge(&mut self, values: &[Datum]) {
        if let Some(v) = values.first() {
            if !v.is_null() {
                self.total = datum_add(&self.total, v);
            }
        }
    }

    fn result(&self) -> Datum {
        self.total.clone()
    }
}

/// Order-based aggregation (MIN, MAX).
struct Comparable {
    keep: Ordering,
    best: Option<Datum>,
}

impl AggregationUnit for Comparable {
    fn merge(&mut self, values: &[Datum]) {
        let Some(v) = values.first() else { return };
        if v.is_null() {
            return;
        }
        match &self.best {
            None => self.best = Some(v.clone()),
            Some(b) => {
                if cmp_datum(v, b) == self.keep {
                    self.best = Some(v.clone());
                }
            }
        }
    }

    fn result(&self) -> Datum {
        self.best.clone().unwrap_or(Datum::Null)
    }
}

/// AVG over partial (count, sum) pairs. Divides once at the end;
/// zero total count yields NULL.
struct Average {
    count: Datum,
    sum: Datum,
}

impl AggregationUnit for Average {
    fn merge(&mut self, values: &[Datum]) {
        if let [count, sum] = values {
            if !count.is_null() {
                self.count = datum_add(&self.count, count);
            }
            if !sum.is_null() {
                self.sum = datum_add(&self.sum, sum);
            }
        }
    }

    fn result(&self) -> Datum {
        match (self.count.as_f64(), self.sum.as_f64()) {
            (Some(count), Some(sum)) if count != 0.0 => Datum::Float64(sum / count),
            _ => Datum::Null,
        }
    }
}

fn make_unit(func: AggregationType) -> Box<dyn AggregationUnit> {
    match func {
        AggregationType::Count | AggregationType::Sum => {
            Box::new(Accumulator { total: Datum::Null })
        }
        AggregationType::Min => Box::new(Comparable {
            keep: Ordering::Less,
            best: None,
        }),
        AggregationType::Max => Box::new(Comparable {
            keep: Ordering::Greater,
            best: None,
        }),
        AggregationType::Avg => Box::new(Average {
            count: Datum::Null,
            sum: Datum::Null,
        }),
    }
}

enum AggInputs {
    Single(usize),
    CountSum { count_index: usize, sum_index: usize },
}

/// An aggregation projection bound to its input column(s) and unit.
pub struct AggBinding {
    /// Output column the final value lands in.
    pub column_index: usize,
    inputs: AggInputs,
    unit: Box<dyn AggregationUnit>,
}

impl AggBinding {
    pub fn feed(&mut self, row: &[Datum]) {
        match self.inputs {
            AggInputs::Single(index) => {
                let v = row.get(index).cloned().unwrap_or(Datum::Null);
                self.unit.merge(&[v]);
            }
            AggInputs::CountSum {
                count_index,
                sum_index,
            } => {
                let count = row.get(count_index).cloned().unwrap_or(Datum::Null);
                let sum = row.get(sum_index).cloned().unwrap_or(Datum::Null);
                self.unit.merge(&[count, sum]);
            }
        }
    }

    pub fn result(&self) -> Datum {
        self.unit.result()
    }
}

/// Build one binding per aggregation projection. AVG without rewritten
/// COUNT/SUM columns is unmergeable and rejected up front.
pub fn bind_aggregations(projections: &[Projection]) -> FlowResult<Vec<AggBinding>> {
    let mut bindings = Vec::new();
    for projection in projections {
        let Projection::Aggregation {
            func,
            column_index,
            derived,
            ..
        } = projection
        else {
            continue;
        };
        let inputs = match func {
            AggregationType::Avg => {
                let derived = derived.ok_or(MergeError::MissingDerivedColumns {
                    func: AggregationType::Avg.name(),
                })?;
                AggInputs::CountSum {
                    count_index: derived.count_index,
                    sum_index: derived.sum_index,
                }
            }
            _ => AggInputs::Single(*column_index),
        };
        bindings.push(AggBinding {
            column_index: *column_index,
            inputs,
            unit: make_unit(*func),
        });
    }
    Ok(bindings)
}
