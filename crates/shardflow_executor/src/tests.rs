use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use shardflow_common::datum::Datum;
use shardflow_common::error::{ExecutionError, ShardFlowError};
use shardflow_common::unit::{ExecutionUnit, TargetId};

use crate::batch::{BatchAccumulationMode, BatchAccumulator};
use crate::events::{ExecutionListener, UnitExecutionEvent, UnitOutcome};
use crate::executor::{ExecutionGroupContext, FanoutConfig, FanoutExecutor};

fn unit(target: &str, sql: &str) -> ExecutionUnit {
    ExecutionUnit::new(target, sql, vec![])
}

fn units_on_distinct_targets(n: usize) -> Vec<ExecutionUnit> {
    (0..n)
        .map(|i| unit(&format!("ds_{}", i), "SELECT 1"))
        .collect()
}

#[test]
fn test_results_preserve_input_order_under_skewed_delays() {
    let executor = FanoutExecutor::new(FanoutConfig { max_workers: 4 });
    let ctx = ExecutionGroupContext::new();
    let units = units_on_distinct_targets(6);
    // Earlier units sleep longer, so completion order inverts input order.
    let delays_ms = [40u64, 29, 23, 11, 5, 1];

    let results = executor
        .run(&ctx, &units, |idx, _unit| {
            std::thread::sleep(Duration::from_millis(delays_ms[idx]));
            Ok(idx)
        })
        .unwrap();

    assert_eq!(results, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn test_same_target_callbacks_are_serialized() {
    let executor = FanoutExecutor::new(FanoutConfig { max_workers: 4 });
    let ctx = ExecutionGroupContext::new();
    // Four units, all against the same data source.
    let units: Vec<_> = (0..4).map(|_| unit("ds_shared", "UPDATE t SET x = 1")).collect();

    let in_flight = AtomicBool::new(false);
    let overlapped = AtomicBool::new(false);

    executor
        .run(&ctx, &units, |_idx, _unit| {
            if in_flight.swap(true, Ordering::SeqCst) {
                overlapped.store(true, Ordering::SeqCst);
            }
            std::thread::sleep(Duration::from_millis(5));
            in_flight.store(false, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    assert!(
        !overlapped.load(Ordering::SeqCst),
        "two callbacks overlapped on one connection"
    );
}

#[test]
fn test_fail_fast_returns_first_error_in_unit_order_after_running_all() {
    let executor = FanoutExecutor::new(FanoutConfig { max_workers: 4 });
    let ctx = ExecutionGroupContext::new();
    let units = units_on_distinct_targets(5);
    let executed = AtomicUsize::new(0);

    let result: Result<Vec<()>, _> = executor.run(&ctx, &units, |idx, u| {
        executed.fetch_add(1, Ordering::SeqCst);
        if idx == 1 || idx == 3 {
            Err(ExecutionError::UnitFailed {
                target: u.target.clone(),
                message: format!("boom {}", idx),
            }
            .into())
        } else {
            Ok(())
        }
    });

    // Every callback still ran: nothing is abandoned under fail-fast.
    assert_eq!(executed.load(Ordering::SeqCst), 5);
    match result {
        Err(ShardFlowError::Execution(ExecutionError::UnitFailed { target, message })) => {
            assert_eq!(target, TargetId::new("ds_1"));
            assert_eq!(message, "boom 1");
        }
        other => panic!("expected unit 1 error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_collect_keeps_errors_attached_to_slots() {
    let executor = FanoutExecutor::new(FanoutConfig { max_workers: 2 });
    let ctx = ExecutionGroupContext::new();
    let units = units_on_distinct_targets(3);

    let results = executor.run_collect(&ctx, &units, |idx, u| {
        if idx == 1 {
            Err(ExecutionError::UnitFailed {
                target: u.target.clone(),
                message: "bad".to_string(),
            }
            .into())
        } else {
            Ok(idx * 10)
        }
    });

    assert_eq!(results.len(), 3);
    assert_eq!(*results[0].as_ref().unwrap(), 0);
    assert!(results[1].is_err());
    assert_eq!(*results[2].as_ref().unwrap(), 20);
}

#[test]
fn test_callback_panic_surfaces_as_worker_panicked() {
    let executor = FanoutExecutor::new(FanoutConfig { max_workers: 2 });
    let ctx = ExecutionGroupContext::new();
    let units = units_on_distinct_targets(3);

    let results = executor.run_collect(&ctx, &units, |idx, _unit| {
        if idx == 2 {
            panic!("driver blew up");
        }
        Ok(idx)
    });

    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(matches!(
        results[2],
        Err(ShardFlowError::Execution(ExecutionError::WorkerPanicked { .. }))
    ));
}

#[test]
fn test_serial_config_runs_everything_on_caller_thread() {
    let executor = FanoutExecutor::new(FanoutConfig::serial());
    let ctx = ExecutionGroupContext::new();
    let units = units_on_distinct_targets(4);
    let caller = std::thread::current().id();

    let results = executor
        .run(&ctx, &units, |idx, _unit| {
            assert_eq!(std::thread::current().id(), caller);
            Ok(idx)
        })
        .unwrap();

    assert_eq!(results, vec![0, 1, 2, 3]);
}

#[test]
fn test_empty_unit_list() {
    let executor = FanoutExecutor::new(FanoutConfig::default());
    let ctx = ExecutionGroupContext::new();
    let results: Vec<i32> = executor.run(&ctx, &[], |_, _| Ok(0)).unwrap();
    assert!(results.is_empty());
}

#[derive(Default)]
struct RecordingListener {
    starts: Mutex<Vec<usize>>,
    finishes: Mutex<Vec<(usize, bool)>>,
}

impl ExecutionListener for RecordingListener {
    fn on_execution_start(&self, event: &UnitExecutionEvent<'_>) {
        assert!(event.outcome.is_none());
        self.starts.lock().push(event.unit_index);
    }

    fn on_execution_finish(&self, event: &UnitExecutionEvent<'_>) {
        let ok = matches!(event.outcome, Some(UnitOutcome::Succeeded));
        self.finishes.lock().push((event.unit_index, ok));
    }
}

#[test]
fn test_listeners_observe_every_unit_without_affecting_results() {
    let executor = FanoutExecutor::new(FanoutConfig { max_workers: 3 });
    let listener = Arc::new(RecordingListener::default());
    let ctx = ExecutionGroupContext::new().with_listener(listener.clone());
    let units = units_on_distinct_targets(4);

    let results = executor.run_collect(&ctx, &units, |idx, u| {
        if idx == 2 {
            Err(ExecutionError::UnitFailed {
                target: u.target.clone(),
                message: "nope".to_string(),
            }
            .into())
        } else {
            Ok(idx)
        }
    });
    assert_eq!(results.len(), 4);

    let mut starts = listener.starts.lock().clone();
    starts.sort_unstable();
    assert_eq!(starts, vec![0, 1, 2, 3]);

    let finishes = listener.finishes.lock().clone();
    assert_eq!(finishes.len(), 4);
    for (idx, ok) in finishes {
        assert_eq!(ok, idx != 2);
    }
}

#[test]
fn test_parameters_visible_to_listener() {
    struct ParamCheck;
    impl ExecutionListener for ParamCheck {
        fn on_execution_start(&self, event: &UnitExecutionEvent<'_>) {
            assert_eq!(event.parameters, &[Datum::Int64(42)]);
            assert_eq!(event.sql, "SELECT ?");
        }
        fn on_execution_finish(&self, _event: &UnitExecutionEvent<'_>) {}
    }

    let executor = FanoutExecutor::new(FanoutConfig::default());
    let ctx = ExecutionGroupContext::new().with_listener(Arc::new(ParamCheck));
    let units = vec![ExecutionUnit::new("ds_0", "SELECT ?", vec![Datum::Int64(42)])];
    executor.run(&ctx, &units, |_, _| Ok(())).unwrap();
}

// ── BatchAccumulator ────────────────────────────────────────────────

#[test]
fn test_batch_accumulate_sum() {
    // Calls 0,1 → unit A; call 2 → unit B.
    let mut acc = BatchAccumulator::new(BatchAccumulationMode::Sum);
    acc.add_batch([TargetId::new("a")]);
    acc.add_batch([TargetId::new("a")]);
    acc.add_batch([TargetId::new("b")]);
    assert_eq!(acc.logical_call_count(), 3);

    let mut per_unit = HashMap::new();
    per_unit.insert(TargetId::new("a"), vec![1, 1]);
    per_unit.insert(TargetId::new("b"), vec![1]);
    assert_eq!(acc.accumulate(&per_unit).unwrap(), vec![1, 1, 1]);
}

#[test]
fn test_batch_accumulate_sums_across_units_touched_by_one_call() {
    // Call 0 fans out to both units; call 1 only to A.
    let mut acc = BatchAccumulator::new(BatchAccumulationMode::Sum);
    acc.add_batch([TargetId::new("a"), TargetId::new("b")]);
    acc.add_batch([TargetId::new("a")]);

    let mut per_unit = HashMap::new();
    per_unit.insert(TargetId::new("a"), vec![2, 3]);
    per_unit.insert(TargetId::new("b"), vec![4]);
    assert_eq!(acc.accumulate(&per_unit).unwrap(), vec![6, 3]);
}

#[test]
fn test_batch_accumulate_last_write_wins() {
    let mut acc = BatchAccumulator::new(BatchAccumulationMode::LastWriteWins);
    acc.add_batch([TargetId::new("a"), TargetId::new("b")]);
    acc.add_batch([TargetId::new("a")]);

    let mut per_unit = HashMap::new();
    per_unit.insert(TargetId::new("a"), vec![2, 3]);
    per_unit.insert(TargetId::new("b"), vec![4]);
    // Unit B touched call 0 after A in insertion order, so its value wins.
    assert_eq!(acc.accumulate(&per_unit).unwrap(), vec![4, 3]);
}

#[test]
fn test_batch_last_write_wins_no_summing_of_overlaps() {
    let mut acc = BatchAccumulator::new(BatchAccumulationMode::LastWriteWins);
    acc.add_batch([TargetId::new("a")]);
    acc.add_batch([TargetId::new("a")]);

    let mut per_unit = HashMap::new();
    per_unit.insert(TargetId::new("a"), vec![1, 1]);
    // Each logical entry is exactly its physical value, never a sum.
    assert_eq!(acc.accumulate(&per_unit).unwrap(), vec![1, 1]);
}

#[test]
fn test_batch_route_units_snapshot() {
    let mut acc = BatchAccumulator::new(BatchAccumulationMode::Sum);
    acc.add_batch([TargetId::new("a")]);
    acc.add_batch([TargetId::new("b"), TargetId::new("a")]);

    let routes = acc.route_units();
    assert_eq!(routes.len(), 2);
    assert_eq!(routes[0].target, TargetId::new("a"));
    assert_eq!(routes[0].logical_call_indices, vec![0, 1]);
    assert_eq!(routes[1].target, TargetId::new("b"));
    assert_eq!(routes[1].logical_call_indices, vec![1]);
}

#[test]
fn test_batch_duplicate_target_within_one_call_reuses_position() {
    let mut acc = BatchAccumulator::new(BatchAccumulationMode::Sum);
    acc.add_batch([TargetId::new("a"), TargetId::new("a")]);

    let routes = acc.route_units();
    assert_eq!(routes[0].logical_call_indices, vec![0]);
}

#[test]
fn test_batch_shape_errors() {
    let mut acc = BatchAccumulator::new(BatchAccumulationMode::Sum);
    acc.add_batch([TargetId::new("a")]);

    // Missing unit result.
    let empty = HashMap::new();
    assert!(matches!(
        acc.accumulate(&empty),
        Err(ShardFlowError::Execution(ExecutionError::BatchResultShape { .. }))
    ));

    // Wrong length.
    let mut per_unit = HashMap::new();
    per_unit.insert(TargetId::new("a"), vec![1, 2, 3]);
    assert!(matches!(
        acc.accumulate(&per_unit),
        Err(ShardFlowError::Execution(ExecutionError::BatchResultShape { .. }))
    ));
}
