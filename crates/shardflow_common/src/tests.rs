use std::cmp::Ordering;

use crate::datum::{cmp_datum, datum_add, decimal_to_string, encode_datum_key, Datum, OwnedRow};
use crate::error::{PaginationError, ShardFlowError};
use crate::result::{materialize, MemoryQueryResult, QueryResult};
use crate::statement::{
    compare_by_items, OrderByItem, PaginationKind, PaginationSpec, PaginationValue,
    StatementContext,
};

#[test]
fn test_cmp_datum_nulls_first() {
    assert_eq!(cmp_datum(&Datum::Null, &Datum::Int64(1)), Ordering::Less);
    assert_eq!(cmp_datum(&Datum::Int64(1), &Datum::Null), Ordering::Greater);
    assert_eq!(cmp_datum(&Datum::Null, &Datum::Null), Ordering::Equal);
}

#[test]
fn test_cmp_datum_cross_width_numeric() {
    assert_eq!(cmp_datum(&Datum::Int32(3), &Datum::Int64(4)), Ordering::Less);
    assert_eq!(
        cmp_datum(&Datum::Float64(2.5), &Datum::Int64(2)),
        Ordering::Greater
    );
    assert_eq!(
        cmp_datum(&Datum::Int32(7), &Datum::Float64(7.0)),
        Ordering::Equal
    );
}

#[test]
fn test_cmp_decimal_rescaling() {
    // 1.50 vs 1.5
    assert_eq!(
        cmp_datum(&Datum::Decimal(150, 2), &Datum::Decimal(15, 1)),
        Ordering::Equal
    );
    assert_eq!(
        cmp_datum(&Datum::Decimal(151, 2), &Datum::Decimal(15, 1)),
        Ordering::Greater
    );
}

#[test]
fn test_datum_add_null_identity() {
    assert_eq!(datum_add(&Datum::Null, &Datum::Int64(5)), Datum::Int64(5));
    assert_eq!(datum_add(&Datum::Int64(5), &Datum::Null), Datum::Int64(5));
    assert_eq!(
        datum_add(&Datum::Int32(2), &Datum::Int64(3)),
        Datum::Int64(5)
    );
    assert_eq!(
        datum_add(&Datum::Float64(1.5), &Datum::Int64(1)),
        Datum::Float64(2.5)
    );
}

#[test]
fn test_datum_add_decimal_rescaling() {
    assert_eq!(
        datum_add(&Datum::Decimal(1000, 2), &Datum::Decimal(500, 2)),
        Datum::Decimal(1500, 2)
    );
    // 1.5 + 1.25 = 2.75
    assert_eq!(
        datum_add(&Datum::Decimal(15, 1), &Datum::Decimal(125, 2)),
        Datum::Decimal(275, 2)
    );
    assert_eq!(
        datum_add(&Datum::Decimal(150, 2), &Datum::Int64(2)),
        Datum::Decimal(350, 2)
    );
    assert_eq!(
        datum_add(&Datum::Int32(1), &Datum::Decimal(5, 1)),
        Datum::Decimal(15, 1)
    );
    assert_eq!(
        datum_add(&Datum::Decimal(25, 1), &Datum::Float64(0.5)),
        Datum::Float64(3.0)
    );
}

#[test]
fn test_datum_add_saturates_at_i64_bounds() {
    assert_eq!(
        datum_add(&Datum::Int64(i64::MAX), &Datum::Int64(1)),
        Datum::Int64(i64::MAX)
    );
    assert_eq!(
        datum_add(&Datum::Int64(i64::MIN), &Datum::Int64(-1)),
        Datum::Int64(i64::MIN)
    );
}

#[test]
fn test_as_f64_widens_decimal() {
    assert_eq!(Datum::Decimal(275, 2).as_f64(), Some(2.75));
    assert_eq!(Datum::Decimal(-1, 3).as_f64(), Some(-0.001));
}

#[test]
fn test_encode_datum_key_distinguishes_types() {
    let mut a = Vec::new();
    let mut b = Vec::new();
    encode_datum_key(&mut a, &Datum::Int64(1));
    encode_datum_key(&mut b, &Datum::Boolean(true));
    assert_ne!(a, b);

    let mut c = Vec::new();
    let mut d = Vec::new();
    encode_datum_key(&mut c, &Datum::Text("ab".into()));
    encode_datum_key(&mut d, &Datum::Text("ab".into()));
    assert_eq!(c, d);
}

#[test]
fn test_decimal_to_string() {
    assert_eq!(decimal_to_string(12345, 2), "123.45");
    assert_eq!(decimal_to_string(-1, 3), "-0.001");
    assert_eq!(decimal_to_string(100, 0), "100");
}

#[test]
fn test_compare_by_items_direction() {
    let a = vec![Datum::Int64(1), Datum::Text("z".into())];
    let b = vec![Datum::Int64(1), Datum::Text("a".into())];
    let asc = [OrderByItem::asc(0), OrderByItem::asc(1)];
    let desc = [OrderByItem::asc(0), OrderByItem::desc(1)];
    assert_eq!(compare_by_items(&a, &b, &asc), Ordering::Greater);
    assert_eq!(compare_by_items(&a, &b, &desc), Ordering::Less);
}

#[test]
fn test_memory_query_result_cursor() {
    let mut qr = MemoryQueryResult::from_rows(
        1,
        vec![vec![Datum::Int64(1)], vec![Datum::Int64(2)]],
    );
    // value before first next is an error
    assert!(qr.value(0).is_err());
    assert!(qr.next().unwrap());
    assert_eq!(qr.value(0).unwrap(), Datum::Int64(1));
    assert!(qr.next().unwrap());
    assert_eq!(qr.value(0).unwrap(), Datum::Int64(2));
    assert!(!qr.next().unwrap());
    assert!(!qr.next().unwrap());
}

#[test]
fn test_memory_query_result_column_bounds() {
    let mut qr = MemoryQueryResult::from_rows(1, vec![vec![Datum::Int64(1)]]);
    assert!(qr.next().unwrap());
    match qr.value(3) {
        Err(ShardFlowError::Merge(_)) => {}
        other => panic!("expected merge error, got {:?}", other),
    }
}

#[test]
fn test_materialize_drains_source() {
    let src = MemoryQueryResult::from_rows(
        2,
        vec![
            vec![Datum::Int64(1), Datum::Text("a".into())],
            vec![Datum::Int64(2), Datum::Text("b".into())],
        ],
    );
    let mem = materialize(Box::new(src)).unwrap();
    assert_eq!(mem.row_count(), 2);
    assert_eq!(mem.column_count(), 2);
}

#[test]
fn test_pagination_resolve_literals() {
    let spec = PaginationSpec::limit(2, 3);
    let resolved = spec.resolve(&[]).unwrap();
    assert_eq!(resolved.offset, 2);
    assert_eq!(resolved.row_count, Some(3));
    assert!(!resolved.is_noop());
}

#[test]
fn test_pagination_resolve_parameters() {
    let spec = PaginationSpec {
        offset: Some(PaginationValue::Parameter(0)),
        row_count: Some(PaginationValue::Parameter(1)),
        kind: PaginationKind::Limit,
    };
    let resolved = spec
        .resolve(&[Datum::Int64(10), Datum::Int32(5)])
        .unwrap();
    assert_eq!(resolved.offset, 10);
    assert_eq!(resolved.row_count, Some(5));
}

#[test]
fn test_pagination_rejects_negative_and_unresolved() {
    let spec = PaginationSpec::limit(-1, 3);
    assert!(matches!(
        spec.resolve(&[]),
        Err(PaginationError::NegativeOffset(-1))
    ));

    let spec = PaginationSpec::limit(0, -2);
    assert!(matches!(
        spec.resolve(&[]),
        Err(PaginationError::NegativeRowCount(-2))
    ));

    let spec = PaginationSpec {
        offset: Some(PaginationValue::Parameter(7)),
        row_count: None,
        kind: PaginationKind::RowNumber,
    };
    assert!(matches!(
        spec.resolve(&[]),
        Err(PaginationError::UnresolvedParameter { index: 7 })
    ));
}

#[test]
fn test_group_by_prefix_of_order_by() {
    let ctx = StatementContext::new()
        .with_group_by(vec![OrderByItem::asc(0)])
        .with_order_by(vec![OrderByItem::asc(0), OrderByItem::desc(1)]);
    assert!(ctx.group_by_is_order_by_prefix());

    // direction mismatch
    let ctx = StatementContext::new()
        .with_group_by(vec![OrderByItem::desc(0)])
        .with_order_by(vec![OrderByItem::asc(0)]);
    assert!(!ctx.group_by_is_order_by_prefix());

    // group-by longer than order-by
    let ctx = StatementContext::new()
        .with_group_by(vec![OrderByItem::asc(0), OrderByItem::asc(1)])
        .with_order_by(vec![OrderByItem::asc(0)]);
    assert!(!ctx.group_by_is_order_by_prefix());
}

#[test]
fn test_owned_row_display() {
    let row = OwnedRow::new(vec![Datum::Int64(1), Datum::Text("x".into()), Datum::Null]);
    assert_eq!(format!("{}", row), "(1, x, NULL)");
}
