//! Array columns: catalog lookup, slice read and write.

mod common;

use common::*;
use firebird_thin_rs::protocol::constants::*;
use firebird_thin_rs::protocol::WriteExt;
use firebird_thin_rs::{
    ArrayBound, ArrayColumn, ArrayDesc, ArrayValue, Database, DbValue, Error, Statement,
    Transaction, TransactionParameterBuffer,
};

fn long_vector(lower: i32, upper: i32) -> ArrayDesc {
    ArrayDesc {
        blr_type: BLR_LONG,
        scale: 0,
        length: 4,
        bounds: vec![ArrayBound::new(lower, upper)],
        flags: 0,
        relation_name: "T".into(),
        field_name: "A".into(),
    }
}

fn slice_reply(values: &[i32]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u32(OP_SLICE);
    out.write_i32(values.len() as i32 * 4);
    out.write_i32(values.len() as i32 * 4);
    for &value in values {
        out.write_i32(value);
    }
    out
}

/// Replies for the two catalog queries describing a 1-dimensional
/// INTEGER array with bounds `[lower, upper]`.
fn push_catalog(db: &mut Database<ScriptedTransport>, lower: i32, upper: i32) {
    let names = [("P", SQL_VARYING + 1, 31), ("P", SQL_VARYING + 1, 31)];
    let field_columns = [
        ("RDB$FIELD_TYPE", SQL_SHORT + 1, 2),
        ("RDB$FIELD_SCALE", SQL_SHORT + 1, 2),
        ("RDB$FIELD_LENGTH", SQL_SHORT + 1, 2),
        ("RDB$DIMENSIONS", SQL_SHORT + 1, 2),
    ];
    let bound_columns = [
        ("RDB$LOWER_BOUND", SQL_LONG + 1, 4),
        ("RDB$UPPER_BOUND", SQL_LONG + 1, 4),
    ];
    db.transport_mut()
        .push(ok_handle(10))
        .push(ok_data(&describe_fields(
            ISC_INFO_SQL_STMT_SELECT,
            &field_columns,
            &names,
        )))
        .push(ok())
        .push(fetch_rows(&[&[BLR_LONG as i32, 0, 4, 1]], true))
        .push(ok())
        .push(ok_handle(11))
        .push(ok_data(&describe_fields(
            ISC_INFO_SQL_STMT_SELECT,
            &bound_columns,
            &names,
        )))
        .push(ok())
        .push(fetch_rows(&[&[lower, upper]], true))
        .push(ok());
}

const CATALOG_OPS: [u32; 5] = [
    OP_ALLOCATE_STATEMENT,
    OP_PREPARE_STATEMENT,
    OP_EXECUTE,
    OP_FETCH,
    OP_FREE_STATEMENT,
];

async fn begin(db: &mut Database<ScriptedTransport>) -> Transaction {
    db.transport_mut().push(ok_handle(7));
    let tx = Transaction::begin(db, &TransactionParameterBuffer::read_committed())
        .await
        .unwrap();
    db.transport_mut().clear_sent();
    tx
}

#[tokio::test]
async fn test_write_then_read_preset_shape() {
    let mut db = attach(8192).await;
    let column = ArrayColumn::new(long_vector(1, 3)).unwrap();
    assert_eq!(column.slice_byte_length(), 12);

    db.transport_mut()
        .push(response(0, 555, &[]))
        .push(slice_reply(&[10, 20, 30]));

    let value = ArrayValue::from_vec(vec![
        DbValue::Integer(10),
        DbValue::Integer(20),
        DbValue::Integer(30),
    ]);
    let id = column.write(&mut db, 7, &value).await.unwrap();
    assert_eq!(id, 555);

    let payload = db.transport().payload(0);
    let mut expected = Vec::new();
    for v in [10i32, 20, 30] {
        expected.extend_from_slice(&v.to_be_bytes());
    }
    assert_eq!(&payload[payload.len() - 12..], expected.as_slice());

    let read = column.read(&mut db, 7, 555).await.unwrap();
    assert_eq!(read.extents(), &[3]);
    assert_eq!(read.lower_bounds(), &[1]);
    assert_eq!(read.get(&[2]), Some(&DbValue::Integer(20)));
    assert_eq!(db.transport().ops(), vec![OP_PUT_SLICE, OP_GET_SLICE]);
}

#[tokio::test]
async fn test_write_rejects_wrong_rank() {
    let mut db = attach(8192).await;
    let column = ArrayColumn::new(long_vector(1, 4)).unwrap();
    let value = ArrayValue::new(vec![DbValue::Integer(1); 4], vec![2, 2]).unwrap();
    assert!(matches!(
        column.write(&mut db, 7, &value).await,
        Err(Error::InvalidDimensions {
            expected: 1,
            actual: 2
        })
    ));
    assert!(db.transport().ops().is_empty());
}

#[tokio::test]
async fn test_lookup_reads_catalog() {
    let mut db = attach(8192).await;
    let tx = begin(&mut db).await;
    push_catalog(&mut db, 0, 9);

    let column = ArrayColumn::lookup(&mut db, &tx.bind(), "T", "A")
        .await
        .unwrap();
    assert_eq!(column.desc().blr_type, BLR_LONG);
    assert_eq!(column.desc().bounds, vec![ArrayBound::new(0, 9)]);
    assert_eq!(column.slice_byte_length(), 40);

    let expected: Vec<u32> = CATALOG_OPS.iter().chain(CATALOG_OPS.iter()).copied().collect();
    assert_eq!(db.transport().ops(), expected);
    assert_eq!(db.transport().pending_replies(), 0);
}

#[tokio::test]
async fn test_lookup_missing_column() {
    let mut db = attach(8192).await;
    let tx = begin(&mut db).await;
    let names = [("P", SQL_VARYING + 1, 31), ("P", SQL_VARYING + 1, 31)];
    db.transport_mut()
        .push(ok_handle(10))
        .push(ok_data(&describe_fields(
            ISC_INFO_SQL_STMT_SELECT,
            &[("RDB$FIELD_TYPE", SQL_SHORT + 1, 2)],
            &names,
        )))
        .push(ok())
        .push(fetch_rows(&[], true))
        .push(ok());

    let err = ArrayColumn::lookup(&mut db, &tx.bind(), "T", "NOPE").await;
    assert!(matches!(err, Err(Error::ArrayMetadataNotFound { .. })));
    // The catalog statement is released even on failure.
    assert_eq!(db.transport().ops(), CATALOG_OPS.to_vec());
}

#[tokio::test]
async fn test_fetch_materializes_array_column() {
    let mut db = attach(8192).await;
    let tx = begin(&mut db).await;

    db.transport_mut().push(ok_handle(5)).push(ok_data(&describe_fields(
        ISC_INFO_SQL_STMT_SELECT,
        &[("A", SQL_ARRAY + 1, 8)],
        &[],
    )));
    let mut stmt = Statement::for_database(&db);
    stmt.prepare(&mut db, &tx, "SELECT A FROM T").await.unwrap();

    let mut rows = Vec::new();
    for id in [77i64, 78] {
        rows.write_u32(OP_FETCH_RESPONSE);
        rows.write_i32(0);
        rows.write_i32(1);
        rows.write_i64(id);
        rows.write_i32(0);
    }
    rows.write_u32(OP_FETCH_RESPONSE);
    rows.write_i32(FETCH_NO_MORE_ROWS);
    rows.write_i32(0);

    db.transport_mut().push(ok()).push(rows);
    push_catalog(&mut db, 1, 2);
    db.transport_mut()
        .push(slice_reply(&[4, 5]))
        .push(slice_reply(&[6, 7]));
    db.transport_mut().clear_sent();

    stmt.execute(&mut db).await.unwrap();
    let first = stmt.fetch(&mut db).await.unwrap().unwrap();
    let array = first.get(0).and_then(DbValue::as_array).unwrap();
    assert_eq!(array.elements(), &[DbValue::Integer(4), DbValue::Integer(5)]);

    // The shape is cached, so the second row goes straight to the slice.
    let second = stmt.fetch(&mut db).await.unwrap().unwrap();
    let array = second.get(0).and_then(DbValue::as_array).unwrap();
    assert_eq!(array.get(&[2]), Some(&DbValue::Integer(7)));

    let mut expected = vec![OP_EXECUTE, OP_FETCH];
    expected.extend(CATALOG_OPS);
    expected.extend(CATALOG_OPS);
    expected.extend([OP_GET_SLICE, OP_GET_SLICE]);
    assert_eq!(db.transport().ops(), expected);
}
