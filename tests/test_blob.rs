//! Blob segmentation and cancel-on-failure.

mod common;

use common::*;
use firebird_thin_rs::blob::{read_blob, read_blob_string, write_blob};
use firebird_thin_rs::protocol::constants::*;
use firebird_thin_rs::Blob;

#[tokio::test]
async fn test_write_splits_into_segments() {
    let mut db = attach(4).await;
    assert_eq!(db.segment_size(), 4);
    db.transport_mut()
        .push(response(3, 99, &[]))
        .push(ok())
        .push(ok())
        .push(ok())
        .push(ok());

    let id = write_blob(&mut db, 7, b"0123456789").await.unwrap();
    assert_eq!(id, 99);
    assert_eq!(
        db.transport().ops(),
        vec![
            OP_CREATE_BLOB2,
            OP_PUT_SEGMENT,
            OP_PUT_SEGMENT,
            OP_PUT_SEGMENT,
            OP_CLOSE_BLOB
        ]
    );
    // The last segment carries the remaining two bytes.
    let last = db.transport().payload(3);
    assert_eq!(&last[4..8], &[0, 0, 0, 2]);
}

#[tokio::test]
async fn test_read_collects_segments_until_eof() {
    let mut db = attach(8192).await;
    db.transport_mut()
        .push(ok_handle(3))
        .push(segments(BLOB_SEGMENT_PARTIAL, &[b"ab", b"cd"]))
        .push(segments(BLOB_SEGMENT_EOF, &[b"ef"]))
        .push(ok());

    let data = read_blob(&mut db, 7, 99).await.unwrap();
    assert_eq!(data, b"abcdef");
    assert_eq!(
        db.transport().ops(),
        vec![OP_OPEN_BLOB2, OP_GET_SEGMENT, OP_GET_SEGMENT, OP_CLOSE_BLOB]
    );
}

#[tokio::test]
async fn test_written_segments_read_back_unchanged() {
    let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    let mut db = attach(300).await;
    db.transport_mut().push(response(3, 99, &[]));
    for _ in 0..5 {
        db.transport_mut().push(ok());
    }
    write_blob(&mut db, 7, &data).await.unwrap();

    // Segment bytes follow the handle, the segment length and the buffer length.
    let written: Vec<Vec<u8>> = (1..=4)
        .map(|i| {
            let payload = db.transport().payload(i);
            let len = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]) as usize;
            payload[12..12 + len].to_vec()
        })
        .collect();
    assert!(written.iter().all(|segment| segment.len() <= 300));
    assert_eq!(db.transport().ops().last(), Some(&OP_CLOSE_BLOB));

    db.transport_mut().clear_sent();
    db.transport_mut().push(ok_handle(3));
    for (i, segment) in written.iter().enumerate() {
        let status = if i + 1 == written.len() {
            BLOB_SEGMENT_EOF
        } else {
            BLOB_SEGMENT_PARTIAL
        };
        db.transport_mut().push(segments(status, &[segment.as_slice()]));
    }
    db.transport_mut().push(ok());

    assert_eq!(read_blob(&mut db, 7, 99).await.unwrap(), data);
    assert_eq!(db.transport().pending_replies(), 0);
}

#[tokio::test]
async fn test_read_string_decodes_charset() {
    let mut db = attach(8192).await;
    db.transport_mut()
        .push(ok_handle(3))
        .push(segments(BLOB_SEGMENT_EOF, &["grüße".as_bytes()]))
        .push(ok());

    let charset = db.charsets().default_charset().clone();
    let text = read_blob_string(&mut db, 7, 99, &charset).await.unwrap();
    assert_eq!(text, "grüße");
}

#[tokio::test]
async fn test_write_failure_cancels_before_error() {
    let mut db = attach(4).await;
    db.transport_mut()
        .push(response(3, 99, &[]))
        .push(ok())
        .push(error_response(335544321, "foo"))
        .push(ok());

    let err = write_blob(&mut db, 7, b"0123456789").await.unwrap_err();
    assert_eq!(err.isc_code(), Some(335544321));
    assert_eq!(
        db.transport().ops(),
        vec![
            OP_CREATE_BLOB2,
            OP_PUT_SEGMENT,
            OP_PUT_SEGMENT,
            OP_CANCEL_BLOB
        ]
    );
    assert_eq!(db.transport().pending_replies(), 0);
}

#[tokio::test]
async fn test_read_failure_keeps_original_error_when_cancel_fails() {
    let mut db = attach(8192).await;
    db.transport_mut()
        .push(ok_handle(3))
        .push(error_response(335544329, ""))
        .push(error_response(335544328, ""));

    let err = read_blob(&mut db, 7, 99).await.unwrap_err();
    assert_eq!(err.isc_code(), Some(335544329));
    assert_eq!(
        db.transport().ops(),
        vec![OP_OPEN_BLOB2, OP_GET_SEGMENT, OP_CANCEL_BLOB]
    );
}

#[tokio::test]
async fn test_blob_handle_round_trip() {
    let mut db = attach(8192).await;
    db.transport_mut()
        .push(response(4, 1234, &[]))
        .push(ok())
        .push(ok())
        .push(ok());

    let mut blob = Blob::create(&mut db, 7).await.unwrap();
    assert_eq!(blob.id(), 1234);
    assert_eq!(blob.handle(), 4);
    blob.put_segment(&mut db, b"xyz").await.unwrap();
    blob.close(&mut db).await.unwrap();
    // Closed blobs ignore a second close and a cancel.
    blob.close(&mut db).await.unwrap();
    blob.cancel(&mut db).await.unwrap();
    assert_eq!(
        db.transport().ops(),
        vec![OP_CREATE_BLOB2, OP_PUT_SEGMENT, OP_CLOSE_BLOB]
    );
    assert_eq!(db.transport().pending_replies(), 1);
}
