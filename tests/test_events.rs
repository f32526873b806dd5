//! Event subscriptions against a scripted transport.

mod common;

use bytes::Bytes;
use common::*;
use firebird_thin_rs::protocol::constants::*;
use firebird_thin_rs::{EventNotification, EventParameterBuffer, RemoteEvent};

fn notification(local_id: i32, events: &[(&str, i32)]) -> EventNotification {
    let epb = EventParameterBuffer::with_events(events.iter().copied());
    EventNotification {
        db_handle: 1,
        epb: Bytes::copy_from_slice(epb.as_bytes()),
        local_id,
    }
}

#[tokio::test]
async fn test_queue_notify_requeue_cancel() {
    let mut db = attach(8192).await;
    let event = RemoteEvent::new(["ORDER_PLACED", "ORDER_SHIPPED"], 3).unwrap();

    db.transport_mut()
        .push(ok_handle(40))
        .push(ok_handle(41))
        .push(ok());

    event.queue(&mut db).await.unwrap();
    assert_eq!(event.remote_id().await, Some(40));
    let expected_epb = EventParameterBuffer::with_events([("ORDER_PLACED", 0), ("ORDER_SHIPPED", 0)]);
    assert!(db
        .transport()
        .payload(0)
        .windows(expected_epb.len())
        .any(|w| w == expected_epb.as_bytes()));

    let fired = event
        .handle_notification(&mut db, &notification(3, &[("ORDER_PLACED", 2), ("ORDER_SHIPPED", 0)]))
        .await
        .unwrap();
    assert_eq!(fired, vec![("ORDER_PLACED".to_string(), 2)]);
    assert_eq!(event.remote_id().await, Some(41));

    event.cancel(&mut db).await.unwrap();
    assert_eq!(event.remote_id().await, None);
    // A late notification after cancel is ignored and not re-queued.
    let fired = event
        .handle_notification(&mut db, &notification(3, &[("ORDER_PLACED", 5)]))
        .await
        .unwrap();
    assert!(fired.is_empty());

    assert_eq!(
        db.transport().ops(),
        vec![OP_QUE_EVENTS, OP_QUE_EVENTS, OP_CANCEL_EVENTS]
    );
    assert_eq!(
        event.counts().await,
        vec![
            ("ORDER_PLACED".to_string(), 2),
            ("ORDER_SHIPPED".to_string(), 0)
        ]
    );
}

#[tokio::test]
async fn test_notification_for_other_subscription() {
    let mut db = attach(8192).await;
    let event = RemoteEvent::new(["A"], 3).unwrap();
    let result = event
        .handle_notification(&mut db, &notification(4, &[("A", 1)]))
        .await;
    assert!(result.is_err());
    assert!(db.transport().ops().is_empty());
}

#[tokio::test]
async fn test_cancel_when_not_queued_sends_nothing() {
    let mut db = attach(8192).await;
    let event = RemoteEvent::new(["A"], 3).unwrap();
    event.cancel(&mut db).await.unwrap();
    assert!(db.transport().ops().is_empty());
}
