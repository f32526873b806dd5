//! Remote event subscriptions.
//!
//! A subscription lists event names with the last count seen for each. The
//! server answers a queued EPB once any count moves past the listed value;
//! the reply carries the new counts and the subscription is re-queued with
//! them. Delivery can race with cancellation, so every state change goes
//! through the shared lock.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::database::Database;
use crate::error::{Error, Result};
use crate::protocol::buffer::ReadBuffer;
use crate::protocol::constants::*;
use crate::protocol::messages::{CancelEventsMessage, QueueEventsMessage};
use crate::protocol::param_buffer::EventParameterBuffer;
use crate::protocol::response::read_op;
use crate::protocol::transport::Transport;

/// Event names longer than this cannot be encoded in an EPB.
pub const MAX_EVENT_NAME_LENGTH: usize = 255;

/// An op_event notification delivered on the auxiliary channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNotification {
    pub db_handle: i32,
    pub epb: Bytes,
    pub local_id: i32,
}

/// Parse an op_event packet, including its op code.
pub fn parse_event_notification(buf: &mut ReadBuffer) -> Result<EventNotification> {
    let op = read_op(buf)?;
    if op != OP_EVENT {
        return Err(Error::UnexpectedOperation {
            expected: OP_EVENT,
            actual: op,
        });
    }
    let db_handle = buf.read_i32()?;
    let epb = buf.read_buffer()?;
    buf.skip(8)?; // ast routine and argument
    let local_id = buf.read_i32()?;
    Ok(EventNotification {
        db_handle,
        epb,
        local_id,
    })
}

#[derive(Debug)]
struct EventState {
    names: Vec<String>,
    counts: Vec<i32>,
    local_id: i32,
    remote_id: Option<i32>,
}

impl EventState {
    fn to_epb(&self) -> EventParameterBuffer {
        EventParameterBuffer::with_events(
            self.names
                .iter()
                .map(String::as_str)
                .zip(self.counts.iter().copied()),
        )
    }
}

/// A subscription to named server events.
///
/// Cloning shares the subscription.
#[derive(Debug, Clone)]
pub struct RemoteEvent {
    state: Arc<Mutex<EventState>>,
}

impl RemoteEvent {
    /// Subscribe to `names`; `local_id` identifies the subscription in
    /// op_event notifications.
    pub fn new<I, S>(names: I, local_id: i32) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(Error::configuration("No events to subscribe to"));
        }
        if let Some(name) = names
            .iter()
            .find(|name| name.is_empty() || name.len() > MAX_EVENT_NAME_LENGTH)
        {
            return Err(Error::configuration(format!(
                "Invalid event name '{}'",
                name
            )));
        }
        let counts = vec![0; names.len()];
        Ok(Self {
            state: Arc::new(Mutex::new(EventState {
                names,
                counts,
                local_id,
                remote_id: None,
            })),
        })
    }

    /// Subscription id used in notifications.
    pub async fn local_id(&self) -> i32 {
        self.state.lock().await.local_id
    }

    /// Server-side id, set while queued.
    pub async fn remote_id(&self) -> Option<i32> {
        self.state.lock().await.remote_id
    }

    /// Event names with their last seen counts.
    pub async fn counts(&self) -> Vec<(String, i32)> {
        let state = self.state.lock().await;
        state
            .names
            .iter()
            .cloned()
            .zip(state.counts.iter().copied())
            .collect()
    }

    /// EPB for the current counts.
    pub async fn to_epb(&self) -> EventParameterBuffer {
        self.state.lock().await.to_epb()
    }

    /// Queue the subscription with the current counts.
    pub async fn queue<T: Transport>(&self, db: &mut Database<T>) -> Result<()> {
        let mut state = self.state.lock().await;
        let epb = state.to_epb();
        let response = db
            .execute(&QueueEventsMessage {
                db_handle: db.handle(),
                epb: epb.as_bytes(),
                local_id: state.local_id,
            })
            .await?;
        state.remote_id = Some(response.handle);
        tracing::debug!(
            local_id = state.local_id,
            remote_id = response.handle,
            events = state.names.len(),
            "events queued"
        );
        Ok(())
    }

    /// Cancel a queued subscription. Does nothing when not queued.
    pub async fn cancel<T: Transport>(&self, db: &mut Database<T>) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(event_id) = state.remote_id else {
            return Ok(());
        };
        db.execute(&CancelEventsMessage {
            db_handle: db.handle(),
            event_id,
        })
        .await?;
        state.remote_id = None;
        tracing::debug!(local_id = state.local_id, event_id, "events cancelled");
        Ok(())
    }

    /// Apply the counts carried by a notification EPB.
    ///
    /// Returns each event whose count grew, with the increase. Names the
    /// subscription does not list are ignored. A cancelled subscription
    /// drops late notifications.
    pub async fn update_counts(&self, epb: &[u8]) -> Result<Vec<(String, i32)>> {
        let mut state = self.state.lock().await;
        if state.remote_id.is_none() {
            tracing::trace!(local_id = state.local_id, "notification after cancel dropped");
            return Ok(Vec::new());
        }

        let (&version, mut rest) = epb
            .split_first()
            .ok_or_else(|| Error::protocol("Empty event buffer"))?;
        if version != EPB_VERSION1 {
            return Err(Error::protocol(format!(
                "Unsupported event buffer version {}",
                version
            )));
        }

        let mut fired = Vec::new();
        while let Some((&len, tail)) = rest.split_first() {
            let len = len as usize;
            if tail.len() < len + 4 {
                return Err(Error::protocol("Truncated event buffer"));
            }
            let (name, tail) = tail.split_at(len);
            let (count, tail) = tail.split_at(4);
            rest = tail;

            let count = i32::from_le_bytes([count[0], count[1], count[2], count[3]]);
            let Some(index) = state.names.iter().position(|n| n.as_bytes() == name) else {
                continue;
            };
            let delta = count - state.counts[index];
            state.counts[index] = count;
            if delta > 0 {
                fired.push((state.names[index].clone(), delta));
            }
        }
        // Delivered notifications are one-shot; the caller queues again.
        state.remote_id = None;
        Ok(fired)
    }

    /// Apply a notification and queue the subscription again.
    pub async fn handle_notification<T: Transport>(
        &self,
        db: &mut Database<T>,
        notification: &EventNotification,
    ) -> Result<Vec<(String, i32)>> {
        let local_id = self.local_id().await;
        if notification.local_id != local_id {
            return Err(Error::protocol(format!(
                "Notification for subscription {} delivered to {}",
                notification.local_id, local_id
            )));
        }
        if self.remote_id().await.is_none() {
            return Ok(Vec::new());
        }
        let fired = self.update_counts(&notification.epb).await?;
        self.queue(db).await?;
        Ok(fired)
    }
}
