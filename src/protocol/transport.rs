//! The seam between the marshalling core and the network.

use std::future::Future;

use bytes::Bytes;

use crate::error::Result;
use crate::protocol::buffer::ReadBuffer;
use crate::protocol::message::Message;

/// Request/reply channel to a Firebird server.
///
/// Framing, the connection handshake and authentication live behind this
/// trait. One operation is outstanding at a time.
pub trait Transport: Send {
    /// Send an operation with its XDR payload and return the complete reply,
    /// starting with the reply's own op code.
    fn send(&mut self, op: u32, payload: Bytes) -> impl Future<Output = Result<Bytes>> + Send;

    /// Negotiated packet size; also used as the blob segment size.
    fn packet_size(&self) -> u32;
}

/// Serialize `message`, send it and wrap the reply for reading.
pub async fn round_trip<T, M>(transport: &mut T, message: &M) -> Result<ReadBuffer>
where
    T: Transport,
    M: Message + Sync,
{
    let op = message.op();
    let payload = message.to_payload()?;
    tracing::trace!(op, bytes = payload.len(), "sending operation");
    let reply = transport.send(op, Bytes::from(payload)).await?;
    Ok(ReadBuffer::new(reply))
}
