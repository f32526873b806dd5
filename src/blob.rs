//! Segmented blob I/O.
//!
//! Blobs are read with op_get_segment until the server reports EOF, and
//! written in chunks of at most the segment size. A failure after the blob
//! was opened cancels it before the original error is returned.

use crate::database::Database;
use crate::error::{Error, Result};
use crate::protocol::charset::Charset;
use crate::protocol::constants::*;
use crate::protocol::messages::{
    GetSegmentMessage, HandleMessage, OpenBlobMessage, PutSegmentMessage,
};
use crate::protocol::param_buffer::BlobParameterBuffer;
use crate::protocol::transport::Transport;

/// An open blob on the server.
#[derive(Debug)]
pub struct Blob {
    handle: i32,
    blob_id: i64,
    eof: bool,
    open: bool,
}

impl Blob {
    /// Open an existing blob for reading.
    pub async fn open<T: Transport>(
        db: &mut Database<T>,
        tx_handle: i32,
        blob_id: i64,
    ) -> Result<Self> {
        let bpb = BlobParameterBuffer::new();
        let response = db
            .execute(&OpenBlobMessage {
                create: false,
                bpb: bpb.as_bytes(),
                tx_handle,
                blob_id,
            })
            .await?;
        tracing::trace!(blob_id, handle = response.handle, "blob opened");
        Ok(Self {
            handle: response.handle,
            blob_id,
            eof: false,
            open: true,
        })
    }

    /// Create a new blob for writing.
    pub async fn create<T: Transport>(db: &mut Database<T>, tx_handle: i32) -> Result<Self> {
        let bpb = BlobParameterBuffer::new();
        let response = db
            .execute(&OpenBlobMessage {
                create: true,
                bpb: bpb.as_bytes(),
                tx_handle,
                blob_id: 0,
            })
            .await?;
        tracing::trace!(blob_id = response.blob_id, handle = response.handle, "blob created");
        Ok(Self {
            handle: response.handle,
            blob_id: response.blob_id,
            eof: false,
            open: true,
        })
    }

    /// Blob id, stored in the row that references the blob.
    pub fn id(&self) -> i64 {
        self.blob_id
    }

    /// Server-side blob handle.
    pub fn handle(&self) -> i32 {
        self.handle
    }

    /// Whether the last read reached the end.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Read the next batch of segments, appending to `out`.
    pub async fn read_segments<T: Transport>(
        &mut self,
        db: &mut Database<T>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let max_length = db.segment_size() as u32;
        let response = db
            .execute(&GetSegmentMessage {
                blob_handle: self.handle,
                max_length,
            })
            .await?;

        let data = &response.data[..];
        let mut pos = 0;
        while pos + 2 <= data.len() {
            let len = u16::from_le_bytes([data[pos], data[pos + 1]]) as usize;
            pos += 2;
            let end = pos + len;
            if end > data.len() {
                return Err(Error::protocol(format!(
                    "Blob segment of {} bytes overruns reply of {} bytes",
                    len,
                    data.len()
                )));
            }
            out.extend_from_slice(&data[pos..end]);
            pos = end;
        }

        if response.handle == BLOB_SEGMENT_EOF {
            self.eof = true;
        }
        Ok(())
    }

    /// Read from the current position to the end.
    pub async fn read_to_end<T: Transport>(&mut self, db: &mut Database<T>) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while !self.eof {
            self.read_segments(db, &mut out).await?;
        }
        Ok(out)
    }

    /// Append one segment.
    pub async fn put_segment<T: Transport>(
        &mut self,
        db: &mut Database<T>,
        segment: &[u8],
    ) -> Result<()> {
        db.execute(&PutSegmentMessage {
            blob_handle: self.handle,
            segment,
        })
        .await?;
        Ok(())
    }

    /// Write `data` in segment-sized chunks.
    pub async fn write_all<T: Transport>(&mut self, db: &mut Database<T>, data: &[u8]) -> Result<()> {
        let segment_size = db.segment_size();
        for chunk in data.chunks(segment_size) {
            self.put_segment(db, chunk).await?;
        }
        Ok(())
    }

    /// Close the blob, committing written data.
    pub async fn close<T: Transport>(&mut self, db: &mut Database<T>) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        db.execute(&HandleMessage::new(OP_CLOSE_BLOB, self.handle))
            .await?;
        self.open = false;
        Ok(())
    }

    /// Cancel the blob, discarding written data.
    pub async fn cancel<T: Transport>(&mut self, db: &mut Database<T>) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        db.execute(&HandleMessage::new(OP_CANCEL_BLOB, self.handle))
            .await?;
        Ok(())
    }

    /// Cancel after a failure and hand back the original error.
    async fn abandon<T: Transport>(&mut self, db: &mut Database<T>, error: Error) -> Error {
        tracing::warn!(blob_id = self.blob_id, error = %error, "blob transfer failed, cancelling");
        if let Err(cancel_error) = self.cancel(db).await {
            tracing::warn!(blob_id = self.blob_id, error = %cancel_error, "blob cancel failed");
        }
        error
    }
}

/// Read a whole blob.
pub async fn read_blob<T: Transport>(
    db: &mut Database<T>,
    tx_handle: i32,
    blob_id: i64,
) -> Result<Vec<u8>> {
    let mut blob = Blob::open(db, tx_handle, blob_id).await?;
    let data = match blob.read_to_end(db).await {
        Ok(data) => data,
        Err(e) => return Err(blob.abandon(db, e).await),
    };
    if let Err(e) = blob.close(db).await {
        return Err(blob.abandon(db, e).await);
    }
    tracing::debug!(blob_id, bytes = data.len(), "blob read");
    Ok(data)
}

/// Write `data` into a new blob and return its id.
pub async fn write_blob<T: Transport>(
    db: &mut Database<T>,
    tx_handle: i32,
    data: &[u8],
) -> Result<i64> {
    let mut blob = Blob::create(db, tx_handle).await?;
    let written = match blob.write_all(db, data).await {
        Ok(()) => blob.close(db).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        return Err(blob.abandon(db, e).await);
    }
    tracing::debug!(blob_id = blob.id(), bytes = data.len(), "blob written");
    Ok(blob.id())
}

/// Read a text blob through `charset`.
pub async fn read_blob_string<T: Transport>(
    db: &mut Database<T>,
    tx_handle: i32,
    blob_id: i64,
    charset: &Charset,
) -> Result<String> {
    let data = read_blob(db, tx_handle, blob_id).await?;
    charset.decode(&data)
}

/// Write text into a new blob through `charset`.
pub async fn write_blob_string<T: Transport>(
    db: &mut Database<T>,
    tx_handle: i32,
    text: &str,
    charset: &Charset,
) -> Result<i64> {
    let data = charset.encode(text)?;
    write_blob(db, tx_handle, &data).await
}
