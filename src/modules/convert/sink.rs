use std::io::{self, Write};

use actix_web::web::Bytes;
use tokio::sync::mpsc;

use crate::api::error::SystemError;

/// Size at which buffered output is pushed without waiting for a flush.
pub const CHUNK_SIZE: usize = 64 * 1024;

pub type Chunk = Result<Bytes, SystemError>;

/// `Write` end of the response body. Must be driven from a blocking thread.
///
/// Writes fail with `BrokenPipe` once the receiving side (the HTTP response) is gone,
/// which is how a client disconnect stops the pipeline.
pub struct ChannelSink {
    tx: mpsc::Sender<Chunk>,
    buffer: Vec<u8>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Chunk>) -> Self {
        Self { tx, buffer: Vec::with_capacity(CHUNK_SIZE) }
    }

    fn send_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::replace(&mut self.buffer, Vec::with_capacity(CHUNK_SIZE)));
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response stream closed"))
    }

    /// Reports a failure to the consumer. Anything still buffered is discarded.
    pub fn fail(self, err: SystemError) {
        // receiver may already be gone
        let _ = self.tx.blocking_send(Err(err));
    }
}

impl Write for ChannelSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.tx.is_closed() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "response stream closed"));
        }
        self.buffer.extend_from_slice(buf);
        if self.buffer.len() >= CHUNK_SIZE {
            self.send_buffer()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffer()
    }
}
