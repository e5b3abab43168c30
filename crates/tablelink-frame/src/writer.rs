use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tablelink_transport::LinkStream;
use tracing::trace;

use crate::codec::{encode, encode_frame, Frame, FrameConfig, Message};
use crate::error::{FrameError, Result};
use crate::reader::transport_to_frame_error;

/// Writes complete NUL-terminated frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(config.max_frame_len),
            config,
        }
    }

    /// Encode and send a message (blocking).
    pub fn send(&mut self, message: &Message) -> Result<()> {
        self.buf.clear();
        encode(message, &mut self.buf);
        self.write_buffered()
    }

    /// Send a frame verbatim, whatever checksum it carries.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.buf.clear();
        encode_frame(frame, &mut self.buf);
        self.write_buffered()
    }

    fn write_buffered(&mut self) -> Result<()> {
        if self.buf.len() > self.config.max_frame_len {
            return Err(FrameError::FrameTooLong {
                size: self.buf.len(),
                max: self.config.max_frame_len,
            });
        }

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock && !self.times_out() => continue,
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset
                    ) =>
                {
                    return Err(FrameError::ConnectionClosed)
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        trace!(bytes = offset, "frame written");

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock && !self.times_out() => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// With a write timeout set, `WouldBlock` means the timeout elapsed.
    fn times_out(&self) -> bool {
        self.config.write_timeout.is_some()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl FrameWriter<LinkStream> {
    /// Create a frame writer for `LinkStream` and apply the write timeout from config.
    pub fn with_config_link(inner: LinkStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}
