use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tablelink_transport::LinkStream;
use tracing::trace;

use crate::codec::{decode, Frame, FrameConfig, FRAME_TERMINATOR};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 256;

/// Reads NUL-terminated frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
/// A frame that fails to decode is consumed before the error is returned, so
/// the next call starts cleanly at the following frame.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(config.max_frame_len),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached. A read
    /// timeout on the underlying stream surfaces as an I/O error for which
    /// [`FrameError::is_timeout`] is true; buffered bytes are kept.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(pos) = self.buf.iter().position(|b| *b == FRAME_TERMINATOR) {
                let raw = self.buf.split_to(pos + 1);
                trace!(bytes = raw.len(), "frame boundary found");
                if raw.len() > self.config.max_frame_len {
                    return Err(FrameError::FrameTooLong {
                        size: raw.len(),
                        max: self.config.max_frame_len,
                    });
                }
                return decode(&raw);
            }

            if self.buf.len() >= self.config.max_frame_len {
                let size = self.buf.len();
                self.buf.clear();
                return Err(FrameError::FrameTooLong {
                    size,
                    max: self.config.max_frame_len,
                });
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<LinkStream> {
    /// Create a frame reader for `LinkStream` and apply the read timeout from config.
    pub fn with_config_link(inner: LinkStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: tablelink_transport::TransportError) -> FrameError {
    FrameError::Io(err.into_io())
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};
    use std::time::Duration;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode, Message};

    fn wire(messages: &[Message]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for message in messages {
            encode(message, &mut buf);
        }
        buf.to_vec()
    }

    #[test]
    fn read_single_frame() {
        let message = Message::new(4, "GET; AI DIFFICULTY").unwrap();
        let mut reader = FrameReader::new(Cursor::new(wire(&[message])));

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.id, 4);
        assert_eq!(frame.body, "GET; AI DIFFICULTY");
        assert!(frame.validate());
    }

    #[test]
    fn read_back_to_back_frames() {
        let messages = [
            Message::new(0, "GET; GAME STATE").unwrap(),
            Message::new(100, "SET; GOAL DATA:0,55").unwrap(),
            Message::new(1, "SET; AI STATE:1").unwrap(),
        ];
        let mut reader = FrameReader::new(Cursor::new(wire(&messages)));

        for expected in &messages {
            let frame = reader.read_frame().unwrap();
            assert_eq!(frame.id, expected.id());
            assert_eq!(frame.body, expected.body());
        }
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn partial_read_handling() {
        let bytes = wire(&[Message::new(9, "GET; TABLE MODE").unwrap()]);
        let mut reader = FrameReader::new(ByteByByteReader { bytes, pos: 0 });

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.id, 9);
        assert_eq!(frame.body, "GET; TABLE MODE");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut reader = FrameReader::new(Cursor::new(b"|3|>GET; AI".to_vec()));
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn malformed_frame_is_skipped() {
        let mut bytes = b"|3>GET; AI STATE<70|\0".to_vec();
        bytes.extend(wire(&[Message::new(4, "GET; AI STATE").unwrap()]));
        let mut reader = FrameReader::new(Cursor::new(bytes));

        let err = reader.read_frame().unwrap_err();
        assert!(err.is_malformed());

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.id, 4);
    }

    #[test]
    fn oversized_frame_is_discarded() {
        let mut bytes = vec![b'x'; 150];
        bytes.push(0);
        bytes.extend(wire(&[Message::new(2, "GET; AI STATE").unwrap()]));

        let cfg = FrameConfig {
            max_frame_len: 64,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(bytes), cfg);

        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::FrameTooLong { size: 151, max: 64 }
        ));

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.id, 2);
    }

    #[test]
    fn interrupted_read_retries() {
        let bytes = wire(&[Message::new(8, "GET; AI STATE").unwrap()]);
        let mut reader = FrameReader::new(InterruptedThenData {
            interrupted: false,
            bytes,
            pos: 0,
        });

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.id, 8);
    }

    #[test]
    fn read_timeout_keeps_buffered_bytes() {
        let (mut device, controller) = LinkStream::pair().unwrap();
        let cfg = FrameConfig {
            read_timeout: Some(Duration::from_millis(20)),
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config_link(controller, cfg).unwrap();

        let bytes = wire(&[Message::new(6, "GET; LIGHTING VALUE").unwrap()]);
        let (head, tail) = bytes.split_at(7);

        device.write_all(head).unwrap();
        let err = reader.read_frame().unwrap_err();
        assert!(err.is_timeout());

        device.write_all(tail).unwrap();
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.id, 6);
        assert_eq!(frame.body, "GET; LIGHTING VALUE");
    }

    #[test]
    fn roundtrip_over_link_pair() {
        let (left, right) = LinkStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer
            .send(&Message::new(12, "SET; LIGHTING VALUE:16711680").unwrap())
            .unwrap();
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.id, 12);
        assert_eq!(frame.args(), Some("16711680"));
    }

    #[test]
    fn unterminated_overflow_is_discarded() {
        let cfg = FrameConfig {
            max_frame_len: 16,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(vec![b'|'; 40]), cfg);

        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLong { max: 16, .. }));
    }

    #[test]
    fn accessors_and_into_inner() {
        let reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        assert_eq!(reader.config().max_frame_len, 100);
        let _ = reader.get_ref();
        let _inner = reader.into_inner();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
