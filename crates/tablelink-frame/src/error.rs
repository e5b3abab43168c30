/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame contained no bytes.
    #[error("empty frame")]
    Empty,

    /// A delimiter was missing or out of place.
    #[error("missing '{expected}' delimiter at byte {offset}")]
    MissingDelimiter { expected: char, offset: usize },

    /// The id field is not a decimal number in 0..=100.
    #[error("invalid message id field {0:?}")]
    InvalidId(String),

    /// The checksum field is not a decimal number in 0..=99. The id before
    /// it decoded, so the sender can still be answered.
    #[error("invalid checksum field {field:?} in frame {id}")]
    InvalidChecksumField { id: u8, field: String },

    /// The body is not UTF-8 or contains a reserved character.
    #[error("invalid message body: {0}")]
    InvalidBody(String),

    /// Bytes followed the closing delimiter.
    #[error("{0} trailing bytes after frame")]
    TrailingBytes(usize),

    /// The frame exceeds the configured maximum length.
    #[error("frame too long ({size} bytes, max {max})")]
    FrameTooLong { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// True when a read gave up because its timeout elapsed.
    ///
    /// Buffered bytes are kept, so the read can simply be retried.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::Io(err) if matches!(
                err.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            )
        )
    }

    /// True when the bytes of a single frame were bad but the stream itself
    /// is still usable.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            FrameError::Empty
                | FrameError::MissingDelimiter { .. }
                | FrameError::InvalidId(_)
                | FrameError::InvalidChecksumField { .. }
                | FrameError::InvalidBody(_)
                | FrameError::TrailingBytes(_)
                | FrameError::FrameTooLong { .. }
        )
    }

    /// Id of a malformed frame whose `|id|>` prefix still decoded.
    pub fn frame_id(&self) -> Option<u8> {
        match self {
            FrameError::InvalidChecksumField { id, .. } => Some(*id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
