use std::time::Duration;

/// Errors that can occur in dispatcher and simulator operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] tablelink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] tablelink_frame::FrameError),

    /// A received frame's checksum does not match its body.
    #[error("checksum mismatch on message {id}: computed {expected}, received {received}")]
    Checksum { id: u8, expected: u8, received: u8 },

    /// The device answered with an error body.
    #[error("device rejected message {id}: {body}")]
    Protocol { id: u8, body: String },

    /// An unsolicited frame carried something other than goal data.
    #[error("unknown unsolicited message: {0}")]
    UnknownMessage(String),

    /// No correlated response arrived in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The link closed before a response arrived.
    #[error("peer disconnected: {0}")]
    Disconnected(String),

    /// Every request id is still waiting for a response.
    #[error("message id {0} still has a call in flight")]
    IdInUse(u8),

    /// A response value could not be interpreted.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl PeerError {
    /// True when the received data itself was bad (checksum, protocol or shape).
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            PeerError::Checksum { .. }
                | PeerError::Protocol { .. }
                | PeerError::UnknownMessage(_)
                | PeerError::MalformedResponse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PeerError>;
