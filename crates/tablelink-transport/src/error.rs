use std::io;
use std::path::PathBuf;

/// Errors raised while opening or configuring a link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The device socket could not be bound.
    #[error("failed to bind device socket {path}: {source}")]
    Bind { path: PathBuf, source: io::Error },

    /// No device is listening at the path, or it refused the connection.
    #[error("failed to connect to device at {path}: {source}")]
    Connect { path: PathBuf, source: io::Error },

    /// Accepting a controller connection failed. Non-blocking listeners report
    /// "nothing pending" through this variant with kind `WouldBlock`.
    #[error("failed to accept controller: {0}")]
    Accept(io::Error),

    /// The in-process socket pair could not be created.
    #[error("failed to create in-process link: {0}")]
    Pair(io::Error),

    /// A stream option (timeout, blocking mode) could not be applied.
    #[error("failed to set {option} on link: {source}")]
    Configure {
        option: &'static str,
        source: io::Error,
    },

    /// An I/O error occurred on an open link.
    #[error("link I/O error: {0}")]
    Io(#[from] io::Error),

    /// The socket path does not fit in `sockaddr_un`.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },
}

impl TransportError {
    /// The underlying I/O error, if this error wraps one.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::Bind { source, .. }
            | Self::Connect { source, .. }
            | Self::Configure { source, .. } => Some(source),
            Self::Accept(err) | Self::Pair(err) | Self::Io(err) => Some(err),
            Self::PathTooLong { .. } => None,
        }
    }

    /// Convert into a plain `io::Error`, keeping the original kind when there is one.
    pub fn into_io(self) -> io::Error {
        match self {
            Self::Bind { source, .. }
            | Self::Connect { source, .. }
            | Self::Configure { source, .. } => source,
            Self::Accept(err) | Self::Pair(err) | Self::Io(err) => err,
            other @ Self::PathTooLong { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, other.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
