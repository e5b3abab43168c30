use std::io::{Read, Write};
use std::net::Shutdown;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};

/// A connected duplex byte stream between controller and device.
///
/// Both halves of the link use this type. A stream can be cloned so that one
/// thread reads while another writes, which is how the dispatcher and the
/// simulator split their workers.
pub struct LinkStream {
    inner: LinkStreamInner,
}

enum LinkStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for LinkStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for LinkStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl LinkStream {
    /// Create a connected pair of in-process streams.
    ///
    /// The first end is conventionally handed to the controller and the second
    /// to a simulated device.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) =
            std::os::unix::net::UnixStream::pair().map_err(TransportError::Pair)?;
        debug!("created in-process link pair");
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }

    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: LinkStreamInner::Unix(stream),
        }
    }

    /// Set read timeout on the underlying stream.
    ///
    /// Reads that time out fail with `WouldBlock` or `TimedOut` depending on
    /// the platform.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream
                .set_read_timeout(timeout)
                .map_err(|source| configure("read timeout", source)),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream
                .set_write_timeout(timeout)
                .map_err(|source| configure("write timeout", source)),
        }
    }

    /// Switch the stream between blocking and non-blocking I/O.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream
                .set_nonblocking(nonblocking)
                .map_err(|source| configure("non-blocking mode", source)),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
        }
    }

    /// Shut down both directions of the link.
    ///
    /// Any thread blocked reading a clone of this stream observes end of
    /// stream. Shutting down an already closed link is not an error.
    pub fn shutdown(&self) -> Result<()> {
        let result = match &self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn configure(option: &'static str, source: std::io::Error) -> TransportError {
    TransportError::Configure { option, source }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(_) => f.debug_struct("LinkStream").field("type", &"unix").finish(),
        }
    }
}
