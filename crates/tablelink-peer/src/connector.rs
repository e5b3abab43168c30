use std::path::Path;

#[cfg(unix)]
use tablelink_transport::UnixDomainSocket;

use crate::config::DispatcherConfig;
use crate::dispatcher::Dispatcher;
use crate::error::Result;

/// Connect to a device listening on a Unix domain socket.
pub fn connect(path: impl AsRef<Path>, config: DispatcherConfig) -> Result<Dispatcher> {
    #[cfg(not(unix))]
    {
        let _ = config;
        let path = path.as_ref().to_path_buf();
        return Err(tablelink_transport::TransportError::Connect {
            path,
            source: std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "tablelink-peer requires Unix domain sockets",
            ),
        }
        .into());
    }

    #[cfg(unix)]
    {
        let stream = UnixDomainSocket::connect(path)?;
        Dispatcher::new(stream, config)
    }
}
