use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use tablelink_transport::{LinkStream, TransportError, UnixDomainSocket};
use tracing::{info, warn};

use crate::config::SimulatorConfig;
use crate::error::{PeerError, Result};
use crate::simulator::PeerSimulator;
use crate::state::DeviceState;

/// Serves a simulated device on a Unix domain socket, one controller at a time.
///
/// Every connection starts from [`SimulatorConfig::initial_state`].
pub struct SimulatorListener {
    socket: UnixDomainSocket,
    config: SimulatorConfig,
    connections: AtomicU64,
}

impl SimulatorListener {
    /// Bind to a Unix domain socket path.
    pub fn bind(path: impl AsRef<Path>, config: SimulatorConfig) -> Result<Self> {
        let socket = UnixDomainSocket::bind(path)?;
        Ok(Self {
            socket,
            config,
            connections: AtomicU64::new(0),
        })
    }

    /// Accept the next controller connection (blocking).
    pub fn accept(&self) -> Result<LinkStream> {
        let stream = self.socket.accept()?;
        let count = self.connections.fetch_add(1, Ordering::Relaxed) + 1;
        info!(connection = count, path = ?self.socket.path(), "controller connected");
        Ok(stream)
    }

    /// Run a fresh simulator on `stream` until the controller disconnects or
    /// `running` clears. Returns the final device state.
    pub fn serve(&self, stream: LinkStream, running: &AtomicBool) -> Result<DeviceState> {
        let simulator = PeerSimulator::new(stream, self.config.clone())?;
        let state = simulator.run_until(running)?;
        info!("controller disconnected");
        Ok(state)
    }

    /// Accept and serve controllers until `running` clears.
    ///
    /// The flag is checked at least once per `poll_interval`. An error on one
    /// connection is logged and the listener keeps accepting.
    pub fn serve_until(&self, running: &AtomicBool) -> Result<()> {
        self.socket.set_nonblocking(true)?;
        while running.load(Ordering::SeqCst) {
            match self.accept() {
                Ok(stream) => {
                    stream.set_nonblocking(false)?;
                    if let Err(err) = self.serve(stream, running) {
                        warn!(error = %err, "connection ended with error");
                    }
                }
                Err(PeerError::Transport(TransportError::Accept(err)))
                    if err.kind() == std::io::ErrorKind::WouldBlock =>
                {
                    thread::sleep(self.config.poll_interval);
                }
                Err(err) => return Err(err),
            }
        }
        self.socket.set_nonblocking(false)?;
        Ok(())
    }

    /// Number of controllers accepted so far.
    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    /// Bound socket path.
    pub fn path(&self) -> &Path {
        self.socket.path()
    }
}
