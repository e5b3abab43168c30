//! Controller and device ends of the table link.
//!
//! The [`Dispatcher`] is the controller side: it serializes outgoing
//! requests, correlates responses by message id and queues the goal events
//! the device sends on its own. The [`PeerSimulator`] is a software device
//! that answers the same protocol, for development without table hardware.

pub mod config;
pub mod connector;
pub mod dispatcher;
pub mod error;
#[cfg(unix)]
pub mod listener;
pub mod settings;
pub mod simulator;
pub mod state;

pub use config::{DispatcherConfig, SimulatorConfig};
pub use connector::connect;
pub use dispatcher::{Dispatcher, GoalEvent, Response};
pub use error::{PeerError, Result};
#[cfg(unix)]
pub use listener::SimulatorListener;
pub use settings::TableSettings;
pub use simulator::{
    spawn, spawn_local, PeerSimulator, SimulatorHandle, ERROR_INVALID_ARGUMENT,
    ERROR_NONMATCHING_CHECKSUMS, ERROR_UNRECOGNIZED_MESSAGE,
};
pub use state::DeviceState;
