//! Byte-stream channel between a table controller and its device.
//!
//! The link protocol only needs an ordered, reliable-enough duplex byte
//! stream. This crate provides it in two shapes:
//! - an in-process socket pair ([`LinkStream::pair`]) for a simulated device
//! - Unix domain sockets ([`UnixDomainSocket`]) for a device running in
//!   another process
//!
//! Everything else in tablelink builds on the [`LinkStream`] type provided here.

pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use stream::LinkStream;

#[cfg(unix)]
pub use uds::UnixDomainSocket;
