//! Controller/device link for an air-hockey table.
//!
//! A controller and the table exchange short checksummed text frames over a
//! byte stream. The controller blocks on request/response calls while the
//! table reports goals on its own during a game.
//!
//! # Crate Structure
//!
//! - [`transport`]: duplex byte stream (in-process pair, Unix sockets)
//! - [`frame`]: wire format, checksum, message ids, command catalog
//! - [`peer`]: dispatcher, device simulator, table settings (behind `peer` feature)

/// Re-export transport types.
pub mod transport {
    pub use tablelink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use tablelink_frame::*;
}

/// Re-export dispatcher and simulator types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use tablelink_peer::*;
}
