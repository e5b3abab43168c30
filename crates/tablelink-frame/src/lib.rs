//! Checksummed text framing for the table link.
//!
//! Every message travels as one NUL-terminated frame:
//!
//! ```text
//! |<id>|><TOKEN>[:<arg1>[,<arg2>...]]<<checksum>|\0
//! ```
//!
//! - `id` correlates a response with its request (0-99), or marks a
//!   device-originated frame (100)
//! - the checksum is a running modulo-100 sum of the body bytes
//!
//! The [`catalog`] module holds the fixed set of command tokens both ends
//! understand.

pub mod catalog;
pub mod codec;
pub mod error;
pub mod ids;
pub mod reader;
pub mod writer;

pub use catalog::{ArgShape, Direction, Setting, Side, TableMode, Token, ERROR_MARKER};
pub use codec::{
    checksum, decode, encode, encode_frame, validate, Frame, FrameConfig, Message,
    DEFAULT_MAX_FRAME_LEN, FRAME_TERMINATOR,
};
pub use error::{FrameError, Result};
pub use ids::{MessageIdSequence, MAX_REQUEST_ID, UNSOLICITED_ID};
pub use reader::FrameReader;
pub use writer::FrameWriter;
