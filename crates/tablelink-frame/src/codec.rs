use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};
use crate::ids::{is_unsolicited, UNSOLICITED_ID};

/// Byte that terminates every frame on the wire.
pub const FRAME_TERMINATOR: u8 = 0;

/// Default maximum frame length in bytes, terminator included.
pub const DEFAULT_MAX_FRAME_LEN: usize = 100;

/// Separates the command token from its arguments.
pub const ARG_SEPARATOR: char = ':';

/// Separates individual arguments.
pub const VALUE_SEPARATOR: char = ',';

const RESERVED_BODY_BYTES: [u8; 4] = [b'|', b'>', b'<', FRAME_TERMINATOR];

/// Running modulo-100 sum of the body bytes.
pub fn checksum(body: &str) -> u8 {
    body.bytes()
        .fold(0u8, |acc, byte| ((u16::from(acc) + u16::from(byte)) % 100) as u8)
}

/// A message built locally, ready to be sent.
///
/// The checksum is always derived from the body at construction, so a
/// `Message` can only ever describe a consistent frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: u8,
    body: String,
    checksum: u8,
}

impl Message {
    /// Create a message from an id and a complete body.
    ///
    /// Fails if the id is above 100 or the body contains a frame delimiter.
    pub fn new(id: u8, body: impl Into<String>) -> Result<Self> {
        if id > UNSOLICITED_ID {
            return Err(FrameError::InvalidId(id.to_string()));
        }
        let body = body.into();
        if let Some(byte) = body.bytes().find(|b| RESERVED_BODY_BYTES.contains(b)) {
            return Err(FrameError::InvalidBody(format!(
                "reserved character {:?}",
                char::from(byte)
            )));
        }
        let checksum = checksum(&body);
        Ok(Self { id, body, checksum })
    }

    /// Create a message from a command token and an argument list.
    ///
    /// Empty `args` produce a bare `TOKEN` body, anything else `TOKEN:args`.
    pub fn with_args(id: u8, command: &str, args: &str) -> Result<Self> {
        if args.is_empty() {
            Self::new(id, command)
        } else {
            Self::new(id, format!("{command}{ARG_SEPARATOR}{args}"))
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// The command token (body up to the first `:`).
    pub fn token(&self) -> &str {
        split_body(&self.body).0
    }

    /// True for device-originated frames.
    pub fn is_unsolicited(&self) -> bool {
        is_unsolicited(self.id)
    }

    /// Total wire size including the terminator.
    pub fn wire_size(&self) -> usize {
        wire_size(self.id, &self.body, self.checksum)
    }
}

/// A frame as read off the wire.
///
/// Unlike [`Message`], the checksum here is whatever the sender transmitted;
/// use [`Frame::validate`] before trusting the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: u8,
    pub body: String,
    pub checksum: u8,
}

impl Frame {
    /// Recompute the checksum from the received body and compare.
    pub fn validate(&self) -> bool {
        validate(self)
    }

    /// The command token (body up to the first `:`).
    pub fn token(&self) -> &str {
        split_body(&self.body).0
    }

    /// The raw argument list after the first `:`, if any.
    pub fn args(&self) -> Option<&str> {
        split_body(&self.body).1
    }

    /// True for device-originated frames.
    pub fn is_unsolicited(&self) -> bool {
        is_unsolicited(self.id)
    }

    /// Convert into a [`Message`] if the checksum validates.
    pub fn into_message(self) -> Option<Message> {
        if !self.validate() {
            return None;
        }
        Message::new(self.id, self.body).ok()
    }
}

impl From<&Message> for Frame {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            body: message.body.clone(),
            checksum: message.checksum,
        }
    }
}

impl From<Message> for Frame {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            body: message.body,
            checksum: message.checksum,
        }
    }
}

/// Split a body into its token and optional argument list.
pub fn split_body(body: &str) -> (&str, Option<&str>) {
    match body.split_once(ARG_SEPARATOR) {
        Some((token, args)) => (token, Some(args)),
        None => (body, None),
    }
}

/// Recompute the checksum of a received frame and compare.
pub fn validate(frame: &Frame) -> bool {
    checksum(&frame.body) == frame.checksum
}

/// Encode a message into the wire format.
///
/// Wire format:
/// ```text
/// ┌───┬──────┬────┬──────────────────────┬───┬──────────┬───┬─────┐
/// │ | │ id   │ |> │ TOKEN[:a1[,a2...]]   │ < │ checksum │ | │ NUL │
/// │   │ 0-100│    │                      │   │ 0-99     │   │     │
/// └───┴──────┴────┴──────────────────────┴───┴──────────┴───┴─────┘
/// ```
pub fn encode(message: &Message, dst: &mut BytesMut) {
    put_frame(message.id, &message.body, message.checksum, dst);
}

/// Encode a frame verbatim, including whatever checksum it carries.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) {
    put_frame(frame.id, &frame.body, frame.checksum, dst);
}

fn put_frame(id: u8, body: &str, checksum: u8, dst: &mut BytesMut) {
    dst.reserve(wire_size(id, body, checksum));
    dst.put_u8(b'|');
    dst.put_slice(id.to_string().as_bytes());
    dst.put_slice(b"|>");
    dst.put_slice(body.as_bytes());
    dst.put_u8(b'<');
    dst.put_slice(checksum.to_string().as_bytes());
    dst.put_u8(b'|');
    dst.put_u8(FRAME_TERMINATOR);
}

fn wire_size(id: u8, body: &str, checksum: u8) -> usize {
    // "|" + id + "|>" + body + "<" + checksum + "|" + NUL
    6 + decimal_len(id) + body.len() + decimal_len(checksum)
}

fn decimal_len(value: u8) -> usize {
    match value {
        0..=9 => 1,
        10..=99 => 2,
        _ => 3,
    }
}

/// Decode one frame.
///
/// `src` holds exactly one frame, with or without its NUL terminator. Every
/// deviation from the layout is reported as an error; nothing is assumed.
pub fn decode(src: &[u8]) -> Result<Frame> {
    let src = match src.split_last() {
        Some((&FRAME_TERMINATOR, rest)) => rest,
        _ => src,
    };
    if src.is_empty() {
        return Err(FrameError::Empty);
    }
    if src[0] != b'|' {
        return Err(FrameError::MissingDelimiter {
            expected: '|',
            offset: 0,
        });
    }

    let id_end = find_from(src, 1, b'|')?;
    let id_field = &src[1..id_end];
    let id = parse_decimal(id_field)
        .filter(|id| *id <= u16::from(UNSOLICITED_ID))
        .ok_or_else(|| FrameError::InvalidId(lossy(id_field)))? as u8;

    if src.get(id_end + 1) != Some(&b'>') {
        return Err(FrameError::MissingDelimiter {
            expected: '>',
            offset: id_end + 1,
        });
    }

    let body_start = id_end + 2;
    let body_end = find_from(src, body_start, b'<')?;
    let body_bytes = &src[body_start..body_end];
    if let Some(byte) = body_bytes.iter().find(|b| RESERVED_BODY_BYTES.contains(b)) {
        return Err(FrameError::InvalidBody(format!(
            "reserved character {:?}",
            char::from(*byte)
        )));
    }
    let body = std::str::from_utf8(body_bytes)
        .map_err(|err| FrameError::InvalidBody(err.to_string()))?
        .to_string();

    let checksum_start = body_end + 1;
    let checksum_end = find_from(src, checksum_start, b'|')?;
    let checksum_field = &src[checksum_start..checksum_end];
    let checksum = parse_decimal(checksum_field)
        .filter(|value| *value < 100)
        .ok_or_else(|| FrameError::InvalidChecksumField {
            id,
            field: lossy(checksum_field),
        })?
        as u8;

    let trailing = src.len() - checksum_end - 1;
    if trailing != 0 {
        return Err(FrameError::TrailingBytes(trailing));
    }

    Ok(Frame { id, body, checksum })
}

fn find_from(src: &[u8], start: usize, delimiter: u8) -> Result<usize> {
    src.get(start..)
        .and_then(|rest| rest.iter().position(|b| *b == delimiter))
        .map(|pos| start + pos)
        .ok_or(FrameError::MissingDelimiter {
            expected: char::from(delimiter),
            offset: src.len(),
        })
}

fn parse_decimal(field: &[u8]) -> Option<u16> {
    if field.is_empty() || field.len() > 3 || !field.iter().all(u8::is_ascii_digit) {
        return None;
    }
    field
        .iter()
        .try_fold(0u16, |acc, digit| Some(acc * 10 + u16::from(digit - b'0')))
}

fn lossy(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

/// Configuration for frame reading and writing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum frame length in bytes, terminator included. Default: 100.
    pub max_frame_len: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(message: &Message) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode(message, &mut buf);
        buf.to_vec()
    }

    #[test]
    fn checksum_is_running_sum_mod_100() {
        assert_eq!(checksum(""), 0);
        assert_eq!(checksum("A"), 65);
        assert_eq!(checksum("AB"), 31);
        assert_eq!(checksum("GET; AI DIFFICULTY"), 40);
        assert_eq!(checksum("SET; GOAL DATA:1,42"), 85);
    }

    #[test]
    fn checksum_stays_below_100_and_is_stable() {
        for body in ["", "x", "GET; TABLE AIR SPEED", &"~".repeat(90)] {
            let first = checksum(body);
            assert!(first < 100);
            assert_eq!(first, checksum(body));
        }
    }

    #[test]
    fn encode_produces_reference_layout() {
        let message = Message::new(7, "GET; AI DIFFICULTY").unwrap();
        assert_eq!(encoded(&message), b"|7|>GET; AI DIFFICULTY<40|\0");
        assert_eq!(message.wire_size(), encoded(&message).len());
    }

    #[test]
    fn encode_decode_roundtrip() {
        let bodies = [
            "GET; AI DIFFICULTY",
            "GET; AI DIFFICULTY:5",
            "SET; GOAL DATA:1,42",
            "ERROR! UNRECOGNIZED MESSAGE",
            "",
        ];
        for (id, body) in [0u8, 42, 99, 100].into_iter().zip(bodies) {
            let message = Message::new(id, body).unwrap();
            let frame = decode(&encoded(&message)).unwrap();
            assert_eq!(frame.id, id);
            assert_eq!(frame.body, body);
            assert!(frame.validate());
            assert_eq!(frame.into_message(), Some(message));
        }
    }

    #[test]
    fn decode_accepts_missing_terminator() {
        let frame = decode(b"|3|>GET; AI STATE<70|").unwrap();
        assert_eq!(frame.id, 3);
        assert_eq!(frame.token(), "GET; AI STATE");
        assert_eq!(frame.args(), None);
    }

    #[test]
    fn with_args_formats_body() {
        let bare = Message::with_args(1, "GET; AI STATE", "").unwrap();
        assert_eq!(bare.body(), "GET; AI STATE");

        let set = Message::with_args(2, "SET; TABLE AIR SPEED", "150").unwrap();
        assert_eq!(set.body(), "SET; TABLE AIR SPEED:150");
        assert_eq!(set.token(), "SET; TABLE AIR SPEED");
        assert_eq!(set.checksum(), 48);
    }

    #[test]
    fn new_rejects_reserved_characters_and_ids() {
        assert!(matches!(
            Message::new(1, "GET|x"),
            Err(FrameError::InvalidBody(_))
        ));
        assert!(matches!(
            Message::new(1, "a<b"),
            Err(FrameError::InvalidBody(_))
        ));
        assert!(matches!(
            Message::new(101, "GET; AI STATE"),
            Err(FrameError::InvalidId(_))
        ));
    }

    #[test]
    fn corrupted_checksum_fails_validation() {
        let message = Message::new(5, "GET; AI STATE").unwrap();
        let mut frame = Frame::from(&message);
        frame.checksum = (frame.checksum + 1) % 100;

        let mut buf = BytesMut::new();
        encode_frame(&frame, &mut buf);
        let decoded = decode(&buf).unwrap();

        assert!(!decoded.validate());
        assert!(!validate(&decoded));
        assert_eq!(decoded.into_message(), None);
    }

    #[test]
    fn decode_rejects_malformed_frames() {
        let cases: [(&[u8], fn(&FrameError) -> bool); 11] = [
            (b"", |e| matches!(e, FrameError::Empty)),
            (b"\0", |e| matches!(e, FrameError::Empty)),
            (b"3|>A<65|", |e| {
                matches!(e, FrameError::MissingDelimiter { expected: '|', offset: 0 })
            }),
            (b"|3", |e| matches!(e, FrameError::MissingDelimiter { expected: '|', .. })),
            (b"|3|A<65|", |e| matches!(e, FrameError::MissingDelimiter { expected: '>', .. })),
            (b"|3|>A65|", |e| matches!(e, FrameError::MissingDelimiter { expected: '<', .. })),
            (b"|3|>A<65", |e| matches!(e, FrameError::MissingDelimiter { expected: '|', .. })),
            (b"|x|>A<65|", |e| matches!(e, FrameError::InvalidId(_))),
            (b"|101|>A<65|", |e| matches!(e, FrameError::InvalidId(_))),
            (b"|3|>A<100|", |e| {
                matches!(e, FrameError::InvalidChecksumField { id: 3, .. })
            }),
            (b"|3|>A<65|junk", |e| matches!(e, FrameError::TrailingBytes(4))),
        ];

        for (input, check) in cases {
            let err = decode(input).unwrap_err();
            assert!(check(&err), "unexpected error {err:?} for {input:?}");
            assert!(err.is_malformed());
        }
    }

    #[test]
    fn decode_rejects_invalid_utf8_body() {
        let err = decode(b"|1|>\xff\xfe<0|").unwrap_err();
        assert!(matches!(err, FrameError::InvalidBody(_)));
    }

    #[test]
    fn decode_rejects_empty_id_and_checksum_fields() {
        assert!(matches!(decode(b"||>A<65|"), Err(FrameError::InvalidId(_))));
        assert!(matches!(
            decode(b"|1|>A<|"),
            Err(FrameError::InvalidChecksumField { id: 1, .. })
        ));
    }

    #[test]
    fn garbled_checksum_keeps_frame_id() {
        let err = decode(b"|5|>GET; AI STATE<abc|\0").unwrap_err();
        assert_eq!(err.frame_id(), Some(5));
        assert!(err.is_malformed());

        assert_eq!(decode(b"|x|>A<65|").unwrap_err().frame_id(), None);
    }

    #[test]
    fn split_body_handles_tokens_and_args() {
        assert_eq!(split_body("GET; AI STATE"), ("GET; AI STATE", None));
        assert_eq!(split_body("SET; AI STATE:1"), ("SET; AI STATE", Some("1")));
        assert_eq!(
            split_body("SET; GOAL DATA:0,17"),
            ("SET; GOAL DATA", Some("0,17"))
        );
        assert_eq!(split_body("SET; AI STATE:"), ("SET; AI STATE", Some("")));
    }
}
