//! Uniden remote-control line protocol encoder/decoder.
//!
//! The scanner speaks a line-oriented ASCII protocol over its serial port.
//! Every request is a command name followed by comma-separated arguments
//! and a single carriage return; every response echoes the command name as
//! its first field.
//!
//! # Command format
//!
//! ```text
//! <NAME>[,<arg>...]\r
//! ```
//!
//! - `NAME`: three uppercase ASCII letters (e.g. `MDL`, `SIN`, `CSY`).
//! - `arg`: booleans are `1`/`0`, a null index is `-1`, a null quick key is
//!   `.`, frequencies are eight zero-padded digits.
//! - Terminator: `\r` (0x0D). No line feed.
//!
//! # Failure markers
//!
//! The scanner reports failures in-band. `ERR` (alone, or as the second of
//! two fields) means the command format or a value was wrong; `NG` means the
//! command is not valid in the current mode, typically because Program Mode
//! has not been entered.

use bytes::{BufMut, BytesMut};

use scanlib_core::types::{Frequency, Index, QuickKey};

/// Line terminator for requests and responses.
pub const TERMINATOR: u8 = b'\r';

/// Field separator inside a line.
pub const SEPARATOR: u8 = b',';

/// Marker for a command format or value error.
pub const ERROR_MARKER: &str = "ERR";

/// Marker for a command that is invalid in the current mode.
pub const NOT_GOOD_MARKER: &str = "NG";

/// Result of attempting to decode one response line from a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    /// A complete, successful response.
    Response {
        /// The comma-separated fields, command echo first.
        fields: Vec<String>,
        /// Number of bytes consumed from the input buffer.
        consumed: usize,
    },

    /// The scanner answered `ERR`.
    Rejected(usize),

    /// The scanner answered `NG`.
    NotGood(usize),

    /// The line was not valid ASCII/UTF-8.
    Malformed(usize),

    /// The buffer does not yet contain a complete line. More data is needed.
    Incomplete,
}

/// A single command argument before wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Encoded as `1` or `0`.
    Flag(bool),
    /// Encoded as a decimal number.
    Number(i64),
    /// Encoded verbatim.
    Text(String),
}

impl Arg {
    fn put(&self, buf: &mut BytesMut) {
        match self {
            Arg::Flag(true) => buf.put_u8(b'1'),
            Arg::Flag(false) => buf.put_u8(b'0'),
            Arg::Number(n) => buf.put_slice(n.to_string().as_bytes()),
            Arg::Text(s) => buf.put_slice(s.as_bytes()),
        }
    }
}

impl From<bool> for Arg {
    fn from(v: bool) -> Self {
        Arg::Flag(v)
    }
}

impl From<u8> for Arg {
    fn from(v: u8) -> Self {
        Arg::Number(i64::from(v))
    }
}

impl From<u16> for Arg {
    fn from(v: u16) -> Self {
        Arg::Number(i64::from(v))
    }
}

impl From<u32> for Arg {
    fn from(v: u32) -> Self {
        Arg::Number(i64::from(v))
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Text(v.to_string())
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Arg::Text(v)
    }
}

impl From<Index> for Arg {
    fn from(v: Index) -> Self {
        Arg::Number(i64::from(v.get()))
    }
}

impl From<Option<QuickKey>> for Arg {
    fn from(v: Option<QuickKey>) -> Self {
        Arg::Text(QuickKey::to_wire(v))
    }
}

/// Encode a command line ready for transmission.
///
/// Joins the command name and arguments with commas and appends the
/// terminator. Frequencies must already be rendered to their fixed-width
/// text (see [`frequency_arg`]).
///
/// # Example
///
/// ```
/// use scanlib_uniden::protocol::{encode_command, Arg};
///
/// assert_eq!(encode_command("MDL", &[]), b"MDL\r");
/// assert_eq!(
///     encode_command("KBP", &[Arg::Flag(true)]),
///     b"KBP,1\r"
/// );
/// ```
pub fn encode_command(name: &str, args: &[Arg]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(name.len() + args.len() * 4 + 1);
    buf.put_slice(name.as_bytes());
    for arg in args {
        buf.put_u8(SEPARATOR);
        arg.put(&mut buf);
    }
    buf.put_u8(TERMINATOR);
    buf.to_vec()
}

/// Render a frequency argument as its eight-digit wire text.
pub fn frequency_arg(freq: Frequency) -> scanlib_core::Result<Arg> {
    freq.to_wire().map(Arg::Text)
}

/// Attempt to decode one response line from a byte buffer.
///
/// Scans `buf` for a carriage return. Returns [`DecodeResult::Response`]
/// with the split fields, [`DecodeResult::Rejected`] /
/// [`DecodeResult::NotGood`] for the failure markers, or
/// [`DecodeResult::Incomplete`] if no terminator has arrived yet.
///
/// A failure marker only counts when it is the sole field or the second of
/// exactly two fields; a longer response that happens to carry `ERR` in a
/// text field (a channel named "ERR") is a normal response.
///
/// # Example
///
/// ```
/// use scanlib_uniden::protocol::{decode_response, DecodeResult};
///
/// match decode_response(b"MDL,BC246T\r") {
///     DecodeResult::Response { fields, consumed } => {
///         assert_eq!(fields, vec!["MDL", "BC246T"]);
///         assert_eq!(consumed, 11);
///     }
///     _ => panic!("expected Response"),
/// }
/// ```
pub fn decode_response(buf: &[u8]) -> DecodeResult {
    let term_pos = match buf.iter().position(|&b| b == TERMINATOR) {
        Some(pos) => pos,
        None => return DecodeResult::Incomplete,
    };

    let consumed = term_pos + 1;
    let body = match std::str::from_utf8(&buf[..term_pos]) {
        Ok(s) => s,
        Err(_) => return DecodeResult::Malformed(consumed),
    };

    let fields: Vec<String> = body.split(',').map(str::to_string).collect();

    match fields.as_slice() {
        [only] if only == ERROR_MARKER => DecodeResult::Rejected(consumed),
        [only] if only == NOT_GOOD_MARKER => DecodeResult::NotGood(consumed),
        [_, second] if second == ERROR_MARKER => DecodeResult::Rejected(consumed),
        [_, second] if second == NOT_GOOD_MARKER => DecodeResult::NotGood(consumed),
        _ => DecodeResult::Response { fields, consumed },
    }
}

/// Extract the command name from an encoded command line.
///
/// This is the text the scanner must echo back as the first response field.
///
/// ```
/// use scanlib_uniden::protocol::command_name;
///
/// assert_eq!(command_name(b"SIN,12\r"), "SIN");
/// assert_eq!(command_name(b"MDL\r"), "MDL");
/// ```
pub fn command_name(cmd: &[u8]) -> &str {
    let end = cmd
        .iter()
        .position(|&b| b == SEPARATOR || b == TERMINATOR)
        .unwrap_or(cmd.len());
    std::str::from_utf8(&cmd[..end]).unwrap_or("")
}
