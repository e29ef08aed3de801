//! Tokio codec for the line protocol
//!
//! Frames the byte stream into request lines and parses each one into a
//! [`Command`]. A line that fails to parse is yielded as an `Err` item so the
//! connection can answer it and carry on; only I/O failures end the stream.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::{Command, ProtocolError, Reply, Result};

/// Default cap on a single request line, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8 * 1024;

/// One decoded request line.
pub type Request = std::result::Result<Command, ProtocolError>;

/// Tokio codec decoding [`Request`]s and encoding [`Reply`]s.
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use tokio_util::codec::Decoder;
/// use tally_protocol::{Command, CommandCodec};
///
/// let mut codec = CommandCodec::new();
/// let mut buf = BytesMut::from("GET total\r\n");
///
/// let request = codec.decode(&mut buf).unwrap().unwrap();
/// assert_eq!(request.unwrap(), Command::Get { name: "total".into() });
/// ```
#[derive(Debug, Clone)]
pub struct CommandCodec {
    max_line_length: usize,
    /// Where to resume the newline search in the buffer.
    next_index: usize,
    /// Dropping the tail of an over-long line.
    discarding: bool,
}

impl CommandCodec {
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            max_line_length,
            next_index: 0,
            discarding: false,
        }
    }

    fn parse_line(&self, line: &[u8]) -> Option<Request> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.len() > self.max_line_length {
            return Some(Err(ProtocolError::LineTooLong {
                len: line.len(),
                max: self.max_line_length,
            }));
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        Some(
            std::str::from_utf8(line)
                .map_err(ProtocolError::from)
                .and_then(Command::parse),
        )
    }
}

impl Default for CommandCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for CommandCodec {
    type Item = Request;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Request>> {
        loop {
            let newline = src[self.next_index..].iter().position(|b| *b == b'\n');

            let Some(offset) = newline else {
                if self.discarding {
                    src.clear();
                    self.next_index = 0;
                    return Ok(None);
                }
                // One extra byte for a pending carriage return
                if src.len() > self.max_line_length + 1 {
                    let len = src.len();
                    src.clear();
                    self.next_index = 0;
                    self.discarding = true;
                    return Ok(Some(Err(ProtocolError::LineTooLong {
                        len,
                        max: self.max_line_length,
                    })));
                }
                self.next_index = src.len();
                return Ok(None);
            };

            let end = self.next_index + offset;
            self.next_index = 0;
            let frame = src.split_to(end + 1);

            if self.discarding {
                self.discarding = false;
                continue;
            }
            if let Some(request) = self.parse_line(&frame[..end]) {
                return Ok(Some(request));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Request>> {
        if let Some(request) = self.decode(src)? {
            return Ok(Some(request));
        }
        // Final line without a terminator
        self.next_index = 0;
        if src.is_empty() || std::mem::take(&mut self.discarding) {
            src.clear();
            return Ok(None);
        }
        let frame = src.split();
        Ok(self.parse_line(&frame))
    }
}

impl Encoder<Reply> for CommandCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Reply, dst: &mut BytesMut) -> Result<()> {
        let line = item.to_string();
        dst.reserve(line.len() + 2);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}
