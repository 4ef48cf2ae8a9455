//! Wire framing and frame conversion.
//!
//! [`LineCodec`] cuts the inbound byte stream into lines. [`decode`] and
//! [`encode`] convert between those lines and `irc` protocol messages, adding
//! the one thing the protocol crate does not model: lines over the 512 byte
//! limit are cut down and flagged as truncated instead of rejected.

use super::error::CodecError;
use bytes::BytesMut;
use irc::client::prelude::Message;
use std::io;
use tokio_util::codec::Decoder;

/// Maximum length of a protocol line, CRLF included.
pub const MAX_LINE_LEN: usize = 512;

/// Maximum length of a line body, CRLF excluded.
const MAX_BODY_LEN: usize = MAX_LINE_LEN - 2;

/// Upper bound on bytes buffered while waiting for a newline. Leaves room for
/// an IRCv3 tag section in front of a full-length line.
const MAX_BUFFERED: usize = 8191 + MAX_LINE_LEN;

/// A frame read off the wire.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub message: Message,
    /// The raw line was over the limit and only its head was parsed.
    pub truncated: bool,
}

/// A frame ready for the wire, CRLF terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub line: String,
    pub truncated: bool,
}

/// Parse one line into a message.
pub fn decode(line: &str) -> Result<Decoded, CodecError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let body = truncate_utf8_safe(line, MAX_BODY_LEN);

    let message = body.parse::<Message>().map_err(|e| CodecError::Malformed {
        line: line.to_string(),
        reason: e.to_string(),
    })?;

    Ok(Decoded {
        message,
        truncated: body.len() < line.len(),
    })
}

/// Serialize a message into a single CRLF-terminated wire line.
pub fn encode(message: &Message) -> Result<Encoded, CodecError> {
    let rendered = message.to_string();
    let body = rendered.trim_end_matches(['\r', '\n']);

    if body.is_empty() {
        return Err(CodecError::Empty);
    }
    // A stray line break would let a parameter smuggle in a second command.
    if let Some(ch) = body.chars().find(|c| matches!(c, '\r' | '\n' | '\0')) {
        return Err(CodecError::IllegalCharacter(ch));
    }

    let cut = truncate_utf8_safe(body, MAX_BODY_LEN);
    Ok(Encoded {
        line: format!("{}\r\n", cut),
        truncated: cut.len() < body.len(),
    })
}

/// Split `body` into pieces of at most `limit` bytes without breaking a
/// UTF-8 code point. An empty body yields no pieces.
pub fn split_message(body: &str, limit: usize) -> Vec<&str> {
    let limit = limit.max(4);
    let mut pieces = Vec::with_capacity(body.len().div_ceil(limit));
    let mut rest = body;
    while !rest.is_empty() {
        let piece = truncate_utf8_safe(rest, limit);
        pieces.push(piece);
        rest = &rest[piece.len()..];
    }
    pieces
}

/// Longest prefix of `s` that fits in `max_bytes` and ends on a char boundary.
fn truncate_utf8_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Newline-delimited line decoder for the inbound half of a connection.
///
/// Bytes are decoded lossily so a server sending latin-1 does not kill the
/// connection.
#[derive(Debug, Default)]
pub struct LineCodec {
    /// Index of the next byte to scan for `\n`.
    next_index: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let raw = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;
            let line = String::from_utf8_lossy(&raw);
            return Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()));
        }

        self.next_index = src.len();
        if src.len() > MAX_BUFFERED {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line exceeds {} bytes without a terminator", MAX_BUFFERED),
            ));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irc::client::prelude::{Command, Response};

    #[test]
    fn test_decode_ping() {
        let decoded = decode("PING :xyz123\r\n").unwrap();
        assert!(!decoded.truncated);
        assert_eq!(
            decoded.message.command,
            Command::PING("xyz123".to_string(), None)
        );
    }

    #[test]
    fn test_decode_numeric_with_prefix() {
        let decoded = decode(":irc.example.com 001 bot :Welcome to the network").unwrap();
        match decoded.message.command {
            Command::Response(Response::RPL_WELCOME, args) => {
                assert_eq!(args[0], "bot");
                assert_eq!(args[1], "Welcome to the network");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_decode_long_line_is_truncated_not_rejected() {
        let line = format!("PRIVMSG #chan :{}", "a".repeat(1000));
        let decoded = decode(&line).unwrap();
        assert!(decoded.truncated);
        match decoded.message.command {
            Command::PRIVMSG(target, text) => {
                assert_eq!(target, "#chan");
                assert_eq!(text.len(), MAX_BODY_LEN - "PRIVMSG #chan :".len());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_decode_empty_line_is_malformed() {
        let err = decode("\r\n").unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn test_encode_appends_crlf_once() {
        let encoded = encode(&Message::from(Command::NICK("bot".to_string()))).unwrap();
        assert!(!encoded.truncated);
        assert!(encoded.line.ends_with("\r\n"));
        assert!(!encoded.line.ends_with("\r\n\r\n"));

        let back = decode(&encoded.line).unwrap();
        assert_eq!(back.message.command, Command::NICK("bot".to_string()));
    }

    #[test]
    fn test_encode_rejects_line_injection() {
        let msg = Message::from(Command::PRIVMSG(
            "#chan".to_string(),
            "hi\r\nQUIT :gone".to_string(),
        ));
        let err = encode(&msg).unwrap_err();
        assert!(matches!(err, CodecError::IllegalCharacter('\r')));
    }

    #[test]
    fn test_encode_truncates_to_wire_limit() {
        let msg = Message::from(Command::PRIVMSG("#chan".to_string(), "b".repeat(900)));
        let encoded = encode(&msg).unwrap();
        assert!(encoded.truncated);
        assert_eq!(encoded.line.len(), MAX_LINE_LEN);
        assert!(encoded.line.ends_with("\r\n"));
    }

    #[test]
    fn test_split_message_piece_count_and_order() {
        let body: String = (0..1000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let pieces = split_message(&body, 400);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0].len(), 400);
        assert_eq!(pieces[2].len(), 200);
        assert_eq!(pieces.concat(), body);
    }

    #[test]
    fn test_split_message_keeps_code_points_whole() {
        let body = "é".repeat(300);
        let pieces = split_message(&body, 399);
        assert!(pieces.iter().all(|p| p.len() <= 399));
        assert_eq!(pieces.concat(), body);
    }

    #[test]
    fn test_split_message_empty_body() {
        assert!(split_message("", 400).is_empty());
    }

    #[test]
    fn test_line_codec_splits_and_strips() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"PING :a\r\nNOTICE * :partial"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :a".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b" line\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("NOTICE * :partial line".to_string())
        );
    }

    #[test]
    fn test_line_codec_tolerates_invalid_utf8() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"PRIVMSG #c :caf\xe9\r\n"[..]);
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert!(line.starts_with("PRIVMSG #c :caf"));
    }

    #[test]
    fn test_line_codec_bounds_unterminated_input() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(vec![b'x'; MAX_BUFFERED + 1].as_slice());
        let err = codec.decode(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
