//! Wire protocol: delimiter-framed ASCII strings in both directions.
//!
//! Inbound frames end at `\n` or `\0`. Outbound frames end with the
//! configured [`Terminator`].

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::chess::MoveRejection;

/// Byte written after every outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Terminator {
    #[default]
    Newline,
    Nul,
}

impl Terminator {
    #[must_use]
    pub const fn byte(self) -> u8 {
        match self {
            Self::Newline => b'\n',
            Self::Nul => b'\0',
        }
    }
}

/// A message the server sends to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Both players are paired and the game has begun.
    Setup,
    YourTurn,
    NotYourTurn,
    /// An accepted token, echoed to both players.
    Moved(String),
    Rejected(MoveRejection),
    ServerFull,
    OpponentLeft,
}

impl std::fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Setup => write!(f, "setup"),
            Self::YourTurn => write!(f, "your turn"),
            Self::NotYourTurn => write!(f, "not your turn"),
            Self::Moved(token) => write!(f, "{token}"),
            Self::Rejected(reason) => write!(f, "{reason}"),
            Self::ServerFull => write!(f, "server is full"),
            Self::OpponentLeft => write!(f, "opponent left"),
        }
    }
}

/// One inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Token(String),
    /// The frame exceeded the length limit and was discarded.
    Oversized,
    /// The frame was not valid UTF-8.
    Malformed,
}

/// Codec for the relay's framing.
#[derive(Debug, Clone)]
pub struct RelayCodec {
    max_frame_len: usize,
    terminator: Terminator,
    /// Set while skipping the remainder of an oversized frame.
    discarding: bool,
    /// Bytes already scanned for a delimiter in the buffered frame.
    scanned: usize,
}

impl RelayCodec {
    #[must_use]
    pub fn new(max_frame_len: usize, terminator: Terminator) -> Self {
        Self {
            max_frame_len,
            terminator,
            discarding: false,
            scanned: 0,
        }
    }
}

fn is_delimiter(b: &u8) -> bool {
    *b == b'\n' || *b == b'\0'
}

impl Decoder for RelayCodec {
    type Item = Inbound;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Inbound>, Self::Error> {
        loop {
            let found = src[self.scanned..].iter().position(is_delimiter);
            let Some(offset) = found else {
                if self.discarding {
                    src.clear();
                    self.scanned = 0;
                    return Ok(None);
                }
                // One extra byte for a `\r` still waiting on its `\n`.
                if src.len() > self.max_frame_len + 1 {
                    src.clear();
                    self.scanned = 0;
                    self.discarding = true;
                    return Ok(Some(Inbound::Oversized));
                }
                self.scanned = src.len();
                return Ok(None);
            };

            let end = self.scanned + offset;
            self.scanned = 0;
            let frame = src.split_to(end);
            src.advance(1);

            if self.discarding {
                self.discarding = false;
                continue;
            }
            let mut frame = &frame[..];
            if let [rest @ .., b'\r'] = frame {
                frame = rest;
            }
            if frame.is_empty() {
                continue;
            }
            if frame.len() > self.max_frame_len {
                return Ok(Some(Inbound::Oversized));
            }
            return Ok(Some(match std::str::from_utf8(frame) {
                Ok(text) => Inbound::Token(text.to_string()),
                Err(_) => Inbound::Malformed,
            }));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Inbound>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        if self.discarding || src.is_empty() {
            src.clear();
            return Ok(None);
        }
        // A final unterminated frame still counts.
        src.put_u8(b'\n');
        self.decode(src)
    }
}

impl Encoder<ServerMessage> for RelayCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: ServerMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let text = item.to_string();
        dst.reserve(text.len() + 1);
        dst.put_slice(text.as_bytes());
        dst.put_u8(self.terminator.byte());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut RelayCodec, input: &[u8]) -> Vec<Inbound> {
        let mut buf = BytesMut::from(input);
        let mut out = Vec::new();
        while let Some(item) = codec.decode(&mut buf).unwrap() {
            out.push(item);
        }
        out
    }

    fn token(s: &str) -> Inbound {
        Inbound::Token(s.to_string())
    }

    #[test]
    fn splits_on_newline_and_nul() {
        let mut codec = RelayCodec::new(64, Terminator::Newline);
        let items = decode_all(&mut codec, b"e2e4\n\0O-O\0=Q\r\n");
        assert_eq!(items, vec![token("e2e4"), token("O-O"), token("=Q")]);
    }

    #[test]
    fn waits_for_delimiter() {
        let mut codec = RelayCodec::new(64, Terminator::Newline);
        let mut buf = BytesMut::from(&b"e2"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"e4\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(token("e2e4")));
        assert!(buf.is_empty());
    }

    #[test]
    fn oversized_frame_is_reported_once() {
        let mut codec = RelayCodec::new(8, Terminator::Newline);
        let mut buf = BytesMut::from(&b"0123456789"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Inbound::Oversized));
        buf.extend_from_slice(b"abcdef\ne2e4\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(token("e2e4")));

        let items = decode_all(&mut codec, b"0123456789\nd2d4\n");
        assert_eq!(items, vec![Inbound::Oversized, token("d2d4")]);
    }

    #[test]
    fn full_length_frame_with_split_crlf() {
        let mut codec = RelayCodec::new(8, Terminator::Newline);
        let mut buf = BytesMut::from(&b"01234567\r"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(token("01234567")));

        let mut buf = BytesMut::from(&b"012345678\r"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Inbound::Oversized));
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let mut codec = RelayCodec::new(64, Terminator::Newline);
        let items = decode_all(&mut codec, b"\xff\xfe\n");
        assert_eq!(items, vec![Inbound::Malformed]);
    }

    #[test]
    fn eof_flushes_unterminated_frame() {
        let mut codec = RelayCodec::new(64, Terminator::Newline);
        let mut buf = BytesMut::from(&b"e2e4"[..]);
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), Some(token("e2e4")));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn encodes_with_terminator() {
        let mut codec = RelayCodec::new(64, Terminator::Nul);
        let mut buf = BytesMut::new();
        codec.encode(ServerMessage::YourTurn, &mut buf).unwrap();
        codec
            .encode(ServerMessage::Rejected(MoveRejection::Check), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"your turn\0check\0");

        let mut codec = RelayCodec::new(64, Terminator::Newline);
        let mut buf = BytesMut::new();
        codec
            .encode(ServerMessage::Moved("e2e4".into()), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"e2e4\n");
    }

    #[test]
    fn message_text() {
        assert_eq!(ServerMessage::Setup.to_string(), "setup");
        assert_eq!(ServerMessage::NotYourTurn.to_string(), "not your turn");
        assert_eq!(
            ServerMessage::Rejected(MoveRejection::InvalidMove).to_string(),
            "invalid move"
        );
        assert_eq!(ServerMessage::ServerFull.to_string(), "server is full");
    }
}
