//! Framing for broadcast-protocol datagrams.
//!
//! Wire format:
//! ```text
//! [signature:8][header_len:4][header:N][body_len:4][body:M]
//! ```
//! The signature is the fixed byte sequence `FF FF FF FF 21 4C 5F A0`.  Both
//! length fields are little-endian `u32`.  `header` is a protobuf
//! [`BroadcastHeader`]; `body` is the protobuf message named by the header's
//! message type.

use prost::Message;
use thiserror::Error;

use crate::protocol::messages::{BroadcastHeader, DeviceAuthorizationResponse, MessageType};

/// Leading bytes of every broadcast-protocol datagram.
pub const PACKET_SIGNATURE: [u8; 8] = [0xFF, 0xFF, 0xFF, 0xFF, 0x21, 0x4C, 0x5F, 0xA0];

/// Smallest possible datagram: signature plus two empty length-prefixed sections.
pub const MIN_PACKET_SIZE: usize = PACKET_SIGNATURE.len() + 4 + 4;

/// Errors that can occur while framing or parsing a datagram.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the minimum required length.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The datagram does not start with [`PACKET_SIGNATURE`].
    #[error("bad packet signature")]
    BadSignature,

    /// A length prefix points past the end of the datagram.
    #[error("{section} length mismatch: declared {declared}, available {available}")]
    LengthMismatch {
        section: &'static str,
        declared: usize,
        available: usize,
    },

    /// A section does not fit a `u32` length prefix.
    #[error("{section} too large to frame: {len} bytes")]
    SectionTooLarge { section: &'static str, len: usize },

    /// The header carries no message type or one this client does not know.
    #[error("unknown message type: {0:?}")]
    UnknownMessageType(Option<i32>),

    /// A protobuf section could not be parsed.
    #[error("malformed {section}: {reason}")]
    Decode {
        section: &'static str,
        reason: String,
    },
}

/// A parsed datagram whose body has not been decoded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet<'a> {
    pub header: BroadcastHeader,
    pub body: &'a [u8],
}

/// A decoded body, keyed by the header's message type.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    AuthorizationResponse(DeviceAuthorizationResponse),
    /// A known message type this client does not act on.
    Unhandled(MessageType),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Frames an already-encoded body behind `header`.
///
/// # Errors
///
/// Returns [`ProtocolError::SectionTooLarge`] if either section exceeds
/// `u32::MAX` bytes.
pub fn encode_packet(header: &BroadcastHeader, body: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let header_bytes = header.encode_to_vec();
    let header_len = section_len("header", header_bytes.len())?;
    let body_len = section_len("body", body.len())?;

    let mut buf = Vec::with_capacity(MIN_PACKET_SIZE + header_bytes.len() + body.len());
    buf.extend_from_slice(&PACKET_SIGNATURE);
    buf.extend_from_slice(&header_len.to_le_bytes());
    buf.extend_from_slice(&header_bytes);
    buf.extend_from_slice(&body_len.to_le_bytes());
    buf.extend_from_slice(body);
    Ok(buf)
}

/// Parses the signature, header, and body boundaries of one datagram.
///
/// Trailing bytes after the body are ignored.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the datagram is truncated, carries the wrong
/// signature, or the header is not valid protobuf.
pub fn decode_packet(bytes: &[u8]) -> Result<Packet<'_>, ProtocolError> {
    if bytes.len() < MIN_PACKET_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: MIN_PACKET_SIZE,
            available: bytes.len(),
        });
    }
    if bytes[..PACKET_SIGNATURE.len()] != PACKET_SIGNATURE {
        return Err(ProtocolError::BadSignature);
    }

    let (header_bytes, rest) = read_section(&bytes[PACKET_SIGNATURE.len()..], "header")?;
    let (body, _) = read_section(rest, "body")?;

    let header = BroadcastHeader::decode(header_bytes).map_err(|e| ProtocolError::Decode {
        section: "header",
        reason: e.to_string(),
    })?;
    Ok(Packet { header, body })
}

/// Decodes the body of `packet` according to its header's message type.
///
/// # Errors
///
/// Returns [`ProtocolError::UnknownMessageType`] when the header names no
/// known type, and [`ProtocolError::Decode`] for malformed bodies.
pub fn decode_body(packet: &Packet<'_>) -> Result<InboundMessage, ProtocolError> {
    let kind = packet
        .header
        .kind()
        .ok_or(ProtocolError::UnknownMessageType(packet.header.msg_type))?;
    match kind {
        MessageType::DeviceAuthorizationResponse => DeviceAuthorizationResponse::decode(packet.body)
            .map(InboundMessage::AuthorizationResponse)
            .map_err(|e| ProtocolError::Decode {
                section: "authorization response",
                reason: e.to_string(),
            }),
        other => Ok(InboundMessage::Unhandled(other)),
    }
}

// ── Utility helpers ───────────────────────────────────────────────────────────

fn section_len(section: &'static str, len: usize) -> Result<u32, ProtocolError> {
    u32::try_from(len).map_err(|_| ProtocolError::SectionTooLarge { section, len })
}

/// Splits a `u32`-LE length-prefixed section off the front of `buf`.
fn read_section<'a>(
    buf: &'a [u8],
    section: &'static str,
) -> Result<(&'a [u8], &'a [u8]), ProtocolError> {
    if buf.len() < 4 {
        return Err(ProtocolError::InsufficientData {
            needed: 4,
            available: buf.len(),
        });
    }
    let declared = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let rest = &buf[4..];
    if rest.len() < declared {
        return Err(ProtocolError::LengthMismatch {
            section,
            declared,
            available: rest.len(),
        });
    }
    Ok(rest.split_at(declared))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
