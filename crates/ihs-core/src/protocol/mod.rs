//! Protocol module containing message types and the datagram codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_body, decode_packet, encode_packet, InboundMessage, Packet, ProtocolError};
pub use messages::*;
