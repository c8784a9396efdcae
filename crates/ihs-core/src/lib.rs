//! # ihs-core
//!
//! Shared library for the In-Home Streaming client containing the broadcast
//! protocol messages and codec, the device and ticket domain types, and the
//! key registry and cipher used to seal escrow tickets.
//!
//! It has no dependencies on sockets, timers, or threads.
//!
//! # Architecture overview (for beginners)
//!
//! Before a streaming host accepts a new client device, the user has to
//! *authorize* it: the host shows a PIN, the user types it on the client, and
//! the client sends the host an encrypted *key-escrow ticket* containing the
//! PIN and the device's long-lived secret.  The host answers with a result
//! code.
//!
//! This crate (`ihs-core`) holds everything about that exchange that does not
//! touch the OS:
//!
//! - **`domain`** – The device identity, hosts and their universes, and the
//!   escrow ticket itself.
//!
//! - **`protocol`** – How bytes travel over the network.  Each datagram is a
//!   signature, a length-prefixed protobuf header, and a length-prefixed
//!   protobuf body.
//!
//! - **`crypto`** – The per-universe RSA public keys and the [`TicketCipher`]
//!   that serializes a ticket and encrypts it.

pub mod crypto;
pub mod domain;
pub mod protocol;

pub use crypto::{SealError, TicketCipher};
pub use domain::{DeviceIdentity, EscrowTicket, HostInfo, Universe};
pub use protocol::codec::{decode_body, decode_packet, encode_packet, ProtocolError};
pub use protocol::messages::{AuthorizationResult, BroadcastHeader, MessageType};
