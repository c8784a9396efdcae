//! Domain types with no I/O: hosts, the device identity, and escrow tickets.
//!
//! # Sub-modules
//!
//! - **`host`** – [`HostInfo`] and the [`Universe`] a host belongs to.
//! - **`identity`** – the [`DeviceIdentity`] a client presents to every host,
//!   plus the size limits that apply to names and PINs.
//! - **`ticket`** – the [`EscrowTicket`] built for each authorization request.

pub mod host;
pub mod identity;
pub mod ticket;

pub use host::{HostInfo, ParseUniverseError, Universe};
pub use identity::{
    truncate_utf8, DeviceIdentity, DEVICE_TOKEN_LEN, MAX_DEVICE_NAME_LEN, MAX_PIN_LEN,
    SECRET_KEY_LEN,
};
pub use ticket::{EscrowTicket, EscrowUsage};
