//! ihs-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does ihs-client do? (for beginners)
//!
//! In-Home Streaming lets one machine on the LAN (the *host*) stream games to
//! another (the *client*).  Before a host accepts a new client device, the
//! device has to be *authorized*: the host displays a PIN, the user enters it
//! on the client, and the client proves it knows the PIN.
//!
//! The client application:
//!
//! 1. Loads (or on first run generates and saves) the device identity.
//! 2. Builds a key-escrow ticket holding the PIN and the device secret, and
//!    encrypts it with the public key of the host's universe.
//! 3. Sends the encrypted ticket to the host once a second until the host
//!    answers with a final result.
//! 4. Reports progress, success (with the account the device now belongs to)
//!    or failure to the registered observer.

/// Application layer: use cases for the client.
pub mod application;

/// Infrastructure layer: network, timers, and configuration storage.
pub mod infrastructure;

pub use application::authorization::{StartError, StreamingClient, Transport, TransportError};
pub use application::callbacks::{AuthorizationObserver, CallbackSet};
