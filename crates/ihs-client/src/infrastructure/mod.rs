//! Infrastructure layer for the client application.
//!
//! Contains OS-facing adapters: UDP network I/O, timers, and configuration
//! storage.
//!
//! **Dependency rule**: this layer may depend on `application` and `ihs_core`,
//! but MUST NOT be imported by the `application` or domain layers.
//!
//! # Sub-modules
//!
//! - **`network`** – [`UdpTransport`](network::UdpTransport), which frames and
//!   sends requests, and the receive loop that routes host responses back to
//!   the client.  A `RecordingTransport` is also provided for tests.
//!
//! - **`timer`** – Tokio-backed and hand-driven implementations of the
//!   repeating-timer port.
//!
//! - **`storage`** – TOML configuration file persistence, including the
//!   device identity.

pub mod network;
pub mod storage;
pub mod timer;
