//! Application layer use cases for the client application.
//!
//! # What use cases does the client have?
//!
//! - **`authorization`** – Runs one device-authorization attempt at a time
//!   against a streaming host: builds and seals escrow tickets, sends them on
//!   a retry timer, and interprets the host's responses.  The network and
//!   timer are injected as [`Transport`](authorization::Transport) and
//!   [`RepeatingTimer`](scheduling::RepeatingTimer) trait objects.
//!
//! - **`callbacks`** – The observer trait through which outcomes reach the
//!   embedding application.
//!
//! - **`scheduling`** – The repeating-timer port the authorization use case
//!   runs on.

pub mod authorization;
pub mod callbacks;
pub mod scheduling;
