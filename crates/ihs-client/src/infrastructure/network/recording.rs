//! In-memory [`Transport`] for tests.
//!
//! Every body passed to `send` is recorded in order so tests can decode and
//! inspect exactly what would have gone on the wire.  Set the transport to
//! failing mode to exercise the skipped-tick path.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use ihs_core::protocol::{DeviceAuthorizationRequest, MessageType};
use prost::Message;

use crate::application::authorization::{Transport, TransportError};

/// One recorded `send` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub destination: SocketAddr,
    pub kind: MessageType,
    pub body: Vec<u8>,
}

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentMessage>>,
    failing: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// When `true`, every `send` fails with an I/O error and records nothing.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Decodes every recorded authorization request, skipping other bodies.
    pub fn authorization_requests(&self) -> Vec<DeviceAuthorizationRequest> {
        self.sent()
            .into_iter()
            .filter(|m| m.kind == MessageType::DeviceAuthorizationRequest)
            .filter_map(|m| DeviceAuthorizationRequest::decode(m.body.as_slice()).ok())
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn send(
        &self,
        destination: SocketAddr,
        kind: MessageType,
        body: &[u8],
    ) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "injected failure",
            )));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMessage {
                destination,
                kind,
                body: body.to_vec(),
            });
        Ok(())
    }
}
