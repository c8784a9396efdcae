//! Device authorization use case: the client side of PIN pairing with a host.
//!
//! # The attempt lifecycle (for beginners)
//!
//! A [`StreamingClient`] is either idle or running exactly one authorization
//! attempt.  [`StreamingClient::request_authorization`] starts an attempt and
//! returns immediately; the heavy lifting happens on a repeating timer:
//!
//! ```text
//!            request_authorization()
//!   Idle ─────────────────────────────▶ Requesting ──┐
//!    ▲                                      │  ▲      │ every tick: build ticket,
//!    │                                      │  └──────┘ seal it, send request
//!    │   Success / Denied / … response      │
//!    │   or cancel_authorization()          │
//!    └──────────────── cleanup ◀────────────┘
//! ```
//!
//! 1. On every tick (the first one immediately, then once per retry interval)
//!    a fresh [`EscrowTicket`] is built from the device identity and the PIN,
//!    sealed with the public key of the host's universe, wrapped in a
//!    [`DeviceAuthorizationRequest`], and sent to the host.  A tick that fails
//!    is logged and skipped; the next tick tries again.
//! 2. When a [`DeviceAuthorizationResponse`] arrives, `InProgress` means the
//!    host is still waiting for its user, so the observer hears about progress
//!    and the retries continue.  Any other result ends the attempt and is
//!    reported as success or failure.
//! 3. Ending an attempt stops its timer.  Once the timer has stopped, the
//!    task's cleanup hook frees the client's attempt slot and a new attempt
//!    may start.
//!
//! # Locking
//!
//! The only shared mutable state is the attempt slot,
//! `Mutex<Option<ActiveAttempt>>`.  It is held just long enough to check,
//! install, take, or clear an attempt; never while encrypting, sending, or
//! invoking callbacks.  The attempt's PIN and host live inside the timer task
//! and are read there without locks.
//!
//! [`DeviceAuthorizationResponse`]: ihs_core::protocol::DeviceAuthorizationResponse

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use ihs_core::crypto::TicketCipher;
use ihs_core::domain::{DeviceIdentity, EscrowTicket, HostInfo, MAX_PIN_LEN};
use ihs_core::protocol::{
    AuthorizationResult, BroadcastHeader, DeviceAuthorizationRequest, InboundMessage,
    MessageType, ProtocolError,
};
use prost::Message;
use thiserror::Error;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::application::callbacks::{AuthorizationObserver, ClientCallbackBridge};
use crate::application::scheduling::{RepeatingTimer, TimerHandle, TimerTask};

/// Default delay between two authorization requests.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(1000);

// ── Ports ─────────────────────────────────────────────────────────────────────

/// Error type for outbound message delivery.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("framing error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Sends one broadcast-protocol body to a host.
///
/// The implementation is responsible for the packet header and framing.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    fn send(
        &self,
        destination: SocketAddr,
        kind: MessageType,
        body: &[u8],
    ) -> Result<(), TransportError>;
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Why an authorization attempt could not be started.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartError {
    /// Another attempt is still running or shutting down.
    #[error("an authorization attempt is already in progress")]
    Busy,

    #[error("PIN is {len} bytes long; at most {max} are allowed")]
    PinTooLong { len: usize, max: usize },
}

// ── Attempt state ─────────────────────────────────────────────────────────────

/// The immutable inputs of one attempt, owned by its timer task.
struct AuthorizationAttempt {
    host: HostInfo,
    device_name: String,
    pin: Zeroizing<String>,
}

/// What the client-wide slot records about the running attempt.
struct ActiveAttempt {
    id: u64,
    host: HostInfo,
    /// `None` once the timer has been asked to stop; the slot stays occupied
    /// until the task's cleanup hook clears it.
    timer: Option<TimerHandle>,
}

struct ClientInner {
    identity: DeviceIdentity,
    cipher: TicketCipher,
    transport: Arc<dyn Transport>,
    timer: Arc<dyn RepeatingTimer>,
    retry_interval: Duration,
    callbacks: ClientCallbackBridge,
    slot: Mutex<Option<ActiveAttempt>>,
    next_attempt_id: AtomicU64,
}

impl ClientInner {
    fn slot(&self) -> MutexGuard<'_, Option<ActiveAttempt>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the timer handle of the running attempt, leaving the attempt in
    /// its stopping state.
    fn take_running_timer(&self) -> Option<(u64, HostInfo, TimerHandle)> {
        let mut slot = self.slot();
        let active = slot.as_mut()?;
        let handle = active.timer.take()?;
        Some((active.id, active.host, handle))
    }

    fn running_attempt(&self) -> Option<u64> {
        self.slot()
            .as_ref()
            .filter(|active| active.timer.is_some())
            .map(|active| active.id)
    }
}

// ── StreamingClient ───────────────────────────────────────────────────────────

/// A device that can authorize itself with streaming hosts.
///
/// Dropping the client cancels any running attempt.
pub struct StreamingClient {
    inner: Arc<ClientInner>,
}

impl StreamingClient {
    /// Creates an idle client.
    ///
    /// `timer` must not run the task synchronously inside
    /// [`RepeatingTimer::start`].
    pub fn new(
        identity: DeviceIdentity,
        cipher: TicketCipher,
        transport: Arc<dyn Transport>,
        timer: Arc<dyn RepeatingTimer>,
        retry_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                identity,
                cipher,
                transport,
                timer,
                retry_interval,
                callbacks: ClientCallbackBridge::new(),
                slot: Mutex::new(None),
                next_attempt_id: AtomicU64::new(1),
            }),
        }
    }

    /// The identity presented in every request this client sends.
    pub fn identity(&self) -> &DeviceIdentity {
        &self.inner.identity
    }

    /// Registers the observer that receives outcomes; `None` unregisters it.
    pub fn set_observer(&self, observer: Option<Arc<dyn AuthorizationObserver>>) {
        self.inner.callbacks.set(observer);
    }

    /// Starts authorizing with `host` using the PIN the host displays.
    ///
    /// Returns `false` without changing anything if an attempt is already
    /// active or the PIN is too long.
    pub fn request_authorization(&self, host: HostInfo, pin: &str) -> bool {
        match self.try_request_authorization(host, pin) {
            Ok(()) => true,
            Err(e) => {
                debug!("authorization request refused: {e}");
                false
            }
        }
    }

    /// Like [`request_authorization`](Self::request_authorization), but says
    /// why a request was refused.
    ///
    /// # Errors
    ///
    /// - [`StartError::PinTooLong`] if `pin` exceeds [`MAX_PIN_LEN`] bytes.
    /// - [`StartError::Busy`] if an attempt is active or still stopping.
    pub fn try_request_authorization(&self, host: HostInfo, pin: &str) -> Result<(), StartError> {
        if pin.len() > MAX_PIN_LEN {
            return Err(StartError::PinTooLong {
                len: pin.len(),
                max: MAX_PIN_LEN,
            });
        }

        let mut slot = self.inner.slot();
        if slot.is_some() {
            return Err(StartError::Busy);
        }

        let id = self.inner.next_attempt_id.fetch_add(1, Ordering::Relaxed);
        let task = AuthorizationTask {
            id,
            attempt: AuthorizationAttempt {
                host,
                device_name: self.inner.identity.device_name().to_string(),
                pin: Zeroizing::new(pin.to_string()),
            },
            client: Arc::downgrade(&self.inner),
        };
        let handle = self
            .inner
            .timer
            .start(self.inner.retry_interval, Box::new(task));
        *slot = Some(ActiveAttempt {
            id,
            host,
            timer: Some(handle),
        });
        drop(slot);

        info!(
            "authorization attempt {id} started for {} ({} universe)",
            host.address, host.universe
        );
        Ok(())
    }

    /// Stops the running attempt without notifying the observer.
    ///
    /// Returns `true` if an attempt was running.
    pub fn cancel_authorization(&self) -> bool {
        match self.inner.take_running_timer() {
            Some((id, _, handle)) => {
                handle.stop();
                info!("authorization attempt {id} canceled");
                true
            }
            None => false,
        }
    }

    /// Returns `true` while an attempt occupies the slot, including while it
    /// is shutting down.
    pub fn is_authorizing(&self) -> bool {
        self.inner.slot().is_some()
    }

    /// The host of the attempt occupying the slot, if any.
    pub fn active_host(&self) -> Option<HostInfo> {
        self.inner.slot().as_ref().map(|active| active.host)
    }

    /// Processes a decoded message that arrived from `source`.
    ///
    /// Only authorization responses are acted on.  Responses that arrive
    /// while no attempt is running are dropped without a callback.  A
    /// terminal result is reported before the timer is stopped, so the slot
    /// is still occupied while the callback runs.
    pub fn handle_authorization_message(
        &self,
        source: SocketAddr,
        header: &BroadcastHeader,
        message: &InboundMessage,
    ) {
        let response = match (header.kind(), message) {
            (
                Some(MessageType::DeviceAuthorizationResponse),
                InboundMessage::AuthorizationResponse(response),
            ) => response,
            (kind, _) => {
                debug!("ignoring message {kind:?} from {source}");
                return;
            }
        };

        match response.outcome() {
            AuthorizationResult::InProgress => {
                let Some(id) = self.inner.running_attempt() else {
                    debug!("dropping unsolicited progress from {source}");
                    return;
                };
                debug!("attempt {id}: host {source} is waiting for its user");
                self.inner.callbacks.progress(self);
            }
            result => {
                let Some((id, host, handle)) = self.inner.take_running_timer() else {
                    debug!("dropping unsolicited {result} response from {source}");
                    return;
                };
                if result == AuthorizationResult::Success {
                    info!("attempt {id}: authorized by {}", host.address);
                    self.inner.callbacks.success(self, response.account_id());
                } else {
                    info!("attempt {id}: {} answered {result}", host.address);
                    self.inner.callbacks.failure(self, result);
                }
                handle.stop();
            }
        }
    }
}

impl Drop for StreamingClient {
    fn drop(&mut self) {
        self.cancel_authorization();
    }
}

// ── Timer task ────────────────────────────────────────────────────────────────

struct AuthorizationTask {
    id: u64,
    attempt: AuthorizationAttempt,
    client: Weak<ClientInner>,
}

impl AuthorizationTask {
    fn build_request(&self, client: &ClientInner) -> Option<Vec<u8>> {
        let ticket = EscrowTicket::build(&client.identity, &self.attempt.pin);
        let encrypted = match client.cipher.seal(&ticket, self.attempt.host.universe) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("attempt {}: skipping request: {e}", self.id);
                return None;
            }
        };
        let request = DeviceAuthorizationRequest {
            device_token: Some(client.identity.device_token().to_vec()),
            device_name: Some(self.attempt.device_name.clone()),
            encrypted_request: Some(encrypted),
        };
        Some(request.encode_to_vec())
    }
}

impl TimerTask for AuthorizationTask {
    fn tick(&mut self) {
        let Some(client) = self.client.upgrade() else {
            return;
        };
        let Some(body) = self.build_request(&client) else {
            return;
        };
        let destination = self.attempt.host.address;
        match client
            .transport
            .send(destination, MessageType::DeviceAuthorizationRequest, &body)
        {
            Ok(()) => debug!("attempt {}: request sent to {destination}", self.id),
            Err(e) => warn!("attempt {}: send to {destination} failed: {e}", self.id),
        }
    }

    fn stopped(self: Box<Self>) {
        if let Some(client) = self.client.upgrade() {
            let mut slot = client.slot();
            if slot.as_ref().map(|active| active.id) == Some(self.id) {
                *slot = None;
            }
        }
        debug!("attempt {} cleaned up", self.id);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::timer::manual::ManualTimer;
    use ihs_core::crypto::{RsaEncryptor, RsaError};
    use ihs_core::domain::Universe;
    use ihs_core::protocol::DeviceAuthorizationResponse;

    struct StubEncryptor;

    impl RsaEncryptor for StubEncryptor {
        fn encrypt(&self, _plaintext: &[u8], _key: &[u8]) -> Result<Vec<u8>, RsaError> {
            Ok(vec![0xC1; 256])
        }
    }

    fn host() -> HostInfo {
        HostInfo::new("192.168.1.20:27036".parse().unwrap(), Universe::Public)
    }

    fn make_client(transport: MockTransport) -> (StreamingClient, Arc<ManualTimer>) {
        let timer = Arc::new(ManualTimer::new());
        let client = StreamingClient::new(
            DeviceIdentity::new(7, [1; 32], [2; 8], "unit-test"),
            TicketCipher::new(Arc::new(StubEncryptor)),
            Arc::new(transport),
            timer.clone(),
            DEFAULT_RETRY_INTERVAL,
        );
        (client, timer)
    }

    fn response(result: AuthorizationResult) -> (BroadcastHeader, InboundMessage) {
        (
            BroadcastHeader::for_message(MessageType::DeviceAuthorizationResponse, 1, 1),
            InboundMessage::AuthorizationResponse(DeviceAuthorizationResponse {
                result: Some(result.code()),
                steamid: None,
            }),
        )
    }

    #[test]
    fn test_request_starts_timer_with_retry_interval() {
        // Arrange
        let (client, timer) = make_client(MockTransport::new());

        // Act
        let started = client.request_authorization(host(), "1234");

        // Assert
        assert!(started);
        assert!(client.is_authorizing());
        assert_eq!(timer.active_count(), 1);
        assert_eq!(timer.last_interval(), Some(DEFAULT_RETRY_INTERVAL));
    }

    #[test]
    fn test_second_request_is_busy() {
        let (client, _timer) = make_client(MockTransport::new());
        client.request_authorization(host(), "1234");

        assert_eq!(
            client.try_request_authorization(host(), "1234"),
            Err(StartError::Busy)
        );
    }

    #[test]
    fn test_overlong_pin_is_rejected_without_state_change() {
        let (client, timer) = make_client(MockTransport::new());

        let result = client.try_request_authorization(host(), "1234567890123456");

        assert_eq!(result, Err(StartError::PinTooLong { len: 16, max: 15 }));
        assert!(!client.is_authorizing());
        assert_eq!(timer.active_count(), 0);
    }

    #[test]
    fn test_tick_sends_request_to_host() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|dest, kind, body| {
                let request = DeviceAuthorizationRequest::decode(body).unwrap();
                *dest == host().address
                    && *kind == MessageType::DeviceAuthorizationRequest
                    && request.device_token == Some(vec![2; 8])
                    && request.device_name.as_deref() == Some("unit-test")
                    && request.encrypted_request == Some(vec![0xC1; 256])
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let (client, timer) = make_client(transport);
        client.request_authorization(host(), "1234");

        // Act
        timer.fire();
    }

    #[test]
    fn test_send_failure_keeps_attempt_running() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(2).returning(|_, _, _| {
            Err(TransportError::Io(std::io::Error::other("network down")))
        });
        let (client, timer) = make_client(transport);
        client.request_authorization(host(), "1234");

        timer.fire();
        timer.fire();

        assert!(client.is_authorizing());
        assert_eq!(timer.active_count(), 1);
    }

    #[test]
    fn test_terminal_response_frees_slot() {
        // Arrange
        let (client, timer) = make_client(MockTransport::new());
        client.request_authorization(host(), "1234");
        let (header, message) = response(AuthorizationResult::Denied);

        // Act
        client.handle_authorization_message(host().address, &header, &message);

        // Assert
        assert!(!client.is_authorizing());
        assert_eq!(timer.active_count(), 0);
        assert!(client.request_authorization(host(), "1234"));
    }

    #[test]
    fn test_progress_response_keeps_attempt() {
        let (client, timer) = make_client(MockTransport::new());
        client.request_authorization(host(), "1234");
        let (header, message) = response(AuthorizationResult::InProgress);

        client.handle_authorization_message(host().address, &header, &message);

        assert!(client.is_authorizing());
        assert_eq!(timer.active_count(), 1);
    }

    #[test]
    fn test_non_response_message_is_ignored() {
        let (client, timer) = make_client(MockTransport::new());
        client.request_authorization(host(), "1234");
        let header = BroadcastHeader::for_message(MessageType::Status, 1, 1);

        client.handle_authorization_message(
            host().address,
            &header,
            &InboundMessage::Unhandled(MessageType::Status),
        );

        assert_eq!(timer.active_count(), 1);
    }

    #[test]
    fn test_cancel_frees_slot() {
        let (client, timer) = make_client(MockTransport::new());
        client.request_authorization(host(), "1234");

        assert!(client.cancel_authorization());
        assert!(!client.cancel_authorization());
        assert!(!client.is_authorizing());
        assert_eq!(timer.active_count(), 0);
    }

    #[test]
    fn test_dropping_client_stops_timer() {
        let (client, timer) = make_client(MockTransport::new());
        client.request_authorization(host(), "1234");

        drop(client);

        assert_eq!(timer.active_count(), 0);
    }
}
