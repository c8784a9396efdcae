//! Delivery of authorization outcomes to the embedding application.
//!
//! # How notifications reach the caller (for beginners)
//!
//! The streaming client never blocks waiting for a host: it sends requests
//! from a timer and learns about the outcome when a response datagram
//! arrives on the network thread.  The application registers one
//! [`AuthorizationObserver`] per client and is called back from that thread,
//! with the client that produced the outcome as the first argument:
//!
//! - [`on_progress`](AuthorizationObserver::on_progress) – the host is still
//!   waiting for the user; the client keeps retrying.
//! - [`on_success`](AuthorizationObserver::on_success) – the device is now
//!   authorized for the given account.
//! - [`on_failure`](AuthorizationObserver::on_failure) – the host refused or
//!   gave up; the result code says why.
//!
//! Callbacks run synchronously and must return quickly.  No client lock is
//! held while they run, but the finishing attempt still occupies the client,
//! so starting a new attempt from a success or failure callback is refused
//! as busy.

use std::sync::{Arc, PoisonError, RwLock};

use ihs_core::protocol::AuthorizationResult;

use crate::application::authorization::StreamingClient;

/// Receives the outcome of authorization attempts.
///
/// Every method defaults to a no-op, so implementors only override what they
/// care about.
pub trait AuthorizationObserver: Send + Sync {
    fn on_progress(&self, _client: &StreamingClient) {}

    fn on_success(&self, _client: &StreamingClient, _account_id: u64) {}

    fn on_failure(&self, _client: &StreamingClient, _result: AuthorizationResult) {}
}

type ProgressFn = Box<dyn Fn(&StreamingClient) + Send + Sync>;
type SuccessFn = Box<dyn Fn(&StreamingClient, u64) + Send + Sync>;
type FailureFn = Box<dyn Fn(&StreamingClient, AuthorizationResult) + Send + Sync>;

/// An observer assembled from optional closures.
///
/// ```ignore
/// let callbacks = CallbackSet::new()
///     .on_success(|_, account| println!("authorized for {account}"))
///     .on_failure(|client, result| {
///         eprintln!("{:?} refused: {result}", client.active_host());
///     });
/// client.set_observer(Some(Arc::new(callbacks)));
/// ```
#[derive(Default)]
pub struct CallbackSet {
    progress: Option<ProgressFn>,
    success: Option<SuccessFn>,
    failure: Option<FailureFn>,
}

impl CallbackSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress(mut self, f: impl Fn(&StreamingClient) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn on_success(
        mut self,
        f: impl Fn(&StreamingClient, u64) + Send + Sync + 'static,
    ) -> Self {
        self.success = Some(Box::new(f));
        self
    }

    pub fn on_failure(
        mut self,
        f: impl Fn(&StreamingClient, AuthorizationResult) + Send + Sync + 'static,
    ) -> Self {
        self.failure = Some(Box::new(f));
        self
    }
}

impl AuthorizationObserver for CallbackSet {
    fn on_progress(&self, client: &StreamingClient) {
        if let Some(f) = &self.progress {
            f(client);
        }
    }

    fn on_success(&self, client: &StreamingClient, account_id: u64) {
        if let Some(f) = &self.success {
            f(client, account_id);
        }
    }

    fn on_failure(&self, client: &StreamingClient, result: AuthorizationResult) {
        if let Some(f) = &self.failure {
            f(client, result);
        }
    }
}

/// Holds the zero-or-one observer registered with a client.
#[derive(Default)]
pub struct ClientCallbackBridge {
    observer: RwLock<Option<Arc<dyn AuthorizationObserver>>>,
}

impl ClientCallbackBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the registered observer; `None` unregisters it.
    pub fn set(&self, observer: Option<Arc<dyn AuthorizationObserver>>) {
        *self.observer.write().unwrap_or_else(PoisonError::into_inner) = observer;
    }

    pub fn progress(&self, client: &StreamingClient) {
        if let Some(observer) = self.current() {
            observer.on_progress(client);
        }
    }

    pub fn success(&self, client: &StreamingClient, account_id: u64) {
        if let Some(observer) = self.current() {
            observer.on_success(client, account_id);
        }
    }

    pub fn failure(&self, client: &StreamingClient, result: AuthorizationResult) {
        if let Some(observer) = self.current() {
            observer.on_failure(client, result);
        }
    }

    /// Clones the observer out so it is invoked without the lock held.
    fn current(&self) -> Option<Arc<dyn AuthorizationObserver>> {
        self.observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use ihs_core::crypto::TicketCipher;
    use ihs_core::domain::DeviceIdentity;

    use crate::infrastructure::network::recording::RecordingTransport;
    use crate::infrastructure::timer::ManualTimer;

    fn idle_client(name: &str) -> StreamingClient {
        StreamingClient::new(
            DeviceIdentity::new(9, [1; 32], [2; 8], name),
            TicketCipher::oaep(),
            Arc::new(RecordingTransport::new()),
            Arc::new(ManualTimer::new()),
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_bridge_without_observer_is_silent() {
        let client = idle_client("den");
        let bridge = ClientCallbackBridge::new();
        bridge.progress(&client);
        bridge.success(&client, 1);
        bridge.failure(&client, AuthorizationResult::Denied);
    }

    #[test]
    fn test_callback_set_forwards_to_registered_closures() {
        // Arrange
        let client = idle_client("den");
        let account = Arc::new(AtomicU64::new(0));
        let failures = Arc::new(Mutex::new(Vec::new()));
        let account_clone = Arc::clone(&account);
        let failures_clone = Arc::clone(&failures);
        let bridge = ClientCallbackBridge::new();
        bridge.set(Some(Arc::new(
            CallbackSet::new()
                .on_success(move |_, id| account_clone.store(id, Ordering::SeqCst))
                .on_failure(move |_, r| failures_clone.lock().unwrap().push(r)),
        )));

        // Act
        bridge.success(&client, 76_561_198_000_000_000);
        bridge.failure(&client, AuthorizationResult::TimedOut);
        bridge.progress(&client);

        // Assert
        assert_eq!(account.load(Ordering::SeqCst), 76_561_198_000_000_000);
        assert_eq!(*failures.lock().unwrap(), vec![AuthorizationResult::TimedOut]);
    }

    #[test]
    fn test_callbacks_receive_the_reporting_client() {
        // Arrange
        let kitchen = idle_client("kitchen");
        let office = idle_client("office");
        let names = Arc::new(Mutex::new(Vec::new()));
        let names_clone = Arc::clone(&names);
        let bridge = ClientCallbackBridge::new();
        bridge.set(Some(Arc::new(CallbackSet::new().on_progress(
            move |client| {
                names_clone
                    .lock()
                    .unwrap()
                    .push(client.identity().device_name().to_string());
            },
        ))));

        // Act
        bridge.progress(&kitchen);
        bridge.progress(&office);

        // Assert
        assert_eq!(*names.lock().unwrap(), vec!["kitchen", "office"]);
    }

    #[test]
    fn test_unregistering_stops_delivery() {
        let client = idle_client("den");
        let count = Arc::new(AtomicU64::new(0));
        let count_clone = Arc::clone(&count);
        let bridge = ClientCallbackBridge::new();
        bridge.set(Some(Arc::new(CallbackSet::new().on_progress(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }))));

        bridge.progress(&client);
        bridge.set(None);
        bridge.progress(&client);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_observer_may_replace_itself_from_a_callback() {
        // Arrange
        let client = idle_client("den");
        let bridge = Arc::new(ClientCallbackBridge::new());
        let bridge_clone = Arc::clone(&bridge);
        bridge.set(Some(Arc::new(CallbackSet::new().on_progress(move |_| {
            bridge_clone.set(None);
        }))));

        // Act / Assert – must not deadlock
        bridge.progress(&client);
        bridge.progress(&client);
    }
}
