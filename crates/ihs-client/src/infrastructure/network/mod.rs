//! UDP network infrastructure for the client application.
//!
//! Outbound: [`UdpTransport`] implements the application's [`Transport`] port
//! by stamping a [`BroadcastHeader`] on each body and sending the framed
//! packet as one datagram.
//!
//! Inbound: [`spawn_receive_loop`] reads datagrams from a clone of the same
//! socket, decodes them, and routes authorization responses to the
//! [`StreamingClient`].
//!
//! # Why a dedicated thread? (for beginners)
//!
//! The socket is a blocking `std::net::UdpSocket`.  Reading from it on a
//! Tokio worker would stall every other task on that worker, so the receive
//! loop runs on its own named thread instead.  The socket has a 500 ms read
//! timeout; each time a read times out the loop checks the `running` flag
//! and exits once the application is shutting down.

pub mod recording;

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use ihs_core::protocol::{decode_body, decode_packet, encode_packet, BroadcastHeader, MessageType};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::application::authorization::{StreamingClient, Transport, TransportError};

/// How long one blocking read may wait before the `running` flag is checked.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Largest datagram the receive loop accepts.
const MAX_DATAGRAM_LEN: usize = 4096;

/// Errors that can occur while setting up client networking.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The UDP socket could not be bound.
    #[error("failed to bind UDP socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A socket option or clone failed.
    #[error("socket setup error: {0}")]
    Io(#[from] std::io::Error),

    /// The receive thread could not be started.
    #[error("failed to spawn receive thread: {0}")]
    Spawn(#[source] std::io::Error),
}

// ── Outbound ──────────────────────────────────────────────────────────────────

/// Sends broadcast-protocol packets over a UDP socket.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    client_id: u64,
    instance_id: u64,
}

impl UdpTransport {
    /// Binds a socket on `addr` with broadcast enabled.
    ///
    /// `client_id` goes into every header; the instance id is random per
    /// transport.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::BindFailed`] if the socket cannot be bound.
    pub fn bind(addr: SocketAddr, client_id: u64) -> Result<Self, NetworkError> {
        let socket =
            UdpSocket::bind(addr).map_err(|source| NetworkError::BindFailed { addr, source })?;
        socket.set_broadcast(true)?;
        let instance_id = rand::thread_rng().gen();
        info!("UDP transport bound on {}", socket.local_addr()?);
        Ok(Self {
            socket,
            client_id,
            instance_id,
        })
    }

    /// Clones the underlying socket for the receive loop.
    pub fn try_clone_socket(&self) -> Result<UdpSocket, NetworkError> {
        Ok(self.socket.try_clone()?)
    }
}

impl Transport for UdpTransport {
    fn send(
        &self,
        destination: SocketAddr,
        kind: MessageType,
        body: &[u8],
    ) -> Result<(), TransportError> {
        let header = BroadcastHeader::for_message(kind, self.client_id, self.instance_id);
        let packet = encode_packet(&header, body)?;
        self.socket.send_to(&packet, destination)?;
        Ok(())
    }
}

// ── Inbound ───────────────────────────────────────────────────────────────────

/// Spawns the thread that feeds datagrams from `socket` to `client`.
///
/// The thread exits after `running` is cleared, within one read timeout.
///
/// # Errors
///
/// Returns [`NetworkError`] if the read timeout cannot be set or the thread
/// cannot be spawned.
pub fn spawn_receive_loop(
    socket: UdpSocket,
    client: Arc<StreamingClient>,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<()>, NetworkError> {
    socket.set_read_timeout(Some(READ_TIMEOUT))?;
    std::thread::Builder::new()
        .name("ihs-receive".to_string())
        .spawn(move || receive_loop(socket, client, running))
        .map_err(NetworkError::Spawn)
}

/// Decodes one datagram and hands it to `client`.
///
/// Undecodable datagrams are logged at `debug` and dropped.
pub fn route_datagram(client: &StreamingClient, source: SocketAddr, datagram: &[u8]) {
    let packet = match decode_packet(datagram) {
        Ok(packet) => packet,
        Err(e) => {
            debug!("dropping datagram from {source}: {e}");
            return;
        }
    };
    match decode_body(&packet) {
        Ok(message) => client.handle_authorization_message(source, &packet.header, &message),
        Err(e) => debug!("dropping packet from {source}: {e}"),
    }
}

fn receive_loop(socket: UdpSocket, client: Arc<StreamingClient>, running: Arc<AtomicBool>) {
    let mut buf = vec![0u8; MAX_DATAGRAM_LEN];

    while running.load(Ordering::Relaxed) {
        let (len, source) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(e) if is_timeout_error(&e) => continue,
            Err(e) => {
                error!("UDP recv error: {e}");
                continue;
            }
        };
        route_datagram(&client, source, &buf[..len]);
    }

    info!("receive loop stopped");
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_frames_packet_with_header() {
        // Arrange
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap(), 99).unwrap();

        // Act
        transport
            .send(
                receiver.local_addr().unwrap(),
                MessageType::DeviceAuthorizationRequest,
                b"body",
            )
            .unwrap();

        // Assert
        let mut buf = [0u8; 512];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        let packet = decode_packet(&buf[..len]).unwrap();
        assert_eq!(packet.header.client_id, Some(99));
        assert_eq!(
            packet.header.kind(),
            Some(MessageType::DeviceAuthorizationRequest)
        );
        assert_eq!(packet.body, b"body");
    }

    #[test]
    fn test_timeout_errors_are_recognised() {
        let err = std::io::Error::from(std::io::ErrorKind::WouldBlock);
        assert!(is_timeout_error(&err));
        let err = std::io::Error::from(std::io::ErrorKind::ConnectionReset);
        assert!(!is_timeout_error(&err));
    }
}
