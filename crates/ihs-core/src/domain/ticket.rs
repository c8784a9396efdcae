//! The key-escrow ticket a client hands to a host when asking to be authorized.
//!
//! # What is in the ticket? (for beginners)
//!
//! To authorize a new device, the host needs proof that the person at the
//! client knows the PIN displayed on the host, plus the device's long-lived
//! secret so it can later recognise the device.  The client packs both,
//! together with its identifier and name, into an *escrow ticket*:
//!
//! | Field         | Source                                |
//! |---------------|---------------------------------------|
//! | `password`    | PIN typed by the user                 |
//! | `identifier`  | [`DeviceIdentity::device_id`]         |
//! | `payload`     | [`DeviceIdentity::secret_key`]        |
//! | `usage`       | always [`EscrowUsage::StreamingDevice`] |
//! | `device_name` | [`DeviceIdentity::device_name`]       |
//!
//! The ticket is built fresh for every retransmission, encrypted before it
//! leaves the process, and wiped from memory when dropped.

use std::fmt;

use zeroize::Zeroizing;

use crate::domain::identity::{DeviceIdentity, SECRET_KEY_LEN};

/// Purpose tag carried in an escrow ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum EscrowUsage {
    /// The ticket registers a streaming client device.
    StreamingDevice = 0,
}

impl EscrowUsage {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// A fully populated escrow ticket.
///
/// Every field is always present; there is no partial ticket.
pub struct EscrowTicket {
    password: Zeroizing<Vec<u8>>,
    identifier: u64,
    payload: Zeroizing<[u8; SECRET_KEY_LEN]>,
    usage: EscrowUsage,
    device_name: String,
}

impl EscrowTicket {
    /// Builds the ticket for one authorization request.
    ///
    /// Pure construction: the PIN is copied into zeroizing storage owned by
    /// the ticket and is wiped when the ticket is dropped.
    pub fn build(identity: &DeviceIdentity, pin: &str) -> Self {
        Self {
            password: Zeroizing::new(pin.as_bytes().to_vec()),
            identifier: identity.device_id(),
            payload: Zeroizing::new(*identity.secret_key()),
            usage: EscrowUsage::StreamingDevice,
            device_name: identity.device_name().to_string(),
        }
    }

    pub fn password(&self) -> &[u8] {
        &self.password
    }

    pub fn identifier(&self) -> u64 {
        self.identifier
    }

    pub fn payload(&self) -> &[u8; SECRET_KEY_LEN] {
        &self.payload
    }

    pub fn usage(&self) -> EscrowUsage {
        self.usage
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl fmt::Debug for EscrowTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EscrowTicket")
            .field("password", &"<redacted>")
            .field("identifier", &self.identifier)
            .field("payload", &"<redacted>")
            .field("usage", &self.usage)
            .field("device_name", &self.device_name)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> DeviceIdentity {
        DeviceIdentity::new(0x1122_3344_5566_7788, [0x5A; 32], [0x01; 8], "couch-pc")
    }

    #[test]
    fn test_build_populates_every_field() {
        // Arrange
        let identity = identity();

        // Act
        let ticket = EscrowTicket::build(&identity, "1234");

        // Assert
        assert_eq!(ticket.password(), b"1234");
        assert_eq!(ticket.identifier(), 0x1122_3344_5566_7788);
        assert_eq!(ticket.payload(), &[0x5A; 32]);
        assert_eq!(ticket.usage(), EscrowUsage::StreamingDevice);
        assert_eq!(ticket.device_name(), "couch-pc");
    }

    #[test]
    fn test_build_with_empty_pin_still_carries_password() {
        let ticket = EscrowTicket::build(&identity(), "");
        assert!(ticket.password().is_empty());
    }

    #[test]
    fn test_streaming_device_usage_is_zero() {
        assert_eq!(EscrowUsage::StreamingDevice.as_i32(), 0);
    }

    #[test]
    fn test_debug_output_does_not_contain_pin() {
        let ticket = EscrowTicket::build(&identity(), "987654");
        let text = format!("{ticket:?}");
        assert!(!text.contains("987654"));
        assert!(text.contains("<redacted>"));
    }
}
