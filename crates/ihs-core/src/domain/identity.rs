//! The stable identity a client device presents to streaming hosts.

use std::fmt;

use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of the long-lived device secret carried in every escrow ticket.
pub const SECRET_KEY_LEN: usize = 32;

/// Length of the device token sent in clear next to the encrypted ticket.
pub const DEVICE_TOKEN_LEN: usize = 8;

/// Maximum number of bytes of a device name that is sent to a host.
pub const MAX_DEVICE_NAME_LEN: usize = 63;

/// Maximum number of bytes in an authorization PIN.
pub const MAX_PIN_LEN: usize = 15;

/// Identifier, secret, token and display name of this client device.
///
/// The secret key is zeroized when the identity is dropped and is never
/// printed by the `Debug` implementation.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DeviceIdentity {
    device_id: u64,
    secret_key: [u8; SECRET_KEY_LEN],
    device_token: [u8; DEVICE_TOKEN_LEN],
    device_name: String,
}

impl DeviceIdentity {
    /// Creates an identity from persisted values.
    ///
    /// `device_name` is cut to [`MAX_DEVICE_NAME_LEN`] bytes on a character
    /// boundary.
    pub fn new(
        device_id: u64,
        secret_key: [u8; SECRET_KEY_LEN],
        device_token: [u8; DEVICE_TOKEN_LEN],
        device_name: &str,
    ) -> Self {
        Self {
            device_id,
            secret_key,
            device_token,
            device_name: truncate_utf8(device_name, MAX_DEVICE_NAME_LEN).to_string(),
        }
    }

    /// Generates a fresh identity with random id, secret and token.
    pub fn generate(device_name: &str) -> Self {
        let mut rng = rand::thread_rng();
        let mut secret_key = [0u8; SECRET_KEY_LEN];
        rng.fill_bytes(&mut secret_key);
        let mut device_token = [0u8; DEVICE_TOKEN_LEN];
        rng.fill_bytes(&mut device_token);
        Self::new(rng.next_u64(), secret_key, device_token, device_name)
    }

    pub fn device_id(&self) -> u64 {
        self.device_id
    }

    pub fn secret_key(&self) -> &[u8; SECRET_KEY_LEN] {
        &self.secret_key
    }

    pub fn device_token(&self) -> &[u8; DEVICE_TOKEN_LEN] {
        &self.device_token
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("device_id", &self.device_id)
            .field("secret_key", &"<redacted>")
            .field("device_token", &"<redacted>")
            .field("device_name", &self.device_name)
            .finish()
    }
}

/// Returns the longest prefix of `s` that is at most `max_len` bytes and ends
/// on a UTF-8 character boundary.
pub fn truncate_utf8(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_keeps_short_device_name() {
        let identity = DeviceIdentity::new(7, [1; 32], [2; 8], "living-room");
        assert_eq!(identity.device_name(), "living-room");
        assert_eq!(identity.device_id(), 7);
    }

    #[test]
    fn test_new_truncates_long_device_name_to_limit() {
        let long = "x".repeat(100);
        let identity = DeviceIdentity::new(1, [0; 32], [0; 8], &long);
        assert_eq!(identity.device_name().len(), MAX_DEVICE_NAME_LEN);
    }

    #[test]
    fn test_truncate_utf8_never_splits_a_character() {
        // "é" is two bytes; 5 of them make 10 bytes.
        let name = "ééééé";
        let cut = truncate_utf8(name, 5);
        assert_eq!(cut, "éé");
        assert!(cut.len() <= 5);
    }

    #[test]
    fn test_truncate_utf8_returns_input_when_short_enough() {
        assert_eq!(truncate_utf8("abc", 3), "abc");
        assert_eq!(truncate_utf8("", 0), "");
    }

    #[test]
    fn test_generate_produces_distinct_identities() {
        let a = DeviceIdentity::generate("a");
        let b = DeviceIdentity::generate("a");
        assert_ne!(a.secret_key(), b.secret_key());
        assert_ne!(a.device_id(), b.device_id());
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let identity = DeviceIdentity::new(42, [0xAB; 32], [0xCD; 8], "deck");
        let text = format!("{identity:?}");
        assert!(text.contains("<redacted>"));
        assert!(!text.contains("171"), "secret bytes must not be printed");
        assert!(text.contains("deck"));
    }
}
