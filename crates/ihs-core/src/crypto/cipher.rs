//! Serialization and RSA encryption of escrow tickets.
//!
//! # How a ticket is sealed (for beginners)
//!
//! 1. The universe key is copied out of the registry ([`pubkeys::lookup`]).
//! 2. The [`EscrowTicket`] is protobuf-encoded into a bounded, self-wiping
//!    buffer ([`TicketCipher::serialize`]).
//! 3. The plaintext is encrypted against the key ([`TicketCipher::encrypt`]).
//!
//! The RSA primitive sits behind [`RsaEncryptor`] so tests can replace it.
//! The production implementation is [`OaepSha1Encryptor`].

use std::sync::Arc;

use prost::Message;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Oaep, RsaPublicKey};
use sha1::Sha1;
use thiserror::Error;
use tracing::trace;
use zeroize::Zeroize;

use crate::crypto::bounded::{BoundedBuffer, CapacityError};
use crate::crypto::pubkeys::{self, KeyLookupError, MAX_PUBLIC_KEY_LEN};
use crate::domain::{EscrowTicket, Universe};
use crate::protocol::KeyEscrowTicket;

/// Largest serialized ticket the cipher accepts.
pub const MAX_TICKET_LEN: usize = 2048;

/// Largest ciphertext the cipher will hand back.
pub const MAX_CIPHERTEXT_LEN: usize = 2048;

// ── RSA primitive ─────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RsaError {
    #[error("invalid public key: {0}")]
    InvalidKey(String),

    #[error("encryption failed: {0}")]
    Encrypt(String),
}

/// Encrypts a plaintext against a DER-encoded RSA public key.
#[cfg_attr(test, mockall::automock)]
pub trait RsaEncryptor: Send + Sync {
    fn encrypt(&self, plaintext: &[u8], public_key: &[u8]) -> Result<Vec<u8>, RsaError>;
}

/// RSA-OAEP with SHA-1, the padding hosts expect for escrow tickets.
///
/// Accepts keys as `SubjectPublicKeyInfo` or bare PKCS#1 DER.
#[derive(Debug, Default, Clone, Copy)]
pub struct OaepSha1Encryptor;

impl RsaEncryptor for OaepSha1Encryptor {
    fn encrypt(&self, plaintext: &[u8], public_key: &[u8]) -> Result<Vec<u8>, RsaError> {
        let key = RsaPublicKey::from_public_key_der(public_key)
            .or_else(|_| RsaPublicKey::from_pkcs1_der(public_key))
            .map_err(|e| RsaError::InvalidKey(e.to_string()))?;
        key.encrypt(&mut rand::thread_rng(), Oaep::new::<Sha1>(), plaintext)
            .map_err(|e| RsaError::Encrypt(e.to_string()))
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
pub enum CipherError {
    /// The serialized ticket does not fit [`MAX_TICKET_LEN`].
    #[error("serialized ticket too large: {0}")]
    TicketTooLarge(#[from] CapacityError),

    #[error("ticket encryption failed: {0}")]
    EncryptionFailed(String),
}

/// Failure of the full lookup → serialize → encrypt pipeline.
#[derive(Debug, Error, PartialEq)]
pub enum SealError {
    #[error(transparent)]
    KeyLookup(#[from] KeyLookupError),

    #[error(transparent)]
    Cipher(#[from] CipherError),
}

// ── TicketCipher ──────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct TicketCipher {
    encryptor: Arc<dyn RsaEncryptor>,
}

impl TicketCipher {
    pub fn new(encryptor: Arc<dyn RsaEncryptor>) -> Self {
        Self { encryptor }
    }

    /// Convenience constructor using [`OaepSha1Encryptor`].
    pub fn oaep() -> Self {
        Self::new(Arc::new(OaepSha1Encryptor))
    }

    /// Protobuf-encodes `ticket`.  The same ticket always yields the same bytes.
    ///
    /// # Errors
    ///
    /// [`CipherError::TicketTooLarge`] if the encoding exceeds [`MAX_TICKET_LEN`].
    pub fn serialize(
        &self,
        ticket: &EscrowTicket,
    ) -> Result<BoundedBuffer<MAX_TICKET_LEN>, CipherError> {
        let mut message = KeyEscrowTicket {
            password: Some(ticket.password().to_vec()),
            identifier: Some(ticket.identifier()),
            payload: Some(ticket.payload().to_vec()),
            usage: Some(ticket.usage().as_i32()),
            device_name: Some(ticket.device_name().to_string()),
            ..Default::default()
        };

        let len = message.encoded_len();
        let result = if len > MAX_TICKET_LEN {
            Err(CipherError::TicketTooLarge(CapacityError {
                capacity: MAX_TICKET_LEN,
                requested: len,
            }))
        } else {
            BoundedBuffer::try_from_vec(message.encode_to_vec()).map_err(CipherError::from)
        };

        message.password.zeroize();
        message.payload.zeroize();
        result
    }

    /// Encrypts `plaintext` against `public_key`.
    ///
    /// # Errors
    ///
    /// [`CipherError::EncryptionFailed`] if the primitive fails or its output
    /// exceeds [`MAX_CIPHERTEXT_LEN`].
    pub fn encrypt(&self, plaintext: &[u8], public_key: &[u8]) -> Result<Vec<u8>, CipherError> {
        let ciphertext = self
            .encryptor
            .encrypt(plaintext, public_key)
            .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;
        if ciphertext.len() > MAX_CIPHERTEXT_LEN {
            return Err(CipherError::EncryptionFailed(format!(
                "ciphertext of {} bytes exceeds {MAX_CIPHERTEXT_LEN}",
                ciphertext.len()
            )));
        }
        Ok(ciphertext)
    }

    /// Looks up the key for `universe`, serializes `ticket`, and encrypts it.
    pub fn seal(&self, ticket: &EscrowTicket, universe: Universe) -> Result<Vec<u8>, SealError> {
        let mut key = [0u8; MAX_PUBLIC_KEY_LEN];
        let key_len = pubkeys::lookup(universe, &mut key)?;
        let plaintext = self.serialize(ticket)?;
        trace!(
            "sealing {}-byte ticket for {universe} universe with {key_len}-byte key",
            plaintext.len()
        );
        Ok(self.encrypt(plaintext.as_slice(), &key[..key_len])?)
    }
}

impl std::fmt::Debug for TicketCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketCipher").finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
