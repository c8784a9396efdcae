//! Key registry and escrow-ticket encryption.
//!
//! # Sub-modules
//!
//! - **`bounded`** – [`BoundedBuffer`], a capacity-checked buffer that is
//!   wiped on drop.
//! - **`pubkeys`** – the per-universe RSA public key registry.
//! - **`cipher`** – [`TicketCipher`], which serializes and encrypts tickets.

pub mod bounded;
pub mod cipher;
pub mod pubkeys;

pub use bounded::{BoundedBuffer, CapacityError};
pub use cipher::{
    CipherError, OaepSha1Encryptor, RsaEncryptor, RsaError, SealError, TicketCipher,
    MAX_CIPHERTEXT_LEN, MAX_TICKET_LEN,
};
pub use pubkeys::{key_for, lookup, KeyLookupError, MAX_PUBLIC_KEY_LEN};
