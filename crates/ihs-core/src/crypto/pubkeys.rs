//! Per-universe RSA public keys used to encrypt escrow tickets.
//!
//! The keys are DER-encoded `SubjectPublicKeyInfo` blobs compiled into the
//! binary from `keys/`.  The internal and dev universes share one key.
//!
//! The blobs currently checked in are locally generated 2048-bit stand-ins,
//! not the vendor's published universe keys.  Hosts cannot decrypt tickets
//! sealed with them; replace the files in `keys/` with the published keys
//! before pairing with real hosts.

use thiserror::Error;

use crate::domain::Universe;

/// Largest key blob any universe may carry.
pub const MAX_PUBLIC_KEY_LEN: usize = 384;

static PUBLIC_UNIVERSE_KEY: &[u8] = include_bytes!("../../keys/universe_public.der");
static BETA_UNIVERSE_KEY: &[u8] = include_bytes!("../../keys/universe_beta.der");
static INTERNAL_UNIVERSE_KEY: &[u8] = include_bytes!("../../keys/universe_internal.der");

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyLookupError {
    #[error("no public key for {0}")]
    NotFound(Universe),

    #[error("key buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
}

/// Returns the embedded key for `universe`, or `None` if it has none.
pub fn key_for(universe: Universe) -> Option<&'static [u8]> {
    match universe {
        Universe::Public => Some(PUBLIC_UNIVERSE_KEY),
        Universe::Beta => Some(BETA_UNIVERSE_KEY),
        Universe::Internal | Universe::Dev => Some(INTERNAL_UNIVERSE_KEY),
        Universe::Other(_) => None,
    }
}

/// Copies the key for `universe` into `out` and returns its length.
///
/// `out` is left untouched on error.
///
/// # Errors
///
/// - [`KeyLookupError::NotFound`] for universes without a key.
/// - [`KeyLookupError::BufferTooSmall`] if `out` cannot hold the whole key.
pub fn lookup(universe: Universe, out: &mut [u8]) -> Result<usize, KeyLookupError> {
    let key = key_for(universe).ok_or(KeyLookupError::NotFound(universe))?;
    if out.len() < key.len() {
        return Err(KeyLookupError::BufferTooSmall {
            needed: key.len(),
            available: out.len(),
        });
    }
    out[..key.len()].copy_from_slice(key);
    Ok(key.len())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
