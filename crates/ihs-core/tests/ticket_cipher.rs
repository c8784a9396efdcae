//! Integration tests for escrow-ticket sealing.
//!
//! These tests run the real RSA-OAEP primitive and decrypt the result with a
//! test-only private key, checking that every ticket field survives intact.

use ihs_core::crypto::{key_for, OaepSha1Encryptor, RsaEncryptor, TicketCipher};
use ihs_core::domain::{DeviceIdentity, EscrowTicket, Universe};
use ihs_core::protocol::KeyEscrowTicket;
use prost::Message;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Oaep, RsaPrivateKey};
use sha1::Sha1;

static TEST_PRIVATE_KEY: &str = include_str!("fixtures/test_private.pem");
static TEST_PUBLIC_KEY: &[u8] = include_bytes!("fixtures/test_public.der");

fn identity() -> DeviceIdentity {
    DeviceIdentity::new(0xDEAD_BEEF_0000_0001, [0x3C; 32], [0x9A; 8], "den-tablet")
}

fn decrypt(ciphertext: &[u8]) -> Vec<u8> {
    let key = RsaPrivateKey::from_pkcs8_pem(TEST_PRIVATE_KEY).expect("fixture key must parse");
    key.decrypt(Oaep::new::<Sha1>(), ciphertext)
        .expect("decryption must succeed")
}

#[test]
fn test_decrypted_ticket_recovers_every_field() {
    // Arrange
    let cipher = TicketCipher::oaep();
    let ticket = EscrowTicket::build(&identity(), "482913");
    let plaintext = cipher.serialize(&ticket).expect("serialize must succeed");

    // Act
    let ciphertext = cipher
        .encrypt(plaintext.as_slice(), TEST_PUBLIC_KEY)
        .expect("encrypt must succeed");
    let decoded = KeyEscrowTicket::decode(decrypt(&ciphertext).as_slice()).expect("valid ticket");

    // Assert
    assert_eq!(decoded.password.as_deref(), Some(&b"482913"[..]));
    assert_eq!(decoded.identifier, Some(0xDEAD_BEEF_0000_0001));
    assert_eq!(decoded.payload.as_deref(), Some(&[0x3C; 32][..]));
    assert_eq!(decoded.usage, Some(0));
    assert_eq!(decoded.device_name.as_deref(), Some("den-tablet"));
}

#[test]
fn test_encryption_is_randomized_but_plaintext_is_not() {
    let cipher = TicketCipher::oaep();
    let ticket = EscrowTicket::build(&identity(), "1111");
    let plaintext = cipher.serialize(&ticket).unwrap();

    let a = cipher.encrypt(plaintext.as_slice(), TEST_PUBLIC_KEY).unwrap();
    let b = cipher.encrypt(plaintext.as_slice(), TEST_PUBLIC_KEY).unwrap();

    assert_ne!(a, b, "OAEP padding must be randomized");
    assert_eq!(decrypt(&a), decrypt(&b));
    assert_eq!(decrypt(&a), plaintext.as_slice());
}

#[test]
fn test_seal_with_registry_key_yields_modulus_sized_ciphertext() {
    let cipher = TicketCipher::oaep();
    let ticket = EscrowTicket::build(&identity(), "0000");

    for universe in [Universe::Public, Universe::Beta, Universe::Internal, Universe::Dev] {
        let ciphertext = cipher.seal(&ticket, universe).expect("seal must succeed");
        assert_eq!(ciphertext.len(), 256, "{universe}");
    }
}

#[test]
fn test_every_registry_key_parses_as_rsa() {
    for universe in [Universe::Public, Universe::Beta, Universe::Internal] {
        let key = key_for(universe).unwrap();
        assert!(OaepSha1Encryptor.encrypt(b"ping", key).is_ok(), "{universe}");
    }
}

#[test]
fn test_longest_device_name_and_pin_still_fit_one_rsa_block() {
    // Arrange
    let long_name = "n".repeat(200);
    let identity = DeviceIdentity::new(u64::MAX, [0xFF; 32], [0xFF; 8], &long_name);
    let ticket = EscrowTicket::build(&identity, "123456789012345");

    // Act
    let result = TicketCipher::oaep().seal(&ticket, Universe::Public);

    // Assert
    assert!(result.is_ok());
}
