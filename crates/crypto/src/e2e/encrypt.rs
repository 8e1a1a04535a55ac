//! Envelope-Verschluesselung fuer alle drei Wire-Formate
//!
//! Reine Funktionen: kein I/O, nur Schluessel rein, Envelope raus.
//! Format B und C nutzen pro Aufruf ein frisches ephemeres Schluessel-Paar,
//! nie den Langzeit-Schluessel.

use p256::ecdh::EphemeralSecret;
use p256::PublicKey;
use rand_core::OsRng;

use crate::e2e::aead::seal;
use crate::e2e::envelope::{Envelope, WireFormat, FOREIGN_KEY_ID_LEN};
use crate::e2e::key_exchange::{derive_ephemeral_key, derive_symmetric_key};
use crate::error::CryptoResult;
use crate::keys::KeyPair;

/// Format A: Sender nutzt seinen Langzeit-Schluessel
pub fn encrypt_legacy(
    sender: &KeyPair,
    recipient: &PublicKey,
    plaintext: &[u8],
) -> CryptoResult<Envelope> {
    let format = WireFormat::Legacy;
    let key = derive_symmetric_key(
        sender.secret_key(),
        recipient,
        format.context(),
        format.key_len(),
    )?;
    let (nonce, ciphertext) = seal(&key, plaintext)?;

    Ok(Envelope::Legacy {
        sender: *sender.public_key(),
        nonce,
        ciphertext,
    })
}

/// Format B: frisches ephemeres Paar, Empfaenger ist ein Geraete-Key
pub fn encrypt_v2(recipient: &PublicKey, plaintext: &[u8]) -> CryptoResult<Envelope> {
    let format = WireFormat::V2;
    let ephemeral = EphemeralSecret::random(&mut OsRng);
    let key = derive_ephemeral_key(&ephemeral, recipient, format.context(), format.key_len())?;
    let (nonce, ciphertext) = seal(&key, plaintext)?;

    Ok(Envelope::V2 {
        ephemeral: ephemeral.public_key(),
        nonce,
        ciphertext,
    })
}

/// Format C: fremdes ECIES mit 16-Byte-Schluessel
pub fn encrypt_foreign(
    recipient: &PublicKey,
    key_id: [u8; FOREIGN_KEY_ID_LEN],
    plaintext: &[u8],
) -> CryptoResult<Envelope> {
    let format = WireFormat::Foreign;
    let ephemeral = EphemeralSecret::random(&mut OsRng);
    let key = derive_ephemeral_key(&ephemeral, recipient, format.context(), format.key_len())?;
    let (nonce, ciphertext) = seal(&key, plaintext)?;

    Ok(Envelope::Foreign {
        key_id,
        ephemeral: ephemeral.public_key(),
        nonce,
        ciphertext,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
