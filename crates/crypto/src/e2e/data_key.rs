//! Grosse Payloads ueber einen kurzlebigen Data Key
//!
//! Statt die ganze Nachricht asymmetrisch zu verschluesseln wird ein
//! zufaelliger 32-Byte Data Key erzeugt:
//! 1. Body mit AES-256-GCM versiegeln (Combined-Form)
//! 2. Data Key fuer den Empfaenger wrappen (v2 oder Legacy)
//!
//! Beim Oeffnen gilt fuer den Data Key dieselbe Dispatch-Regel wie fuer
//! Nachrichten, danach nur noch ein symmetrisches Open.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use p256::PublicKey;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::e2e::aead::{open_combined, seal_combined};
use crate::e2e::decrypt::{decrypt_dispatch, decrypt_v2};
use crate::e2e::encrypt::{encrypt_legacy, encrypt_v2};
use crate::e2e::envelope::V2_PREFIX;
use crate::error::CryptoResult;
use crate::keys::KeyPair;
use crate::types::{base64_bytes, SecretBytes};

/// Laenge des Data Keys (AES-256)
pub const DATA_KEY_LEN: usize = 32;

/// Gewrappter Data Key in Textform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataKeyEnvelope(pub String);

impl DataKeyEnvelope {
    pub fn is_v2(&self) -> bool {
        self.0.starts_with(V2_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Versiegelter grosser Payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPayload {
    pub data_key: DataKeyEnvelope,
    /// `nonce || ciphertext || tag`
    #[serde(with = "base64_bytes")]
    pub body: Vec<u8>,
}

fn generate_data_key() -> SecretBytes {
    let mut key = vec![0u8; DATA_KEY_LEN];
    OsRng.fill_bytes(&mut key);
    SecretBytes::new(key)
}

/// Versiegelt fuer einen Geraete-Key (Data Key im v2-Format)
pub fn seal_for_device(recipient: &PublicKey, payload: &[u8]) -> CryptoResult<SealedPayload> {
    let data_key = generate_data_key();
    let body = seal_combined(&data_key, payload)?;
    let wrapped = encrypt_v2(recipient, data_key.as_bytes())?.to_text();
    Ok(SealedPayload {
        data_key: DataKeyEnvelope(wrapped),
        body,
    })
}

/// Versiegelt fuer einen Legacy-Empfaenger (Data Key im Format A)
pub fn seal_legacy(
    sender: &KeyPair,
    recipient: &PublicKey,
    payload: &[u8],
) -> CryptoResult<SealedPayload> {
    let data_key = generate_data_key();
    let body = seal_combined(&data_key, payload)?;
    let wrapped = encrypt_legacy(sender, recipient, data_key.as_bytes())?.to_text();
    Ok(SealedPayload {
        data_key: DataKeyEnvelope(wrapped),
        body,
    })
}

/// Packt den Data Key aus: `"v2:"` direkt, sonst Base64 mit Dispatch
pub fn unwrap_data_key(local: &KeyPair, envelope: &DataKeyEnvelope) -> CryptoResult<SecretBytes> {
    let key = if envelope.is_v2() {
        decrypt_v2(local, envelope.as_str())?
    } else {
        let bytes = STANDARD.decode(envelope.as_str().trim())?;
        let result = decrypt_dispatch(local, &bytes)?;
        tracing::debug!(format = ?result.format, "Data Key ausgepackt");
        result.plaintext
    };
    Ok(SecretBytes::new(key))
}

/// Oeffnet einen versiegelten Payload
pub fn open_sealed(local: &KeyPair, sealed: &SealedPayload) -> CryptoResult<Vec<u8>> {
    let data_key = unwrap_data_key(local, &sealed.data_key)?;
    open_combined(&data_key, &sealed.body)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
