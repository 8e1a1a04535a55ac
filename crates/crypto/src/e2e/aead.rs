//! AES-GCM Seal/Open
//!
//! Die Schluessellaenge waehlt die Variante: 16 Bytes -> AES-128-GCM,
//! 32 Bytes -> AES-256-GCM. Nonce 12 Bytes, Tag 16 Bytes am Ende.
//!
//! ## Combined-Form
//! ```text
//! [nonce(12)] [ciphertext] [tag(16)]
//! ```

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit},
    Aes128Gcm, Aes256Gcm, Nonce,
};
use rand_core::OsRng;

use crate::error::{CryptoError, CryptoResult};
use crate::types::SecretBytes;

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Verschluesselt mit frischer Zufalls-Nonce, gibt `(nonce, ciphertext || tag)` zurueck
pub fn seal(key: &SecretBytes, plaintext: &[u8]) -> CryptoResult<([u8; NONCE_LEN], Vec<u8>)> {
    let (nonce, ciphertext) = match key.len() {
        16 => {
            let cipher = Aes128Gcm::new_from_slice(key.as_bytes())
                .map_err(|e| CryptoError::EncodingError(e.to_string()))?;
            let nonce = Aes128Gcm::generate_nonce(&mut OsRng);
            let ct = cipher
                .encrypt(&nonce, plaintext)
                .map_err(|e| CryptoError::EncodingError(e.to_string()))?;
            (nonce, ct)
        }
        32 => {
            let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
                .map_err(|e| CryptoError::EncodingError(e.to_string()))?;
            let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
            let ct = cipher
                .encrypt(&nonce, plaintext)
                .map_err(|e| CryptoError::EncodingError(e.to_string()))?;
            (nonce, ct)
        }
        n => {
            return Err(CryptoError::EncodingError(format!(
                "ungueltige AES-Schluessellaenge {n}"
            )))
        }
    };

    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(nonce.as_slice());
    Ok((nonce_bytes, ciphertext))
}

/// Entschluesselt `ciphertext || tag`. Jeder Fehler ist `AuthenticationFailed`.
pub fn open(key: &SecretBytes, nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    if ciphertext.len() < TAG_LEN {
        return Err(CryptoError::InvalidCiphertext);
    }
    let nonce = Nonce::from_slice(nonce);
    let result = match key.len() {
        16 => Aes128Gcm::new_from_slice(key.as_bytes())
            .map_err(|_| CryptoError::AuthenticationFailed)?
            .decrypt(nonce, ciphertext),
        32 => Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|_| CryptoError::AuthenticationFailed)?
            .decrypt(nonce, ciphertext),
        _ => return Err(CryptoError::AuthenticationFailed),
    };
    result.map_err(|_| CryptoError::AuthenticationFailed)
}

/// Combined-Form: `nonce || ciphertext || tag`
pub fn seal_combined(key: &SecretBytes, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let (nonce, ciphertext) = seal(key, plaintext)?;
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Oeffnet die Combined-Form
pub fn open_combined(key: &SecretBytes, combined: &[u8]) -> CryptoResult<Vec<u8>> {
    if combined.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::InvalidCiphertext);
    }
    let (nonce, ciphertext) = combined.split_at(NONCE_LEN);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(nonce);
    open(key, &nonce_bytes, ciphertext)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
