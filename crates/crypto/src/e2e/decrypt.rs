//! Envelope-Entschluesselung und Format-Dispatch
//!
//! Text/Binaer-Eingaenge tragen kein Diskriminator-Byte. Heuristik:
//! - Laenge > 70: zuerst Format C, bei jedem Fehler Format A
//! - sonst: nur Format A
//!
//! Format B wird nie automatisch erkannt, nur ueber `decrypt_v2`.
//! Die Versuche sind seiteneffektfrei. Jeder Fehlschlag nach dem Base64-Schritt
//! ist nach aussen `AuthenticationFailed`, egal ob Struktur oder GCM-Tag
//! scheiterte.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::e2e::aead::open;
use crate::e2e::envelope::{
    decode_foreign, decode_legacy, decode_v2_bytes, Envelope, WireFormat,
    FOREIGN_DISPATCH_THRESHOLD, V2_PREFIX,
};
use crate::e2e::key_exchange::derive_symmetric_key;
use crate::error::{CryptoError, CryptoResult};
use crate::keys::KeyPair;

/// Ergebnis einer Dispatch-Entschluesselung
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decrypted {
    pub plaintext: Vec<u8>,
    /// Format, mit dem entschluesselt wurde
    pub format: WireFormat,
    /// Versuchte Formate in Reihenfolge
    pub attempts: Vec<WireFormat>,
}

impl Decrypted {
    /// true wenn ein frueherer Versuch scheiterte
    pub fn used_fallback(&self) -> bool {
        self.attempts.len() > 1
    }
}

/// Oeffnet einen bereits dekodierten Envelope mit dem lokalen Schluessel
pub fn open_envelope(local: &KeyPair, envelope: &Envelope) -> CryptoResult<Vec<u8>> {
    let format = envelope.format();
    let key = derive_symmetric_key(
        local.secret_key(),
        envelope.peer_key(),
        format.context(),
        format.key_len(),
    )?;
    open(&key, envelope.nonce(), envelope.ciphertext())
}

/// Entschluesselt Format C oder A nach der Laengen-Heuristik
pub fn decrypt_dispatch(local: &KeyPair, bytes: &[u8]) -> CryptoResult<Decrypted> {
    let mut attempts = Vec::with_capacity(2);

    if bytes.len() > FOREIGN_DISPATCH_THRESHOLD {
        attempts.push(WireFormat::Foreign);
        match decode_foreign(bytes).and_then(|env| open_envelope(local, &env)) {
            Ok(plaintext) => {
                return Ok(Decrypted {
                    plaintext,
                    format: WireFormat::Foreign,
                    attempts,
                })
            }
            Err(_) => {
                tracing::debug!(laenge = bytes.len(), "Fremdformat passt nicht, versuche Legacy");
            }
        }
    }

    attempts.push(WireFormat::Legacy);
    match decode_legacy(bytes).and_then(|env| open_envelope(local, &env)) {
        Ok(plaintext) => Ok(Decrypted {
            plaintext,
            format: WireFormat::Legacy,
            attempts,
        }),
        Err(_) => {
            tracing::debug!(
                laenge = bytes.len(),
                versuche = attempts.len(),
                "Entschluesselung fehlgeschlagen"
            );
            Err(CryptoError::AuthenticationFailed)
        }
    }
}

/// Entschluesselt die Textform von Format B
///
/// Nur kaputtes Base64 ist ein `DecodingError` (Text-Grenze), alles danach
/// `AuthenticationFailed`.
pub fn decrypt_v2(local: &KeyPair, text: &str) -> CryptoResult<Vec<u8>> {
    let encoded = text
        .strip_prefix(V2_PREFIX)
        .ok_or(CryptoError::AuthenticationFailed)?;
    let bytes = STANDARD.decode(encoded.trim())?;
    decode_v2_bytes(&bytes)
        .and_then(|envelope| open_envelope(local, &envelope))
        .map_err(|_| CryptoError::AuthenticationFailed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
