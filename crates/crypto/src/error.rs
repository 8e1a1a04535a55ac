//! Fehlertypen fuer das E2EE-Subsystem

use thiserror::Error;

/// Fehler im E2EE-Subsystem
///
/// Entschluesselungsfehler nennen nie das versuchte Wire-Format.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Kein lokales Schluessel-Paar geladen")]
    NotInitialized,

    #[error("Empfaenger-Schluessel nicht gefunden: {0}")]
    RecipientKeyNotFound(String),

    #[error("Ungueltige Public-Key-Kodierung: {0}")]
    InvalidPublicKeyEncoding(String),

    #[error("Ungueltige Private-Key-Kodierung: {0}")]
    InvalidPrivateKeyEncoding(String),

    #[error("Importierter Private Key passt nicht zum Public Key")]
    KeyMismatch,

    #[error("Ungueltiger Ciphertext")]
    InvalidCiphertext,

    #[error("Entschluesselung fehlgeschlagen")]
    AuthenticationFailed,

    #[error("Kodierung fehlgeschlagen: {0}")]
    EncodingError(String),

    #[error("Dekodierung fehlgeschlagen: {0}")]
    DecodingError(String),

    #[error("Key Derivation fehlgeschlagen: {0}")]
    KeyDerivation(String),

    #[error("PKCS#8-Struktur konnte nicht gelesen werden")]
    Pkcs8Parse,

    #[error("Secure-Storage-Fehler: {0}")]
    Storage(String),

    #[error("Unerwarteter Fehler: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl From<base64::DecodeError> for CryptoError {
    fn from(e: base64::DecodeError) -> Self {
        Self::DecodingError(e.to_string())
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
