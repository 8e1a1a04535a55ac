//! E2E Verschluesselung (End-to-End)
//!
//! Geraet <-> Geraet Verschluesselung. Das Verzeichnis speichert nur
//! Public Keys und sieht nie Klartext.
//!
//! ## Ablauf
//! 1. ECDH(lokaler Private Key, Peer Public Key) -> X-Koordinate
//! 2. HKDF-SHA256 mit leerem Salt und Format-Context
//! 3. AES-GCM mit Zufalls-Nonce
//! 4. Envelope in einem der drei Wire-Formate serialisieren

pub mod aead;
pub mod data_key;
pub mod decrypt;
pub mod encrypt;
pub mod envelope;
pub mod key_exchange;

pub use data_key::{
    open_sealed, seal_for_device, seal_legacy, unwrap_data_key, DataKeyEnvelope, SealedPayload,
};
pub use decrypt::{decrypt_dispatch, decrypt_v2, open_envelope, Decrypted};
pub use encrypt::{encrypt_foreign, encrypt_legacy, encrypt_v2};
pub use envelope::{
    decode_foreign, decode_legacy, decode_v2_bytes, decode_v2_text, Envelope, WireFormat,
};
pub use key_exchange::{derive_ephemeral_key, derive_symmetric_key, hkdf_derive};
