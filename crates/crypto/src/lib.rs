//! # syncbridge-crypto
//!
//! Ende-zu-Ende Verschluesselung zwischen Geraeten fuer SyncBridge.
//!
//! ## Module
//! - `der` - Minimaler ASN.1 DER Reader/Writer
//! - `keys` - P-256 Schluessel-Paar und Public-Key-Kodierungen
//! - `store` - Key Material Store ueber Secure Storage
//! - `directory` - Key Directory Client (Public-Key-Verzeichnis)
//! - `e2e` - ECDH + HKDF, Wire-Formate A/B/C, grosse Payloads
//! - `engine` - Crypto Engine (verbindet Store, Verzeichnis und e2e)
//! - `import` - PKCS#8 Import/Export
//! - `config` - TOML-Konfiguration
//! - `types` - Gemeinsame Typen (PublicKeyRecord, SecretBytes)
//! - `error` - Fehlertypen

pub mod config;
pub mod der;
pub mod directory;
pub mod e2e;
pub mod engine;
pub mod error;
pub mod import;
pub mod keys;
pub mod store;
pub mod types;

// Bequeme Re-Exports
pub use config::CryptoConfig;
pub use directory::{KeyDirectory, KeyDirectoryClient, MemoryKeyDirectory};
pub use engine::CryptoEngine;
pub use error::{CryptoError, CryptoResult};
pub use import::{
    export_pkcs8, export_raw, extract_from_pkcs8, extract_private_key, import_keypair,
    import_pkcs8, normalize_raw_private_key, DecodeAttempt, Imported,
};
pub use keys::{KeyEncoding, KeyPair};
pub use store::{KeyMaterialStore, MemorySecureStorage, SecureStorage};
pub use types::{PublicKeyRecord, SecretBytes};

pub use e2e::{
    decrypt_dispatch, decrypt_v2, encrypt_foreign, encrypt_legacy, encrypt_v2, open_sealed,
    seal_for_device, seal_legacy, DataKeyEnvelope, Decrypted, Envelope, SealedPayload,
    WireFormat,
};
