//! Key Material Store
//!
//! Besitzt das aktive lokale ECDH-Schluessel-Paar:
//! - Laden aus dem Secure Storage beim ersten Zugriff
//! - Generieren und Persistieren falls keins vorhanden ist
//! - Ersetzen im Ganzen (Reset oder Import)
//! - Loeschen (Logout)
//!
//! Schreibende Operationen halten den Write-Lock ueber Persistenz und
//! Austausch hinweg. Leser klonen nur den `Arc` und sehen daher nie ein
//! halb aktualisiertes Paar.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::config::SpeicherEinstellungen;
use crate::error::{CryptoError, CryptoResult};
use crate::keys::{encode_uncompressed, KeyPair};

/// Secure Storage (Keychain / Keystore) der Host-Plattform
pub trait SecureStorage: Send + Sync {
    /// Speichert Bytes unter einem Tag (ueberschreibt)
    fn store(&self, tag: &str, bytes: &[u8]) -> anyhow::Result<()>;

    /// Laedt die Bytes eines Tags, `None` wenn nicht vorhanden
    fn load(&self, tag: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Loescht einen Tag. Fehlende Tags sind kein Fehler.
    fn delete(&self, tag: &str) -> anyhow::Result<()>;
}

/// In-Process Secure Storage (Tests, Hosts ohne Keychain)
#[derive(Debug, Default)]
pub struct MemorySecureStorage {
    eintraege: DashMap<String, Vec<u8>>,
    schreiben_fehlschlagen: AtomicBool,
    lesen_fehlschlagen: AtomicBool,
}

impl MemorySecureStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simuliert einen Keychain-Fehler fuer alle folgenden Schreibzugriffe
    pub fn set_schreiben_fehlschlagen(&self, fehlschlagen: bool) {
        self.schreiben_fehlschlagen.store(fehlschlagen, Ordering::SeqCst);
    }

    /// Simuliert einen Keychain-Fehler fuer alle folgenden Lesezugriffe
    pub fn set_lesen_fehlschlagen(&self, fehlschlagen: bool) {
        self.lesen_fehlschlagen.store(fehlschlagen, Ordering::SeqCst);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.eintraege.contains_key(tag)
    }
}

impl SecureStorage for MemorySecureStorage {
    fn store(&self, tag: &str, bytes: &[u8]) -> anyhow::Result<()> {
        if self.schreiben_fehlschlagen.load(Ordering::SeqCst) {
            anyhow::bail!("Keychain nicht beschreibbar ({tag})");
        }
        self.eintraege.insert(tag.to_string(), bytes.to_vec());
        Ok(())
    }

    fn load(&self, tag: &str) -> anyhow::Result<Option<Vec<u8>>> {
        if self.lesen_fehlschlagen.load(Ordering::SeqCst) {
            anyhow::bail!("Keychain nicht lesbar ({tag})");
        }
        Ok(self.eintraege.get(tag).map(|entry| entry.value().clone()))
    }

    fn delete(&self, tag: &str) -> anyhow::Result<()> {
        if self.schreiben_fehlschlagen.load(Ordering::SeqCst) {
            anyhow::bail!("Keychain nicht beschreibbar ({tag})");
        }
        self.eintraege.remove(tag);
        Ok(())
    }
}

/// Verwaltet das aktive lokale Schluessel-Paar
pub struct KeyMaterialStore {
    storage: Arc<dyn SecureStorage>,
    private_tag: String,
    public_tag: String,
    aktiv: RwLock<Option<Arc<KeyPair>>>,
}

impl KeyMaterialStore {
    pub fn new(storage: Arc<dyn SecureStorage>, einstellungen: &SpeicherEinstellungen) -> Self {
        Self {
            storage,
            private_tag: einstellungen.private_key_tag(),
            public_tag: einstellungen.public_key_tag(),
            aktiv: RwLock::new(None),
        }
    }

    /// Gibt das aktive Paar zurueck, ohne zu laden oder zu generieren
    pub fn active(&self) -> CryptoResult<Arc<KeyPair>> {
        self.aktiv
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(CryptoError::NotInitialized)
    }

    pub fn is_loaded(&self) -> bool {
        self.aktiv.read().is_some()
    }

    /// Laedt das persistierte Paar oder generiert und persistiert ein neues
    ///
    /// Lesefehler des Storage gelten als "nicht vorhanden".
    pub fn load_or_generate(&self) -> CryptoResult<Arc<KeyPair>> {
        if let Some(pair) = self.aktiv.read().as_ref() {
            return Ok(Arc::clone(pair));
        }

        let mut aktiv = self.aktiv.write();
        // Ein anderer Writer kann zwischen Read- und Write-Lock geladen haben
        if let Some(pair) = aktiv.as_ref() {
            return Ok(Arc::clone(pair));
        }

        let pair = match self.load_persisted() {
            Some(pair) => {
                tracing::info!("Lokales Schluessel-Paar aus Secure Storage geladen");
                pair
            }
            None => {
                let pair = KeyPair::generate();
                let vorher = self.vorzustand();
                self.persist(&pair, vorher)?;
                tracing::info!("Neues lokales Schluessel-Paar generiert und gespeichert");
                pair
            }
        };

        let pair = Arc::new(pair);
        *aktiv = Some(Arc::clone(&pair));
        Ok(pair)
    }

    /// Ersetzt das aktive Paar (persistiert zuerst, tauscht dann aus)
    ///
    /// Storage-Fehler werden propagiert, der Cache bleibt dann unveraendert.
    /// Ist der bisherige Private Key nicht lesbar, wird nichts geschrieben.
    pub fn replace(&self, pair: KeyPair) -> CryptoResult<Arc<KeyPair>> {
        let mut aktiv = self.aktiv.write();
        let vorher = self.vorzustand();
        if let Vorzustand::Unlesbar(e) = &vorher {
            return Err(CryptoError::Storage(format!(
                "bisheriger Private Key nicht lesbar: {e}"
            )));
        }
        self.persist(&pair, vorher)?;
        let pair = Arc::new(pair);
        *aktiv = Some(Arc::clone(&pair));
        tracing::info!("Lokales Schluessel-Paar ersetzt");
        Ok(pair)
    }

    /// Reset: generiert ein neues Paar und ersetzt das aktive
    pub fn regenerate(&self) -> CryptoResult<Arc<KeyPair>> {
        self.replace(KeyPair::generate())
    }

    /// Loescht beide Haelften und den Cache. Idempotent.
    pub fn clear(&self) {
        let mut aktiv = self.aktiv.write();
        for tag in [&self.private_tag, &self.public_tag] {
            if let Err(e) = self.storage.delete(tag) {
                tracing::warn!(tag = %tag, fehler = %e, "Schluessel konnte nicht geloescht werden");
            }
        }
        *aktiv = None;
        tracing::info!("Lokales Schluessel-Paar geloescht");
    }

    fn load_persisted(&self) -> Option<KeyPair> {
        let bytes = match self.storage.load(&self.private_tag) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(fehler = %e, "Secure Storage nicht lesbar, generiere neu");
                return None;
            }
        };

        let pair = match KeyPair::from_private_bytes(&bytes) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(fehler = %e, "Gespeicherter Private Key unbrauchbar, generiere neu");
                return None;
            }
        };

        // Private Key ist die Quelle der Wahrheit
        match self.storage.load(&self.public_tag) {
            Ok(Some(public)) if public == encode_uncompressed(pair.public_key()) => {}
            _ => {
                tracing::warn!("Gespeicherter Public Key fehlt oder weicht ab, schreibe neu");
                if let Err(e) = self
                    .storage
                    .store(&self.public_tag, &pair.public_uncompressed())
                {
                    tracing::warn!(fehler = %e, "Public Key konnte nicht neu geschrieben werden");
                }
            }
        }

        Some(pair)
    }

    fn vorzustand(&self) -> Vorzustand {
        match self.storage.load(&self.private_tag) {
            Ok(bytes) => Vorzustand::Bekannt(bytes),
            Err(e) => Vorzustand::Unlesbar(e.to_string()),
        }
    }

    /// Schreibt beide Haelften. Scheitert die zweite, wird der vorherige
    /// Zustand der ersten wiederhergestellt, sofern er bekannt ist.
    fn persist(&self, pair: &KeyPair, vorher: Vorzustand) -> CryptoResult<()> {
        self.storage
            .store(&self.private_tag, pair.private_key_bytes().as_bytes())
            .map_err(|e| CryptoError::Storage(e.to_string()))?;

        if let Err(e) = self
            .storage
            .store(&self.public_tag, &pair.public_uncompressed())
        {
            let rollback = match vorher {
                Vorzustand::Bekannt(Some(alt)) => self.storage.store(&self.private_tag, &alt),
                Vorzustand::Bekannt(None) => self.storage.delete(&self.private_tag),
                Vorzustand::Unlesbar(_) => {
                    tracing::warn!("Vorheriger Private Key unbekannt, kein Rollback");
                    Ok(())
                }
            };
            if let Err(rb) = rollback {
                tracing::warn!(fehler = %rb, "Rollback des Private Key fehlgeschlagen");
            }
            return Err(CryptoError::Storage(e.to_string()));
        }

        Ok(())
    }
}

/// Persistierter Private Key vor einem Schreibvorgang
enum Vorzustand {
    Bekannt(Option<Vec<u8>>),
    Unlesbar(String),
}

impl std::fmt::Debug for KeyMaterialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterialStore")
            .field("private_tag", &self.private_tag)
            .field("public_tag", &self.public_tag)
            .field("geladen", &self.is_loaded())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
