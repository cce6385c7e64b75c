//! Persistent per-installation identity
//!
//! The identity is an opaque string that survives process restarts. It is
//! read once when the tracker starts and written only when absent. Storage
//! failures never reach the caller: telemetry must not block startup, so the
//! tracker falls back to an id that lives only for this process.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};

/// Key/value style storage for the installation identity
pub trait IdentityStore: Send + Sync {
    /// Read the stored identity, `None` when nothing has been stored yet
    fn load(&self) -> Result<Option<String>>;

    /// Persist the identity
    fn save(&self, identity: &str) -> Result<()>;
}

/// Identity kept in a single file, `$XDG_DATA_HOME/vortex/identity` by default
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the XDG default location
    pub fn default_location() -> Self {
        Self::new(crate::config::Config::identity_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::IdentityUnavailable(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn save(&self, identity: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::IdentityUnavailable(format!(
                    "failed to create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        std::fs::write(&self.path, identity).map_err(|e| {
            Error::IdentityUnavailable(format!("failed to write {}: {}", self.path.display(), e))
        })
    }
}

/// In-process identity storage, for hosts that persist elsewhere and for tests
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    value: Mutex<Option<String>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with an identity
    pub fn with_identity(identity: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(identity.into())),
        }
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Result<Option<String>> {
        let guard = self
            .value
            .lock()
            .map_err(|_| Error::IdentityUnavailable("identity lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, identity: &str) -> Result<()> {
        let mut guard = self
            .value
            .lock()
            .map_err(|_| Error::IdentityUnavailable("identity lock poisoned".to_string()))?;
        *guard = Some(identity.to_string());
        Ok(())
    }
}

/// Load the stored identity or create and persist a new one.
///
/// Never fails. A blank stored value counts as absent. Any storage error is
/// logged and answered with a fresh identifier that is not persisted.
pub fn load_or_create(store: &dyn IdentityStore) -> String {
    match store.load() {
        Ok(Some(identity)) if !identity.trim().is_empty() => identity,
        Ok(_) => {
            let identity = new_identity();
            if let Err(e) = store.save(&identity) {
                tracing::warn!(error = %e, "Could not persist identity, using ephemeral id");
            }
            identity
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not load identity, using ephemeral id");
            new_identity()
        }
    }
}

fn new_identity() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct BrokenStore;

    impl IdentityStore for BrokenStore {
        fn load(&self) -> Result<Option<String>> {
            Err(Error::IdentityUnavailable("disk on fire".to_string()))
        }

        fn save(&self, _identity: &str) -> Result<()> {
            Err(Error::IdentityUnavailable("disk on fire".to_string()))
        }
    }

    #[test]
    fn test_file_store_creates_then_reuses() {
        let dir = TempDir::new().unwrap();
        let store = FileIdentityStore::new(dir.path().join("nested/identity"));

        let first = load_or_create(&store);
        assert!(!first.is_empty());
        assert!(store.path().exists());

        let second = load_or_create(&store);
        assert_eq!(first, second);
    }

    #[test]
    fn test_file_store_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileIdentityStore::new(dir.path().join("identity"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_blank_identity_is_replaced() {
        let store = MemoryIdentityStore::with_identity("   ");
        let identity = load_or_create(&store);
        assert!(!identity.trim().is_empty());
        assert_eq!(store.load().unwrap(), Some(identity));
    }

    #[test]
    fn test_memory_store_keeps_seeded_identity() {
        let store = MemoryIdentityStore::with_identity("device-42");
        assert_eq!(load_or_create(&store), "device-42");
    }

    #[test]
    fn test_broken_store_falls_back_to_ephemeral() {
        let a = load_or_create(&BrokenStore);
        let b = load_or_create(&BrokenStore);
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }
}
