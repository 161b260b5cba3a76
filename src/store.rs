use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no blob stored under key {0}")]
    NotFound(String),
    #[error("invalid blob key: {0}")]
    InvalidKey(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for blob storage operations (allows mocking for tests)
///
/// Keys are opaque identifiers handed out when a clip is uploaded. The store
/// owns raw bytes only; which keys are still referenced is the catalog's
/// concern.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;
    /// Deleting a key that was never stored is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Production blob store backed by a directory of flat files
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: PathBuf) -> Self {
        FsBlobStore { root }
    }

    /// Resolve a key to its on-disk path, rejecting anything that could
    /// escape the store root.
    fn blob_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            || key.starts_with('.')
        {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait::async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.blob_path(key)?;
        fs::create_dir_all(&self.root).await?;
        fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.blob_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.blob_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory blob store used by tests and available for ephemeral sessions
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        MemoryBlobStore {
            blobs: Mutex::new(HashMap::new()),
        }
    }
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.blobs
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Blob store manager that handles clip byte lifecycle
#[derive(Clone)]
pub struct BlobStoreManager {
    store: Arc<dyn BlobStore>,
}

impl std::fmt::Debug for BlobStoreManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStoreManager")
            .field("store", &"<dyn BlobStore>")
            .finish()
    }
}

impl BlobStoreManager {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        BlobStoreManager { store }
    }

    /// Create a manager over an on-disk store rooted at the given directory
    pub fn on_disk(root: PathBuf) -> Self {
        Self::new(Arc::new(FsBlobStore::new(root)))
    }

    /// Create a manager over an in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBlobStore::new()))
    }

    pub async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        debug!("Storing clip {} ({} bytes)", key, bytes.len());
        self.store.put(key, bytes).await
    }

    pub async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.store.get(key).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        debug!("Deleting clip {}", key);
        self.store.delete(key).await
    }
}
