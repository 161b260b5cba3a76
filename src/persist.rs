use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::warn;

use crate::catalog::{default_categories, Catalog, SoundBank};

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk record of the board, written after every catalog mutation and
/// read once at startup. Older files may lack `categories`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedState {
    pub banks: Vec<SoundBank>,
    #[serde(default)]
    pub current_bank_index: usize,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
}

/// Load the saved board state. A missing or corrupt file starts a fresh
/// default board instead of failing startup.
pub async fn load(path: &Path) -> Catalog {
    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not read saved state {}: {}", path.display(), e);
            }
            return Catalog::new();
        }
    };

    match serde_json::from_str::<SavedState>(&text) {
        Ok(saved) => Catalog::from_parts(saved.banks, saved.current_bank_index, saved.categories),
        Err(e) => {
            warn!(
                "Saved state {} is corrupt, starting fresh: {}",
                path.display(),
                e
            );
            Catalog::new()
        }
    }
}

pub async fn save(path: &Path, catalog: &Catalog) -> Result<(), PersistError> {
    let saved = SavedState {
        banks: catalog.banks().to_vec(),
        current_bank_index: catalog.current_bank_index(),
        categories: catalog.categories().to_vec(),
    };
    let text = serde_json::to_string(&saved)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, text).await?;
    Ok(())
}
