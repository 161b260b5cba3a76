use base64::{engine::general_purpose, Engine as _};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

use crate::catalog::{Catalog, SoundBank};
use crate::store::{BlobStoreManager, StoreError};

/// Concurrent blob reads during export.
const EXPORT_CONCURRENCY: usize = 10;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("invalid backup document: {0}")]
    InvalidFormat(String),
    #[error("blob store error: {0}")]
    Store(#[from] StoreError),
}

/// The full exportable state: catalog content plus every referenced clip,
/// each embedded as a self-describing data URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub banks: Vec<SoundBank>,
    pub categories: Vec<String>,
    pub files: HashMap<String, String>,
}

impl Snapshot {
    pub fn from_json(text: &str) -> Result<Self, TransferError> {
        serde_json::from_str(text).map_err(|e| TransferError::InvalidFormat(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, TransferError> {
        serde_json::to_string(self).map_err(|e| TransferError::InvalidFormat(e.to_string()))
    }
}

/// Produce a snapshot of the catalog plus blob content.
///
/// Every distinct referenced file id is read exactly once. Export is
/// best-effort: a clip that cannot be read is logged and left out of the
/// snapshot rather than failing the whole backup.
pub async fn export(catalog: &Catalog, store: &BlobStoreManager) -> Snapshot {
    let file_ids = catalog.referenced_file_ids();
    let payloads: Vec<Option<(String, String)>> = stream::iter(file_ids)
        .map(|file_id| {
            let store = store.clone();
            async move {
                match store.get(&file_id).await {
                    Ok(bytes) => {
                        let url = encode_data_url(sniff_media_type(&bytes), &bytes);
                        Some((file_id, url))
                    }
                    Err(e) => {
                        warn!("Backup: failed to read clip {}: {}", file_id, e);
                        None
                    }
                }
            }
        })
        .buffer_unordered(EXPORT_CONCURRENCY)
        .collect()
        .await;

    Snapshot {
        banks: catalog.banks().to_vec(),
        categories: catalog.categories().to_vec(),
        files: payloads.into_iter().flatten().collect(),
    }
}

/// Restore a snapshot's blob content and hand back the catalog parts.
///
/// Payloads are all decoded before anything is written, so a malformed
/// entry rejects the document without touching the store; writes themselves
/// overwrite whatever already lives under each key.
pub async fn import(
    snapshot: Snapshot,
    store: &BlobStoreManager,
) -> Result<(Vec<SoundBank>, Vec<String>), TransferError> {
    if snapshot.banks.is_empty() {
        return Err(TransferError::InvalidFormat(
            "backup contains no banks".to_string(),
        ));
    }

    let mut decoded = Vec::with_capacity(snapshot.files.len());
    for (file_id, url) in &snapshot.files {
        let (_, bytes) = decode_data_url(url)?;
        decoded.push((file_id.clone(), bytes));
    }

    for (file_id, bytes) in decoded {
        store.put(&file_id, &bytes).await?;
    }

    Ok((snapshot.banks, snapshot.categories))
}

/// Guess a clip's media type from its magic bytes. Falls back to a generic
/// type; the tag only matters for round-tripping through other tools.
pub fn sniff_media_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"fLaC") {
        "audio/flac"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
        "audio/wav"
    } else if bytes.starts_with(b"OggS") {
        "audio/ogg"
    } else if bytes.starts_with(b"ID3")
        || (bytes.len() >= 2 && bytes[0] == 0xff && bytes[1] & 0xe0 == 0xe0)
    {
        "audio/mpeg"
    } else if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        "audio/mp4"
    } else {
        "application/octet-stream"
    }
}

pub fn encode_data_url(media_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        media_type,
        general_purpose::STANDARD.encode(bytes)
    )
}

/// Split a `data:<mime>;base64,<payload>` URL into its media type and raw
/// bytes.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>), TransferError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| TransferError::InvalidFormat("payload is not a data URL".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| TransferError::InvalidFormat("data URL has no payload".to_string()))?;
    let media_type = meta.strip_suffix(";base64").unwrap_or(meta);
    let bytes = general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| TransferError::InvalidFormat(format!("bad base64 payload: {}", e)))?;
    Ok((media_type.to_string(), bytes))
}
