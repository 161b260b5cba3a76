use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::{Catalog, CatalogError, Sound, SoundDraft};
use crate::config::Config;
use crate::hotkeys::{self, Key, KeyAction};
use crate::persist;
use crate::playback::{AudioBackend, PlaybackEngine, PlaybackError};
use crate::store::{BlobStoreManager, StoreError};
use crate::transfer::{self, Snapshot, TransferError};

#[derive(Error, Debug)]
pub enum SoundboardError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("playback error: {0}")]
    Playback(#[from] PlaybackError),
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),
    #[error("blob store error: {0}")]
    Store(#[from] StoreError),
}

/// The soundboard controller: wires the catalog, the playback engine, the
/// blob store and persistence together in the order UI events arrive.
///
/// The catalog owns sound/bank/category lifetime; this controller is the
/// one place that releases clip bytes when a sound goes away and that saves
/// state after every mutation.
pub struct Soundboard {
    catalog: Catalog,
    engine: PlaybackEngine,
    store: BlobStoreManager,
    state_path: Option<PathBuf>,
}

impl Soundboard {
    /// Open the board from its on-disk state. A missing or corrupt state
    /// file starts a fresh board rather than failing.
    pub async fn open(config: &Config, backend: Box<dyn AudioBackend>) -> Self {
        let store = BlobStoreManager::on_disk(config.clips_dir());
        let catalog = persist::load(&config.state_path()).await;
        Soundboard {
            engine: PlaybackEngine::new(backend, store.clone()),
            catalog,
            store,
            state_path: Some(config.state_path()),
        }
    }

    /// Assemble a board from explicit parts, without persistence. Used by
    /// tests and ephemeral sessions.
    pub fn with_parts(
        catalog: Catalog,
        store: BlobStoreManager,
        backend: Box<dyn AudioBackend>,
    ) -> Self {
        Soundboard {
            engine: PlaybackEngine::new(backend, store.clone()),
            catalog,
            store,
            state_path: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    /// Persist after a mutation. Persistence failures are reported, not
    /// fatal: the in-memory board stays authoritative.
    async fn save(&self) {
        if let Some(path) = &self.state_path {
            if let Err(e) = persist::save(path, &self.catalog).await {
                warn!("Failed to save board state: {}", e);
            }
        }
    }

    /// React to a key event per the hotkey contract.
    pub async fn handle_key(&mut self, key: Key, typing: bool) -> Result<(), SoundboardError> {
        match hotkeys::resolve(key, typing) {
            KeyAction::StopAll => {
                self.engine.stop_all();
                Ok(())
            }
            KeyAction::Ignored => Ok(()),
            KeyAction::Trigger(key) => {
                let Some(sound) = self.catalog.sound_for_hotkey(&key) else {
                    return Ok(());
                };
                let sound = sound.clone();
                self.play_sound(&sound).await
            }
        }
    }

    async fn play_sound(&self, sound: &Sound) -> Result<(), SoundboardError> {
        match self.engine.play(sound).await {
            Ok(()) => Ok(()),
            Err(PlaybackError::ClipMissing(file_id)) => {
                // Recoverable: the category is simply silent afterwards.
                warn!(
                    "Cannot play {}: clip {} is gone from the store",
                    sound.name, file_id
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Play the sound at a row of the current bank.
    pub async fn play(&self, sound_index: usize) -> Result<(), SoundboardError> {
        let sound = self
            .catalog
            .sound(self.catalog.current_bank_index(), sound_index)?
            .clone();
        self.play_sound(&sound).await
    }

    /// Stop the sound at a row of the current bank, if it is the one its
    /// category is playing.
    pub fn stop(&self, sound_index: usize) -> Result<(), SoundboardError> {
        let sound = self
            .catalog
            .sound(self.catalog.current_bank_index(), sound_index)?
            .clone();
        self.engine.stop(&sound);
        Ok(())
    }

    pub fn stop_all(&self) {
        self.engine.stop_all();
    }

    pub fn set_global_volume(&self, volume: u8) {
        self.engine.set_global_volume(volume);
    }

    /// Store uploaded clip bytes under a fresh id for a sound draft to
    /// reference.
    pub async fn import_clip(&self, bytes: &[u8]) -> Result<String, SoundboardError> {
        let file_id = Uuid::new_v4().to_string();
        self.store.put(&file_id, bytes).await?;
        Ok(file_id)
    }

    pub async fn add_sound(&mut self, draft: SoundDraft) -> Result<(), SoundboardError> {
        let bank_index = self.catalog.current_bank_index();
        self.catalog.add_sound(bank_index, draft)?;
        self.save().await;
        Ok(())
    }

    /// Replace a sound's fields. A live occupant keeps playing with its old
    /// settings until the next play.
    pub async fn edit_sound(
        &mut self,
        sound_index: usize,
        draft: SoundDraft,
    ) -> Result<(), SoundboardError> {
        let bank_index = self.catalog.current_bank_index();
        self.catalog.edit_sound(bank_index, sound_index, draft)?;
        self.save().await;
        Ok(())
    }

    /// Remove a sound and release its clip from the blob store. A clip
    /// already sounding keeps playing until evicted; the handle holds its
    /// own copy of the audio.
    pub async fn remove_sound(&mut self, sound_index: usize) -> Result<(), SoundboardError> {
        let bank_index = self.catalog.current_bank_index();
        let removed = self.catalog.remove_sound(bank_index, sound_index)?;
        if let Err(e) = self.store.delete(&removed.file_id).await {
            warn!("Failed to release clip {}: {}", removed.file_id, e);
        }
        self.save().await;
        Ok(())
    }

    /// Set a sound's volume and propagate it to the live occupant.
    pub async fn change_volume(
        &mut self,
        sound_index: usize,
        volume: u8,
    ) -> Result<(), SoundboardError> {
        let bank_index = self.catalog.current_bank_index();
        let sound = self.catalog.sound_mut(bank_index, sound_index)?;
        sound.volume = volume.min(100);
        let sound = sound.clone();
        self.engine.change_volume(&sound, sound.volume);
        self.save().await;
        Ok(())
    }

    /// Flip a sound's loop flag and propagate it to the live occupant.
    pub async fn toggle_loop(&mut self, sound_index: usize) -> Result<(), SoundboardError> {
        let bank_index = self.catalog.current_bank_index();
        let sound = self.catalog.sound_mut(bank_index, sound_index)?;
        sound.looping = !sound.looping;
        let sound = sound.clone();
        self.engine.toggle_loop(&sound);
        self.save().await;
        Ok(())
    }

    pub async fn add_bank(&mut self, name: &str) -> Result<usize, SoundboardError> {
        let index = self.catalog.add_bank(name)?;
        self.save().await;
        Ok(index)
    }

    pub async fn remove_bank(&mut self, index: usize) -> Result<(), SoundboardError> {
        self.catalog.remove_bank(index)?;
        self.save().await;
        Ok(())
    }

    pub async fn select_bank(&mut self, index: usize) -> Result<(), SoundboardError> {
        self.catalog.select_bank(index)?;
        self.save().await;
        Ok(())
    }

    pub async fn add_category(&mut self, name: &str) -> Result<String, SoundboardError> {
        let name = self.catalog.add_category(name)?;
        self.save().await;
        Ok(name)
    }

    /// Serialize the whole board (catalog + clips) into a backup document.
    pub async fn backup(&self) -> Result<String, SoundboardError> {
        let snapshot = transfer::export(&self.catalog, &self.store).await;
        Ok(snapshot.to_json()?)
    }

    /// Restore a backup document, overwriting stored clips and replacing
    /// the whole catalog. A rejected document leaves the catalog untouched.
    pub async fn restore(&mut self, text: &str) -> Result<(), SoundboardError> {
        let snapshot = Snapshot::from_json(text)?;
        let (banks, categories) = transfer::import(snapshot, &self.store).await?;
        self.catalog.replace(banks, categories);
        self.save().await;
        info!("Restored backup with {} banks", self.catalog.banks().len());
        Ok(())
    }
}
