use std::cell::RefCell;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::catalog::Sound;
use crate::playback::backend::{AudioBackend, AudioError, AudioHandle};
use crate::store::{BlobStoreManager, StoreError};

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("clip {0} is missing from the blob store")]
    ClipMissing(String),
    #[error("blob store error: {0}")]
    Store(#[from] StoreError),
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),
}

struct Occupant {
    handle: Box<dyn AudioHandle>,
    sound_id: String,
    volume: u8,
}

#[derive(Default)]
struct EngineState {
    global_volume: u8,
    next_ticket: u64,
    /// Last ticket issued per category. A `play` whose fetch resolves after
    /// its ticket went stale discards its result instead of installing it.
    tickets: HashMap<String, u64>,
    occupants: HashMap<String, Occupant>,
}

impl EngineState {
    fn issue_ticket(&mut self, category: &str) -> u64 {
        self.next_ticket += 1;
        self.tickets.insert(category.to_string(), self.next_ticket);
        self.next_ticket
    }

    fn evict(&mut self, category: &str) {
        if let Some(mut occupant) = self.occupants.remove(category) {
            occupant.handle.stop();
        }
    }
}

fn effective_volume(clip_volume: u8, global_volume: u8) -> f32 {
    (clip_volume as f32 / 100.0) * (global_volume as f32 / 100.0)
}

/// The playback engine: one owned map from category to the clip currently
/// sounding there.
///
/// Category identity is the exclusivity unit. Starting a clip evicts
/// whatever its category was playing, while other categories keep sounding
/// untouched; sound identity only matters for targeted stop and live-update
/// calls. Non-looping clips that reach their natural end leave a quiet
/// occupant behind until the next eviction, which is harmless.
pub struct PlaybackEngine {
    backend: Box<dyn AudioBackend>,
    store: BlobStoreManager,
    state: RefCell<EngineState>,
}

impl PlaybackEngine {
    pub fn new(backend: Box<dyn AudioBackend>, store: BlobStoreManager) -> Self {
        PlaybackEngine {
            backend,
            store,
            state: RefCell::new(EngineState {
                global_volume: 100,
                ..EngineState::default()
            }),
        }
    }

    /// Start a sound, synchronously evicting its category's current
    /// occupant first. The clip bytes are fetched from the blob store; a
    /// missing blob is a recoverable error that leaves the category silent.
    ///
    /// Other events may run while the fetch is pending, so the occupant is
    /// installed only if no newer `play`/`stop` claimed the category in the
    /// meantime.
    pub async fn play(&self, sound: &Sound) -> Result<(), PlaybackError> {
        let ticket = {
            let mut state = self.state.borrow_mut();
            state.evict(&sound.category);
            state.issue_ticket(&sound.category)
        };

        let bytes = match self.store.get(&sound.file_id).await {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound(_)) => {
                return Err(PlaybackError::ClipMissing(sound.file_id.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut state = self.state.borrow_mut();
        if state.tickets.get(&sound.category) != Some(&ticket) {
            debug!(
                "Discarding stale playback of {} in category {}",
                sound.name, sound.category
            );
            return Ok(());
        }

        let mut handle = self.backend.load(bytes)?;
        handle.set_looping(sound.looping);
        handle.set_volume(effective_volume(sound.volume, state.global_volume));
        handle.start()?;
        state.occupants.insert(
            sound.category.clone(),
            Occupant {
                handle,
                sound_id: sound.id.clone(),
                volume: sound.volume,
            },
        );
        Ok(())
    }

    /// Stop a sound if it is its category's current occupant; stopping a
    /// sound that is not occupying its category has no effect.
    pub fn stop(&self, sound: &Sound) {
        let mut state = self.state.borrow_mut();
        if let Some(mut occupant) = state.occupants.remove(&sound.category) {
            if occupant.sound_id == sound.id {
                occupant.handle.stop();
                state.tickets.remove(&sound.category);
            } else {
                state.occupants.insert(sound.category.clone(), occupant);
            }
        }
    }

    /// Halt every occupant across all categories and invalidate anything
    /// still in flight.
    pub fn stop_all(&self) {
        let mut state = self.state.borrow_mut();
        for (_, mut occupant) in state.occupants.drain() {
            occupant.handle.stop();
        }
        state.tickets.clear();
    }

    pub fn global_volume(&self) -> u8 {
        self.state.borrow().global_volume
    }

    /// Update the global scale factor and re-apply the derived volume to
    /// every live occupant without restarting playback.
    pub fn set_global_volume(&self, volume: u8) {
        let mut state = self.state.borrow_mut();
        state.global_volume = volume.min(100);
        let global_volume = state.global_volume;
        for occupant in state.occupants.values_mut() {
            occupant
                .handle
                .set_volume(effective_volume(occupant.volume, global_volume));
        }
    }

    /// Apply a new per-clip volume to the live occupant, if this sound is
    /// the one occupying its category.
    pub fn change_volume(&self, sound: &Sound, volume: u8) {
        let mut state = self.state.borrow_mut();
        let global_volume = state.global_volume;
        if let Some(occupant) = state.occupants.get_mut(&sound.category) {
            if occupant.sound_id == sound.id {
                occupant.volume = volume.min(100);
                let volume = occupant.volume;
                occupant
                    .handle
                    .set_volume(effective_volume(volume, global_volume));
            }
        }
    }

    /// Push the sound's loop flag to the live handle, if this sound is the
    /// one occupying its category; otherwise the flag takes effect on the
    /// next `play`.
    pub fn toggle_loop(&self, sound: &Sound) {
        let mut state = self.state.borrow_mut();
        if let Some(occupant) = state.occupants.get_mut(&sound.category) {
            if occupant.sound_id == sound.id {
                occupant.handle.set_looping(sound.looping);
            }
        }
    }

    /// Id of the sound currently occupying a category, if any.
    pub fn active_sound(&self, category: &str) -> Option<String> {
        self.state
            .borrow()
            .occupants
            .get(category)
            .map(|o| o.sound_id.clone())
    }

    pub fn is_active(&self, sound: &Sound) -> bool {
        self.active_sound(&sound.category).as_deref() == Some(sound.id.as_str())
    }

    pub fn active_count(&self) -> usize {
        self.state.borrow().occupants.len()
    }
}
