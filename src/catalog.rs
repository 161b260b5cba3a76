use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_BANK_NAME: &str = "Default";

/// Categories every fresh board starts with. More can be added at runtime;
/// once a category is referenced it is never deleted.
pub fn default_categories() -> Vec<String> {
    vec!["sound".to_string(), "music".to_string()]
}

#[derive(Error, Debug, PartialEq)]
pub enum CatalogError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("hotkey '{0}' is already bound in this bank")]
    DuplicateHotkey(String),
    #[error("the last remaining bank cannot be removed")]
    LastBank,
    #[error("bank index {0} is out of range")]
    BankIndex(usize),
    #[error("sound index {0} is out of range")]
    SoundIndex(usize),
}

/// A clip registered on the board. `file_id` points into the blob store; the
/// catalog never touches the bytes themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sound {
    pub id: String,
    pub name: String,
    pub file_id: String,
    pub hotkey: String,
    pub category: String,
    pub volume: u8,
    #[serde(rename = "loop")]
    pub looping: bool,
}

/// A named, ordered collection of sounds. Exactly one bank is current at a
/// time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SoundBank {
    pub name: String,
    pub sounds: Vec<Sound>,
}

impl SoundBank {
    pub fn empty(name: &str) -> Self {
        SoundBank {
            name: name.to_string(),
            sounds: Vec::new(),
        }
    }
}

/// Form input for creating or editing a sound. Unset or empty required
/// fields reject the whole mutation before anything changes.
#[derive(Debug, Clone, Default)]
pub struct SoundDraft {
    pub name: Option<String>,
    pub file_id: Option<String>,
    pub hotkey: Option<String>,
    pub category: Option<String>,
    pub volume: Option<u8>,
    pub looping: Option<bool>,
}

impl SoundDraft {
    fn required(value: Option<String>, field: &'static str) -> Result<String, CatalogError> {
        match value {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(CatalogError::MissingField(field)),
        }
    }

    /// Validate the draft into a sound carrying the given id. Hotkeys are
    /// stored lowercased; volume defaults to 100 and loop to off.
    fn into_sound(self, id: String) -> Result<Sound, CatalogError> {
        Ok(Sound {
            id,
            name: Self::required(self.name, "name")?,
            file_id: Self::required(self.file_id, "file")?,
            hotkey: Self::required(self.hotkey, "hotkey")?.to_lowercase(),
            category: Self::required(self.category, "category")?,
            volume: self.volume.unwrap_or(100).min(100),
            looping: self.looping.unwrap_or(false),
        })
    }
}

/// The full bank/sound/category data structure and its validated mutations.
///
/// Invariants held across every operation: `current_bank_index` is always in
/// range, at least one bank exists, and hotkeys are unique (case-insensitive)
/// within each bank.
#[derive(Debug, Clone)]
pub struct Catalog {
    banks: Vec<SoundBank>,
    current_bank_index: usize,
    categories: Vec<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog {
            banks: vec![SoundBank::empty(DEFAULT_BANK_NAME)],
            current_bank_index: 0,
            categories: default_categories(),
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a catalog from untrusted parts (a persisted snapshot or a
    /// restored backup). An empty bank list falls back to the default bank
    /// and an out-of-range index resets to 0 rather than failing.
    pub fn from_parts(
        banks: Vec<SoundBank>,
        current_bank_index: usize,
        categories: Vec<String>,
    ) -> Self {
        let banks = if banks.is_empty() {
            vec![SoundBank::empty(DEFAULT_BANK_NAME)]
        } else {
            banks
        };
        let current_bank_index = if current_bank_index < banks.len() {
            current_bank_index
        } else {
            0
        };
        let categories = if categories.is_empty() {
            default_categories()
        } else {
            categories
        };
        Catalog {
            banks,
            current_bank_index,
            categories,
        }
    }

    pub fn banks(&self) -> &[SoundBank] {
        &self.banks
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn current_bank_index(&self) -> usize {
        self.current_bank_index
    }

    pub fn current_bank(&self) -> &SoundBank {
        &self.banks[self.current_bank_index]
    }

    pub fn bank(&self, index: usize) -> Result<&SoundBank, CatalogError> {
        self.banks.get(index).ok_or(CatalogError::BankIndex(index))
    }

    pub fn sound(&self, bank_index: usize, sound_index: usize) -> Result<&Sound, CatalogError> {
        self.bank(bank_index)?
            .sounds
            .get(sound_index)
            .ok_or(CatalogError::SoundIndex(sound_index))
    }

    /// Case-insensitive hotkey lookup in the current bank.
    pub fn sound_for_hotkey(&self, key: &str) -> Option<&Sound> {
        let key = key.to_lowercase();
        self.current_bank()
            .sounds
            .iter()
            .find(|s| s.hotkey.to_lowercase() == key)
    }

    /// Every distinct file id referenced by any sound in any bank, in
    /// first-seen order.
    pub fn referenced_file_ids(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut ids = Vec::new();
        for bank in &self.banks {
            for sound in &bank.sounds {
                if seen.insert(sound.file_id.clone()) {
                    ids.push(sound.file_id.clone());
                }
            }
        }
        ids
    }

    fn check_hotkey_free(
        bank: &SoundBank,
        hotkey: &str,
        exclude: Option<usize>,
    ) -> Result<(), CatalogError> {
        let hotkey = hotkey.to_lowercase();
        let collision = bank
            .sounds
            .iter()
            .enumerate()
            .any(|(i, s)| Some(i) != exclude && s.hotkey.to_lowercase() == hotkey);
        if collision {
            Err(CatalogError::DuplicateHotkey(hotkey))
        } else {
            Ok(())
        }
    }

    /// Validate the draft and append it to the bank as a new sound with a
    /// fresh id.
    pub fn add_sound(
        &mut self,
        bank_index: usize,
        draft: SoundDraft,
    ) -> Result<&Sound, CatalogError> {
        self.bank(bank_index)?;
        let sound = draft.into_sound(Uuid::new_v4().to_string())?;
        let bank = &self.banks[bank_index];
        Self::check_hotkey_free(bank, &sound.hotkey, None)?;
        let bank = &mut self.banks[bank_index];
        bank.sounds.push(sound);
        let index = bank.sounds.len() - 1;
        Ok(&bank.sounds[index])
    }

    /// Validate the draft and replace the sound at the given position,
    /// keeping its id. The sound's own hotkey does not count as a collision.
    pub fn edit_sound(
        &mut self,
        bank_index: usize,
        sound_index: usize,
        draft: SoundDraft,
    ) -> Result<&Sound, CatalogError> {
        let id = self.sound(bank_index, sound_index)?.id.clone();
        let sound = draft.into_sound(id)?;
        Self::check_hotkey_free(&self.banks[bank_index], &sound.hotkey, Some(sound_index))?;
        let slot = &mut self.banks[bank_index].sounds[sound_index];
        *slot = sound;
        Ok(slot)
    }

    /// Remove a sound and hand it back so the caller can release its
    /// `file_id` from the blob store. The catalog itself never calls the
    /// store.
    pub fn remove_sound(
        &mut self,
        bank_index: usize,
        sound_index: usize,
    ) -> Result<Sound, CatalogError> {
        self.sound(bank_index, sound_index)?;
        Ok(self.banks[bank_index].sounds.remove(sound_index))
    }

    /// Append a new empty bank and select it. Returns the new bank's index.
    pub fn add_bank(&mut self, name: &str) -> Result<usize, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::MissingField("bank name"));
        }
        self.banks.push(SoundBank::empty(name));
        self.current_bank_index = self.banks.len() - 1;
        Ok(self.current_bank_index)
    }

    /// Remove a bank. The current bank index resets to 0 afterwards,
    /// whichever bank was removed.
    pub fn remove_bank(&mut self, index: usize) -> Result<SoundBank, CatalogError> {
        self.bank(index)?;
        if self.banks.len() == 1 {
            return Err(CatalogError::LastBank);
        }
        let removed = self.banks.remove(index);
        self.current_bank_index = 0;
        Ok(removed)
    }

    pub fn select_bank(&mut self, index: usize) -> Result<(), CatalogError> {
        self.bank(index)?;
        self.current_bank_index = index;
        Ok(())
    }

    /// Add a category. Adding one that already exists (exact match) is a
    /// no-op. Returns the trimmed name so a form can select it.
    pub fn add_category(&mut self, name: &str) -> Result<String, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::MissingField("category name"));
        }
        if !self.categories.iter().any(|c| c == name) {
            self.categories.push(name.to_string());
        }
        Ok(name.to_string())
    }

    /// Replace the whole catalog with restored content, resetting the
    /// current bank to the first one.
    pub fn replace(&mut self, banks: Vec<SoundBank>, categories: Vec<String>) {
        *self = Catalog::from_parts(banks, 0, categories);
    }

    /// Mutable access for the controller to apply live slider/checkbox
    /// updates. Index errors surface the same way as the other operations.
    pub fn sound_mut(
        &mut self,
        bank_index: usize,
        sound_index: usize,
    ) -> Result<&mut Sound, CatalogError> {
        self.sound(bank_index, sound_index)?;
        Ok(&mut self.banks[bank_index].sounds[sound_index])
    }
}
