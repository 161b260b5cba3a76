use std::path::PathBuf;

/// Application configuration: where the board keeps its clip bytes and its
/// saved state.
#[derive(Clone, Debug)]
pub struct Config {
    pub data_dir: PathBuf,
}

impl Config {
    /// Resolve the data directory, honoring the `SOUNDBOARD_DATA_DIR`
    /// override.
    pub fn load() -> Self {
        let data_dir = std::env::var("SOUNDBOARD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home_dir = dirs::home_dir().expect("Failed to get home directory");
                home_dir.join(".soundboard")
            });
        Config { data_dir }
    }

    /// Directory the blob store writes clip bytes into.
    pub fn clips_dir(&self) -> PathBuf {
        self.data_dir.join("files")
    }

    /// Path of the persisted board state.
    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("soundboard.json")
    }
}
