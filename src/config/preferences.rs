use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use tracing::{debug, info};

/// Environment override for the title-swipe toggle
pub const ENABLE_TITLE_SWIPES_ENV: &str = "TITLESWIPE_ENABLE_TITLE_SWIPES";

#[derive(Error, Debug)]
pub enum PreferencesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Boolean preferences the gesture engine reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKey {
    EnableTitleSwipes,
}

/// Read-only access to user preferences
pub trait PreferenceSource: Send + Sync {
    fn read_flag(&self, key: PreferenceKey) -> bool;
}

/// User preferences as stored in `preferences.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Flicks on a title bar move or resize the window
    pub enable_title_swipes: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            enable_title_swipes: true,
        }
    }
}

impl Preferences {
    pub fn default_path() -> PathBuf {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home_dir
            .join(".config")
            .join("titleswipe")
            .join("preferences.toml")
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, PreferencesError> {
        if !path.exists() {
            debug!(path = %path.display(), "No preferences file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Write to `path`, creating the parent directory if needed
    pub fn save(&self, path: &Path) -> Result<(), PreferencesError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content)?;
        fs::rename(temp_path, path)?;
        Ok(())
    }

    /// Apply environment overrides on top of the loaded values
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var(ENABLE_TITLE_SWIPES_ENV) {
            self.enable_title_swipes = value.eq_ignore_ascii_case("true") || value == "1";
        }
        self
    }
}

impl PreferenceSource for Preferences {
    fn read_flag(&self, key: PreferenceKey) -> bool {
        match key {
            PreferenceKey::EnableTitleSwipes => self.enable_title_swipes,
        }
    }
}

/// Preferences backed by a file that can be reloaded while running
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    current: RwLock<Preferences>,
}

impl PreferenceStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PreferencesError> {
        let path = path.into();
        let preferences = Preferences::load(&path)?.with_env_overrides();
        info!(path = %path.display(), ?preferences, "Loaded preferences");
        Ok(Self {
            path,
            current: RwLock::new(preferences),
        })
    }

    pub fn open_default() -> Result<Self, PreferencesError> {
        Self::open(Preferences::default_path())
    }

    /// Re-read the file; the previous values stay in place on error
    pub fn reload(&self) -> Result<Preferences, PreferencesError> {
        let preferences = Preferences::load(&self.path)?.with_env_overrides();
        *self.current.write().expect("poisoned lock") = preferences.clone();
        debug!(?preferences, "Reloaded preferences");
        Ok(preferences)
    }

    pub fn current(&self) -> Preferences {
        self.current.read().expect("poisoned lock").clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceSource for PreferenceStore {
    fn read_flag(&self, key: PreferenceKey) -> bool {
        self.current.read().expect("poisoned lock").read_flag(key)
    }
}
