//! MirrorLink Settings
//!
//! JSON-file implementation of the [`SettingsStore`] contract: the user's
//! preferred output mode and the last-known-active flag. Reads and writes
//! go straight to disk on every call; the engine treats every call as
//! advisory and fallible, so there is no caching layer to invalidate.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use mirrorlink_common::error::{MirrorError, MirrorResult};
use mirrorlink_platform_core::{Mode, SettingsStore};

/// On-disk settings document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredSettings {
    /// Preferred output mode, if the user ever picked one.
    #[serde(default)]
    preferred_mode: Option<Mode>,

    /// Whether a mirroring session was active when the process last ran.
    #[serde(default)]
    last_active: bool,
}

/// Settings store backed by a single JSON file.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    /// Create a store at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store at the standard per-user location.
    pub fn at_default_location() -> Self {
        let base = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local").join("share")
            });
        Self::new(base.join("mirrorlink").join("settings.json"))
    }

    fn read(&self) -> MirrorResult<StoredSettings> {
        if !self.path.exists() {
            return Ok(StoredSettings::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&content)
            .map_err(|e| MirrorError::settings(format!("Failed to parse {:?}: {e}", self.path)))
    }

    fn write(&self, settings: &StoredSettings) -> MirrorResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn preferred_mode(&self) -> MirrorResult<Option<Mode>> {
        Ok(self.read()?.preferred_mode)
    }

    fn set_preferred_mode(&self, mode: Option<Mode>) -> MirrorResult<()> {
        let mut settings = self.read().unwrap_or_default();
        match mode {
            Some(mode) => tracing::debug!(%mode, "Saving preferred mode"),
            None => tracing::debug!("Clearing preferred mode"),
        }
        settings.preferred_mode = mode;
        self.write(&settings)
    }

    fn last_active(&self) -> MirrorResult<bool> {
        Ok(self.read()?.last_active)
    }

    fn set_last_active(&self, active: bool) -> MirrorResult<()> {
        let mut settings = self.read().unwrap_or_default();
        settings.last_active = active;
        self.write(&settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in_temp(name: &str) -> JsonSettingsStore {
        let dir = std::env::temp_dir().join("mirrorlink_test_settings");
        std::fs::create_dir_all(&dir).unwrap();
        JsonSettingsStore::new(dir.join(name))
    }

    #[test]
    fn missing_file_reads_as_defaults() {
        let store = store_in_temp("missing.json");
        let _ = std::fs::remove_file(&store.path);
        assert_eq!(store.preferred_mode().unwrap(), None);
        assert!(!store.last_active().unwrap());
    }

    #[test]
    fn preferred_mode_round_trips() {
        let store = store_in_temp("preferred.json");
        let _ = std::fs::remove_file(&store.path);

        let mode = Mode::new(3840, 2160, 30);
        store.set_preferred_mode(Some(mode)).unwrap();
        assert_eq!(store.preferred_mode().unwrap(), Some(mode));

        store.set_preferred_mode(None).unwrap();
        assert_eq!(store.preferred_mode().unwrap(), None);
    }

    #[test]
    fn last_active_flag_persists_independently_of_mode() {
        let store = store_in_temp("active.json");
        let _ = std::fs::remove_file(&store.path);

        store.set_preferred_mode(Some(Mode::new(1920, 1080, 60))).unwrap();
        store.set_last_active(true).unwrap();
        assert!(store.last_active().unwrap());
        assert_eq!(store.preferred_mode().unwrap(), Some(Mode::new(1920, 1080, 60)));
    }
}
