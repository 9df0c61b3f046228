//! File-based configuration storage.
//!
//! Each key is stored as `<dir>/<key>.json`. Writes go to a temporary file
//! first and are renamed into place, so a crash never leaves a half-written
//! record behind.

use meterdisplay_core::{ConfigError, ConfigStorage};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Configuration storage backed by a directory of JSON files.
#[derive(Debug, Clone)]
pub struct FileConfigStorage {
    dir: PathBuf,
}

impl FileConfigStorage {
    /// Open storage in `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            ConfigError::StorageUnavailable(format!("{}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ConfigError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ConfigError::InvalidData(format!("invalid key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl ConfigStorage for FileConfigStorage {
    fn read(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::ReadError(format!("{}: {}", path.display(), e))),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, value)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| ConfigError::WriteError(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), "Wrote configuration");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ConfigError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ConfigError::WriteError(format!("{}: {}", path.display(), e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meterdisplay_core::{ConfigHandlers, DeviceSettings, SettingsLayout};

    /// Storage in a scratch directory that is removed on drop.
    struct TempStorage(FileConfigStorage);

    impl std::ops::Deref for TempStorage {
        type Target = FileConfigStorage;

        fn deref(&self) -> &FileConfigStorage {
            &self.0
        }
    }

    impl Drop for TempStorage {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(self.0.dir());
        }
    }

    fn temp_storage(name: &str) -> TempStorage {
        let dir = std::env::temp_dir().join(format!(
            "meterdisplay-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        TempStorage(FileConfigStorage::new(dir).unwrap())
    }

    #[test]
    fn test_read_missing_key() {
        let storage = temp_storage("missing");
        assert_eq!(storage.read("settings").unwrap(), None);
        assert!(!storage.has_key("settings"));
    }

    #[test]
    fn test_write_read_remove() {
        let storage = temp_storage("write-read");
        storage.write("display", r#"{"rotation":1}"#).unwrap();

        assert!(storage.dir().join("display.json").exists());
        assert!(!storage.dir().join("display.json.tmp").exists());
        assert_eq!(
            storage.read("display").unwrap().as_deref(),
            Some(r#"{"rotation":1}"#)
        );

        storage.remove("display").unwrap();
        assert_eq!(storage.read("display").unwrap(), None);
        storage.remove("display").unwrap();
    }

    #[test]
    fn test_rejects_path_keys() {
        let storage = temp_storage("keys");
        assert!(matches!(
            storage.write("../escape", "{}"),
            Err(ConfigError::InvalidData(_))
        ));
        assert!(storage.read("").is_err());
    }

    #[test]
    fn test_settings_survive_reopen() {
        let storage = temp_storage("reopen");
        let mut settings = DeviceSettings::energy_and_water_defaults();
        settings.display_screen = 2;
        storage.save_settings(&settings).unwrap();

        let reopened = FileConfigStorage::new(storage.dir().to_path_buf()).unwrap();
        let loaded =
            ConfigHandlers::load_or_default(&reopened, DeviceSettings::energy_and_water_defaults())
                .unwrap();
        assert_eq!(loaded.display_screen, 2);
        assert_eq!(
            reopened.load_settings(SettingsLayout::EnergyAndWater).unwrap(),
            settings
        );
    }

    #[test]
    fn test_temp_dir_removed_on_drop() {
        let storage = temp_storage("cleanup");
        storage.write("display", r#"{"rotation":2}"#).unwrap();
        let dir = storage.dir().to_path_buf();
        assert!(dir.exists());

        drop(storage);
        assert!(!dir.exists());
    }
}
