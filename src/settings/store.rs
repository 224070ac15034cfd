use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::effects::types::EffectKind;
use crate::settings::types::{SessionConfig, SettingsFile};

const SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Persistent settings store with debounced saving.
pub struct SettingsStore {
    path: PathBuf,
    data: Mutex<SettingsFile>,
    save_notify: Notify,
    is_dirty: AtomicBool,
}

impl SettingsStore {
    /// Create a new store, loading from disk if the file exists.
    ///
    /// An unreadable or malformed file is logged and replaced by defaults.
    pub fn new(path: PathBuf) -> Self {
        let data = Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Ignoring settings at {}: {e}", path.display());
            SettingsFile::default()
        });
        Self {
            path,
            data: Mutex::new(data),
            save_notify: Notify::new(),
            is_dirty: AtomicBool::new(false),
        }
    }

    /// Load settings from a JSON file, returning default on missing file.
    pub fn load(path: &Path) -> Result<SettingsFile, String> {
        if !path.exists() {
            return Ok(SettingsFile::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&contents).map_err(|e| e.to_string())
    }

    /// Save current settings to disk atomically (write .tmp then rename).
    pub fn save(&self) -> Result<(), String> {
        let data = self.data.lock().clone();
        let json = serde_json::to_string_pretty(&data).map_err(|e| e.to_string())?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json).map_err(|e| e.to_string())?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| e.to_string())?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The last effect the user selected, if any.
    pub fn effect(&self) -> Option<EffectKind> {
        self.data.lock().effect
    }

    /// Remember the selected effect. Triggers a debounced save.
    pub fn set_effect(&self, effect: EffectKind) {
        {
            let mut data = self.data.lock();
            if data.effect == Some(effect) {
                return;
            }
            data.effect = Some(effect);
        }
        self.mark_dirty();
    }

    /// Current session configuration.
    pub fn session(&self) -> SessionConfig {
        self.data.lock().session.clone()
    }

    fn mark_dirty(&self) {
        self.is_dirty.store(true, Ordering::Release);
        self.save_notify.notify_one();
    }

    /// Start the debounce task. Waits for dirty notification, sleeps 500ms, then saves.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_debounce_task(self: &Arc<Self>) -> JoinHandle<()> {
        self.start_debounce_task_with_delay(SAVE_DEBOUNCE)
    }

    /// Debounce task with a configurable delay (for testing).
    ///
    /// Uses an `AtomicBool` dirty flag to avoid losing notifications that arrive
    /// between `save()` completing and `notified().await` re-registering.
    pub fn start_debounce_task_with_delay(self: &Arc<Self>, delay: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                store.save_notify.notified().await;
                tokio::time::sleep(delay).await;
                if store.is_dirty.swap(false, Ordering::AcqRel) {
                    if let Err(e) = store.save() {
                        tracing::warn!("Failed to save settings: {e}");
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Helper: create a store backed by a temp directory.
    fn temp_store() -> (SettingsStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("effects.json");
        let store = SettingsStore::new(path);
        (store, dir)
    }

    #[test]
    fn load_returns_default_when_file_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nonexistent.json");
        let result = SettingsStore::load(&path).unwrap();
        assert_eq!(result, SettingsFile::default());
    }

    #[test]
    fn load_parses_valid_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("effects.json");
        let json = r#"{"effect":"invert","session":{"jpegQuality":70}}"#;
        std::fs::write(&path, json).unwrap();

        let result = SettingsStore::load(&path).unwrap();
        assert_eq!(result.effect, Some(EffectKind::Invert));
        assert_eq!(result.session.jpeg_quality, 70);
    }

    #[test]
    fn load_returns_error_for_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("effects.json");
        std::fs::write(&path, "not valid json!!!").unwrap();

        assert!(SettingsStore::load(&path).is_err());
    }

    #[test]
    fn new_falls_back_to_defaults_for_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("effects.json");
        std::fs::write(&path, "{{{").unwrap();

        let store = SettingsStore::new(path);
        assert!(store.effect().is_none());
        assert_eq!(store.session(), SessionConfig::default());
    }

    #[test]
    fn save_round_trips_through_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("effects.json");
        let file = SettingsFile {
            effect: None,
            session: SessionConfig {
                buffer_capacity: 5,
                ..SessionConfig::default()
            },
        };
        std::fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();

        let store = SettingsStore::new(path.clone());
        assert_eq!(store.path(), path.as_path());
        store.set_effect(EffectKind::CannyEdge);
        store.save().unwrap();

        let loaded = SettingsStore::load(&path).unwrap();
        assert_eq!(loaded.effect, Some(EffectKind::CannyEdge));
        assert_eq!(loaded.session.buffer_capacity, 5);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deep").join("effects.json");
        let store = SettingsStore::new(path.clone());
        store.set_effect(EffectKind::Blur);
        store.save().unwrap();

        assert!(path.exists());
    }

    #[test]
    fn save_is_atomic() {
        let (store, dir) = temp_store();
        store.set_effect(EffectKind::Blur);
        store.save().unwrap();

        let tmp_path = dir.path().join("effects.json.tmp");
        assert!(
            !tmp_path.exists(),
            ".tmp file should be cleaned up after rename"
        );
    }

    #[test]
    fn new_loads_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("effects.json");
        let file = SettingsFile {
            effect: Some(EffectKind::Grayscale),
            session: SessionConfig::default(),
        };
        std::fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();

        let store = SettingsStore::new(path);
        assert_eq!(store.effect(), Some(EffectKind::Grayscale));
    }

    #[test]
    fn set_effect_overwrites_previous_choice() {
        let (store, _dir) = temp_store();
        store.set_effect(EffectKind::Blur);
        store.set_effect(EffectKind::Invert);
        assert_eq!(store.effect(), Some(EffectKind::Invert));
    }

    #[test]
    fn setting_same_effect_does_not_mark_dirty() {
        let (store, _dir) = temp_store();
        store.set_effect(EffectKind::Blur);
        store.is_dirty.store(false, Ordering::Release);
        store.set_effect(EffectKind::Blur);
        assert!(!store.is_dirty.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn debounce_task_persists_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("effects.json");
        let store = Arc::new(SettingsStore::new(path.clone()));
        let task = store.start_debounce_task_with_delay(Duration::from_millis(10));

        store.set_effect(EffectKind::Invert);

        let mut saved = None;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if path.exists() {
                saved = SettingsStore::load(&path).ok();
                if saved.as_ref().and_then(|s| s.effect).is_some() {
                    break;
                }
            }
        }
        task.abort();

        assert_eq!(saved.and_then(|s| s.effect), Some(EffectKind::Invert));
    }
}
