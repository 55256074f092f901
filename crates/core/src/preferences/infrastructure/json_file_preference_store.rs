use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::compositing::domain::mask_style::MaskStyle;
use crate::preferences::domain::preference_store::{PreferenceError, PreferenceStore};
use crate::preferences::domain::user_id::UserId;

use super::in_memory_preference_store::InMemoryPreferenceStore;

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    user: UserId,
    style: MaskStyle,
}

/// [`InMemoryPreferenceStore`] mirrored to a JSON file after every write.
///
/// A failed save is logged and the in-memory choice still takes effect.
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    inner: InMemoryPreferenceStore,
    // Serializes snapshot + write so the file never lags a newer choice.
    save_lock: Mutex<()>,
}

impl JsonFilePreferenceStore {
    /// Opens `path`, treating a missing file as an empty store.
    pub fn open(path: &Path) -> Result<Self, PreferenceError> {
        let entries: Vec<Entry> = match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| PreferenceError::Format {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(PreferenceError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        log::debug!("Loaded {} style preferences from {}", entries.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            inner: InMemoryPreferenceStore::from_entries(
                entries.into_iter().map(|e| (e.user, e.style)),
            ),
            save_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<(), PreferenceError> {
        let _guard = self.save_lock.lock().unwrap_or_else(|e| e.into_inner());
        let entries: Vec<Entry> = self
            .inner
            .entries()
            .into_iter()
            .map(|(user, style)| Entry { user, style })
            .collect();

        let write_err = |source| PreferenceError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(&entries).map_err(|source| {
            PreferenceError::Format {
                path: self.path.clone(),
                source,
            }
        })?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, json).map_err(write_err)?;
        fs::rename(&temp_path, &self.path).map_err(write_err)?;
        Ok(())
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn style_for(&self, user: UserId) -> Option<MaskStyle> {
        self.inner.style_for(user)
    }

    fn set_style(&self, user: UserId, style: MaskStyle) {
        self.inner.set_style(user, style);
        if let Err(e) = self.save() {
            log::warn!("Style for user {user} kept in memory only: {e}");
        }
    }
}
