//! File-backed implementation of the [`DefaultStore`] contract.
//!
//! The two preferred-target slots are kept in one small JSON file. Writes
//! replace the whole file through a rename, so a slot is either absent or
//! fully valid -- a crash mid-write never leaves a partial record behind.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::services::DefaultStore;
use crate::types::{DefaultSelection, SessionKind};

/// On-disk shape of the defaults file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DefaultsFile {
    /// Preferred target for exclusive sessions.
    exclusive: Option<DefaultSelection>,
    /// Preferred target for shared sessions.
    shared: Option<DefaultSelection>,
}

/// A [`DefaultStore`] backed by a JSON file.
///
/// The file is read once at construction and cached; every write goes
/// through the cache to disk synchronously. Store failures are logged
/// and swallowed -- a broken defaults file costs the user a preference,
/// never a connection.
pub struct JsonDefaultStore {
    path: PathBuf,
    cache: Mutex<DefaultsFile>,
}

impl JsonDefaultStore {
    /// Open (or create) the defaults file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cache = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| Error::Store(format!("corrupt defaults file: {e}")))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => DefaultsFile::default(),
            Err(e) => return Err(Error::Io(e)),
        };
        Ok(JsonDefaultStore {
            path,
            cache: Mutex::new(cache),
        })
    }

    /// Persist the cached contents, all-or-nothing.
    fn persist(path: &Path, contents: &DefaultsFile) -> Result<()> {
        let text = serde_json::to_string_pretty(contents)
            .map_err(|e| Error::Store(format!("encode defaults: {e}")))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl DefaultStore for JsonDefaultStore {
    fn read(&self, kind: SessionKind) -> Option<DefaultSelection> {
        let cache = self.cache.lock().expect("defaults cache poisoned");
        match kind {
            SessionKind::Exclusive => cache.exclusive.clone(),
            SessionKind::Shared => cache.shared.clone(),
        }
    }

    fn write(&self, kind: SessionKind, value: Option<DefaultSelection>) {
        let mut cache = self.cache.lock().expect("defaults cache poisoned");
        match kind {
            SessionKind::Exclusive => cache.exclusive = value,
            SessionKind::Shared => cache.shared = value,
        }
        if let Err(e) = Self::persist(&self.path, &cache) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to persist default selection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RadioSource;

    fn selection(serial: &str) -> DefaultSelection {
        DefaultSelection {
            serial: serial.to_string(),
            source: RadioSource::Local,
            station: None,
        }
    }

    #[test]
    fn read_missing_file_yields_empty_slots() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDefaultStore::open(dir.path().join("defaults.json")).unwrap();
        assert_eq!(store.read(SessionKind::Exclusive), None);
        assert_eq!(store.read(SessionKind::Shared), None);
    }

    #[test]
    fn write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defaults.json");

        let store = JsonDefaultStore::open(&path).unwrap();
        store.write(SessionKind::Exclusive, Some(selection("1234")));
        store.write(
            SessionKind::Shared,
            Some(DefaultSelection {
                serial: "5678".to_string(),
                source: RadioSource::Smartlink,
                station: Some("Shack".to_string()),
            }),
        );

        // Re-open to prove the values survived the process boundary.
        let reopened = JsonDefaultStore::open(&path).unwrap();
        assert_eq!(reopened.read(SessionKind::Exclusive), Some(selection("1234")));
        assert_eq!(
            reopened.read(SessionKind::Shared).unwrap().station,
            Some("Shack".to_string())
        );
    }

    #[test]
    fn clearing_a_slot_leaves_the_other_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defaults.json");

        let store = JsonDefaultStore::open(&path).unwrap();
        store.write(SessionKind::Exclusive, Some(selection("1234")));
        store.write(SessionKind::Shared, Some(selection("5678")));
        store.write(SessionKind::Exclusive, None);

        let reopened = JsonDefaultStore::open(&path).unwrap();
        assert_eq!(reopened.read(SessionKind::Exclusive), None);
        assert_eq!(reopened.read(SessionKind::Shared), Some(selection("5678")));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defaults.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonDefaultStore::open(&path),
            Err(Error::Store(_))
        ));
    }
}
