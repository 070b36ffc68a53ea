use std::io::Write;
use std::{fs, io, path};

use bgstate_core::{Listener, State, Value};
use bgstate_serde::{json_to_value, value_to_json};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Result, SnapshotError};

/// Persists the shared state as one JSON document.
///
/// # Example
///
/// ```rust,ignore
/// let store = SnapshotStore::new(data_dir.join("state.json"));
/// let handle = owner.initialize(store.load()?)?;
/// handle.add_listener(&store.listener())?;
/// ```
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: path::PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<path::PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &path::Path {
        &self.path
    }

    /// Read the persisted state. A missing file is an empty state.
    pub fn load(&self) -> Result<State> {
        debug!(path = %self.path.display(), "loading snapshot");

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(State::new()),
            Err(error) => return Err(self.io_error(error)),
        };

        let json: serde_json::Value = serde_json::from_str(&contents)?;
        match json_to_value(json) {
            Value::Map(state) => Ok(state),
            _ => Err(SnapshotError::NotAnObject {
                path: self.path.clone(),
            }),
        }
    }

    /// Write `state` as pretty JSON.
    ///
    /// The document is written to a temporary file next to the target and
    /// renamed over it, so readers never observe a partial write.
    pub fn save(&self, state: &State) -> Result<()> {
        debug!(path = %self.path.display(), keys = state.len(), "saving snapshot");

        let json = value_to_json(Value::Map(state.clone()));
        let contents = serde_json::to_string_pretty(&json)?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => path::Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        file.write_all(contents.as_bytes())
            .map_err(|e| self.io_error(e))?;
        file.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        Ok(())
    }

    /// A listener that saves every state it is called with.
    pub fn listener(&self) -> Listener {
        let store = self.clone();
        Listener::new(move |state| {
            if let Err(error) = store.save(&state) {
                warn!(path = %store.path.display(), %error, "failed to persist snapshot");
            }
        })
    }

    fn io_error(&self, error: io::Error) -> SnapshotError {
        SnapshotError::Io {
            path: self.path.clone(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bgstate_core::state;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("state.json"));
        assert_eq!(store.load().unwrap(), State::new());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("state.json"));

        let saved = state! {
            "apples" => 3,
            "theme" => "dark",
            "tabs" => vec![1, 2],
            "ratio" => 0.5,
        };
        store.save(&saved).unwrap();
        assert_eq!(store.load().unwrap(), saved);

        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\n  \"apples\": 3"));
    }

    #[test]
    fn save_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("state.json"));

        store.save(&state! { "a" => 1, "b" => 2 }).unwrap();
        store.save(&state! { "a" => 5 }).unwrap();
        assert_eq!(store.load().unwrap(), state! { "a" => 5 });

        // only the target file remains
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn non_object_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let err = SnapshotStore::new(&path).load().unwrap_err();
        assert!(matches!(err, SnapshotError::NotAnObject { .. }));
    }

    #[test]
    fn invalid_json_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let err = SnapshotStore::new(&path).load().unwrap_err();
        assert!(matches!(err, SnapshotError::Json(_)));
    }

    #[test]
    fn listener_saves_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("state.json"));

        store.listener().call(state! { "tab" => 7 });
        assert_eq!(store.load().unwrap(), state! { "tab" => 7 });
    }

    #[test]
    fn listener_survives_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("missing").join("state.json"));

        // logs and carries on
        store.listener().call(state! { "tab" => 7 });
        assert!(!store.path().exists());
    }
}
