//! Saving and loading world states by slot name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::state::WorldState;

/// Somewhere world states can be kept between sessions.
pub trait StateStore {
    /// Store `state` under `slot`, replacing what was there.
    fn save(&mut self, slot: &str, state: &WorldState) -> EngineResult<()>;

    /// The state saved under `slot`.
    fn load(&self, slot: &str) -> EngineResult<WorldState>;

    /// Every slot in use, sorted.
    fn list(&self) -> EngineResult<Vec<String>>;
}

/// Keeps serialized states in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: BTreeMap<String, String>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn save(&mut self, slot: &str, state: &WorldState) -> EngineResult<()> {
        self.slots.insert(slot.to_string(), state.to_json()?);
        Ok(())
    }

    fn load(&self, slot: &str) -> EngineResult<WorldState> {
        let json = self
            .slots
            .get(slot)
            .ok_or_else(|| EngineError::MissingSlot(slot.to_string()))?;
        WorldState::from_json(json)
    }

    fn list(&self) -> EngineResult<Vec<String>> {
        Ok(self.slots.keys().cloned().collect())
    }
}

/// Keeps each slot as `{slot}.json` in a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// A store writing into `dir`, which is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding the saves.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{slot}.json"))
    }
}

impl StateStore for JsonFileStore {
    fn save(&mut self, slot: &str, state: &WorldState) -> EngineResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|source| EngineError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path(slot);
        std::fs::write(&path, state.to_json()?).map_err(|source| EngineError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "state saved");
        Ok(())
    }

    fn load(&self, slot: &str) -> EngineResult<WorldState> {
        let path = self.path(slot);
        if !path.exists() {
            return Err(EngineError::MissingSlot(slot.to_string()));
        }
        let json = std::fs::read_to_string(&path).map_err(|source| EngineError::Io {
            path: path.clone(),
            source,
        })?;
        WorldState::from_json(&json)
    }

    fn list(&self) -> EngineResult<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.dir).map_err(|source| EngineError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let mut slots: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        slots.sort();
        Ok(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::scenario::tests::hamlet;

    fn state() -> WorldState {
        WorldState::new(&hamlet(), &EngineConfig::default()).unwrap()
    }

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemoryStore::new();
        let state = state();
        store.save("one", &state).unwrap();
        assert_eq!(store.load("one").unwrap(), state);
        assert_eq!(store.list().unwrap(), vec!["one".to_string()]);
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("saves"));
        assert!(store.list().unwrap().is_empty());

        let state = state();
        store.save("b", &state).unwrap();
        store.save("a", &state).unwrap();
        assert_eq!(store.list().unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.load("a").unwrap(), state);
    }

    #[test]
    fn missing_slots_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(matches!(
            store.load("nope"),
            Err(EngineError::MissingSlot(slot)) if slot == "nope"
        ));
        assert!(matches!(
            MemoryStore::new().load("nope"),
            Err(EngineError::MissingSlot(_))
        ));
    }
}
