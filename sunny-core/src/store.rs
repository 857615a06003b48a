use serde_json::{Map, Value};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::{error::StoreError, model::Place};

const PLACE_KEY: &str = "place";

/// Remembers the last place the user picked.
///
/// Backed by a small JSON key-value file; the place lives under the `"place"`
/// key. Writes go to a sibling temp file that is flushed to disk and then
/// renamed over the original.
#[derive(Debug, Clone)]
pub struct PlaceStore {
    path: PathBuf,
}

impl PlaceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, place: &Place) -> Result<(), StoreError> {
        let mut entries = self.read_entries()?;
        let value = serde_json::to_value(place).map_err(|source| self.corrupt(source))?;
        entries.insert(PLACE_KEY.to_string(), value);

        self.write_entries(&entries)?;
        tracing::info!(place = %place.name, "saved selected place");
        Ok(())
    }

    pub fn load(&self) -> Result<Place, StoreError> {
        let mut entries = self.read_entries()?;
        let value = entries.remove(PLACE_KEY).ok_or(StoreError::NotFound)?;

        serde_json::from_value(value).map_err(|source| self.corrupt(source))
    }

    pub fn exists(&self) -> bool {
        self.read_entries()
            .is_ok_and(|entries| entries.contains_key(PLACE_KEY))
    }

    fn read_entries(&self) -> Result<Map<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let contents = fs::read_to_string(&self.path).map_err(|source| self.io(source))?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&contents).map_err(|source| self.corrupt(source))
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }

        let contents =
            serde_json::to_string_pretty(entries).map_err(|source| self.corrupt(source))?;

        let tmp = self.path.with_extension("json.tmp");
        write_synced(&tmp, contents.as_bytes()).map_err(|source| io_error(&tmp, source))?;
        fs::rename(&tmp, &self.path).map_err(|source| self.io(source))?;

        Ok(())
    }

    fn io(&self, source: io::Error) -> StoreError {
        io_error(&self.path, source)
    }

    fn corrupt(&self, source: serde_json::Error) -> StoreError {
        StoreError::Corrupt {
            path: self.path.clone(),
            source,
        }
    }
}

/// Writes `contents` and flushes them to disk before returning.
fn write_synced(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

fn io_error(path: &Path, source: io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}
