//! Persistence of the selected background shader.
//!
//! The preference is a single integer stored under [`PREFERENCE_KEY`]. It is
//! read once when a scene mounts and written once per selection; anything
//! missing or malformed falls back to the default shader.
use std::cell::Cell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::registry::ShaderId;

pub const PREFERENCE_KEY: &str = "selectedShader";

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("failed to access preference file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse preference file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to encode preferences: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub trait PreferenceStore {
    /// Raw stored id, unvalidated. `Ok(None)` when nothing was saved yet.
    fn read(&self) -> Result<Option<i64>, PreferenceError>;

    fn write(&mut self, id: ShaderId) -> Result<(), PreferenceError>;
}

/// TOML file store; keeps unrelated keys written by other tools.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_table(&self) -> Result<toml::Table, PreferenceError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(toml::Table::new()),
            Err(source) => {
                return Err(PreferenceError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        contents
            .parse::<toml::Table>()
            .map_err(|source| PreferenceError::Parse {
                path: self.path.clone(),
                source,
            })
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn read(&self) -> Result<Option<i64>, PreferenceError> {
        let table = self.load_table()?;
        Ok(table.get(PREFERENCE_KEY).and_then(|value| value.as_integer()))
    }

    fn write(&mut self, id: ShaderId) -> Result<(), PreferenceError> {
        // A corrupt file is replaced rather than blocking the selection.
        let mut table = match self.load_table() {
            Ok(table) => table,
            Err(PreferenceError::Parse { .. }) => toml::Table::new(),
            Err(err) => return Err(err),
        };
        table.insert(
            PREFERENCE_KEY.to_string(),
            toml::Value::Integer(i64::from(id.raw())),
        );
        let encoded = toml::to_string(&table)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| PreferenceError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        fs::write(&self.path, encoded).map_err(|source| PreferenceError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(shader = %id, path = %self.path.display(), "stored shader preference");
        Ok(())
    }
}

/// In-memory store that counts writes.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    value: Option<i64>,
    reads: Cell<usize>,
    writes: usize,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(value: i64) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn raw(&self) -> Option<i64> {
        self.value
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn read(&self) -> Result<Option<i64>, PreferenceError> {
        self.reads.set(self.reads.get() + 1);
        Ok(self.value)
    }

    fn write(&mut self, id: ShaderId) -> Result<(), PreferenceError> {
        self.value = Some(i64::from(id.raw()));
        self.writes += 1;
        Ok(())
    }
}

/// Reads the stored shader, failing safe to `fallback`.
pub fn load_selected_shader(store: &dyn PreferenceStore, fallback: ShaderId) -> ShaderId {
    match store.read() {
        Ok(Some(raw)) => match ShaderId::from_raw(raw) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(%err, fallback = %fallback, "ignoring stored shader preference");
                fallback
            }
        },
        Ok(None) => fallback,
        Err(err) => {
            tracing::warn!(%err, fallback = %fallback, "failed to read shader preference");
            fallback
        }
    }
}
