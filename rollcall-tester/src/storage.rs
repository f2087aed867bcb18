//! Filesystem implementations of the core loader/storage traits.

use log::{debug, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rollcall_game::{DataLoader, Roster, RosterError, StateStorage};

const KEY_OWNED: &str = "owned_ids";
const KEY_LAST_DRAW: &str = "last_draw_ids";

/// Roster fixture shipped with the tester, used when no `--data` path is
/// given.
pub const EMBEDDED_ROSTER_JSON: &str = include_str!("../assets/roster_ja.json");

#[derive(Debug, thiserror::Error)]
pub enum FsDataError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("roster error: {0}")]
    Roster(#[from] RosterError),
}

/// Loads the roster from a JSON file on disk.
pub struct FsDataLoader {
    path: PathBuf,
}

impl FsDataLoader {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataLoader for FsDataLoader {
    type Error = FsDataError;

    fn load_roster(&self) -> Result<Roster, Self::Error> {
        let json = fs::read_to_string(&self.path)?;
        debug!("loaded roster payload from {}", self.path.display());
        Ok(Roster::from_json(&json)?)
    }
}

/// Loads the embedded fixture roster.
#[derive(Clone, Copy, Default)]
pub struct EmbeddedDataLoader;

impl DataLoader for EmbeddedDataLoader {
    type Error = RosterError;

    fn load_roster(&self) -> Result<Roster, Self::Error> {
        Roster::from_json(EMBEDDED_ROSTER_JSON)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FileStorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One JSON file per persisted key, under a dedicated directory.
/// Undecodable payloads degrade to `None`, mirroring how the original
/// treated corrupt browser storage.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn save_ids(&self, key: &str, ids: &[String]) -> Result<(), FileStorageError> {
        let payload = serde_json::to_string(ids)?;
        fs::write(self.key_path(key), payload)?;
        Ok(())
    }

    fn load_ids(&self, key: &str) -> Result<Option<Vec<String>>, FileStorageError> {
        let path = self.key_path(key);
        let payload = match fs::read_to_string(&path) {
            Ok(payload) => payload,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_str(&payload) {
            Ok(ids) => Ok(Some(ids)),
            Err(err) => {
                warn!("corrupt payload in {}: {err}; falling back", path.display());
                Ok(None)
            }
        }
    }

    fn remove_key(&self, key: &str) -> Result<(), FileStorageError> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl StateStorage for FileStorage {
    type Error = FileStorageError;

    fn save_owned(&self, ids: &[String]) -> Result<(), Self::Error> {
        self.save_ids(KEY_OWNED, ids)
    }

    fn load_owned(&self) -> Result<Option<Vec<String>>, Self::Error> {
        self.load_ids(KEY_OWNED)
    }

    fn save_last_draw(&self, ids: &[String]) -> Result<(), Self::Error> {
        self.save_ids(KEY_LAST_DRAW, ids)
    }

    fn load_last_draw(&self) -> Result<Option<Vec<String>>, Self::Error> {
        self.load_ids(KEY_LAST_DRAW)
    }

    fn clear(&self) -> Result<(), Self::Error> {
        self.remove_key(KEY_OWNED)?;
        self.remove_key(KEY_LAST_DRAW)
    }
}
