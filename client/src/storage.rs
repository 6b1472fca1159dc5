//! Durable blob storage backed by one JSON file per key.
//!
//! Each collection blob lands in `<dir>/<key>.json`. Writes go through a
//! temp file and rename so a crash mid-write never leaves a half-written
//! blob behind.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use baler_engine::{BlobStore, Error};

/// File-per-key [`BlobStore`] rooted at a data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|err| Error::Storage(format!("create {}: {err}", dir.display())))?;
        Ok(Self { dir })
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl BlobStore for FileStore {
    fn get(&self, key: &str) -> baler_engine::Result<Option<String>> {
        match fs::read_to_string(self.blob_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Storage(format!("read {key}: {err}"))),
        }
    }

    fn put(&self, key: &str, value: &str) -> baler_engine::Result<()> {
        // Atomic write
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value).map_err(|err| Error::Storage(format!("write {key}: {err}")))?;
        fs::rename(&tmp, self.blob_path(key))
            .map_err(|err| Error::Storage(format!("rename {key}: {err}")))?;
        Ok(())
    }
}
