//! File-backed model resources.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, trace};
use serde::de::DeserializeOwned;

use lockstep::{SyncError, resource::Resource};

/// A [`Resource`] stored in a file.
///
/// The file is only opened while a save is in progress, and each save
/// replaces its whole contents.
#[derive(Debug, Clone)]
pub struct FileResource {
    name: String,
    path: PathBuf,
}

impl FileResource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Resource for FileResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn save(&mut self, contents: &str) -> io::Result<()> {
        fs::write(&self.path, contents)?;
        trace!(resource = self.name.as_str(), path = self.path.display().to_string(); "Resource written");
        Ok(())
    }
}

/// Reads a previously saved model from `path`, or builds a fresh one when
/// the file does not exist yet.
///
/// # Errors
///
/// Returns `SyncError` when the file exists but cannot be read or parsed.
pub fn load_or_else<T, F>(path: &Path, fresh: F) -> Result<T, SyncError>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    if !path.exists() {
        debug!(path = path.display().to_string(); "No saved state, starting fresh");
        return Ok(fresh());
    }

    let content = fs::read_to_string(path)?;
    let value = toml::from_str(&content)?;
    debug!(path = path.display().to_string(); "Loaded saved state");
    Ok(value)
}
