//! Flat JSON record files, one per domain.
//!
//! Loading never fails: a missing file is created with the default value and a
//! malformed file is reported and replaced in memory by the default. Saving
//! writes a sibling `.tmp` file and renames it over the target.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use strum::{EnumIter, IntoStaticStr};

use crate::core::error::AppResult;

/// Record domains and their backing file names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
pub enum Domain {
    #[strum(serialize = "admins.json")]
    Admins,
    #[strum(serialize = "banned_users.json")]
    Bans,
    #[strum(serialize = "warns.json")]
    Warnings,
    #[strum(serialize = "history.json")]
    History,
    #[strum(serialize = "cache.json")]
    Cache,
    #[strum(serialize = "stats.json")]
    Stats,
    #[strum(serialize = "users.json")]
    Users,
}

impl Domain {
    /// File name of the record inside the data directory
    pub fn file_name(self) -> &'static str {
        self.into()
    }

    pub fn path_in(self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

/// Loads a record, falling back to `T::default()`.
///
/// A missing file is created with the pretty-printed default. A file that
/// cannot be read or parsed is left untouched and the default is returned.
pub fn load_record<T>(path: &Path) -> T
where
    T: Serialize + DeserializeOwned + Default,
{
    if !path.exists() {
        let default = T::default();
        if let Err(e) = save_record(path, &default) {
            log::warn!("Failed to create record file {}: {}", path.display(), e);
        }
        return default;
    }

    let raw = match fs_err::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            log::warn!("Failed to read record file, using empty default: {}", e);
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            log::warn!(
                "Record file {} is malformed ({}), using empty default",
                path.display(),
                e
            );
            T::default()
        }
    }
}

/// Writes a record as pretty JSON, replacing the previous file atomically.
pub fn save_record<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)?;

    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(".tmp");
    let temp_path = PathBuf::from(temp_path);

    fs_err::write(&temp_path, json)?;
    if let Err(e) = fs_err::rename(&temp_path, path) {
        let _ = fs_err::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

/// In-memory mirror of one record file.
///
/// Every mutation goes through [`Table::update`], which rewrites the file
/// before returning; there is no write-behind.
#[derive(Debug)]
pub struct Table<T> {
    path: PathBuf,
    data: T,
}

impl<T> Table<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Opens the table for `domain` inside `dir`
    pub fn open(dir: &Path, domain: Domain) -> Self {
        let path = domain.path_in(dir);
        let data = load_record(&path);
        Self { path, data }
    }

    /// Read-only view of the mirrored value
    pub fn get(&self) -> &T {
        &self.data
    }

    /// Applies `f` to the in-memory value and rewrites the file.
    ///
    /// The in-memory value keeps the mutation even if the write fails; the
    /// error is returned so the caller can report it.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> AppResult<R> {
        let out = f(&mut self.data);
        self.save()?;
        Ok(out)
    }

    /// Rewrites the backing file with the current value
    pub fn save(&self) -> AppResult<()> {
        save_record(&self.path, &self.data)
    }
}
