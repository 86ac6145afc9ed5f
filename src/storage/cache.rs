//! URL to downloaded-file cache.
//!
//! The cache never downloads anything itself: callers store a file they have
//! already produced, and every lookup re-checks that the file is still on disk.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::core::error::AppResult;
use crate::storage::models::{CacheEntry, MediaKind};
use crate::storage::store::RecordStore;

/// Returns the entry for `url` if its file still exists.
pub fn lookup<'a>(store: &'a RecordStore, url: &str) -> Option<&'a CacheEntry> {
    let entry = store.cache.get().get(url)?;
    if entry.file.exists() {
        Some(entry)
    } else {
        log::debug!(
            "Cache entry for {} points to missing file {}, ignoring",
            url,
            entry.file.display()
        );
        None
    }
}

/// Like [`lookup`], but only returns entries usable for `wanted`.
pub fn lookup_for<'a>(store: &'a RecordStore, url: &str, wanted: MediaKind) -> Option<&'a CacheEntry> {
    lookup(store, url).filter(|entry| entry.kind.satisfies(wanted))
}

/// Records `file` as the artifact for `url`, replacing any previous entry.
///
/// A replaced entry's file is deleted unless it is the same path.
pub fn store(
    store: &mut RecordStore,
    url: &str,
    file: &Path,
    kind: MediaKind,
    title: Option<String>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let entry = CacheEntry {
        file: PathBuf::from(file),
        kind,
        title,
        time: now,
    };
    let previous = store.cache.update(|cache| cache.insert(url.to_string(), entry))?;
    if let Some(previous) = previous.filter(|previous| previous.file != file && previous.file.exists()) {
        if let Err(e) = fs_err::remove_file(&previous.file) {
            log::warn!("Failed to remove replaced artifact {}: {}", previous.file.display(), e);
        }
    }
    log::info!("Cached {} as {} -> {}", url, kind, file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_lookup_hits_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut records = RecordStore::open(&dir.path().join("data")).unwrap();
        let file = dir.path().join("song.mp3");
        fs_err::write(&file, b"id3").unwrap();

        store(&mut records, "https://youtu.be/a", &file, MediaKind::Audio, Some("Song".into()), now()).unwrap();

        let entry = lookup(&records, "https://youtu.be/a").unwrap();
        assert_eq!(entry.file, file);
        assert_eq!(entry.title.as_deref(), Some("Song"));
        assert!(lookup_for(&records, "https://youtu.be/a", MediaKind::Audio).is_some());
        assert!(lookup_for(&records, "https://youtu.be/a", MediaKind::Video).is_none());
    }

    #[test]
    fn test_lookup_ignores_deleted_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut records = RecordStore::open(&dir.path().join("data")).unwrap();
        let file = dir.path().join("clip.mp4");
        fs_err::write(&file, b"mp4").unwrap();
        store(&mut records, "https://youtu.be/b", &file, MediaKind::Video, None, now()).unwrap();

        fs_err::remove_file(&file).unwrap();

        assert!(lookup(&records, "https://youtu.be/b").is_none());
    }

    #[test]
    fn test_store_overwrites_previous_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut records = RecordStore::open(&dir.path().join("data")).unwrap();
        let first = dir.path().join("a.mp3");
        let second = dir.path().join("b.mp4");
        fs_err::write(&first, b"a").unwrap();
        fs_err::write(&second, b"b").unwrap();

        store(&mut records, "u", &first, MediaKind::Audio, None, now()).unwrap();
        store(&mut records, "u", &second, MediaKind::Video, None, now()).unwrap();

        assert_eq!(records.cache.get().len(), 1);
        assert_eq!(lookup(&records, "u").unwrap().kind, MediaKind::Video);
        assert!(!first.exists());
        assert!(second.exists());
    }

    #[test]
    fn test_store_same_file_again_keeps_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut records = RecordStore::open(&dir.path().join("data")).unwrap();
        let file = dir.path().join("a.mp3");
        fs_err::write(&file, b"a").unwrap();

        store(&mut records, "u", &file, MediaKind::Audio, None, now()).unwrap();
        store(&mut records, "u", &file, MediaKind::Audio, Some("A".into()), now()).unwrap();

        assert!(file.exists());
        assert_eq!(lookup(&records, "u").unwrap().title.as_deref(), Some("A"));
    }
}
