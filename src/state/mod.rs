//! File-backed state: one JSON document per fact under the state directory.
//!
//! Each document has a single writer (the scheduled job that owns it). Writes
//! go to a sibling temp file and are renamed into place.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::warn;

pub mod model;
pub mod repo;

pub use model::{BroadcastDoc, CachedResult, CursorDoc, RateLimitDoc, SubscribersDoc};
pub use repo::*;

pub const CURSOR_FILE: &str = "last_update_id.json";
pub const RATE_LIMIT_FILE: &str = "rate_limits.json";
pub const CACHE_FILE: &str = "today_video.json";
pub const SUBSCRIBERS_FILE: &str = "subscribers.json";
pub const BROADCAST_FILE: &str = "last_broadcast.json";

fn read_raw(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}

/// Read a disposable document. Missing and unparsable documents both read as `None`.
pub fn read_doc<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let Some(content) = read_raw(path)? else {
        return Ok(None);
    };
    match serde_json::from_str(&content) {
        Ok(doc) => Ok(Some(doc)),
        Err(err) => {
            warn!(?err, path = %path.display(), "ignoring unreadable state document");
            Ok(None)
        }
    }
}

/// Read a document that must not be lost. Only a missing document reads as
/// `None`; unparsable content is an error and is left on disk untouched.
pub fn read_doc_strict<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let Some(content) = read_raw(path)? else {
        return Ok(None);
    };
    serde_json::from_str(&content)
        .map(Some)
        .with_context(|| format!("corrupt state document {}", path.display()))
}

/// Replace a document atomically.
pub fn write_doc<T: Serialize>(path: &Path, doc: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let body = serde_json::to_string_pretty(doc).context("failed to encode state document")?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("state.json");
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));
    fs::write(&tmp, body).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_and_corrupt_read_as_none() {
        let td = tempdir().unwrap();
        let p = td.path().join("doc.json");
        assert_eq!(read_doc::<CursorDoc>(&p).unwrap(), None);

        fs::write(&p, "invalid json").unwrap();
        assert_eq!(read_doc::<CursorDoc>(&p).unwrap(), None);
    }

    #[test]
    fn strict_read_rejects_corrupt_documents() {
        let td = tempdir().unwrap();
        let p = td.path().join("doc.json");
        assert_eq!(read_doc_strict::<CursorDoc>(&p).unwrap(), None);

        fs::write(&p, "{\"lastProcessedUpdateId\": ").unwrap();
        let err = read_doc_strict::<CursorDoc>(&p).unwrap_err();
        assert!(format!("{err:#}").contains("corrupt state document"));
        assert_eq!(fs::read_to_string(&p).unwrap(), "{\"lastProcessedUpdateId\": ");
    }

    #[test]
    fn write_replaces_and_leaves_no_temp_files() {
        let td = tempdir().unwrap();
        let p = td.path().join("nested").join("doc.json");
        write_doc(&p, &CursorDoc { last_processed_update_id: 7 }).unwrap();
        write_doc(&p, &CursorDoc { last_processed_update_id: 9 }).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&p).unwrap()).unwrap();
        assert_eq!(raw["lastProcessedUpdateId"], 9);

        let entries = fs::read_dir(p.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }
}
