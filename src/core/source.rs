use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::core::recording::Recording;
use crate::error::{Result, TimelineError};

/// Where recording snapshots come from.
///
/// The hosted entity API is one implementation; `SnapshotDir` reads saved
/// API responses from disk.
#[cfg_attr(test, mockall::automock)]
pub trait RecordingSource: Send + Sync {
    fn fetch(&self, id: &str) -> Result<Option<Recording>>;

    fn list(&self) -> Result<Vec<Recording>>;
}

/// A directory of `<id>.json` files, one recording per file.
pub struct SnapshotDir {
    root: PathBuf,
}

impl SnapshotDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scan_snapshot_files(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(TimelineError::MissingDirectory(self.root.clone()));
        }

        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        Ok(files)
    }
}

/// Reads one snapshot file. A missing `id` is taken from the file stem.
pub fn load_snapshot(path: &Path) -> Result<Recording> {
    let content = fs::read_to_string(path).map_err(|source| TimelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut recording = Recording::from_json(&content).map_err(|source| TimelineError::Snapshot {
        path: path.to_path_buf(),
        source,
    })?;

    if recording.id.is_none() {
        recording.id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string);
    }

    Ok(recording)
}

impl RecordingSource for SnapshotDir {
    fn fetch(&self, id: &str) -> Result<Option<Recording>> {
        let path = self.root.join(format!("{}.json", id));
        if !path.exists() {
            debug!("No snapshot for recording {}", id);
            return Ok(None);
        }
        load_snapshot(&path).map(Some)
    }

    fn list(&self) -> Result<Vec<Recording>> {
        let mut recordings = Vec::new();

        for path in self.scan_snapshot_files()? {
            match load_snapshot(&path) {
                Ok(recording) => recordings.push(recording),
                Err(e) => warn!("Skipping snapshot: {}", e),
            }
        }

        Ok(recordings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::recording::RecordingStatus;
    use tempfile::tempdir;

    #[test]
    fn test_list_reads_json_files_and_skips_broken_ones() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("rec-b.json"), r#"{ "status": "analyzed" }"#).unwrap();
        fs::write(
            dir.path().join("rec-a.json"),
            r#"{ "id": "custom", "status": "processing" }"#,
        )
        .unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = SnapshotDir::new(dir.path().to_path_buf());
        let recordings = source.list().unwrap();

        assert_eq!(recordings.len(), 2);
        assert_eq!(recordings[0].id.as_deref(), Some("custom"));
        assert_eq!(recordings[1].id.as_deref(), Some("rec-b"));
        assert_eq!(recordings[1].status, RecordingStatus::Analyzed);
    }

    #[test]
    fn test_fetch() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("rec-1.json"), r#"{ "status": "failed" }"#).unwrap();

        let source = SnapshotDir::new(dir.path().to_path_buf());
        let found = source.fetch("rec-1").unwrap().unwrap();
        assert_eq!(found.status, RecordingStatus::Failed);
        assert!(source.fetch("rec-2").unwrap().is_none());
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempdir().unwrap();
        let source = SnapshotDir::new(dir.path().join("absent"));
        assert!(matches!(
            source.list(),
            Err(TimelineError::MissingDirectory(_))
        ));
    }

    #[test]
    fn test_load_snapshot_reports_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            load_snapshot(&path),
            Err(TimelineError::Snapshot { .. })
        ));
    }
}
