// src/backup.rs
//! Pre-transform snapshots of files the normalizer is about to rewrite

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::events::Stage;

/// Retention area holding one snapshot per (file, stage) pair
///
/// A slot is never overwritten: if it already holds different content, the
/// snapshot goes to the next free numbered name instead.
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Base snapshot name, e.g. `wildcards_clean_wildcards_original.txt`
    pub fn slot_name(source: &Path, stage: Stage) -> String {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let ext = source
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "txt".to_string());

        format!("{}_{}_original.{}", stem, stage.name(), ext)
    }

    fn candidate(&self, source: &Path, stage: Stage, n: usize) -> PathBuf {
        let base = Self::slot_name(source, stage);
        if n == 0 {
            return self.dir.join(base);
        }

        match base.rsplit_once('.') {
            Some((name, ext)) => self.dir.join(format!("{}.{}.{}", name, n, ext)),
            None => self.dir.join(format!("{}.{}", base, n)),
        }
    }

    /// Copy `source` into the retention area before `stage` rewrites it.
    ///
    /// Returns `None` when `source` does not exist (nothing to lose), and the
    /// existing snapshot path when an identical snapshot is already stored.
    pub fn snapshot(&self, source: &Path, stage: Stage) -> Result<Option<PathBuf>> {
        if !source.exists() {
            return Ok(None);
        }

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create backup directory {:?}", self.dir))?;

        let content =
            fs::read(source).with_context(|| format!("Failed to read {:?} for backup", source))?;

        let mut n = 0;
        loop {
            let candidate = self.candidate(source, stage, n);

            if !candidate.exists() {
                fs::write(&candidate, &content)
                    .with_context(|| format!("Failed to write backup {:?}", candidate))?;
                debug!("Backed up {:?} to {:?}", source, candidate);
                return Ok(Some(candidate));
            }

            let existing = fs::read(&candidate)
                .with_context(|| format!("Failed to read existing backup {:?}", candidate))?;
            if existing == content {
                return Ok(Some(candidate));
            }

            n += 1;
        }
    }

    /// Copy a snapshot back over `target`
    pub fn restore(&self, snapshot: &Path, target: &Path) -> Result<()> {
        fs::copy(snapshot, target)
            .with_context(|| format!("Failed to restore {:?} from {:?}", target, snapshot))?;
        Ok(())
    }

    /// Every snapshot currently in the retention area, sorted by name
    pub fn snapshots(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {:?}", self.dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect::<Vec<_>>();
        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_slot_name_reflects_file_and_stage() {
        assert_eq!(
            BackupStore::slot_name(Path::new("out/wildcards.txt"), Stage::CleanWildcards),
            "wildcards_clean_wildcards_original.txt"
        );
        assert_eq!(
            BackupStore::slot_name(Path::new("domains"), Stage::FinalizeDomains),
            "domains_finalize_domains_original.txt"
        );
    }

    #[test]
    fn test_snapshot_roundtrip_is_byte_exact() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("domains.txt");
        let original = b"https://a.com\r\n  spaced  \n\xff\xfe raw bytes\n";
        fs::write(&source, original).unwrap();

        let store = BackupStore::new(temp.path().join("trash"));
        let snapshot = store.snapshot(&source, Stage::FinalizeDomains).unwrap().unwrap();

        fs::write(&source, "rewritten\n").unwrap();
        store.restore(&snapshot, &source).unwrap();

        assert_eq!(fs::read(&source).unwrap(), original.to_vec());
    }

    #[test]
    fn test_missing_source_has_no_snapshot() {
        let temp = TempDir::new().unwrap();
        let store = BackupStore::new(temp.path().join("trash"));

        let result = store
            .snapshot(&temp.path().join("absent.txt"), Stage::Classify)
            .unwrap();
        assert!(result.is_none());
        assert!(store.snapshots().unwrap().is_empty());
    }

    #[test]
    fn test_snapshots_are_never_overwritten() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("wildcards.txt");
        let store = BackupStore::new(temp.path().join("trash"));

        fs::write(&source, "first\n").unwrap();
        let first = store.snapshot(&source, Stage::CleanWildcards).unwrap().unwrap();

        // Same content: no new file
        let again = store.snapshot(&source, Stage::CleanWildcards).unwrap().unwrap();
        assert_eq!(first, again);

        fs::write(&source, "second\n").unwrap();
        let second = store.snapshot(&source, Stage::CleanWildcards).unwrap().unwrap();

        assert_ne!(first, second);
        assert_eq!(
            second.file_name().unwrap(),
            "wildcards_clean_wildcards_original.1.txt"
        );
        assert_eq!(fs::read_to_string(&first).unwrap(), "first\n");
        assert_eq!(fs::read_to_string(&second).unwrap(), "second\n");
        assert_eq!(store.snapshots().unwrap().len(), 2);
    }
}
