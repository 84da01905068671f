// src/targets.rs
//! Newline-delimited target files: the append-only working file written by
//! the harvester and the category files rewritten by the normalizer.

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::error::Result;

/// Destination for raw targets produced by the harvester
#[async_trait]
pub trait TargetSink: Send + Sync {
    /// Append targets, returning how many lines were written
    async fn append(&mut self, targets: &[String]) -> Result<usize>;
}

/// The working file. Opened for append on every write and closed after it,
/// so everything written before an interruption stays on disk.
pub struct TargetFile {
    path: PathBuf,
}

impl TargetFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TargetSink for TargetFile {
    async fn append(&mut self, targets: &[String]) -> Result<usize> {
        let lines = sanitize(targets);
        if lines.is_empty() {
            return Ok(0);
        }

        let mut file = tokio::fs::OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut buf = String::new();
        // A previous write may have been cut off before its newline
        if file.metadata().await?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1)).await?;
            file.read_exact(&mut last).await?;
            if last[0] != b'\n' {
                buf.push('\n');
            }
        }

        for line in &lines {
            buf.push_str(line);
            buf.push('\n');
        }

        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;

        Ok(lines.len())
    }
}

/// In-memory target sink. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryTargets {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl TargetSink for MemoryTargets {
    async fn append(&mut self, targets: &[String]) -> Result<usize> {
        let lines = sanitize(targets);
        let count = lines.len();
        let mut guard = match self.lines.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.extend(lines.into_iter().map(str::to_string));
        Ok(count)
    }
}

/// One target per line: trim, drop blanks, and never let an embedded line
/// break split a target in two
fn sanitize(targets: &[String]) -> Vec<&str> {
    targets
        .iter()
        .flat_map(|t| t.lines())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Decode file bytes as UTF-8, falling back to ISO-8859-1
pub fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            let bytes = err.into_bytes();
            tracing::warn!("Input is not valid UTF-8, decoding as ISO-8859-1");
            bytes.into_iter().map(char::from).collect()
        }
    }
}

/// Read a target file as trimmed, non-empty lines
pub fn read_lines(path: &Path) -> anyhow::Result<Vec<String>> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;

    Ok(decode_text(bytes)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Replace a target file's content with `lines`, one per line, each
/// terminated by a newline. Written to a temporary file and renamed.
pub fn write_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> anyhow::Result<()> {
    let mut content = String::new();
    for line in lines {
        content.push_str(line.as_ref());
        content.push('\n');
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write temporary file {:?}", temp_path))?;
    fs::rename(&temp_path, path).with_context(|| format!("Failed to replace {:?}", path))?;
    Ok(())
}

/// Append `lines` to a target file, creating it if missing
pub fn append_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> anyhow::Result<()> {
    if lines.is_empty() {
        return Ok(());
    }

    let mut file = fs::OpenOptions::new()
        .read(true)
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {:?} for append", path))?;

    if file.metadata()?.len() > 0 {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        if last[0] != b'\n' {
            writeln!(file)?;
        }
    }

    for line in lines {
        writeln!(file, "{}", line.as_ref())?;
    }
    file.flush()?;
    Ok(())
}
