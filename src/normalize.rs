// src/normalize.rs
//! Normalization of the raw harvest into category files and a final domain list
//!
//! Four stages, each independently re-runnable:
//!
//! 1. classify: split the working file into wildcards, invalid entries and
//!    valid URLs (valid URLs seed the domain file)
//! 2. clean wildcards: strip wildcard prefixes; a stem still ending in `*`
//!    is promoted to the domain file
//! 3. clean invalid: bare hosts (a dot, no whitespace) are promoted as `https://host`
//! 4. finalize domains: add a missing scheme, then de-duplicate
//!
//! Every file a stage writes is snapshotted into the [`BackupStore`] first.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

use crate::backup::BackupStore;
use crate::classify::partition;
use crate::config::PipelineConfig;
use crate::events::{EventSink, PipelineEvent, Stage};
use crate::targets::{append_lines, read_lines, write_lines};

lazy_static! {
    /// Scheme prefix removed from wildcard entries
    static ref WILDCARD_SCHEME: Regex = Regex::new(r"^[a-zA-Z]+://").expect("scheme pattern is valid");

    /// Any URI scheme, used to decide whether a domain entry already has one
    static ref ANY_SCHEME: Regex =
        Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://").expect("scheme pattern is valid");
}

/// What the wildcard cleanup does with one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardOutcome {
    /// Stays in the wildcards file, cleaned
    Keep(String),
    /// Trailing-`*` stem moved to the domain set
    Promote(String),
    /// Nothing usable left
    Drop,
}

/// Clean one wildcard entry
pub fn clean_wildcard(entry: &str) -> WildcardOutcome {
    let line = entry
        .trim()
        .trim_start_matches('*')
        .trim_start_matches('.')
        .trim_start_matches('-')
        .trim();

    if let Some(stem) = line.strip_suffix('*') {
        let stem = stem.trim();
        return if stem.is_empty() {
            WildcardOutcome::Drop
        } else {
            WildcardOutcome::Promote(stem.to_string())
        };
    }

    let line = WILDCARD_SCHEME.replace(line, "");
    match line.chars().next() {
        Some(c) if c.is_alphanumeric() => WildcardOutcome::Keep(line.into_owned()),
        _ => WildcardOutcome::Drop,
    }
}

/// Promote an invalid entry that looks like a bare host to `https://host`
pub fn promote_invalid(entry: &str) -> Option<String> {
    let line = entry.trim();
    if line.contains('.') && !line.contains(char::is_whitespace) {
        Some(format!("https://{}", line))
    } else {
        None
    }
}

/// Prefix `https://` unless the entry already carries a scheme
pub fn ensure_scheme(entry: &str) -> String {
    let line = entry.trim();
    if ANY_SCHEME.is_match(line) {
        line.to_string()
    } else {
        format!("https://{}", line)
    }
}

/// Schemed, de-duplicated domain set (sorted, so reruns are byte-identical)
pub fn finalize<I, S>(entries: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .filter(|e| !e.as_ref().trim().is_empty())
        .map(|e| ensure_scheme(e.as_ref()))
        .collect()
}

/// Counts for one completed stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    /// Lines read from the stage's input
    pub input: usize,
    /// Lines left in the stage's own output file(s)
    pub kept: usize,
    /// Lines added to the domain file
    pub promoted: usize,
}

/// Outcome of a full normalization run
#[derive(Debug, Default)]
pub struct NormalizeReport {
    pub completed: Vec<StageReport>,
    pub failed: Vec<(Stage, anyhow::Error)>,
}

impl NormalizeReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.completed.iter().find(|r| r.stage == stage)
    }
}

/// Runs the normalization stages over the files named in a [`PipelineConfig`]
pub struct Normalizer {
    config: PipelineConfig,
    backups: BackupStore,
    events: Arc<dyn EventSink>,
}

impl Normalizer {
    pub fn new(config: PipelineConfig, events: Arc<dyn EventSink>) -> Self {
        let backups = BackupStore::new(config.backup_dir.clone());
        Self {
            config,
            backups,
            events,
        }
    }

    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Run all stages in order. A failing stage is reported and the
    /// remaining stages still run on whatever files exist.
    pub fn run_all(&self) -> NormalizeReport {
        let mut report = NormalizeReport::default();

        for stage in Stage::ALL {
            match self.run_stage(stage) {
                Ok(stage_report) => report.completed.push(stage_report),
                Err(e) => report.failed.push((stage, e)),
            }
        }

        info!(
            "Normalization finished: {} stages completed, {} failed",
            report.completed.len(),
            report.failed.len()
        );
        report
    }

    /// Run a single stage, emitting its completion or failure event
    pub fn run_stage(&self, stage: Stage) -> Result<StageReport> {
        let result = match stage {
            Stage::Classify => self.classify(),
            Stage::CleanWildcards => self.clean_wildcards(),
            Stage::CleanInvalid => self.clean_invalid(),
            Stage::FinalizeDomains => self.finalize_domains(),
        };

        match &result {
            Ok(r) => self.events.emit(&PipelineEvent::StageCompleted {
                stage,
                input: r.input,
                kept: r.kept,
                promoted: r.promoted,
            }),
            Err(e) => self.events.emit(&PipelineEvent::StageFailed {
                stage,
                error: format!("{:#}", e),
            }),
        }

        result
    }

    fn backup(&self, file: &Path, stage: Stage) -> Result<()> {
        if let Some(snapshot) = self.backups.snapshot(file, stage)? {
            self.events.emit(&PipelineEvent::BackupWritten {
                stage,
                source: file.to_path_buf(),
                snapshot,
            });
        }
        Ok(())
    }

    /// Partition the working file into the three category files.
    /// All three are rewritten, so no stale output survives.
    fn classify(&self) -> Result<StageReport> {
        let stage = Stage::Classify;
        let lines = read_lines(&self.config.working_file)?;
        let parts = partition(&lines);

        self.backup(&self.config.wildcards_file, stage)?;
        self.backup(&self.config.invalid_file, stage)?;
        self.backup(&self.config.domains_file, stage)?;

        write_lines(&self.config.wildcards_file, &parts.wildcards)?;
        write_lines(&self.config.invalid_file, &parts.invalid)?;
        write_lines(&self.config.domains_file, &parts.valid)?;

        Ok(StageReport {
            stage,
            input: lines.len(),
            kept: parts.wildcards.len() + parts.invalid.len(),
            promoted: parts.valid.len(),
        })
    }

    fn clean_wildcards(&self) -> Result<StageReport> {
        let stage = Stage::CleanWildcards;
        let lines = read_lines(&self.config.wildcards_file)?;

        let mut kept = Vec::new();
        let mut promoted = Vec::new();
        for line in &lines {
            match clean_wildcard(line) {
                WildcardOutcome::Keep(root) => kept.push(root),
                WildcardOutcome::Promote(domain) => promoted.push(domain),
                WildcardOutcome::Drop => {}
            }
        }

        if self.config.wildcard_roots_as_domains {
            promoted.extend(kept.iter().cloned());
        }

        self.backup(&self.config.wildcards_file, stage)?;
        self.backup(&self.config.domains_file, stage)?;

        write_lines(&self.config.wildcards_file, &kept)?;
        append_lines(&self.config.domains_file, &promoted)?;

        Ok(StageReport {
            stage,
            input: lines.len(),
            kept: kept.len(),
            promoted: promoted.len(),
        })
    }

    /// Promote bare hosts from the invalid file. The invalid file itself is
    /// left as is; entries that are not promoted are simply not carried on.
    fn clean_invalid(&self) -> Result<StageReport> {
        let stage = Stage::CleanInvalid;
        let lines = read_lines(&self.config.invalid_file)?;

        let promoted: Vec<String> = lines.iter().filter_map(|l| promote_invalid(l)).collect();

        self.backup(&self.config.invalid_file, stage)?;
        self.backup(&self.config.domains_file, stage)?;

        append_lines(&self.config.domains_file, &promoted)?;

        Ok(StageReport {
            stage,
            input: lines.len(),
            kept: lines.len() - promoted.len(),
            promoted: promoted.len(),
        })
    }

    fn finalize_domains(&self) -> Result<StageReport> {
        let stage = Stage::FinalizeDomains;
        let lines = read_lines(&self.config.domains_file)?;

        let schemed = lines.iter().filter(|l| !ANY_SCHEME.is_match(l)).count();
        let domains: Vec<String> = finalize(&lines).into_iter().collect();

        self.backup(&self.config.domains_file, stage)?;
        write_lines(&self.config.domains_file, &domains)?;

        Ok(StageReport {
            stage,
            input: lines.len(),
            kept: domains.len(),
            promoted: schemed,
        })
    }
}
