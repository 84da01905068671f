// src/events.rs
//! Structured progress events emitted by the harvester and the normalizer
//!
//! The pipeline never prints. It reports what happened as [`PipelineEvent`]s
//! to an [`EventSink`], and the sink decides whether that becomes log lines,
//! a spinner message, or a record for a test to inspect.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

/// Normalization stages, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Classify,
    CleanWildcards,
    CleanInvalid,
    FinalizeDomains,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Classify,
        Stage::CleanWildcards,
        Stage::CleanInvalid,
        Stage::FinalizeDomains,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Classify => "classify",
            Stage::CleanWildcards => "clean_wildcards",
            Stage::CleanInvalid => "clean_invalid",
            Stage::FinalizeDomains => "finalize_domains",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A checkpoint already exists for this page; nothing was fetched
    PageSkipped { platform: String, page: u32 },
    /// A listing page was fetched and decoded
    PageFetched { platform: String, page: u32, programs: usize },
    /// A page came back empty: no more pages
    ListingExhausted { platform: String, page: u32 },
    /// A page was fully processed and its checkpoint written
    PageCompleted { platform: String, page: u32, targets: usize },
    /// A program's scope was resolved and its targets appended
    ProgramHarvested { platform: String, program: String, targets: usize },
    /// A program contributed nothing (no scope reference, fetch or document failure)
    ProgramMissed { platform: String, program: String, reason: String },
    /// A program was already harvested earlier in this run
    ProgramDuplicate { platform: String, program: String },
    /// A pre-transform snapshot was stored
    BackupWritten { stage: Stage, source: PathBuf, snapshot: PathBuf },
    StageCompleted { stage: Stage, input: usize, kept: usize, promoted: usize },
    StageFailed { stage: Stage, error: String },
}

/// Receiver of pipeline events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PipelineEvent);
}

/// Event sink that turns every event into a `tracing` record
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEvents;

impl EventSink for LogEvents {
    fn emit(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::PageSkipped { platform, page } => {
                info!(platform = %platform, page, "Checkpoint exists, skipping page");
            }
            PipelineEvent::PageFetched { platform, page, programs } => {
                info!(platform = %platform, page, programs, "Fetched listing page");
            }
            PipelineEvent::ListingExhausted { platform, page } => {
                info!(platform = %platform, page, "No more programs, stopping");
            }
            PipelineEvent::PageCompleted { platform, page, targets } => {
                info!(platform = %platform, page, targets, "Page complete, checkpoint saved");
            }
            PipelineEvent::ProgramHarvested { platform, program, targets } => {
                debug!(platform = %platform, program = %program, targets, "Harvested program scope");
            }
            PipelineEvent::ProgramMissed { platform, program, reason } => {
                warn!(platform = %platform, program = %program, "No targets for program: {}", reason);
            }
            PipelineEvent::ProgramDuplicate { platform, program } => {
                debug!(platform = %platform, program = %program, "Program already harvested in this run");
            }
            PipelineEvent::BackupWritten { stage, source, snapshot } => {
                debug!(stage = %stage, "Backed up {:?} to {:?}", source, snapshot);
            }
            PipelineEvent::StageCompleted { stage, input, kept, promoted } => {
                info!(stage = %stage, input, kept, promoted, "Stage complete");
            }
            PipelineEvent::StageFailed { stage, error } => {
                warn!(stage = %stage, "Stage failed: {}", error);
            }
        }
    }
}

/// Event sink that keeps every event in memory
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryEvents {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl MemoryEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<PipelineEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for MemoryEvents {
    fn emit(&self, event: &PipelineEvent) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }
}
