// src/harvester.rs
//! Paginated, resumable scope harvesting

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::checkpoint::CheckpointStore;
use crate::error::Result;
use crate::events::{EventSink, PipelineEvent};
use crate::platforms::{Platform, ProgramSummary};
use crate::targets::TargetSink;

/// Counters for one pass over a platform's listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    pub pages_fetched: u32,
    pub pages_skipped: u32,
    pub programs_harvested: usize,
    pub programs_missed: usize,
    pub programs_duplicate: usize,
    pub targets_written: usize,
}

/// What happened to a single program
enum ProgramOutcome {
    Harvested(usize),
    Missed,
    Duplicate,
}

/// Drives platforms page by page and appends every harvested target to a sink
///
/// One harvester can run several platforms (or several listing orders of
/// the same platform); a program seen in an earlier pass is not fetched again.
pub struct Harvester {
    sink: Box<dyn TargetSink>,
    events: Arc<dyn EventSink>,
    inter_page_delay: Duration,
    seen_programs: HashSet<(String, String)>,
}

impl Harvester {
    pub fn new(
        sink: Box<dyn TargetSink>,
        events: Arc<dyn EventSink>,
        inter_page_delay: Duration,
    ) -> Self {
        Self {
            sink,
            events,
            inter_page_delay,
            seen_programs: HashSet::new(),
        }
    }

    /// Walk pages 1, 2, 3, ... of `platform` until a page comes back empty.
    ///
    /// Pages with a checkpoint are skipped without fetching. A page's
    /// checkpoint is written only once all of its programs were processed.
    /// A failed or undecodable listing page ends the harvest with an error;
    /// everything written before it stays valid.
    pub async fn harvest(
        &mut self,
        platform: &dyn Platform,
        checkpoints: &mut dyn CheckpointStore,
    ) -> Result<HarvestReport> {
        let mut report = HarvestReport::default();
        let mut page: u32 = 1;

        info!("Harvesting {} ({})", platform.name(), platform.checkpoint_namespace());

        loop {
            if checkpoints.is_done(page).await? {
                self.events.emit(&PipelineEvent::PageSkipped {
                    platform: platform.name().to_string(),
                    page,
                });
                report.pages_skipped += 1;
                page += 1;
                continue;
            }

            let listing = platform.fetch_listing_page(page).await?;

            if listing.is_exhausted() {
                self.events.emit(&PipelineEvent::ListingExhausted {
                    platform: platform.name().to_string(),
                    page,
                });
                break;
            }

            self.events.emit(&PipelineEvent::PageFetched {
                platform: platform.name().to_string(),
                page,
                programs: listing.programs.len(),
            });

            let mut page_targets = 0;
            for program in &listing.programs {
                match self.harvest_program(platform, program).await? {
                    ProgramOutcome::Harvested(count) => {
                        report.programs_harvested += 1;
                        page_targets += count;
                    }
                    ProgramOutcome::Missed => report.programs_missed += 1,
                    ProgramOutcome::Duplicate => report.programs_duplicate += 1,
                }
            }

            checkpoints.record(page, &listing.raw).await?;
            report.pages_fetched += 1;
            report.targets_written += page_targets;

            self.events.emit(&PipelineEvent::PageCompleted {
                platform: platform.name().to_string(),
                page,
                targets: page_targets,
            });

            if !self.inter_page_delay.is_zero() {
                tokio::time::sleep(self.inter_page_delay).await;
            }
            page += 1;
        }

        info!(
            "{}: {} pages fetched, {} skipped, {} programs harvested, {} without scope, {} targets",
            platform.name(),
            report.pages_fetched,
            report.pages_skipped,
            report.programs_harvested,
            report.programs_missed,
            report.targets_written
        );

        Ok(report)
    }

    /// Resolve, fetch and extract one program. Only sink failures propagate;
    /// every per-program failure becomes a miss.
    async fn harvest_program(
        &mut self,
        platform: &dyn Platform,
        program: &ProgramSummary,
    ) -> Result<ProgramOutcome> {
        let key = (platform.name().to_string(), program.brief_url.clone());
        if !program.brief_url.is_empty() && !self.seen_programs.insert(key) {
            self.events.emit(&PipelineEvent::ProgramDuplicate {
                platform: platform.name().to_string(),
                program: program.name.clone(),
            });
            return Ok(ProgramOutcome::Duplicate);
        }

        let targets = match self.fetch_program_targets(platform, program).await {
            Ok(targets) => targets,
            Err(reason) => {
                self.events.emit(&PipelineEvent::ProgramMissed {
                    platform: platform.name().to_string(),
                    program: program.name.clone(),
                    reason,
                });
                return Ok(ProgramOutcome::Missed);
            }
        };

        let written = self.sink.append(&targets).await?;

        self.events.emit(&PipelineEvent::ProgramHarvested {
            platform: platform.name().to_string(),
            program: program.name.clone(),
            targets: written,
        });

        Ok(ProgramOutcome::Harvested(written))
    }

    async fn fetch_program_targets(
        &self,
        platform: &dyn Platform,
        program: &ProgramSummary,
    ) -> std::result::Result<Vec<String>, String> {
        let scope_ref = match platform.resolve_scope_ref(program).await {
            Ok(Some(scope_ref)) => scope_ref,
            Ok(None) => return Err("no scope document reference found".to_string()),
            Err(e) => return Err(format!("failed to resolve scope document: {}", e)),
        };

        let document = platform
            .fetch_scope_document(&scope_ref)
            .await
            .map_err(|e| format!("failed to fetch scope document: {}", e))?;

        platform
            .extract_targets(&document)
            .map_err(|e| format!("failed to extract targets: {}", e))
    }
}
