// src/summary.rs
//! End-of-run summary, colored when stdout is a terminal

use colored::Colorize;
use std::fmt::Write as _;

use crate::harvester::HarvestReport;
use crate::normalize::NormalizeReport;

/// Outcome of one harvest pass, keyed by its checkpoint namespace
pub struct HarvestOutcome {
    pub label: String,
    pub result: Result<HarvestReport, String>,
}

/// Renders the summary printed after a run
pub struct Summary {
    use_colors: bool,
}

impl Summary {
    /// Summary for stdout
    pub fn new() -> Self {
        Self {
            use_colors: is_terminal::is_terminal(std::io::stdout()),
        }
    }

    pub fn plain() -> Self {
        Self { use_colors: false }
    }

    fn ok(&self, text: &str) -> String {
        if self.use_colors {
            text.green().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn failed(&self, text: &str) -> String {
        if self.use_colors {
            text.red().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        if self.use_colors {
            text.cyan().bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn render(&self, harvests: &[HarvestOutcome], normalize: Option<&NormalizeReport>) -> String {
        let mut out = String::new();

        if !harvests.is_empty() {
            let _ = writeln!(out, "{}", self.heading("Harvest"));
        }
        for outcome in harvests {
            match &outcome.result {
                Ok(report) => {
                    let _ = writeln!(
                        out,
                        "  {} {}: {} pages ({} resumed), {} programs, {} without scope, {} targets",
                        self.ok("ok"),
                        outcome.label,
                        report.pages_fetched,
                        report.pages_skipped,
                        report.programs_harvested,
                        report.programs_missed,
                        report.targets_written
                    );
                }
                Err(error) => {
                    let _ = writeln!(out, "  {} {}: {}", self.failed("failed"), outcome.label, error);
                }
            }
        }

        if let Some(report) = normalize {
            let _ = writeln!(out, "{}", self.heading("Normalize"));
            for stage in &report.completed {
                let _ = writeln!(
                    out,
                    "  {} {}: {} in, {} kept, {} promoted",
                    self.ok("ok"),
                    stage.stage,
                    stage.input,
                    stage.kept,
                    stage.promoted
                );
            }
            for (stage, error) in &report.failed {
                let _ = writeln!(out, "  {} {}: {:#}", self.failed("failed"), stage, error);
            }
        }

        out
    }
}

impl Default for Summary {
    fn default() -> Self {
        Self::new()
    }
}
