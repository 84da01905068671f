// src/main.rs
use clap::Parser;
use scope_harvest::checkpoint::FileCheckpointStore;
use scope_harvest::cli::Cli;
use scope_harvest::config::Config;
use scope_harvest::events::EventSink;
use scope_harvest::harvester::Harvester;
use scope_harvest::normalize::Normalizer;
use scope_harvest::platforms::build_platforms;
use scope_harvest::progress::{ProgressEvents, ProgressIndicator};
use scope_harvest::summary::{HarvestOutcome, Summary};
use scope_harvest::targets::TargetFile;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Validate arguments
    cli.validate()?;

    // Load config file
    let config = Config::from_file(Path::new(&cli.config))?;

    // Initialize logging
    let log_level: &str = match cli.log_level_override() {
        Some(level) => level,
        None => &config.logging.level,
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .init();

    tracing::info!("Starting scope-harvest...");

    let progress = ProgressIndicator::new(cli.should_show_progress());
    let events: Arc<dyn EventSink> = Arc::new(ProgressEvents::new(progress.clone()));

    // Harvest: one pass per platform instance, sharing one working file
    let mut harvests = Vec::new();
    if cli.should_harvest() {
        let platforms = build_platforms(cli.platforms(), &config.platforms)?;
        if platforms.is_empty() {
            tracing::warn!("No enabled platform selected, nothing to harvest");
        }

        let sink = TargetFile::new(config.pipeline.working_file.clone());
        let mut harvester = Harvester::new(
            Box::new(sink),
            events.clone(),
            config.pipeline.inter_page_delay(),
        );

        for platform in &platforms {
            let namespace = platform.checkpoint_namespace();
            let mut checkpoints =
                FileCheckpointStore::new(config.pipeline.checkpoint_dir.clone(), namespace.clone())
                    .await?;

            let result = harvester.harvest(platform.as_ref(), &mut checkpoints).await;
            if let Err(ref e) = result {
                match e.status() {
                    Some(status) => {
                        tracing::error!("Harvest of {} aborted on HTTP {}: {}", namespace, status, e)
                    }
                    None => tracing::error!("Harvest of {} aborted: {}", namespace, e),
                }
            }

            harvests.push(HarvestOutcome {
                label: namespace,
                result: result.map_err(|e| e.to_string()),
            });
        }
    }

    // Normalize whatever was harvested, even after a failed listing
    let normalize = if cli.should_normalize() {
        let normalizer = Normalizer::new(config.pipeline.clone(), events.clone());
        Some(normalizer.run_all())
    } else {
        None
    };

    progress.finish();

    if !cli.quiet {
        print!("{}", Summary::new().render(&harvests, normalize.as_ref()));
    }

    let failed_harvests = harvests.iter().filter(|h| h.result.is_err()).count();
    if failed_harvests > 0 {
        anyhow::bail!("{} harvest pass(es) aborted on a listing failure", failed_harvests);
    }

    if let Some(report) = &normalize {
        if !report.is_success() {
            anyhow::bail!("{} normalization stage(s) failed", report.failed.len());
        }
    }

    Ok(())
}
