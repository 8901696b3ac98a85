///
/// This module implements the CLI interface for content-backup: command parsing,
/// wiring of the concrete clients, and the user-visible console output.
///
/// All pipeline logic (run gating, archiving, orchestration) lives in the
/// [`content-backup-core`] crate. This module only connects it to the real
/// marketing API client and the GCS bucket.
///
/// ## How To Use
/// - From a scheduler: `content-backup sync --config config.json`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`content-backup-core`]: ../../content-backup-core/
use crate::bucket::ObjectStoreBackupStore;
use crate::load_config::{load_config, DEFAULT_CONFIG_PATH};
use crate::marketing_cloud::MarketingCloudClient;
use anyhow::Result;
use clap::{Parser, Subcommand};
use content_backup_core::clock::{Clock, SystemClock};
use content_backup_core::run_marker::{
    CorruptMarkerPolicy, GateDecision, MarkerFile, MarkerState, RunGate, DEFAULT_MARKER_PATH,
};
use content_backup_core::synchronise::{run_gated, synchronise, RunOutcome};
use std::path::PathBuf;

/// CLI for content-backup: daily archive of marketing content assets.
#[derive(Parser)]
#[clap(
    name = "content-backup",
    version,
    about = "Back up recently modified marketing content assets into a cloud storage bucket"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run today's backup unless it already ran
    Sync {
        /// Path to the JSON or YAML settings document
        #[clap(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Path to the run marker file
        #[clap(long, default_value = DEFAULT_MARKER_PATH)]
        marker: PathBuf,
        /// What to do when the run marker cannot be parsed: fail, skip or reprocess
        #[clap(long, default_value = "fail")]
        on_corrupt_marker: CorruptMarkerPolicy,
    },
    /// Show the run marker and whether today's backup already happened
    Status {
        /// Path to the run marker file
        #[clap(long, default_value = DEFAULT_MARKER_PATH)]
        marker: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let clock = SystemClock;
    match cli.command {
        Commands::Sync {
            config,
            marker,
            on_corrupt_marker,
        } => sync(&clock, config, marker, on_corrupt_marker).await,
        Commands::Status { marker } => status(&clock, marker),
    }
}

async fn sync(
    clock: &dyn Clock,
    config_path: PathBuf,
    marker_path: PathBuf,
    policy: CorruptMarkerPolicy,
) -> Result<()> {
    let marker_file = MarkerFile::new(marker_path);
    tracing::info!(command = "sync", marker = %marker_file.path().display(), "Starting backup");

    let outcome = run_gated(&marker_file, policy, clock, |previous| async move {
        let config = load_config(&config_path)?;
        let client = MarketingCloudClient::new();
        let store = ObjectStoreBackupStore::for_gcs_bucket(&config.google_cloud.bucket_name);
        synchronise(&config, previous.as_ref(), &client, &client, &store, clock).await
    })
    .await;

    match outcome {
        Ok(RunOutcome::AlreadyRanToday { .. }) => {
            println!("Backup has already run today. Exiting.");
            Ok(())
        }
        Ok(RunOutcome::Completed(report)) => {
            if report.uploaded.is_empty() {
                println!("No new or updated content assets found.");
            }
            for key in &report.uploaded {
                println!("Uploaded: {key}");
            }
            tracing::info!(
                command = "sync",
                fetched = report.fetched,
                uploaded = report.uploaded.len(),
                next_marker = %report.next_marker.to_rfc3339(),
                "Backup complete"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "sync", kind = e.kind(), error = %e, "Backup failed");
            Err(anyhow::Error::new(e))
        }
    }
}

fn status(clock: &dyn Clock, marker_path: PathBuf) -> Result<()> {
    let marker_file = MarkerFile::new(marker_path);
    let state = marker_file.load()?;
    match &state {
        MarkerState::Missing => println!("No backup recorded yet."),
        MarkerState::Present(marker) => println!("Last backup: {}", marker.to_rfc3339()),
        MarkerState::Corrupt { raw, reason } => {
            println!("Run marker is corrupt ({reason}): {raw:?}")
        }
    }
    // Report with the strictest policy so corruption is surfaced, not hidden.
    let gate = RunGate::new(marker_file.path(), CorruptMarkerPolicy::Fail);
    match gate.evaluate(&state, clock.now()) {
        Ok(GateDecision::AlreadyRan { .. }) => println!("Already ran today: yes"),
        Ok(GateDecision::Proceed { .. }) => println!("Already ran today: no"),
        Err(e) => {
            tracing::warn!(error = %e, "Run marker unusable");
            println!("Already ran today: unknown");
        }
    }
    Ok(())
}
