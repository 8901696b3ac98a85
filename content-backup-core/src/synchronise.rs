//! High-level pipeline: gate → authenticate → fetch → archive → record the run.
//!
//! This module provides the top-level orchestration of one backup run:
//!   - [`run_gated`] reads the run marker, stops early when the job already ran
//!     today, and persists the next marker only after the body succeeded
//!   - [`synchronise`] is the body: it authenticates, fetches every asset
//!     modified since the previous marker and archives them into the bucket
//!
//! # Major Types
//! - [`SynchroniseReport`]: what one run fetched and wrote, plus the marker to persist
//! - [`RunOutcome`]: either the run was skipped for today, or it completed
//!
//! # Error Handling
//! Every step returns immediately with its [`BackupError`]. No step is retried
//! and the marker is left untouched on any failure, so the next run covers the
//! same window again. Archiving overwrites objects, so re-processing is safe.

use std::future::Future;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{error, info, warn};

use crate::archive::archive;
use crate::clock::Clock;
use crate::config::BackupConfig;
use crate::contract::{Authenticator, BackupStore, ContentSource};
use crate::error::BackupError;
use crate::run_marker::{CorruptMarkerPolicy, GateDecision, MarkerFile, RunGate, RunMarker};

#[derive(Debug, Clone, PartialEq)]
pub struct SynchroniseReport {
    /// Cutoff sent to the content endpoint.
    pub since: DateTime<Utc>,
    pub fetched: usize,
    /// Keys written to the bucket, in write order.
    pub uploaded: Vec<String>,
    /// Marker to persist once the run is accepted as successful.
    pub next_marker: RunMarker,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    AlreadyRanToday { last_run: Option<RunMarker> },
    Completed(SynchroniseReport),
}

/// Authenticate, fetch and archive. Does not touch the marker file.
pub async fn synchronise<A, C, S>(
    config: &BackupConfig,
    previous: Option<&RunMarker>,
    authenticator: &A,
    content: &C,
    store: &S,
    clock: &dyn Clock,
) -> Result<SynchroniseReport, BackupError>
where
    A: Authenticator + ?Sized,
    C: ContentSource + ?Sized,
    S: BackupStore + ?Sized,
{
    let started_at = clock.now();
    let since = match (previous, config.settings.initial_since) {
        (Some(marker), _) => marker.last_run(),
        (None, Some(initial)) => {
            info!(initial_since = %initial, "[SYNC] No run marker, using configured initial cutoff");
            initial
        }
        (None, None) => {
            warn!(
                cutoff = %started_at,
                "[SYNC] No run marker and no settings.initial_since; only assets modified from now on will be fetched"
            );
            started_at
        }
    };

    info!(since = %since.to_rfc3339_opts(SecondsFormat::Secs, true), "[SYNC] Starting backup run");

    let credentials = config.credentials();
    let token = match authenticator.authenticate(&credentials).await {
        Ok(token) => {
            info!(client_id = %credentials.client_id, "[SYNC] Authenticated");
            token
        }
        Err(e) => {
            error!(error = %e, "[SYNC][ERROR] Authentication failed");
            return Err(e);
        }
    };

    let assets = match content
        .fetch_modified_since(&token, &config.salesforce.content_url, since)
        .await
    {
        Ok(assets) => {
            info!(count = assets.len(), "[SYNC] Fetched modified content assets");
            assets
        }
        Err(e) => {
            error!(error = %e, "[SYNC][ERROR] Content fetch failed");
            return Err(e);
        }
    };

    let uploaded = if assets.is_empty() {
        info!("[SYNC] No new or updated content assets found");
        Vec::new()
    } else {
        archive(
            &assets,
            store,
            &config.settings.backup_prefix,
            clock.local_today(),
        )
        .await?
    };

    // Never move the marker backwards, even if the clock did.
    let floor = previous.copied().unwrap_or(RunMarker::new(since));
    let next_marker = RunMarker::new(clock.now()).max(floor);

    Ok(SynchroniseReport {
        since,
        fetched: assets.len(),
        uploaded,
        next_marker,
    })
}

/// Run `body` at most once per UTC day and persist its marker on success.
///
/// `body` receives the previous marker (if any) and is only invoked when the
/// gate lets the run proceed. Configuration loading belongs inside `body` so
/// that a skipped day never reads the settings document.
pub async fn run_gated<F, Fut>(
    marker_file: &MarkerFile,
    policy: CorruptMarkerPolicy,
    clock: &dyn Clock,
    body: F,
) -> Result<RunOutcome, BackupError>
where
    F: FnOnce(Option<RunMarker>) -> Fut,
    Fut: Future<Output = Result<SynchroniseReport, BackupError>>,
{
    let state = marker_file.load()?;
    let gate = RunGate::new(marker_file.path(), policy);

    let previous = match gate.evaluate(&state, clock.now())? {
        GateDecision::AlreadyRan { last_run } => {
            info!(
                last_run = ?last_run.map(|m| m.to_rfc3339()),
                "[SYNC] Backup has already run today, skipping"
            );
            return Ok(RunOutcome::AlreadyRanToday { last_run });
        }
        GateDecision::Proceed { previous } => previous,
    };

    let report = body(previous).await?;
    marker_file.store(&report.next_marker)?;
    Ok(RunOutcome::Completed(report))
}
