//! The run marker: a one-line file holding the timestamp of the last
//! successful backup, and the gate that keeps the job to one run per UTC day.
//!
//! The marker is handled as an explicit value. [`MarkerFile::load`] reads it
//! into a [`MarkerState`], [`RunGate::evaluate`] turns that into a
//! [`GateDecision`], and [`MarkerFile::store`] writes the next value once a
//! run has succeeded.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::error::BackupError;

pub const DEFAULT_MARKER_PATH: &str = "last_run_timestamp.txt";

/// Modification-time cutoff already covered by a previous backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RunMarker {
    last_run: DateTime<Utc>,
}

impl RunMarker {
    pub fn new(last_run: DateTime<Utc>) -> Self {
        RunMarker { last_run }
    }

    pub fn last_run(&self) -> DateTime<Utc> {
        self.last_run
    }

    /// True when the marker falls on the same UTC calendar date as `now`.
    pub fn is_same_utc_day(&self, now: DateTime<Utc>) -> bool {
        self.last_run.date_naive() == now.date_naive()
    }

    /// Accepts RFC 3339 and the offset-less ISO form older markers used,
    /// which is read as UTC.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err("marker file is empty".to_string());
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(RunMarker::new(ts.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| RunMarker::new(naive.and_utc()))
            .map_err(|e| format!("{raw:?} is not an ISO-8601 timestamp: {e}"))
    }

    pub fn to_rfc3339(&self) -> String {
        self.last_run.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

/// What was found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerState {
    Missing,
    Present(RunMarker),
    Corrupt { raw: String, reason: String },
}

/// Handle on the marker file at a fixed path.
#[derive(Debug, Clone)]
pub struct MarkerFile {
    path: PathBuf,
}

impl MarkerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        MarkerFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<MarkerState, BackupError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No run marker found");
                return Ok(MarkerState::Missing);
            }
            Err(source) => {
                return Err(BackupError::Persistence {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        match RunMarker::parse(&raw) {
            Ok(marker) => {
                debug!(path = %self.path.display(), last_run = %marker.to_rfc3339(), "Read run marker");
                Ok(MarkerState::Present(marker))
            }
            Err(reason) => {
                warn!(path = %self.path.display(), %reason, "Run marker does not parse");
                Ok(MarkerState::Corrupt {
                    raw: raw.trim().to_string(),
                    reason,
                })
            }
        }
    }

    /// Overwrite the marker, creating parent directories as needed.
    pub fn store(&self, marker: &RunMarker) -> Result<(), BackupError> {
        let persistence = |source| BackupError::Persistence {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(persistence)?;
        }
        fs::write(&self.path, marker.to_rfc3339()).map_err(persistence)?;
        info!(path = %self.path.display(), last_run = %marker.to_rfc3339(), "Run marker updated");
        Ok(())
    }
}

/// What to do when the marker file exists but cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CorruptMarkerPolicy {
    /// Abort with [`BackupError::StateCorruption`].
    #[default]
    Fail,
    /// Treat the run as already done today.
    Skip,
    /// Treat the job as never having run.
    Reprocess,
}

impl FromStr for CorruptMarkerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Ok(CorruptMarkerPolicy::Fail),
            "skip" => Ok(CorruptMarkerPolicy::Skip),
            "reprocess" => Ok(CorruptMarkerPolicy::Reprocess),
            other => Err(format!(
                "unknown corrupt-marker policy {other:?} (expected fail, skip or reprocess)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Run now; `previous` is the marker to fetch from, if any.
    Proceed { previous: Option<RunMarker> },
    /// A backup already happened today.
    AlreadyRan { last_run: Option<RunMarker> },
}

#[derive(Debug, Clone)]
pub struct RunGate {
    marker_path: PathBuf,
    policy: CorruptMarkerPolicy,
}

impl RunGate {
    pub fn new(marker_path: impl Into<PathBuf>, policy: CorruptMarkerPolicy) -> Self {
        RunGate {
            marker_path: marker_path.into(),
            policy,
        }
    }

    pub fn evaluate(
        &self,
        state: &MarkerState,
        now: DateTime<Utc>,
    ) -> Result<GateDecision, BackupError> {
        match state {
            MarkerState::Missing => Ok(GateDecision::Proceed { previous: None }),
            MarkerState::Present(marker) if marker.is_same_utc_day(now) => {
                Ok(GateDecision::AlreadyRan {
                    last_run: Some(*marker),
                })
            }
            MarkerState::Present(marker) => Ok(GateDecision::Proceed {
                previous: Some(*marker),
            }),
            MarkerState::Corrupt { raw, reason } => match self.policy {
                CorruptMarkerPolicy::Fail => Err(BackupError::StateCorruption {
                    path: self.marker_path.clone(),
                    reason: reason.clone(),
                }),
                CorruptMarkerPolicy::Skip => {
                    warn!(%raw, "Corrupt run marker, treating today's run as done");
                    Ok(GateDecision::AlreadyRan { last_run: None })
                }
                CorruptMarkerPolicy::Reprocess => {
                    warn!(%raw, "Corrupt run marker, treating job as never run");
                    Ok(GateDecision::Proceed { previous: None })
                }
            },
        }
    }
}

/// Whether a backup already ran on `now`'s UTC date. A corrupt marker is an error.
pub fn has_run_today(marker_file: &MarkerFile, now: DateTime<Utc>) -> Result<bool, BackupError> {
    let state = marker_file.load()?;
    let gate = RunGate::new(marker_file.path(), CorruptMarkerPolicy::Fail);
    Ok(matches!(
        gate.evaluate(&state, now)?,
        GateDecision::AlreadyRan { .. }
    ))
}
