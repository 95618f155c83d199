//! Serializable end-of-run report and its JSON file form.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::types::{OutcomeRecord, OutcomeStatus, Properties};

/// Default filename for a report under a run directory.
pub const REPORT_FILENAME: &str = "run_report.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Success,
  Failure,
}

/// One top-level unit action in a [RunReport].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceReport {
  #[serde(rename = "type")]
  pub type_name: String,
  pub name: String,
  /// Batch position, telling repeated declarations of one unit apart.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub position: Option<usize>,
  /// Action that was run (or would have been, for `unprocessed`).
  pub result: String,
  pub status: OutcomeStatus,
  pub before: Option<Properties>,
  pub after: Option<Properties>,
  pub duration_ms: u64,
  pub error: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub skip_reason: Option<String>,
}

impl From<&OutcomeRecord> for ResourceReport {
  fn from(record: &OutcomeRecord) -> Self {
    Self {
      type_name: record.unit.type_name().to_string(),
      name: record.unit.name().to_string(),
      position: record.position,
      result: record.action.clone(),
      status: record.status,
      before: record.before.clone(),
      after: record.after.clone(),
      duration_ms: u64::try_from(record.elapsed.as_millis()).unwrap_or(u64::MAX),
      error: record.failure.clone(),
      skip_reason: record.skip_reason.clone(),
    }
  }
}

/// Summary of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
  pub run_id: Uuid,
  pub start_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  pub status: RunStatus,
  /// Terminal unit actions, nested ones included.
  pub total_res_count: usize,
  pub updated_res_count: usize,
  pub resources: Vec<ResourceReport>,
  pub error: Option<String>,
}

impl RunReport {
  pub fn failed_resources(&self) -> impl Iterator<Item = &ResourceReport> {
    self
      .resources
      .iter()
      .filter(|r| r.status == OutcomeStatus::Failed)
  }

  /// Writes the report to `path` as pretty JSON, creating parent
  /// directories. The JSON goes to a `.tmp` sibling first and is renamed
  /// into place, so readers never see a partial report.
  #[instrument(level = "trace", skip(self), fields(run_id = %self.run_id))]
  pub fn save(&self, path: &Path) -> io::Result<()> {
    let json = serde_json::to_vec_pretty(self).map_err(invalid_data)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent)?;
    }
    let staged = staging_path(path);
    let written = fs::write(&staged, json).and_then(|()| fs::rename(&staged, path));
    if written.is_err() {
      let _ = fs::remove_file(&staged);
    }
    written?;
    debug!(path = %path.display(), resources = self.resources.len(), "saved run report");
    Ok(())
  }

  /// Reads a report saved by [Self::save]. Missing files are `NotFound`;
  /// malformed ones are `InvalidData`.
  #[instrument(level = "trace")]
  pub fn load(path: &Path) -> io::Result<Self> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(invalid_data)
  }
}

fn staging_path(path: &Path) -> PathBuf {
  let mut staged = path.as_os_str().to_owned();
  staged.push(".tmp");
  PathBuf::from(staged)
}

fn invalid_data(e: serde_json::Error) -> io::Error {
  io::Error::new(io::ErrorKind::InvalidData, e)
}
