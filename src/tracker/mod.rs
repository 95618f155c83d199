//! Per-unit outcome bookkeeping driven by the engine's event stream.
//!
//! A record opens on `resource_action_start` and is archived on
//! `resource_completed`. Records opened while another is still pending are
//! nested (their unit was converged inside another unit's action) and sit
//! below the top level.

mod report;

use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::ConvergeError;
use crate::events::Event;
use crate::types::{OutcomeRecord, OutcomeStatus, Unit, UnitRef};

pub use report::{REPORT_FILENAME, ResourceReport, RunReport, RunStatus};

#[derive(Debug)]
struct Pending {
  record: OutcomeRecord,
  started: Instant,
}

/// Records what happened to every unit action in a run.
#[derive(Debug)]
pub struct OutcomeTracker {
  run_id: Uuid,
  started_at: DateTime<Utc>,
  pending: Vec<Pending>,
  archived: Vec<OutcomeRecord>,
  total: usize,
}

impl Default for OutcomeTracker {
  fn default() -> Self {
    Self::new()
  }
}

impl OutcomeTracker {
  pub fn new() -> Self {
    Self {
      run_id: Uuid::new_v4(),
      started_at: Utc::now(),
      pending: Vec::new(),
      archived: Vec::new(),
      total: 0,
    }
  }

  pub fn run_id(&self) -> Uuid {
    self.run_id
  }

  /// Updates bookkeeping for one lifecycle event.
  pub fn observe(&mut self, event: &Event<'_>) {
    match *event {
      Event::ActionStart { unit, action } => {
        let level = self.pending.len();
        let mut record = OutcomeRecord::new(unit.reference(), action, level);
        record.position = unit.position();
        self.pending.push(Pending {
          record,
          started: Instant::now(),
        });
      }
      Event::CurrentStateLoaded { unit, current, .. } => {
        if let Some(p) = self.open_for(unit) {
          p.record.before = current.cloned();
        }
      }
      Event::CurrentStateLoadBypassed { .. } | Event::FailedRetriable { .. } => {}
      Event::UpToDate { unit, .. } => self.terminal(unit, OutcomeStatus::UpToDate, None, None),
      Event::Updated { unit, .. } => self.terminal(unit, OutcomeStatus::Updated, None, None),
      Event::Skipped { unit, reason, .. } => {
        self.terminal(unit, OutcomeStatus::Skipped, Some(reason.to_string()), None)
      }
      Event::Bypassed { unit, .. } => self.terminal(
        unit,
        OutcomeStatus::Skipped,
        Some(crate::types::SkipReason::WhyRunBypass.to_string()),
        None,
      ),
      Event::Failed { unit, error, .. } => {
        self.terminal(unit, OutcomeStatus::Failed, None, Some(error.to_string()))
      }
      Event::Completed { unit, action } => self.complete(unit, action),
    }
  }

  fn open_for(&mut self, unit: &Unit) -> Option<&mut Pending> {
    let reference = unit.reference();
    self
      .pending
      .last_mut()
      .filter(|p| p.record.unit == reference)
  }

  fn terminal(
    &mut self,
    unit: &Unit,
    status: OutcomeStatus,
    skip_reason: Option<String>,
    failure: Option<String>,
  ) {
    self.total += 1;
    let Some(p) = self.open_for(unit) else {
      debug!(unit = %unit.reference(), status = %status, "outcome for a unit with no open record");
      return;
    };
    p.record.status = status;
    p.record.skip_reason = skip_reason;
    p.record.failure = failure;
    if matches!(status, OutcomeStatus::Updated | OutcomeStatus::UpToDate) && p.record.before.is_some() {
      p.record.after = Some(unit.properties().clone());
    }
  }

  fn complete(&mut self, unit: &Unit, action: &str) {
    let reference = unit.reference();
    let matches_top = self
      .pending
      .last()
      .is_some_and(|p| p.record.unit == reference && p.record.action == action);
    if !matches_top {
      debug!(unit = %reference, action = %action, "completion without a matching open record");
      return;
    }
    let Some(Pending { mut record, started }) = self.pending.pop() else {
      return;
    };
    record.elapsed = started.elapsed();
    if unit.sensitive() {
      record.sensitive = true;
      record.before = None;
      record.after = None;
    }
    self.archived.push(record);
  }

  /// Archived records at or below `max_nesting` whose status is in
  /// `statuses` (every status when empty).
  pub fn filtered(&self, max_nesting: usize, statuses: &[OutcomeStatus]) -> Vec<&OutcomeRecord> {
    self
      .archived
      .iter()
      .filter(|r| r.nesting_level <= max_nesting)
      .filter(|r| statuses.is_empty() || statuses.contains(&r.status))
      .collect()
  }

  /// Records of the top-level batch, in completion order.
  pub fn top_level(&self) -> Vec<&OutcomeRecord> {
    self.filtered(0, &[])
  }

  pub fn records(&self) -> &[OutcomeRecord] {
    &self.archived
  }

  /// Number of unit actions that reached a terminal state, nested ones
  /// included.
  pub fn total_count(&self) -> usize {
    self.total
  }

  pub fn updated_count(&self) -> usize {
    self.filtered(0, &[OutcomeStatus::Updated]).len()
  }

  /// Adds an `unprocessed` record for every `(unit, action)` of `batch` that
  /// has no top-level record. Declarations are told apart by batch position,
  /// so a repeated reference is accounted once per declaration. Records still
  /// pending (the run unwound while they were open) are archived as they
  /// stand. Returns how many unprocessed records were added.
  pub fn finalize<'a>(&mut self, batch: impl IntoIterator<Item = &'a Unit>) -> usize {
    while let Some(Pending { mut record, started }) = self.pending.pop() {
      record.elapsed = started.elapsed();
      self.archived.push(record);
    }
    let mut added = 0;
    for unit in batch {
      let reference = unit.reference();
      for action in unit.actions() {
        if !self.has_top_level(&reference, unit.position(), action) {
          let mut record = OutcomeRecord::new(reference.clone(), action.clone(), 0);
          record.position = unit.position();
          record.sensitive = unit.sensitive();
          self.archived.push(record);
          added += 1;
        }
      }
    }
    added
  }

  fn has_top_level(&self, unit: &UnitRef, position: Option<usize>, action: &str) -> bool {
    self.archived.iter().any(|r| {
      r.nesting_level == 0 && r.position == position && &r.unit == unit && r.action == action
    })
  }

  /// Report of the run so far. `error` is the run's failure, if it failed.
  pub fn report(&self, error: Option<&ConvergeError>) -> RunReport {
    RunReport {
      run_id: self.run_id,
      start_time: self.started_at,
      end_time: Utc::now(),
      status: if error.is_some() {
        RunStatus::Failure
      } else {
        RunStatus::Success
      },
      total_res_count: self.total,
      updated_res_count: self.updated_count(),
      resources: self.top_level().into_iter().map(ResourceReport::from).collect(),
      error: error.map(ToString::to_string),
    }
  }
}
