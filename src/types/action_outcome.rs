//! Result of running one action on one unit.

use std::fmt;

use super::OutcomeStatus;
use crate::error::ActionError;

/// Why an action did not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
  /// The requested action was `nothing`.
  ActionNothing,
  /// A run guard vetoed the action.
  Guard(String),
  /// Dry-run mode and the handler cannot simulate the action.
  WhyRunBypass,
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SkipReason::ActionNothing => write!(f, "action nothing"),
      SkipReason::Guard(description) => write!(f, "{description}"),
      SkipReason::WhyRunBypass => write!(f, "why-run not supported by handler"),
    }
  }
}

/// Outcome of a single `run_action` call.
#[derive(Debug)]
pub enum ActionOutcome {
  Updated,
  UpToDate,
  Skipped(SkipReason),
  /// Failed with `ignore_failure` set; the run continued.
  Failed(ActionError),
  Unprocessed,
}

impl ActionOutcome {
  pub fn status(&self) -> OutcomeStatus {
    match self {
      ActionOutcome::Updated => OutcomeStatus::Updated,
      ActionOutcome::UpToDate => OutcomeStatus::UpToDate,
      ActionOutcome::Skipped(_) => OutcomeStatus::Skipped,
      ActionOutcome::Failed(_) => OutcomeStatus::Failed,
      ActionOutcome::Unprocessed => OutcomeStatus::Unprocessed,
    }
  }

  pub fn is_updated(&self) -> bool {
    matches!(self, ActionOutcome::Updated)
  }
}
