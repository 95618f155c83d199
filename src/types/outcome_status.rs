//! Final status of one unit action.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
  Updated,
  UpToDate,
  Skipped,
  Failed,
  /// Never reached because the run aborted first.
  Unprocessed,
}

impl OutcomeStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      OutcomeStatus::Updated => "updated",
      OutcomeStatus::UpToDate => "up_to_date",
      OutcomeStatus::Skipped => "skipped",
      OutcomeStatus::Failed => "failed",
      OutcomeStatus::Unprocessed => "unprocessed",
    }
  }
}

impl fmt::Display for OutcomeStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
