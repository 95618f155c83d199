//! One tracked unit action, as recorded by the outcome tracker.

use std::time::Duration;

use super::{OutcomeStatus, Properties, UnitRef};

/// What happened to one action on one unit during a run.
///
/// `before`/`after` are `None` when the handler has no state model or the unit
/// is sensitive.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeRecord {
  pub unit: UnitRef,
  pub action: String,
  /// Batch position of the declaration that ran, see [super::Unit::position].
  pub position: Option<usize>,
  pub status: OutcomeStatus,
  pub before: Option<Properties>,
  pub after: Option<Properties>,
  pub failure: Option<String>,
  pub skip_reason: Option<String>,
  pub elapsed: Duration,
  /// 0 for the top-level batch, +1 per nested converge.
  pub nesting_level: usize,
  pub sensitive: bool,
}

impl OutcomeRecord {
  pub fn new(unit: UnitRef, action: impl Into<String>, nesting_level: usize) -> Self {
    Self {
      unit,
      action: action.into(),
      position: None,
      status: OutcomeStatus::Unprocessed,
      before: None,
      after: None,
      failure: None,
      skip_reason: None,
      elapsed: Duration::ZERO,
      nesting_level,
      sensitive: false,
    }
  }
}
