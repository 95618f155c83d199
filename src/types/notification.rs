//! Notifications: "when I change, run action X on unit Y".

use std::fmt;

use serde::{Deserialize, Serialize};

use super::UnitRef;

/// When a notification fires relative to the notifying unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timing {
  /// Ahead of the notifying unit's action, when a why-run preview of that
  /// action reports it would update.
  Before,
  /// Right after the notifying unit's action, before the next unit in the batch.
  Immediate,
  /// Once, after the whole batch has run.
  Delayed,
}

impl fmt::Display for Timing {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Timing::Before => write!(f, "before"),
      Timing::Immediate => write!(f, "immediate"),
      Timing::Delayed => write!(f, "delayed"),
    }
  }
}

/// A request from `source` to run `action` on `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Notification {
  pub target: UnitRef,
  pub action: String,
  pub source: UnitRef,
  pub timing: Timing,
}

impl Notification {
  pub fn new(target: UnitRef, action: impl Into<String>, source: UnitRef, timing: Timing) -> Self {
    Self {
      target,
      action: action.into(),
      source,
      timing,
    }
  }

  /// Two notifications are duplicates when they would run the same action on
  /// the same target, whoever sent them.
  pub fn duplicates(&self, other: &Notification) -> bool {
    self.target == other.target && self.action == other.action
  }
}

impl fmt::Display for Notification {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} notifies {} on {} ({})",
      self.source, self.action, self.target, self.timing
    )
  }
}
