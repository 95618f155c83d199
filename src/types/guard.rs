//! Run guards: `only_if` / `not_if` conditionals attached to a unit.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use super::Unit;
use crate::shell::run_shell;

/// Whether a guard must hold (`only_if`) or must not hold (`not_if`) for the
/// unit to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
  OnlyIf,
  NotIf,
}

impl fmt::Display for GuardKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GuardKind::OnlyIf => write!(f, "only_if"),
      GuardKind::NotIf => write!(f, "not_if"),
    }
  }
}

type GuardFn = Arc<dyn Fn(&Unit) -> bool + Send + Sync>;

#[derive(Clone)]
enum GuardCheck {
  Block(GuardFn),
  Command(String),
}

/// A conditional evaluated before a unit's action runs.
#[derive(Clone)]
pub struct Guard {
  kind: GuardKind,
  check: GuardCheck,
}

impl Guard {
  pub fn only_if(check: impl Fn(&Unit) -> bool + Send + Sync + 'static) -> Self {
    Self {
      kind: GuardKind::OnlyIf,
      check: GuardCheck::Block(Arc::new(check)),
    }
  }

  pub fn not_if(check: impl Fn(&Unit) -> bool + Send + Sync + 'static) -> Self {
    Self {
      kind: GuardKind::NotIf,
      check: GuardCheck::Block(Arc::new(check)),
    }
  }

  /// Runs `command` through the shell; exit status 0 counts as true.
  pub fn only_if_command(command: impl Into<String>) -> Self {
    Self {
      kind: GuardKind::OnlyIf,
      check: GuardCheck::Command(command.into()),
    }
  }

  /// Runs `command` through the shell; exit status 0 counts as true.
  pub fn not_if_command(command: impl Into<String>) -> Self {
    Self {
      kind: GuardKind::NotIf,
      check: GuardCheck::Command(command.into()),
    }
  }

  pub fn kind(&self) -> GuardKind {
    self.kind
  }

  /// Human-readable form, e.g. `not_if "test -f /etc/motd"`.
  pub fn description(&self) -> String {
    match &self.check {
      GuardCheck::Block(_) => format!("{} {{ block }}", self.kind),
      GuardCheck::Command(cmd) => format!("{} {cmd:?}", self.kind),
    }
  }

  /// True when the unit may proceed past this guard.
  pub(crate) fn allows(&self, unit: &Unit) -> bool {
    let holds = match &self.check {
      GuardCheck::Block(f) => f(unit),
      GuardCheck::Command(cmd) => match run_shell(cmd) {
        Ok(status) => status.success(),
        Err(e) => {
          warn!(unit = %unit.reference(), command = %cmd, error = %e, "guard command could not be run");
          false
        }
      },
    };
    match self.kind {
      GuardKind::OnlyIf => holds,
      GuardKind::NotIf => !holds,
    }
  }
}

impl fmt::Debug for Guard {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Guard").field(&self.description()).finish()
  }
}
