//! Error types for filters, units, resolution and convergence runs.
//!
//! [ConvergeError] is what a run returns. Failures from a handler's action body are
//! [ActionError]s; the engine wraps them with the unit they came from before they
//! leave [crate::engine::ConvergenceEngine::converge].

use std::fmt;

use thiserror::Error;

use crate::handler::HandlerId;
use crate::types::UnitRef;

/// Invalid version or version requirement string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
  #[error("invalid version: {0:?}")]
  InvalidVersion(String),
  #[error("invalid version requirement: {0:?}")]
  InvalidRequirement(String),
}

/// Invalid unit declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
  #[error("unit type name must not be empty")]
  EmptyTypeName,
  #[error("unit name must not be empty (type {0})")]
  EmptyName(String),
  #[error("{0} declares an empty action name")]
  EmptyAction(UnitRef),
  #[error("{0} declares a property with an empty key")]
  EmptyPropertyKey(UnitRef),
  #[error("invalid unit reference {0:?} (expected `type[name]`)")]
  InvalidReference(String),
}

/// No handler could be produced for a unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
  #[error("cannot find a handler for {type_name} on {platform} version {version}")]
  NoHandlerAvailable {
    type_name: String,
    platform: String,
    version: String,
  },
  #[error("handler {0} is registered but has no implementation in the catalog")]
  UnknownHandler(HandlerId),
}

/// An event sink rejected an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event sink {sink} failed: {message}")]
pub struct SinkError {
  pub sink: String,
  pub message: String,
}

impl SinkError {
  pub fn new(sink: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      sink: sink.into(),
      message: message.into(),
    }
  }
}

/// Failure raised from inside a handler's action body.
#[derive(Debug, Error)]
pub enum ActionError {
  #[error("{0}")]
  Failed(String),
  #[error("command `{command}` {}", describe_exit(.code))]
  Command { command: String, code: Option<i32> },
  #[error(transparent)]
  Io(#[from] std::io::Error),
  #[error("action {action} is not supported by {handler}")]
  Unsupported { handler: HandlerId, action: String },
  #[error("nested converge failed: {0}")]
  Nested(#[source] Box<ConvergeError>),
}

fn describe_exit(code: &Option<i32>) -> String {
  match code {
    Some(c) => format!("exited with status {c}"),
    None => "was terminated by a signal".to_string(),
  }
}

impl ActionError {
  pub fn failed(message: impl Into<String>) -> Self {
    ActionError::Failed(message.into())
  }

  /// Short name of the error variant, used in composite failure messages.
  pub fn kind(&self) -> &'static str {
    match self {
      ActionError::Failed(_) => "ActionError::Failed",
      ActionError::Command { .. } => "ActionError::Command",
      ActionError::Io(_) => "ActionError::Io",
      ActionError::Unsupported { .. } => "ActionError::Unsupported",
      ActionError::Nested(_) => "ActionError::Nested",
    }
  }
}

/// Error returned by a convergence run.
#[derive(Debug, Error)]
pub enum ConvergeError {
  #[error(transparent)]
  Resolution(#[from] ResolutionError),
  #[error("{unit} ({defined_at}) had an error: {}: {source}", .source.kind())]
  Action {
    unit: UnitRef,
    action: String,
    defined_at: String,
    #[source]
    source: ActionError,
  },
  #[error("{notifier} notifies {action} on {target}, which is not declared")]
  UnresolvedNotification {
    notifier: UnitRef,
    target: UnitRef,
    action: String,
  },
  #[error(
    "immediate notifications nested deeper than {limit} at {unit} action {action} (possible notification cycle)"
  )]
  NotificationDepthExceeded {
    unit: UnitRef,
    action: String,
    limit: usize,
  },
  #[error(transparent)]
  Sink(#[from] SinkError),
  #[error("{0}")]
  Multiple(MultipleFailures),
}

impl ConvergeError {
  /// Short name of the underlying failure, used in composite failure messages.
  pub fn kind(&self) -> &'static str {
    match self {
      ConvergeError::Resolution(_) => "ResolutionError",
      ConvergeError::Action { source, .. } => source.kind(),
      ConvergeError::UnresolvedNotification { .. } => "UnresolvedNotification",
      ConvergeError::NotificationDepthExceeded { .. } => "NotificationDepthExceeded",
      ConvergeError::Sink(_) => "SinkError",
      ConvergeError::Multiple(_) => "MultipleFailures",
    }
  }

  /// The handler error behind an [ConvergeError::Action], if that is what this is.
  pub fn action_error(&self) -> Option<&ActionError> {
    match self {
      ConvergeError::Action { source, .. } => Some(source),
      _ => None,
    }
  }
}

/// Where a captured failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOrigin {
  /// The main pass over the batch.
  ConvergeRun,
  /// A queued delayed notification.
  DelayedNotification,
}

impl fmt::Display for FailureOrigin {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FailureOrigin::ConvergeRun => write!(f, "converge run"),
      FailureOrigin::DelayedNotification => write!(f, "delayed notification"),
    }
  }
}

/// Failures collected over one run: at most one from the batch plus one per
/// failed delayed notification.
#[derive(Debug, Default)]
pub struct MultipleFailures {
  failures: Vec<(FailureOrigin, ConvergeError)>,
}

impl MultipleFailures {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn client_run_failure(&mut self, error: ConvergeError) {
    self.failures.push((FailureOrigin::ConvergeRun, error));
  }

  pub fn notification_failure(&mut self, error: ConvergeError) {
    self.failures.push((FailureOrigin::DelayedNotification, error));
  }

  pub fn is_empty(&self) -> bool {
    self.failures.is_empty()
  }

  pub fn len(&self) -> usize {
    self.failures.len()
  }

  pub fn failures(&self) -> &[(FailureOrigin, ConvergeError)] {
    &self.failures
  }

  /// One line per failure, in the order they were captured.
  pub fn backtrace(&self) -> Vec<String> {
    self
      .failures
      .iter()
      .map(|(origin, e)| format!("{origin}: {}: {e}", e.kind()))
      .collect()
  }

  /// `Ok` when nothing failed, the single error as-is when exactly one failed,
  /// otherwise the composite.
  pub fn into_result(mut self) -> Result<(), ConvergeError> {
    match self.failures.len() {
      0 => Ok(()),
      1 => match self.failures.pop() {
        Some((_, e)) => Err(e),
        None => Ok(()),
      },
      _ => Err(ConvergeError::Multiple(self)),
    }
  }
}

impl fmt::Display for MultipleFailures {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Multiple failures occurred:")?;
    for (origin, e) in &self.failures {
      writeln!(f, "* {} occurred in {origin}: {e}", e.kind())?;
    }
    Ok(())
  }
}

impl std::error::Error for MultipleFailures {}
