//! Lifecycle events emitted by the engine for every unit action, and the
//! sinks that consume them.
//!
//! Delivery is synchronous and in registration order. A sink error is not
//! swallowed: it aborts the run like any other failure.

use std::fmt;

use tracing::{error, info, warn};

use crate::error::{ActionError, SinkError};
use crate::types::{Properties, SkipReason, Unit};

/// One step in a unit action's lifecycle. Borrowed from the engine's state,
/// so sinks copy out what they keep.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
  ActionStart {
    unit: &'a Unit,
    action: &'a str,
  },
  CurrentStateLoaded {
    unit: &'a Unit,
    action: &'a str,
    current: Option<&'a Properties>,
  },
  CurrentStateLoadBypassed {
    unit: &'a Unit,
    action: &'a str,
  },
  UpToDate {
    unit: &'a Unit,
    action: &'a str,
  },
  Skipped {
    unit: &'a Unit,
    action: &'a str,
    reason: &'a SkipReason,
  },
  Updated {
    unit: &'a Unit,
    action: &'a str,
  },
  /// Terminal failure: an action error, or a resolution failure before any
  /// handler ran.
  Failed {
    unit: &'a Unit,
    action: &'a str,
    error: &'a dyn std::error::Error,
  },
  FailedRetriable {
    unit: &'a Unit,
    action: &'a str,
    retries_left: u32,
    error: &'a ActionError,
  },
  /// Why-run mode and the handler cannot simulate the action.
  Bypassed {
    unit: &'a Unit,
    action: &'a str,
  },
  Completed {
    unit: &'a Unit,
    action: &'a str,
  },
}

impl<'a> Event<'a> {
  /// Wire name of the event, e.g. `resource_updated`.
  pub fn name(&self) -> &'static str {
    match self {
      Event::ActionStart { .. } => "resource_action_start",
      Event::CurrentStateLoaded { .. } => "resource_current_state_loaded",
      Event::CurrentStateLoadBypassed { .. } => "resource_current_state_load_bypassed",
      Event::UpToDate { .. } => "resource_up_to_date",
      Event::Skipped { .. } => "resource_skipped",
      Event::Updated { .. } => "resource_updated",
      Event::Failed { .. } => "resource_failed",
      Event::FailedRetriable { .. } => "resource_failed_retriable",
      Event::Bypassed { .. } => "resource_bypassed",
      Event::Completed { .. } => "resource_completed",
    }
  }

  pub fn unit(&self) -> &'a Unit {
    match *self {
      Event::ActionStart { unit, .. }
      | Event::CurrentStateLoaded { unit, .. }
      | Event::CurrentStateLoadBypassed { unit, .. }
      | Event::UpToDate { unit, .. }
      | Event::Skipped { unit, .. }
      | Event::Updated { unit, .. }
      | Event::Failed { unit, .. }
      | Event::FailedRetriable { unit, .. }
      | Event::Bypassed { unit, .. }
      | Event::Completed { unit, .. } => unit,
    }
  }

  pub fn action(&self) -> &'a str {
    match *self {
      Event::ActionStart { action, .. }
      | Event::CurrentStateLoaded { action, .. }
      | Event::CurrentStateLoadBypassed { action, .. }
      | Event::UpToDate { action, .. }
      | Event::Skipped { action, .. }
      | Event::Updated { action, .. }
      | Event::Failed { action, .. }
      | Event::FailedRetriable { action, .. }
      | Event::Bypassed { action, .. }
      | Event::Completed { action, .. } => action,
    }
  }
}

impl fmt::Display for Event<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {} action {}", self.name(), self.unit().reference(), self.action())
  }
}

/// Consumer of lifecycle events (reporters, metrics, telemetry).
pub trait EventSink {
  /// Name used in [SinkError]s.
  fn name(&self) -> &str;

  fn handle(&mut self, event: &Event<'_>) -> Result<(), SinkError>;
}

/// Fan-out to registered sinks, in registration order.
#[derive(Default)]
pub struct EventDispatcher {
  sinks: Vec<Box<dyn EventSink>>,
}

impl EventDispatcher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&mut self, sink: impl EventSink + 'static) {
    self.sinks.push(Box::new(sink));
  }

  pub fn add_boxed(&mut self, sink: Box<dyn EventSink>) {
    self.sinks.push(sink);
  }

  pub fn len(&self) -> usize {
    self.sinks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.sinks.is_empty()
  }

  /// Delivers `event` to each sink; stops at the first error.
  pub fn dispatch(&mut self, event: &Event<'_>) -> Result<(), SinkError> {
    for sink in &mut self.sinks {
      sink.handle(event)?;
    }
    Ok(())
  }
}

impl fmt::Debug for EventDispatcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let names: Vec<&str> = self.sinks.iter().map(|s| s.name()).collect();
    f.debug_struct("EventDispatcher").field("sinks", &names).finish()
  }
}

/// Writes each event to `tracing` as a human-readable run log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
  fn name(&self) -> &str {
    "tracing"
  }

  fn handle(&mut self, event: &Event<'_>) -> Result<(), SinkError> {
    let unit = event.unit().reference();
    let action = event.action();
    match event {
      Event::ActionStart { .. } => info!(unit = %unit, action = %action, "processing"),
      Event::Skipped { reason, .. } => info!(unit = %unit, action = %action, reason = %reason, "skipped"),
      Event::Updated { .. } => info!(unit = %unit, action = %action, "updated"),
      Event::UpToDate { .. } => info!(unit = %unit, action = %action, "up to date"),
      Event::Bypassed { .. } => info!(unit = %unit, action = %action, "would run (why-run)"),
      Event::FailedRetriable { retries_left, error, .. } => {
        warn!(unit = %unit, action = %action, retries_left = %retries_left, error = %error, "retrying")
      }
      Event::Failed { error, .. } => error!(unit = %unit, action = %action, error = %error, "failed"),
      _ => tracing::debug!(unit = %unit, action = %action, event = event.name()),
    }
    Ok(())
  }
}
