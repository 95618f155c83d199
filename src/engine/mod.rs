//! Convergence engine: runs a batch of units in order, propagates immediate
//! and delayed notifications, applies retry/ignore-failure policy and drives
//! the outcome tracker through the event stream.
//!
//! Execution is single-threaded and depth-first. Immediate notifications run
//! as recursive calls before the next unit in the batch; delayed ones run
//! once each, in FIFO order, after the batch, and each gets its chance even
//! when the batch or an earlier notification failed. `before` notifications
//! run ahead of an action whose why-run preview says it would update.

mod collection;
mod context;
mod delayed;
#[cfg(test)]
mod engine_test;

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use crate::config::EngineConfig;
use crate::error::{ActionError, ConvergeError, MultipleFailures, SinkError};
use crate::events::{Event, EventDispatcher, EventSink};
use crate::handler::Handler;
use crate::resolver::HandlerResolver;
use crate::tracker::{OutcomeTracker, RunReport};
use crate::types::{ActionOutcome, Notification, NodeFacts, SkipReason, Unit};

pub use collection::UnitCollection;
pub use context::ActionContext;
pub use delayed::DelayedQueue;

/// Runs batches of units against one node.
pub struct ConvergenceEngine<'r> {
  resolver: HandlerResolver<'r>,
  facts: &'r NodeFacts,
  config: EngineConfig,
  tracker: OutcomeTracker,
  sinks: EventDispatcher,
  nesting_level: usize,
  notification_depth: usize,
  previewing: bool,
}

impl<'r> ConvergenceEngine<'r> {
  pub fn new(resolver: HandlerResolver<'r>, facts: &'r NodeFacts, config: EngineConfig) -> Self {
    Self {
      resolver,
      facts,
      config,
      tracker: OutcomeTracker::new(),
      sinks: EventDispatcher::new(),
      nesting_level: 0,
      notification_depth: 0,
      previewing: false,
    }
  }

  /// Adds an event sink. Sinks see events after the outcome tracker, in the
  /// order they were added.
  pub fn add_sink(&mut self, sink: impl EventSink + 'static) {
    self.sinks.add(sink);
  }

  pub fn facts(&self) -> &NodeFacts {
    self.facts
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub fn tracker(&self) -> &OutcomeTracker {
    &self.tracker
  }

  pub fn into_tracker(self) -> OutcomeTracker {
    self.tracker
  }

  /// Report of the last run; `outcome` is what [Self::converge] returned.
  pub fn report(&self, outcome: &Result<(), ConvergeError>) -> RunReport {
    self.tracker.report(outcome.as_ref().err())
  }

  /// Converges the top-level batch, then accounts every unit action that was
  /// never reached as `unprocessed`.
  #[instrument(level = "trace", skip(self, units), fields(units = units.len()))]
  pub fn converge(&mut self, units: &mut UnitCollection) -> Result<(), ConvergeError> {
    info!(units = units.len(), why_run = self.config.why_run, "converging");
    let result = self.converge_batch(units);
    let unprocessed = self.tracker.finalize(units.iter());
    match &result {
      Ok(()) => info!(
        updated = self.tracker.updated_count(),
        total = self.tracker.total_count(),
        "converge complete"
      ),
      Err(e) => error!(unprocessed, error = %e, "converge failed"),
    }
    result
  }

  pub(crate) fn converge_nested(&mut self, units: &mut UnitCollection) -> Result<(), ConvergeError> {
    if self.previewing {
      debug!(units = units.len(), "previewing, nested units not converged");
      return Ok(());
    }
    self.nesting_level += 1;
    debug!(level = self.nesting_level, units = units.len(), "converging nested units");
    let result = self.converge_batch(units);
    self.nesting_level -= 1;
    result
  }

  fn converge_batch(&mut self, units: &mut UnitCollection) -> Result<(), ConvergeError> {
    units.resolve_notifications()?;
    units.set_nesting_level(self.nesting_level);

    let mut queue = DelayedQueue::new();
    let mut failures = MultipleFailures::new();
    if let Err(e) = self.run_batch(units, &mut queue) {
      failures.client_run_failure(e);
    }
    self.run_delayed(units, &mut queue, &mut failures);
    failures.into_result()
  }

  fn run_batch(&mut self, units: &mut UnitCollection, queue: &mut DelayedQueue) -> Result<(), ConvergeError> {
    for index in 0..units.len() {
      let actions = match units.get_index(index) {
        Some(unit) => unit.actions().to_vec(),
        None => continue,
      };
      for action in &actions {
        self.run_action(units, queue, index, action)?;
      }
    }
    Ok(())
  }

  /// Runs queued delayed notifications by position, so notifications queued
  /// while delivering others are delivered too.
  fn run_delayed(&mut self, units: &mut UnitCollection, queue: &mut DelayedQueue, failures: &mut MultipleFailures) {
    let mut next = 0;
    while let Some(notification) = queue.get(next).cloned() {
      next += 1;
      debug!(notification = %notification, "running delayed notification");
      let Some(index) = units.index_of(&notification.target) else {
        failures.notification_failure(unresolved(&notification));
        continue;
      };
      if let Err(e) = self.run_action(units, queue, index, &notification.action) {
        warn!(notification = %notification, error = %e, "delayed notification failed");
        failures.notification_failure(e);
      }
    }
  }

  /// Runs `action` on the unit at `index`, then its notifications if the
  /// action updated it.
  #[instrument(level = "trace", skip(self, units, queue))]
  fn run_action(
    &mut self,
    units: &mut UnitCollection,
    queue: &mut DelayedQueue,
    index: usize,
    action: &str,
  ) -> Result<ActionOutcome, ConvergeError> {
    let Some(declared) = units.get_index(index) else {
      return Ok(ActionOutcome::Unprocessed);
    };
    let before: Vec<Notification> = declared.before_notifications().cloned().collect();
    if !before.is_empty() {
      let preview = declared.clone();
      if self.preview(&preview, action) {
        for notification in &before {
          self.notify_immediately(units, queue, notification)?;
        }
      }
    }

    let Some(mut unit) = units.get_index(index).cloned() else {
      return Ok(ActionOutcome::Unprocessed);
    };
    let result = self.perform(&mut unit, action);
    let updated = unit.updated_by_last_action();
    let immediate: Vec<Notification> = unit.immediate_notifications().cloned().collect();
    let delayed: Vec<Notification> = unit.delayed_notifications().cloned().collect();
    units.replace(index, unit);
    let outcome = result?;

    if !updated {
      return Ok(outcome);
    }
    for notification in &immediate {
      self.notify_immediately(units, queue, notification)?;
    }
    for notification in delayed {
      let description = notification.to_string();
      if queue.push(notification) {
        debug!(notification = %description, "queued delayed notification");
      } else {
        debug!(notification = %description, "delayed notification already queued");
      }
    }
    Ok(outcome)
  }

  fn notify_immediately(
    &mut self,
    units: &mut UnitCollection,
    queue: &mut DelayedQueue,
    notification: &Notification,
  ) -> Result<(), ConvergeError> {
    let Some(index) = units.index_of(&notification.target) else {
      return Err(unresolved(notification));
    };
    if self.notification_depth >= self.config.max_notification_depth {
      return Err(ConvergeError::NotificationDepthExceeded {
        unit: notification.target.clone(),
        action: notification.action.clone(),
        limit: self.config.max_notification_depth,
      });
    }
    info!(notification = %notification, "running immediate notification");
    self.notification_depth += 1;
    let result = self.run_action(units, queue, index, &notification.action);
    self.notification_depth -= 1;
    result.map(|_| ())
  }

  /// Runs `action` on `unit` in why-run mode without emitting events and
  /// reports whether it would update. A vetoed action, an unresolvable
  /// handler, a handler without why-run support or a failing preview all
  /// count as "would not update".
  fn preview(&mut self, unit: &Unit, action: &str) -> bool {
    if unit.should_skip(action).is_some() {
      return false;
    }
    let resolved = match self.resolver.resolve_provider(self.facts, unit, action) {
      Ok(r) => r,
      Err(e) => {
        debug!(unit = %unit.reference(), action = %action, error = %e, "cannot preview action");
        return false;
      }
    };
    if !resolved.handler.supports_why_run() {
      debug!(
        unit = %unit.reference(),
        handler = %resolved.id,
        "handler cannot preview, before notifications not sent"
      );
      return false;
    }

    let why_run = std::mem::replace(&mut self.config.why_run, true);
    let previewing = std::mem::replace(&mut self.previewing, true);
    let result = match resolved.handler.load_current_state(unit) {
      Ok(current) => {
        let mut ctx = ActionContext::new(self, unit, action, current.as_ref());
        resolved.handler.run(&mut ctx, action)
      }
      Err(e) => Err(e),
    };
    self.previewing = previewing;
    self.config.why_run = why_run;

    match result {
      Ok(would_update) => {
        debug!(unit = %unit.reference(), action = %action, would_update, "previewed action");
        would_update
      }
      Err(e) => {
        debug!(unit = %unit.reference(), action = %action, error = %e, "preview failed");
        false
      }
    }
  }

  /// One action on one unit, bracketed by `resource_action_start` and
  /// `resource_completed`. Completion is emitted even when the action, or a
  /// sink handling its start, failed.
  fn perform(&mut self, unit: &mut Unit, action: &str) -> Result<ActionOutcome, ConvergeError> {
    let started = Instant::now();
    unit.set_updated_by_last_action(false);
    let result = match self.emit(Event::ActionStart { unit, action }) {
      Ok(()) => self.perform_action(unit, action),
      Err(e) => Err(e.into()),
    };
    unit.set_elapsed(started.elapsed());
    let completed = self.emit(Event::Completed { unit, action });
    let outcome = result?;
    completed?;
    Ok(outcome)
  }

  fn perform_action(&mut self, unit: &mut Unit, action: &str) -> Result<ActionOutcome, ConvergeError> {
    if let Some(reason) = unit.should_skip(action) {
      info!(unit = %unit.reference(), action = %action, reason = %reason, "skipped");
      self.emit(Event::Skipped { unit, action, reason: &reason })?;
      return Ok(ActionOutcome::Skipped(reason));
    }

    let resolved = match self.resolver.resolve_provider(self.facts, unit, action) {
      Ok(r) => r,
      Err(e) => {
        error!(unit = %unit.reference(), action = %action, error = %e, "no handler");
        self.emit(Event::Failed { unit, action, error: &e })?;
        return Err(e.into());
      }
    };
    debug!(unit = %unit.reference(), handler = %resolved.id, "handler resolved");

    if self.config.why_run && !resolved.handler.supports_why_run() {
      self.emit(Event::CurrentStateLoadBypassed { unit, action })?;
      self.emit(Event::Bypassed { unit, action })?;
      return Ok(ActionOutcome::Skipped(SkipReason::WhyRunBypass));
    }

    let mut retries_left = unit.retries();
    loop {
      let error = match self.attempt(&resolved.handler, unit, action)? {
        Ok(true) => {
          unit.set_updated_by_last_action(true);
          info!(unit = %unit.reference(), action = %action, "updated");
          self.emit(Event::Updated { unit, action })?;
          return Ok(ActionOutcome::Updated);
        }
        Ok(false) => {
          debug!(unit = %unit.reference(), action = %action, "up to date");
          self.emit(Event::UpToDate { unit, action })?;
          return Ok(ActionOutcome::UpToDate);
        }
        Err(e) => e,
      };

      if unit.ignore_failure() {
        warn!(unit = %unit.reference(), action = %action, error = %error, "ignoring failure");
        self.emit(Event::Failed { unit, action, error: &error })?;
        return Ok(ActionOutcome::Failed(error));
      }
      if retries_left > 0 {
        retries_left -= 1;
        warn!(
          unit = %unit.reference(),
          action = %action,
          retries_left,
          error = %error,
          "action failed, retrying"
        );
        self.emit(Event::FailedRetriable { unit, action, retries_left, error: &error })?;
        if !unit.retry_delay().is_zero() {
          std::thread::sleep(unit.retry_delay());
        }
        continue;
      }
      error!(unit = %unit.reference(), action = %action, error = %error, "action failed");
      self.emit(Event::Failed { unit, action, error: &error })?;
      return Err(ConvergeError::Action {
        unit: unit.reference(),
        action: action.to_string(),
        defined_at: unit.defined_at().to_string(),
        source: error,
      });
    }
  }

  /// Loads current state and runs the handler once. The outer error is an
  /// event sink failure; the inner one is the action's own failure.
  fn attempt(
    &mut self,
    handler: &Arc<dyn Handler>,
    unit: &Unit,
    action: &str,
  ) -> Result<Result<bool, ActionError>, ConvergeError> {
    let current = match handler.load_current_state(unit) {
      Ok(current) => current,
      Err(e) => return Ok(Err(e)),
    };
    self.emit(Event::CurrentStateLoaded {
      unit,
      action,
      current: current.as_ref(),
    })?;
    let mut ctx = ActionContext::new(self, unit, action, current.as_ref());
    Ok(handler.run(&mut ctx, action))
  }

  fn emit(&mut self, event: Event<'_>) -> Result<(), SinkError> {
    self.tracker.observe(&event);
    self.sinks.dispatch(&event)
  }
}

fn unresolved(notification: &Notification) -> ConvergeError {
  ConvergeError::UnresolvedNotification {
    notifier: notification.source.clone(),
    target: notification.target.clone(),
    action: notification.action.clone(),
  }
}
