//! Declared units: the things a run converges.

use std::time::Duration;

use super::{Guard, Notification, Properties, SkipReason, Timing, UnitRef};
use crate::error::UnitError;
use crate::handler::HandlerId;

/// The no-op action. A unit asked to run it is always skipped.
pub const ACTION_NOTHING: &str = "nothing";

const DYNAMICALLY_DEFINED: &str = "dynamically defined";

/// A declared unit of desired state: type, name, properties, actions to run,
/// guards, notifications and failure policy.
///
/// Built with [Unit::builder]. The engine owns the run-time flags
/// (`updated`, `updated_by_last_action`, `elapsed`).
#[derive(Debug, Clone)]
pub struct Unit {
  type_name: String,
  name: String,
  properties: Properties,
  actions: Vec<String>,
  guards: Vec<Guard>,
  notifications: Vec<Notification>,
  handler: Option<HandlerId>,
  ignore_failure: bool,
  retries: u32,
  retry_delay: Duration,
  sensitive: bool,
  defined_at: Option<String>,
  position: Option<usize>,
  nesting_level: usize,
  updated: bool,
  updated_by_last_action: bool,
  elapsed: Duration,
}

impl Unit {
  pub fn builder(type_name: impl Into<String>, name: impl Into<String>) -> UnitBuilder {
    UnitBuilder::new(type_name, name)
  }

  pub fn type_name(&self) -> &str {
    &self.type_name
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn reference(&self) -> UnitRef {
    UnitRef::new(self.type_name.clone(), self.name.clone())
  }

  pub fn properties(&self) -> &Properties {
    &self.properties
  }

  pub fn properties_mut(&mut self) -> &mut Properties {
    &mut self.properties
  }

  /// Actions to run, in order, when the unit is reached in its batch.
  pub fn actions(&self) -> &[String] {
    &self.actions
  }

  pub fn guards(&self) -> &[Guard] {
    &self.guards
  }

  pub fn notifications(&self) -> &[Notification] {
    &self.notifications
  }

  pub fn before_notifications(&self) -> impl Iterator<Item = &Notification> {
    self
      .notifications
      .iter()
      .filter(|n| n.timing == Timing::Before)
  }

  pub fn immediate_notifications(&self) -> impl Iterator<Item = &Notification> {
    self
      .notifications
      .iter()
      .filter(|n| n.timing == Timing::Immediate)
  }

  pub fn delayed_notifications(&self) -> impl Iterator<Item = &Notification> {
    self
      .notifications
      .iter()
      .filter(|n| n.timing == Timing::Delayed)
  }

  /// Handler pinned on the unit; bypasses resolution when set.
  pub fn handler(&self) -> Option<&HandlerId> {
    self.handler.as_ref()
  }

  pub fn ignore_failure(&self) -> bool {
    self.ignore_failure
  }

  pub fn retries(&self) -> u32 {
    self.retries
  }

  pub fn retry_delay(&self) -> Duration {
    self.retry_delay
  }

  pub fn sensitive(&self) -> bool {
    self.sensitive
  }

  /// Declaration site for error messages, or `"dynamically defined"`.
  pub fn defined_at(&self) -> &str {
    self.defined_at.as_deref().unwrap_or(DYNAMICALLY_DEFINED)
  }

  /// Index in the [crate::engine::UnitCollection] the unit was declared in.
  /// Two declarations of the same reference have different positions.
  pub fn position(&self) -> Option<usize> {
    self.position
  }

  pub(crate) fn set_position(&mut self, position: usize) {
    self.position = Some(position);
  }

  pub fn nesting_level(&self) -> usize {
    self.nesting_level
  }

  pub(crate) fn set_nesting_level(&mut self, level: usize) {
    self.nesting_level = level;
  }

  /// True once any action on this unit has changed the system during the run.
  pub fn updated(&self) -> bool {
    self.updated
  }

  pub fn updated_by_last_action(&self) -> bool {
    self.updated_by_last_action
  }

  /// Sets the per-action flag; a `true` also latches [Unit::updated].
  pub fn set_updated_by_last_action(&mut self, updated: bool) {
    self.updated_by_last_action = updated;
    if updated {
      self.updated = true;
    }
  }

  pub fn elapsed(&self) -> Duration {
    self.elapsed
  }

  pub(crate) fn set_elapsed(&mut self, elapsed: Duration) {
    self.elapsed = elapsed;
  }

  /// Why `action` must not run, or `None` when it may.
  ///
  /// `nothing` is vetoed first; after that guards are evaluated in declaration
  /// order and the first one that vetoes wins.
  pub fn should_skip(&self, action: &str) -> Option<SkipReason> {
    if action == ACTION_NOTHING {
      return Some(SkipReason::ActionNothing);
    }
    self
      .guards
      .iter()
      .find(|g| !g.allows(self))
      .map(|g| SkipReason::Guard(g.description()))
  }
}

/// Builder for [Unit].
#[derive(Debug)]
pub struct UnitBuilder {
  unit: Unit,
  pending: Vec<(String, UnitRef, Timing)>,
}

impl UnitBuilder {
  fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      unit: Unit {
        type_name: type_name.into(),
        name: name.into(),
        properties: Properties::new(),
        actions: Vec::new(),
        guards: Vec::new(),
        notifications: Vec::new(),
        handler: None,
        ignore_failure: false,
        retries: 0,
        retry_delay: Duration::from_secs(2),
        sensitive: false,
        defined_at: None,
        position: None,
        nesting_level: 0,
        updated: false,
        updated_by_last_action: false,
        elapsed: Duration::ZERO,
      },
      pending: Vec::new(),
    }
  }

  /// Appends an action. Units without any action run `nothing`.
  pub fn action(mut self, action: impl Into<String>) -> Self {
    self.unit.actions.push(action.into());
    self
  }

  pub fn actions<I, S>(mut self, actions: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.unit.actions.extend(actions.into_iter().map(Into::into));
    self
  }

  pub fn property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
    self.unit.properties.insert(key, value);
    self
  }

  pub fn properties(mut self, properties: Properties) -> Self {
    self.unit.properties = properties;
    self
  }

  pub fn guard(mut self, guard: Guard) -> Self {
    self.unit.guards.push(guard);
    self
  }

  /// When this unit is updated, run `action` on `target` with the given timing.
  pub fn notifies(mut self, action: impl Into<String>, target: UnitRef, timing: Timing) -> Self {
    self.pending.push((action.into(), target, timing));
    self
  }

  pub fn handler(mut self, handler: impl Into<HandlerId>) -> Self {
    self.unit.handler = Some(handler.into());
    self
  }

  pub fn ignore_failure(mut self, ignore: bool) -> Self {
    self.unit.ignore_failure = ignore;
    self
  }

  pub fn retries(mut self, retries: u32) -> Self {
    self.unit.retries = retries;
    self
  }

  pub fn retry_delay(mut self, delay: Duration) -> Self {
    self.unit.retry_delay = delay;
    self
  }

  pub fn sensitive(mut self, sensitive: bool) -> Self {
    self.unit.sensitive = sensitive;
    self
  }

  pub fn defined_at(mut self, location: impl Into<String>) -> Self {
    self.unit.defined_at = Some(location.into());
    self
  }

  pub fn build(self) -> Result<Unit, UnitError> {
    let UnitBuilder { mut unit, pending } = self;
    if unit.type_name.trim().is_empty() {
      return Err(UnitError::EmptyTypeName);
    }
    if unit.name.is_empty() {
      return Err(UnitError::EmptyName(unit.type_name));
    }
    let reference = unit.reference();
    if unit.actions.is_empty() {
      unit.actions.push(ACTION_NOTHING.to_string());
    }
    if unit.actions.iter().any(|a| a.trim().is_empty()) {
      return Err(UnitError::EmptyAction(reference));
    }
    if unit.properties.keys().any(str::is_empty) {
      return Err(UnitError::EmptyPropertyKey(reference));
    }
    for (action, target, timing) in pending {
      if action.trim().is_empty() {
        return Err(UnitError::EmptyAction(reference));
      }
      unit
        .notifications
        .push(Notification::new(target, action, reference.clone(), timing));
    }
    Ok(unit)
  }
}
