//! Handler interface: the code that inspects and converges one kind of unit.
//!
//! Handlers are plain values implementing [Handler], stored in a
//! [HandlerCatalog] under a [HandlerId]. The registry only deals in ids; the
//! catalog turns a resolved id into something runnable.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::ActionContext;
use crate::error::ActionError;
use crate::types::{NodeFacts, Properties, Unit};

/// Identity of a handler, e.g. `service_systemd`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(String);

impl HandlerId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for HandlerId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for HandlerId {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

impl From<String> for HandlerId {
  fn from(value: String) -> Self {
    Self(value)
  }
}

/// Capability interface every handler implements.
///
/// Only [Handler::run] is required. The defaults describe a handler that
/// trusts its registry filters, supports every action, has no state model and
/// cannot simulate itself in why-run mode.
pub trait Handler: Send + Sync {
  /// Self-check on top of the registry filters: `Some(false)` withdraws the
  /// handler for this node even though an entry matched, `Some(true)` claims
  /// it regardless of filters. `None` defers to the registry.
  fn provides(&self, _facts: &NodeFacts, _type_name: &str) -> Option<bool> {
    None
  }

  /// Instance-level check: can this handler perform `action` on `unit`?
  fn supports(&self, _unit: &Unit, _action: &str) -> bool {
    true
  }

  /// Whether the handler can run in why-run mode without changing the system.
  fn supports_why_run(&self) -> bool {
    false
  }

  /// Current state of the thing `unit` describes, or `None` when the handler
  /// does not model state.
  fn load_current_state(&self, _unit: &Unit) -> Result<Option<Properties>, ActionError> {
    Ok(None)
  }

  /// Runs `action` on `ctx.unit()`. Returns `true` when the system was changed.
  fn run(&self, ctx: &mut ActionContext<'_, '_>, action: &str) -> Result<bool, ActionError>;
}

/// Handler implementations by id.
#[derive(Default, Clone)]
pub struct HandlerCatalog {
  handlers: HashMap<HandlerId, Arc<dyn Handler>>,
}

impl HandlerCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds (or replaces) the handler stored under `id`.
  pub fn insert(&mut self, id: impl Into<HandlerId>, handler: impl Handler + 'static) {
    self.handlers.insert(id.into(), Arc::new(handler));
  }

  pub fn insert_arc(&mut self, id: impl Into<HandlerId>, handler: Arc<dyn Handler>) {
    self.handlers.insert(id.into(), handler);
  }

  pub fn with(mut self, id: impl Into<HandlerId>, handler: impl Handler + 'static) -> Self {
    self.insert(id, handler);
    self
  }

  pub fn get(&self, id: &HandlerId) -> Option<Arc<dyn Handler>> {
    self.handlers.get(id).cloned()
  }

  pub fn contains(&self, id: &HandlerId) -> bool {
    self.handlers.contains_key(id)
  }

  pub fn remove(&mut self, id: &HandlerId) -> Option<Arc<dyn Handler>> {
    self.handlers.remove(id)
  }

  pub fn ids(&self) -> impl Iterator<Item = &HandlerId> {
    self.handlers.keys()
  }

  pub fn len(&self) -> usize {
    self.handlers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.handlers.is_empty()
  }
}

impl fmt::Debug for HandlerCatalog {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut ids: Vec<&HandlerId> = self.handlers.keys().collect();
    ids.sort();
    f.debug_struct("HandlerCatalog").field("handlers", &ids).finish()
  }
}
