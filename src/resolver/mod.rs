//! Picks the handler that will run a unit's action.
//!
//! Resolution starts from every handler registered for the unit's type,
//! keeps the *enabled* ones (those that provide the type on this node), and
//! orders them by the registry's priority view. Provider-style resolution then
//! narrows to handlers that support the specific unit and action, falling
//! back to all enabled handlers when none does.


use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::error::ResolutionError;
use crate::handler::{Handler, HandlerCatalog, HandlerId};
use crate::registry::{HandlerRegistry, LegacyPlatformMap};
use crate::types::{NodeFacts, Unit};

/// A resolved handler and the id it was resolved under.
#[derive(Clone)]
pub struct ResolvedHandler {
  pub id: HandlerId,
  pub handler: Arc<dyn Handler>,
}

impl fmt::Debug for ResolvedHandler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ResolvedHandler").field("id", &self.id).finish()
  }
}

fn push_unique(out: &mut Vec<HandlerId>, id: HandlerId) {
  if !out.contains(&id) {
    out.push(id);
  }
}

/// Read-only view over a registry, a handler catalog and an optional legacy
/// table.
#[derive(Debug, Clone, Copy)]
pub struct HandlerResolver<'r> {
  registry: &'r HandlerRegistry,
  catalog: &'r HandlerCatalog,
  legacy: Option<&'r LegacyPlatformMap>,
}

impl<'r> HandlerResolver<'r> {
  pub fn new(registry: &'r HandlerRegistry, catalog: &'r HandlerCatalog) -> Self {
    Self {
      registry,
      catalog,
      legacy: None,
    }
  }

  pub fn with_legacy(mut self, legacy: &'r LegacyPlatformMap) -> Self {
    self.legacy = Some(legacy);
    self
  }

  pub fn registry(&self) -> &'r HandlerRegistry {
    self.registry
  }

  pub fn catalog(&self) -> &'r HandlerCatalog {
    self.catalog
  }

  /// Registered handlers for `key` that claim to provide it on this node:
  /// the handler's own [Handler::provides] when it answers, otherwise
  /// whether any of its entries for `key` matches `facts`.
  pub fn enabled_handlers(&self, facts: &NodeFacts, key: &str) -> Vec<HandlerId> {
    let mut enabled = Vec::new();
    for id in self.registry.resolve_all(None, key, None) {
      let Some(handler) = self.catalog.get(&id) else {
        warn!(key = %key, handler = %id, "registered handler missing from catalog");
        continue;
      };
      let provides = handler
        .provides(facts, key)
        .unwrap_or_else(|| self.registry.entry_matches(Some(facts), key, &id));
      if provides {
        push_unique(&mut enabled, id);
      }
    }
    enabled
  }

  /// `candidates` in registry priority order, followed by any candidate the
  /// priority view does not list.
  pub fn prioritized_handlers(
    &self,
    facts: &NodeFacts,
    key: &str,
    canonical: Option<bool>,
    candidates: &[HandlerId],
  ) -> Vec<HandlerId> {
    let mut ordered = Vec::with_capacity(candidates.len());
    for id in self.registry.resolve_all(Some(facts), key, canonical) {
      if candidates.contains(&id) {
        push_unique(&mut ordered, id);
      }
    }
    for id in candidates {
      push_unique(&mut ordered, id.clone());
    }
    ordered
  }

  /// Resource-style resolution: no action, first prioritized enabled handler.
  #[instrument(level = "trace", skip(self, facts))]
  pub fn resolve_resource(
    &self,
    facts: &NodeFacts,
    key: &str,
    canonical: Option<bool>,
  ) -> Option<HandlerId> {
    let enabled = self.enabled_handlers(facts, key);
    self
      .prioritized_handlers(facts, key, canonical, &enabled)
      .into_iter()
      .next()
  }

  /// Enabled handlers that support `action` on `unit`, or every enabled
  /// handler when none does.
  pub fn supported_handlers(&self, facts: &NodeFacts, unit: &Unit, action: &str) -> Vec<HandlerId> {
    let enabled = self.enabled_handlers(facts, unit.type_name());
    let supported: Vec<HandlerId> = enabled
      .iter()
      .filter(|id| {
        self
          .catalog
          .get(id)
          .is_some_and(|h| h.supports(unit, action))
      })
      .cloned()
      .collect();
    if supported.is_empty() {
      if !enabled.is_empty() {
        debug!(unit = %unit.reference(), action = %action, "no handler supports the action, using enabled handlers");
      }
      enabled
    } else {
      supported
    }
  }

  /// Provider-style resolution of an id through the registry only.
  pub fn resolve_provider_id(&self, facts: &NodeFacts, unit: &Unit, action: &str) -> Option<HandlerId> {
    let supported = self.supported_handlers(facts, unit, action);
    self
      .prioritized_handlers(facts, unit.type_name(), None, &supported)
      .into_iter()
      .next()
  }

  /// Handler that will run `action` on `unit`.
  ///
  /// A handler pinned on the unit wins outright. Otherwise the registry is
  /// consulted, then the legacy table.
  #[instrument(level = "trace", skip(self, facts, unit), fields(unit = %unit.reference()))]
  pub fn resolve_provider(
    &self,
    facts: &NodeFacts,
    unit: &Unit,
    action: &str,
  ) -> Result<ResolvedHandler, ResolutionError> {
    if let Some(id) = unit.handler() {
      debug!(handler = %id, "using handler pinned on unit");
      return self.instantiate(id.clone());
    }
    if let Some(id) = self.resolve_provider_id(facts, unit, action) {
      debug!(handler = %id, "resolved from registry");
      return self.instantiate(id);
    }
    if let Some(id) = self.legacy.and_then(|l| l.lookup(facts, unit.type_name())) {
      debug!(handler = %id, "resolved from legacy platform map");
      return self.instantiate(id);
    }
    let (platform, version) = LegacyPlatformMap::platform_and_version(facts)
      .unwrap_or_else(|| ("unknown".to_string(), "unknown".to_string()));
    Err(ResolutionError::NoHandlerAvailable {
      type_name: unit.type_name().to_string(),
      platform,
      version,
    })
  }

  fn instantiate(&self, id: HandlerId) -> Result<ResolvedHandler, ResolutionError> {
    match self.catalog.get(&id) {
      Some(handler) => Ok(ResolvedHandler { id, handler }),
      None => Err(ResolutionError::UnknownHandler(id)),
    }
  }
}
