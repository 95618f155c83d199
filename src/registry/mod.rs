//! Priority-ordered, filterable dispatch table from unit type name to
//! candidate handlers.
//!
//! Entries for a key are kept sorted by [compare_specificity] at insertion
//! time; lookups walk the sequence front to back. A registry is populated once
//! (built-ins, then [HandlerRegistry::lock], then extensions) and read many
//! times per run.

mod entry;
mod legacy;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, instrument, warn};

use crate::filter::{ExecutionMode, FilterSet, Requirement, Version};
use crate::handler::HandlerId;
use crate::types::NodeFacts;

pub use entry::{RegistryEntry, compare_specificity};
pub use legacy::LegacyPlatformMap;

/// A registration that landed on a key with locked entries and no override
/// permission. Advisory: the registration still went in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
  pub key: String,
  pub handler: HandlerId,
  /// Registry label, e.g. `provider` or `resource`.
  pub kind: String,
}

impl fmt::Display for Collision {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "built-in {} {:?} is being overridden by {} {}; register it with override permission or remove it",
      self.kind, self.key, self.kind, self.handler
    )
  }
}

/// One `provides` declaration, built up and passed to
/// [HandlerRegistry::register].
#[derive(Debug, Clone)]
pub struct Provides {
  key: String,
  handler: HandlerId,
  filters: FilterSet,
  canonical: bool,
  allow_override: bool,
  client_version: Option<Requirement>,
}

impl Provides {
  pub fn new(key: impl Into<String>, handler: impl Into<HandlerId>) -> Self {
    Self {
      key: key.into(),
      handler: handler.into(),
      filters: FilterSet::default(),
      canonical: false,
      allow_override: false,
      client_version: None,
    }
  }

  pub fn filters(mut self, filters: FilterSet) -> Self {
    self.filters = filters;
    self
  }

  pub fn canonical(mut self, canonical: bool) -> Self {
    self.canonical = canonical;
    self
  }

  /// Permission to supersede locked (built-in) entries without a collision.
  pub fn allow_override(mut self, allow: bool) -> Self {
    self.allow_override = allow;
    self
  }

  /// Only register when the running client version satisfies `requirement`.
  pub fn client_version(mut self, requirement: Requirement) -> Self {
    self.client_version = Some(requirement);
    self
  }
}

fn crate_version() -> Version {
  env!("CARGO_PKG_VERSION")
    .parse()
    .unwrap_or_else(|_| Version::new(vec![0]))
}

/// Dispatch table from key (unit type name) to candidate handler entries,
/// most specific and most recent first.
#[derive(Debug, Clone)]
pub struct HandlerRegistry {
  map: BTreeMap<String, Vec<RegistryEntry>>,
  locked: bool,
  mode: ExecutionMode,
  client_version: Version,
  label: String,
  collisions: Vec<Collision>,
}

impl Default for HandlerRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl HandlerRegistry {
  pub fn new() -> Self {
    Self {
      map: BTreeMap::new(),
      locked: false,
      mode: ExecutionMode::Agent,
      client_version: crate_version(),
      label: "handler".to_string(),
      collisions: Vec::new(),
    }
  }

  /// Execution mode used to gate `target_mode` / `agent_mode` filters.
  pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
    self.mode = mode;
    self
  }

  /// Client version matched against [Provides::client_version].
  pub fn with_client_version(mut self, version: Version) -> Self {
    self.client_version = version;
    self
  }

  /// Name used for this registry's entries in collision warnings.
  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.label = label.into();
    self
  }

  pub fn mode(&self) -> ExecutionMode {
    self.mode
  }

  /// Inserts a registration at its specificity position. Returns `false` when
  /// the registration was dropped because of a client version constraint.
  #[instrument(level = "trace", skip(self, provides), fields(key = %provides.key, handler = %provides.handler))]
  pub fn register(&mut self, provides: Provides) -> bool {
    let Provides {
      key,
      handler,
      filters,
      canonical,
      allow_override,
      client_version,
    } = provides;

    if let Some(requirement) = &client_version {
      if !requirement.satisfied_by(&self.client_version) {
        debug!(
          key = %key,
          handler = %handler,
          requirement = %requirement,
          client_version = %self.client_version,
          "registration skipped for this client version"
        );
        return false;
      }
    }

    let existing = self.map.entry(key.clone()).or_default();
    if existing.iter().any(|e| e.locked) && !existing.iter().any(|e| e.allow_override) {
      let collision = Collision {
        key: key.clone(),
        handler: handler.clone(),
        kind: self.label.clone(),
      };
      warn!(key = %key, handler = %handler, "{collision}");
      self.collisions.push(collision);
    }

    let entry = RegistryEntry {
      handler,
      filters,
      canonical,
      allow_override,
      locked: false,
    };
    let at = existing
      .iter()
      .position(|e| compare_specificity(&entry, e) != Ordering::Greater)
      .unwrap_or(existing.len());
    existing.insert(at, entry);
    true
  }

  fn entry_selected(
    &self,
    facts: Option<&NodeFacts>,
    entry: &RegistryEntry,
    canonical: Option<bool>,
  ) -> bool {
    canonical.is_none_or(|c| entry.canonical == c) && entry.filters.matches(facts, self.mode)
  }

  /// Highest-priority handler whose filters match `facts`. `facts = None`
  /// ignores filters; `canonical = Some(_)` additionally requires that flag.
  pub fn resolve_best(
    &self,
    facts: Option<&NodeFacts>,
    key: &str,
    canonical: Option<bool>,
  ) -> Option<HandlerId> {
    self
      .map
      .get(key)?
      .iter()
      .find(|e| self.entry_selected(facts, e, canonical))
      .map(|e| e.handler.clone())
  }

  /// Every matching handler, in priority order. A handler with several
  /// matching entries appears once per entry.
  pub fn resolve_all(
    &self,
    facts: Option<&NodeFacts>,
    key: &str,
    canonical: Option<bool>,
  ) -> Vec<HandlerId> {
    self
      .map
      .get(key)
      .map(|entries| {
        entries
          .iter()
          .filter(|e| self.entry_selected(facts, e, canonical))
          .map(|e| e.handler.clone())
          .collect()
      })
      .unwrap_or_default()
  }

  /// True when some entry for `key` names `handler` and matches `facts`.
  pub fn entry_matches(&self, facts: Option<&NodeFacts>, key: &str, handler: &HandlerId) -> bool {
    self.map.get(key).is_some_and(|entries| {
      entries
        .iter()
        .any(|e| &e.handler == handler && e.filters.matches(facts, self.mode))
    })
  }

  /// Removes every entry for `handler` under every key. Keys left empty are
  /// removed. Returns what was deleted, by key.
  pub fn remove_handler(&mut self, handler: &HandlerId) -> BTreeMap<String, Vec<RegistryEntry>> {
    let mut deleted = BTreeMap::new();
    for (key, entries) in self.map.iter_mut() {
      let (gone, kept): (Vec<_>, Vec<_>) =
        std::mem::take(entries).into_iter().partition(|e| &e.handler == handler);
      *entries = kept;
      if !gone.is_empty() {
        deleted.insert(key.clone(), gone);
      }
    }
    self.map.retain(|_, entries| !entries.is_empty());
    deleted
  }

  /// Removes canonical entries for `handler` under `key`. Returns the
  /// remaining entries, or `None` when the key is now gone.
  pub fn remove_canonical(&mut self, key: &str, handler: &HandlerId) -> Option<&[RegistryEntry]> {
    let entries = self.map.get_mut(key)?;
    entries.retain(|e| !(e.canonical && &e.handler == handler));
    if entries.is_empty() {
      self.map.remove(key);
      return None;
    }
    self.map.get(key).map(Vec::as_slice)
  }

  /// Marks every current entry locked. Irreversible.
  pub fn lock(&mut self) {
    for entry in self.map.values_mut().flatten() {
      entry.locked = true;
    }
    self.locked = true;
  }

  pub fn is_locked(&self) -> bool {
    self.locked
  }

  pub fn entries(&self, key: &str) -> &[RegistryEntry] {
    self.map.get(key).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.map.keys().map(String::as_str)
  }

  /// Collisions recorded since the registry was created.
  pub fn collisions(&self) -> &[Collision] {
    &self.collisions
  }
}
