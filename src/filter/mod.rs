//! Node filters attached to registry entries, and the pure checks that decide
//! whether a node's facts satisfy them.
//!
//! Every check takes `Option<&NodeFacts>`; `None` means "ignore all filters"
//! and always matches. That mode is used to list every handler registered for
//! a key regardless of the node.

mod version;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{FactAttribute, NodeFacts};

pub use version::{Operator, Requirement, Version};

/// Allow-list token that matches any fact value, including a missing one.
pub const MATCH_ANY: &str = "*";

/// Arbitrary node predicate attached to a registration.
pub type NodePredicate = Arc<dyn Fn(&NodeFacts) -> bool + Send + Sync>;

/// Whether the engine converges the local machine or a remote target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
  #[default]
  Agent,
  Target,
}

/// Filters of one registry entry.
///
/// `os`, `platform` and `platform_family` hold allow values and `!`-prefixed
/// deny values. `platform_version` matches when any requirement is satisfied.
#[derive(Clone)]
pub struct FilterSet {
  pub os: Vec<String>,
  pub platform: Vec<String>,
  pub platform_family: Vec<String>,
  pub platform_version: Vec<Requirement>,
  pub predicate: Option<NodePredicate>,
  /// Entry may be used when converging a remote target.
  pub target_mode: bool,
  /// Entry may be used when converging the local machine.
  pub agent_mode: bool,
}

impl Default for FilterSet {
  fn default() -> Self {
    Self {
      os: Vec::new(),
      platform: Vec::new(),
      platform_family: Vec::new(),
      platform_version: Vec::new(),
      predicate: None,
      target_mode: false,
      agent_mode: true,
    }
  }
}

fn strings<I, S>(values: I) -> Vec<String>
where
  I: IntoIterator<Item = S>,
  S: Into<String>,
{
  values.into_iter().map(Into::into).collect()
}

impl FilterSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn os<I, S>(mut self, values: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.os = strings(values);
    self
  }

  pub fn platform<I, S>(mut self, values: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.platform = strings(values);
    self
  }

  pub fn platform_family<I, S>(mut self, values: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.platform_family = strings(values);
    self
  }

  pub fn platform_version(mut self, requirements: impl IntoIterator<Item = Requirement>) -> Self {
    self.platform_version = requirements.into_iter().collect();
    self
  }

  pub fn predicate(mut self, predicate: impl Fn(&NodeFacts) -> bool + Send + Sync + 'static) -> Self {
    self.predicate = Some(Arc::new(predicate));
    self
  }

  pub fn target_mode(mut self, enabled: bool) -> Self {
    self.target_mode = enabled;
    self
  }

  pub fn agent_mode(mut self, enabled: bool) -> Self {
    self.agent_mode = enabled;
    self
  }

  /// Allow/deny values for a string attribute. `PlatformVersion` has none.
  pub fn values(&self, attribute: FactAttribute) -> &[String] {
    match attribute {
      FactAttribute::Os => &self.os,
      FactAttribute::Platform => &self.platform,
      FactAttribute::PlatformFamily => &self.platform_family,
      FactAttribute::PlatformVersion => &[],
    }
  }

  /// Static filters and predicate together.
  pub fn matches(&self, facts: Option<&NodeFacts>, mode: ExecutionMode) -> bool {
    filters_satisfied(facts, self, mode) && matches_predicate(facts, self.predicate.as_ref())
  }
}

impl fmt::Debug for FilterSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FilterSet")
      .field("os", &self.os)
      .field("platform", &self.platform)
      .field("platform_family", &self.platform_family)
      .field("platform_version", &self.platform_version)
      .field("predicate", &self.predicate.as_ref().map(|_| "<fn>"))
      .field("target_mode", &self.target_mode)
      .field("agent_mode", &self.agent_mode)
      .finish()
  }
}

fn is_deny(value: &str) -> bool {
  value.starts_with('!')
}

/// Deny values (`!x`) always win; otherwise matches when there is no allow
/// value or any allow value equals the fact (or is [MATCH_ANY]).
pub fn matches_allow_deny(
  facts: Option<&NodeFacts>,
  filter_values: &[String],
  attribute: FactAttribute,
) -> bool {
  let Some(facts) = facts else {
    return true;
  };
  if filter_values.is_empty() {
    return true;
  }
  let value = facts.attribute(attribute);
  let (deny, allow): (Vec<&String>, Vec<&String>) =
    filter_values.iter().partition(|v| is_deny(v));
  if deny.iter().any(|v| Some(&v[1..]) == value) {
    return false;
  }
  allow.is_empty()
    || allow
      .iter()
      .any(|v| v.as_str() == MATCH_ANY || Some(v.as_str()) == value)
}

/// True when the fact's version satisfies any requirement. A missing or
/// unparsable fact value never matches a non-empty list.
pub fn matches_version_range(
  facts: Option<&NodeFacts>,
  requirements: &[Requirement],
  attribute: FactAttribute,
) -> bool {
  let Some(facts) = facts else {
    return true;
  };
  if requirements.is_empty() {
    return true;
  }
  let Some(raw) = facts.attribute(attribute) else {
    return false;
  };
  match raw.parse::<Version>() {
    Ok(version) => requirements.iter().any(|r| r.satisfied_by(&version)),
    Err(e) => {
      debug!(attribute = %attribute, value = %raw, error = %e, "fact is not a version");
      false
    }
  }
}

pub fn matches_predicate(facts: Option<&NodeFacts>, predicate: Option<&NodePredicate>) -> bool {
  match (facts, predicate) {
    (Some(facts), Some(predicate)) => predicate(facts),
    _ => true,
  }
}

/// In target mode only `target_mode` entries pass; otherwise only
/// `agent_mode` entries do.
pub fn matches_mode(filters: &FilterSet, mode: ExecutionMode) -> bool {
  match mode {
    ExecutionMode::Target => filters.target_mode,
    ExecutionMode::Agent => filters.agent_mode,
  }
}

/// All static filters of `filters` (everything except the predicate).
pub fn filters_satisfied(facts: Option<&NodeFacts>, filters: &FilterSet, mode: ExecutionMode) -> bool {
  if facts.is_none() {
    return true;
  }
  matches_allow_deny(facts, &filters.os, FactAttribute::Os)
    && matches_allow_deny(facts, &filters.platform_family, FactAttribute::PlatformFamily)
    && matches_allow_deny(facts, &filters.platform, FactAttribute::Platform)
    && matches_version_range(facts, &filters.platform_version, FactAttribute::PlatformVersion)
    && matches_mode(filters, mode)
}
