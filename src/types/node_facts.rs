//! Read-only facts describing the node being converged.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Node attributes that registry filters can be written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactAttribute {
  Os,
  Platform,
  PlatformFamily,
  PlatformVersion,
}

impl FactAttribute {
  /// Fact key this attribute is read from.
  pub fn key(self) -> &'static str {
    match self {
      FactAttribute::Os => "os",
      FactAttribute::Platform => "platform",
      FactAttribute::PlatformFamily => "platform_family",
      FactAttribute::PlatformVersion => "platform_version",
    }
  }
}

impl fmt::Display for FactAttribute {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.key())
  }
}

/// Key/value view of the current machine (platform, os, versions and any other
/// collected attribute). The engine only ever reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeFacts {
  values: BTreeMap<String, String>,
}

impl NodeFacts {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder-style insert.
  pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.insert(key, value);
    self
  }

  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.values.insert(key.into(), value.into());
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.values.get(key).map(String::as_str)
  }

  pub fn attribute(&self, attribute: FactAttribute) -> Option<&str> {
    self.get(attribute.key())
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.values.contains_key(key)
  }

  pub fn os(&self) -> Option<&str> {
    self.attribute(FactAttribute::Os)
  }

  pub fn platform(&self) -> Option<&str> {
    self.attribute(FactAttribute::Platform)
  }

  pub fn platform_family(&self) -> Option<&str> {
    self.attribute(FactAttribute::PlatformFamily)
  }

  pub fn platform_version(&self) -> Option<&str> {
    self.attribute(FactAttribute::PlatformVersion)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NodeFacts {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut facts = NodeFacts::new();
    for (k, v) in iter {
      facts.insert(k, v);
    }
    facts
  }
}
