//! Property bag for a unit's declared (or loaded) state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named property values of a unit, with typed getters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
  values: BTreeMap<String, Value>,
}

impl Properties {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.insert(key, value);
    self
  }

  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
    self.values.insert(key.into(), value.into())
  }

  pub fn remove(&mut self, key: &str) -> Option<Value> {
    self.values.remove(key)
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.values.get(key)
  }

  pub fn get_str(&self, key: &str) -> Option<&str> {
    self.get(key).and_then(Value::as_str)
  }

  pub fn get_bool(&self, key: &str) -> Option<bool> {
    self.get(key).and_then(Value::as_bool)
  }

  pub fn get_u64(&self, key: &str) -> Option<u64> {
    self.get(key).and_then(Value::as_u64)
  }

  pub fn get_i64(&self, key: &str) -> Option<i64> {
    self.get(key).and_then(Value::as_i64)
  }

  /// A list of strings; a single string is treated as a one-element list.
  pub fn get_str_list(&self, key: &str) -> Option<Vec<&str>> {
    match self.get(key)? {
      Value::String(s) => Some(vec![s.as_str()]),
      Value::Array(items) => items.iter().map(Value::as_str).collect(),
      _ => None,
    }
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.values.contains_key(key)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.values.keys().map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.values.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Keys whose value differs between `self` and `other` (present in either).
  pub fn diff_keys<'a>(&'a self, other: &'a Properties) -> Vec<&'a str> {
    let mut keys: Vec<&str> = self
      .values
      .keys()
      .chain(other.values.keys())
      .map(String::as_str)
      .filter(|k| self.get(k) != other.get(k))
      .collect();
    keys.sort_unstable();
    keys.dedup();
    keys
  }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Properties {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut props = Properties::new();
    for (k, v) in iter {
      props.insert(k, v);
    }
    props
  }
}
