//! Dot-separated numeric versions and operator+version requirements.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::FilterError;

static REQUIREMENT_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^\s*(=|!=|>=|<=|>|<|~>)?\s*([0-9]+(?:\.[0-9]+)*)\s*$")
    .expect("requirement pattern is valid")
});

/// A version such as `22.04` or `7.9.2009`. Missing trailing components
/// compare as zero, so `2` == `2.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(Vec<u64>);

impl Version {
  pub fn new(components: Vec<u64>) -> Self {
    Self(components)
  }

  pub fn components(&self) -> &[u64] {
    &self.0
  }

  fn component(&self, i: usize) -> u64 {
    self.0.get(i).copied().unwrap_or(0)
  }

  /// Upper bound for `~>`: drop the last component (when there is more than
  /// one) and increment the new last one. `~> 2.3.1` => `2.4`, `~> 2` => `3`.
  /// A component at `u64::MAX` carries into the one before it; `None` when
  /// nothing is left to increment, meaning no upper bound.
  fn pessimistic_bound(&self) -> Option<Version> {
    let mut parts = self.0.clone();
    if parts.len() > 1 {
      parts.pop();
    }
    while let Some(last) = parts.pop() {
      if let Some(next) = last.checked_add(1) {
        parts.push(next);
        return Some(Version(parts));
      }
    }
    None
  }
}

impl PartialEq for Version {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for Version {}

impl PartialOrd for Version {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Version {
  fn cmp(&self, other: &Self) -> Ordering {
    let len = self.0.len().max(other.0.len());
    (0..len)
      .map(|i| self.component(i).cmp(&other.component(i)))
      .find(|o| o.is_ne())
      .unwrap_or(Ordering::Equal)
  }
}

impl FromStr for Version {
  type Err = FilterError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
      return Err(FilterError::InvalidVersion(s.to_string()));
    }
    trimmed
      .split('.')
      .map(|part| part.parse::<u64>())
      .collect::<Result<Vec<_>, _>>()
      .map(Version)
      .map_err(|_| FilterError::InvalidVersion(s.to_string()))
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
    f.write_str(&parts.join("."))
  }
}

impl TryFrom<String> for Version {
  type Error = FilterError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<Version> for String {
  fn from(value: Version) -> Self {
    value.to_string()
  }
}

/// Comparison operator of a [Requirement].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
  Eq,
  NotEq,
  Gt,
  Lt,
  Ge,
  Le,
  /// `~>`: at least this version, below the next "major" at its precision.
  Pessimistic,
}

impl Operator {
  fn parse(token: Option<&str>) -> Operator {
    match token {
      Some("!=") => Operator::NotEq,
      Some(">") => Operator::Gt,
      Some("<") => Operator::Lt,
      Some(">=") => Operator::Ge,
      Some("<=") => Operator::Le,
      Some("~>") => Operator::Pessimistic,
      _ => Operator::Eq,
    }
  }

  fn as_str(self) -> &'static str {
    match self {
      Operator::Eq => "=",
      Operator::NotEq => "!=",
      Operator::Gt => ">",
      Operator::Lt => "<",
      Operator::Ge => ">=",
      Operator::Le => "<=",
      Operator::Pessimistic => "~>",
    }
  }
}

/// A single constraint such as `>= 2.0` or `~> 10.4`. A bare version means `=`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Requirement {
  op: Operator,
  version: Version,
}

impl Requirement {
  pub fn new(op: Operator, version: Version) -> Self {
    Self { op, version }
  }

  pub fn operator(&self) -> Operator {
    self.op
  }

  pub fn version(&self) -> &Version {
    &self.version
  }

  pub fn satisfied_by(&self, candidate: &Version) -> bool {
    match self.op {
      Operator::Eq => candidate == &self.version,
      Operator::NotEq => candidate != &self.version,
      Operator::Gt => candidate > &self.version,
      Operator::Lt => candidate < &self.version,
      Operator::Ge => candidate >= &self.version,
      Operator::Le => candidate <= &self.version,
      Operator::Pessimistic => {
        candidate >= &self.version
          && self.version.pessimistic_bound().is_none_or(|bound| candidate < &bound)
      }
    }
  }
}

impl FromStr for Requirement {
  type Err = FilterError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let caps = REQUIREMENT_RE
      .captures(s)
      .ok_or_else(|| FilterError::InvalidRequirement(s.to_string()))?;
    let op = Operator::parse(caps.get(1).map(|m| m.as_str()));
    let version = caps
      .get(2)
      .ok_or_else(|| FilterError::InvalidRequirement(s.to_string()))?
      .as_str()
      .parse()?;
    Ok(Requirement { op, version })
  }
}

impl fmt::Display for Requirement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.op.as_str(), self.version)
  }
}

impl TryFrom<String> for Requirement {
  type Error = FilterError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<Requirement> for String {
  fn from(value: Requirement) -> Self {
    value.to_string()
  }
}
