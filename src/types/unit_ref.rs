//! Reference to a declared unit by type and name, written `type[name]`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnitError;

/// Reference to a declared unit, e.g. `service[nginx]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnitRef {
  type_name: String,
  name: String,
}

impl UnitRef {
  pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      type_name: type_name.into(),
      name: name.into(),
    }
  }

  pub fn type_name(&self) -> &str {
    &self.type_name
  }

  pub fn name(&self) -> &str {
    &self.name
  }
}

impl fmt::Display for UnitRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}[{}]", self.type_name, self.name)
  }
}

impl FromStr for UnitRef {
  type Err = UnitError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || UnitError::InvalidReference(s.to_string());
    let inner = s.strip_suffix(']').ok_or_else(invalid)?;
    let (type_name, name) = inner.split_once('[').ok_or_else(invalid)?;
    let type_name = type_name.trim();
    if type_name.is_empty() || name.is_empty() {
      return Err(invalid());
    }
    Ok(UnitRef::new(type_name, name))
  }
}

impl TryFrom<String> for UnitRef {
  type Error = UnitError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<UnitRef> for String {
  fn from(value: UnitRef) -> Self {
    value.to_string()
  }
}
