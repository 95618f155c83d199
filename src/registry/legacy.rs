//! Flat platform × version lookup table kept for handlers registered the old
//! way. No specificity ranking: later writes win.

use std::collections::BTreeMap;

use tracing::debug;

use crate::filter::{Requirement, Version};
use crate::handler::HandlerId;
use crate::types::NodeFacts;

type KeyTable = BTreeMap<String, HandlerId>;

#[derive(Debug, Clone, Default)]
struct PlatformTables {
  default: KeyTable,
  /// Version constraint tables in the order they were first written.
  versions: Vec<(String, KeyTable)>,
}

/// Legacy dispatch table: global defaults, per-platform defaults and
/// per-platform version-constraint tables.
#[derive(Debug, Clone, Default)]
pub struct LegacyPlatformMap {
  default: KeyTable,
  platforms: BTreeMap<String, PlatformTables>,
}

/// Lowercase, whitespace replaced with `_`: `Mac OS X` -> `mac_os_x`.
fn normalize_platform(name: &str) -> String {
  name
    .to_lowercase()
    .chars()
    .map(|c| if c.is_whitespace() { '_' } else { c })
    .collect()
}

impl LegacyPlatformMap {
  pub fn new() -> Self {
    Self::default()
  }

  /// Maps `key` to `handler`. With no platform the global default table is
  /// written; with no version, the platform's default table. `version` is a
  /// requirement string such as `>= 13.10`.
  pub fn set(
    &mut self,
    key: impl Into<String>,
    handler: impl Into<HandlerId>,
    platform: Option<&str>,
    version: Option<&str>,
  ) {
    let (key, handler) = (key.into(), handler.into());
    let Some(platform) = platform else {
      self.default.insert(key, handler);
      return;
    };
    let tables = self.platforms.entry(normalize_platform(platform)).or_default();
    match version {
      None => {
        tables.default.insert(key, handler);
      }
      Some(constraint) => {
        match tables.versions.iter_mut().find(|(c, _)| c == constraint) {
          Some((_, table)) => {
            table.insert(key, handler);
          }
          None => {
            let mut table = KeyTable::new();
            table.insert(key, handler);
            tables.versions.push((constraint.to_string(), table));
          }
        }
      }
    }
  }

  /// Merged table for a platform and version: global defaults, then platform
  /// defaults, then every version table whose constraint the version meets.
  pub fn find(&self, platform: &str, version: &str) -> BTreeMap<String, HandlerId> {
    let mut merged = self.default.clone();
    let name = normalize_platform(platform);
    let Some(tables) = self.platforms.get(&name) else {
      debug!(platform = %name, "platform not in legacy map, using defaults");
      return merged;
    };
    merged.extend(tables.default.clone());
    let parsed = version.parse::<Version>();
    for (constraint, table) in &tables.versions {
      let requirement = match constraint.parse::<Requirement>() {
        Ok(r) => r,
        Err(e) => {
          debug!(platform = %name, constraint = %constraint, error = %e, "skipping invalid legacy constraint");
          continue;
        }
      };
      match &parsed {
        Ok(v) if requirement.satisfied_by(v) => {
          debug!(platform = %name, version = %version, constraint = %constraint, "legacy version table matched");
          merged.extend(table.clone());
        }
        Ok(_) => {}
        Err(e) => {
          debug!(platform = %name, version = %version, error = %e, "cannot compare platform version");
        }
      }
    }
    merged
  }

  /// Platform (falling back to `os`) and version (falling back to
  /// `os_version`, then `os_release`) of a node.
  pub fn platform_and_version(facts: &NodeFacts) -> Option<(String, String)> {
    let platform = facts.platform().or_else(|| facts.os())?;
    let version = facts
      .platform_version()
      .or_else(|| facts.get("os_version"))
      .or_else(|| facts.get("os_release"))?;
    Some((platform.to_string(), version.to_string()))
  }

  /// Handler for `key` on this node, if the legacy table has one.
  pub fn lookup(&self, facts: &NodeFacts, key: &str) -> Option<HandlerId> {
    let (platform, version) = Self::platform_and_version(facts)?;
    self.find(&platform, &version).remove(key)
  }

  pub fn is_empty(&self) -> bool {
    self.default.is_empty() && self.platforms.is_empty()
  }
}
