//! Engine configuration: defaults, JSON and environment overrides.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::filter::{ExecutionMode, Version};

pub const ENV_WHY_RUN: &str = "CONVERGE_WHY_RUN";
pub const ENV_TARGET_MODE: &str = "CONVERGE_TARGET_MODE";
pub const ENV_MAX_NOTIFICATION_DEPTH: &str = "CONVERGE_MAX_NOTIFICATION_DEPTH";

/// Default bound on immediate-notification recursion.
pub const DEFAULT_MAX_NOTIFICATION_DEPTH: usize = 64;

fn default_max_notification_depth() -> usize {
  DEFAULT_MAX_NOTIFICATION_DEPTH
}

fn default_client_version() -> String {
  env!("CARGO_PKG_VERSION").to_string()
}

/// Options for a convergence run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Dry run: handlers without why-run support are bypassed.
  pub why_run: bool,
  /// Converging a remote target rather than the local machine.
  pub target_mode: bool,
  /// Immediate notifications nested deeper than this fail the run.
  #[serde(default = "default_max_notification_depth")]
  pub max_notification_depth: usize,
  /// Version matched against client-version constrained registrations.
  #[serde(default = "default_client_version")]
  pub client_version: String,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      why_run: false,
      target_mode: false,
      max_notification_depth: default_max_notification_depth(),
      client_version: default_client_version(),
    }
  }
}

fn parse_flag(name: &str, raw: &str) -> Option<bool> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Some(true),
    "0" | "false" | "no" | "off" | "" => Some(false),
    _ => {
      warn!(variable = %name, value = %raw, "ignoring unrecognised boolean");
      None
    }
  }
}

impl EngineConfig {
  /// Defaults with `CONVERGE_*` environment overrides applied.
  pub fn from_env() -> Self {
    Self::default().with_overrides(|key| std::env::var(key).ok())
  }

  pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(json)
  }

  /// Applies overrides read through `lookup` (an environment, or a map in
  /// tests). Unparsable values are logged and ignored.
  pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
    if let Some(v) = lookup(ENV_WHY_RUN).and_then(|raw| parse_flag(ENV_WHY_RUN, &raw)) {
      self.why_run = v;
    }
    if let Some(v) = lookup(ENV_TARGET_MODE).and_then(|raw| parse_flag(ENV_TARGET_MODE, &raw)) {
      self.target_mode = v;
    }
    if let Some(raw) = lookup(ENV_MAX_NOTIFICATION_DEPTH) {
      match raw.trim().parse::<usize>() {
        Ok(depth) => self.max_notification_depth = depth,
        Err(e) => warn!(
          variable = ENV_MAX_NOTIFICATION_DEPTH,
          value = %raw,
          error = %e,
          "ignoring invalid notification depth"
        ),
      }
    }
    self
  }

  pub fn mode(&self) -> ExecutionMode {
    if self.target_mode {
      ExecutionMode::Target
    } else {
      ExecutionMode::Agent
    }
  }

  /// [Self::client_version] parsed, if it is a plain numeric version.
  pub fn client_version(&self) -> Option<Version> {
    self.client_version.parse().ok()
  }
}
