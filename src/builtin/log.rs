//! `log` units: write a message to the run log.

use tracing::{debug, error, info, warn};

use crate::engine::ActionContext;
use crate::error::ActionError;
use crate::handler::{Handler, HandlerId};
use crate::types::Unit;

use super::LOG_HANDLER;

pub const ACTION_WRITE: &str = "write";

/// Writes `message` (default: the unit name) at `level` (`debug`, `info`,
/// `warn` or `error`; default `info`). Always reports an update.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHandler;

impl Handler for LogHandler {
  fn supports(&self, _unit: &Unit, action: &str) -> bool {
    action == ACTION_WRITE
  }

  fn supports_why_run(&self) -> bool {
    true
  }

  fn run(&self, ctx: &mut ActionContext<'_, '_>, action: &str) -> Result<bool, ActionError> {
    if action != ACTION_WRITE {
      return Err(ActionError::Unsupported {
        handler: HandlerId::from(LOG_HANDLER),
        action: action.to_string(),
      });
    }
    let unit = ctx.unit();
    let message = unit.properties().get_str("message").unwrap_or(unit.name());
    match unit.properties().get_str("level").unwrap_or("info") {
      "debug" => debug!(target: "converge::log", "{message}"),
      "info" => info!(target: "converge::log", "{message}"),
      "warn" => warn!(target: "converge::log", "{message}"),
      "error" => error!(target: "converge::log", "{message}"),
      other => return Err(ActionError::failed(format!("unknown log level {other:?}"))),
    }
    Ok(true)
  }
}
