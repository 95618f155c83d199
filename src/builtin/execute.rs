//! `execute` units: run a shell command.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::engine::ActionContext;
use crate::error::ActionError;
use crate::handler::{Handler, HandlerId};
use crate::shell::run_shell_output;
use crate::types::{Properties, Unit};

use super::EXECUTE_HANDLER;

pub const ACTION_RUN: &str = "run";

/// Runs `command` (default: the unit name) through `sh -c`.
///
/// Properties: `cwd`, `creates` (skip when this path exists) and `returns`
/// (accepted exit codes, a number or a list; default `0`). In why-run mode
/// the command is not run and the unit reports the update it would make.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecuteHandler;

fn accepted_codes(props: &Properties) -> Result<Vec<i64>, ActionError> {
  match props.get("returns") {
    None => Ok(vec![0]),
    Some(Value::Number(n)) => n
      .as_i64()
      .map(|c| vec![c])
      .ok_or_else(|| ActionError::failed(format!("invalid returns value {n}"))),
    Some(Value::Array(items)) => items
      .iter()
      .map(|v| {
        v.as_i64()
          .ok_or_else(|| ActionError::failed(format!("invalid returns value {v}")))
      })
      .collect(),
    Some(other) => Err(ActionError::failed(format!("invalid returns value {other}"))),
  }
}

fn command_of(unit: &Unit) -> &str {
  unit.properties().get_str("command").unwrap_or(unit.name())
}

impl Handler for ExecuteHandler {
  fn supports(&self, _unit: &Unit, action: &str) -> bool {
    action == ACTION_RUN
  }

  fn supports_why_run(&self) -> bool {
    true
  }

  fn run(&self, ctx: &mut ActionContext<'_, '_>, action: &str) -> Result<bool, ActionError> {
    if action != ACTION_RUN {
      return Err(ActionError::Unsupported {
        handler: HandlerId::from(EXECUTE_HANDLER),
        action: action.to_string(),
      });
    }
    let unit = ctx.unit();
    let command = command_of(unit);
    if let Some(creates) = unit.properties().get_str("creates") {
      if Path::new(creates).exists() {
        debug!(unit = %unit.reference(), creates = %creates, "target exists, not running");
        return Ok(false);
      }
    }
    let accepted = accepted_codes(unit.properties())?;
    if ctx.why_run() {
      info!(unit = %unit.reference(), command = %command, "would run command");
      return Ok(true);
    }

    let cwd = unit.properties().get_str("cwd").map(Path::new);
    let output = run_shell_output(command, cwd)?;
    let code = output.status.code();
    if !code.is_some_and(|c| accepted.contains(&i64::from(c))) {
      debug!(
        command = %command,
        stderr = %String::from_utf8_lossy(&output.stderr),
        "command failed"
      );
      return Err(ActionError::Command {
        command: command.to_string(),
        code,
      });
    }
    info!(unit = %unit.reference(), command = %command, "ran command");
    Ok(true)
  }
}
