//! What a handler sees while running an action.

use super::{ConvergenceEngine, UnitCollection};
use crate::config::EngineConfig;
use crate::error::ActionError;
use crate::types::{NodeFacts, Properties, Unit};

/// Borrowed view of the running engine handed to [crate::handler::Handler::run].
pub struct ActionContext<'a, 'r> {
  engine: &'a mut ConvergenceEngine<'r>,
  unit: &'a Unit,
  action: &'a str,
  current: Option<&'a Properties>,
}

impl<'a, 'r> ActionContext<'a, 'r> {
  pub(crate) fn new(
    engine: &'a mut ConvergenceEngine<'r>,
    unit: &'a Unit,
    action: &'a str,
    current: Option<&'a Properties>,
  ) -> Self {
    Self {
      engine,
      unit,
      action,
      current,
    }
  }

  pub fn unit(&self) -> &Unit {
    self.unit
  }

  pub fn action(&self) -> &str {
    self.action
  }

  /// State loaded by the handler before the action ran.
  pub fn current_state(&self) -> Option<&Properties> {
    self.current
  }

  pub fn facts(&self) -> &NodeFacts {
    self.engine.facts()
  }

  pub fn config(&self) -> &EngineConfig {
    self.engine.config()
  }

  pub fn why_run(&self) -> bool {
    self.engine.config().why_run
  }

  /// Converges `units` as children of the current unit: one nesting level
  /// deeper, with their own delayed queue, through the same resolver and
  /// event sinks.
  pub fn converge_nested(&mut self, units: &mut UnitCollection) -> Result<(), ActionError> {
    self
      .engine
      .converge_nested(units)
      .map_err(|e| ActionError::Nested(Box::new(e)))
  }
}
