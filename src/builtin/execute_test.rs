//! Tests for `ExecuteHandler`.

use super::{EXECUTE_HANDLER, register_builtins};
use crate::config::EngineConfig;
use crate::engine::{ConvergenceEngine, UnitCollection};
use crate::error::{ActionError, ConvergeError};
use crate::handler::HandlerCatalog;
use crate::registry::HandlerRegistry;
use crate::resolver::HandlerResolver;
use crate::types::{NodeFacts, OutcomeStatus, Unit};

fn run(config: EngineConfig, unit: Unit) -> (Result<(), ConvergeError>, Vec<OutcomeStatus>) {
  let mut registry = HandlerRegistry::new();
  let mut catalog = HandlerCatalog::new();
  register_builtins(&mut registry, &mut catalog);
  registry.lock();
  let facts = NodeFacts::new().with("platform", "ubuntu");
  let mut engine = ConvergenceEngine::new(HandlerResolver::new(&registry, &catalog), &facts, config);
  let mut units = UnitCollection::new().with(unit);
  let result = engine.converge(&mut units);
  let statuses = engine.tracker().top_level().iter().map(|r| r.status).collect();
  (result, statuses)
}

#[test]
fn runs_command_in_cwd() {
  let dir = tempfile::tempdir().unwrap();
  let unit = Unit::builder("execute", "touch marker")
    .action("run")
    .property("cwd", dir.path().to_str().unwrap())
    .build()
    .unwrap();
  let (result, statuses) = run(EngineConfig::default(), unit);
  result.unwrap();
  assert_eq!(statuses, vec![OutcomeStatus::Updated]);
  assert!(dir.path().join("marker").exists());
}

#[test]
fn creates_makes_it_idempotent() {
  let dir = tempfile::tempdir().unwrap();
  let marker = dir.path().join("marker");
  std::fs::write(&marker, "").unwrap();
  let unit = Unit::builder("execute", "build")
    .action("run")
    .property("command", "exit 1")
    .property("creates", marker.to_str().unwrap())
    .build()
    .unwrap();
  let (result, statuses) = run(EngineConfig::default(), unit);
  result.unwrap();
  assert_eq!(statuses, vec![OutcomeStatus::UpToDate]);
}

#[test]
fn non_zero_exit_fails() {
  let unit = Unit::builder("execute", "fail")
    .action("run")
    .property("command", "exit 3")
    .build()
    .unwrap();
  let (result, statuses) = run(EngineConfig::default(), unit);
  let err = result.unwrap_err();
  assert!(matches!(
    err.action_error(),
    Some(ActionError::Command { code: Some(3), .. })
  ));
  assert!(err.to_string().ends_with("command `exit 3` exited with status 3"));
  assert_eq!(statuses, vec![OutcomeStatus::Failed]);
}

#[test]
fn accepted_exit_codes() {
  let unit = Unit::builder("execute", "grep")
    .action("run")
    .property("command", "exit 1")
    .property("returns", serde_json::json!([0, 1]))
    .build()
    .unwrap();
  let (result, _) = run(EngineConfig::default(), unit);
  result.unwrap();
}

#[test]
fn why_run_does_not_execute() {
  let dir = tempfile::tempdir().unwrap();
  let unit = Unit::builder("execute", "touch marker")
    .action("run")
    .property("cwd", dir.path().to_str().unwrap())
    .build()
    .unwrap();
  let config = EngineConfig {
    why_run: true,
    ..EngineConfig::default()
  };
  let (result, statuses) = run(config, unit);
  result.unwrap();
  assert_eq!(statuses, vec![OutcomeStatus::Updated]);
  assert!(!dir.path().join("marker").exists());
}

#[test]
fn unsupported_action() {
  let unit = Unit::builder("execute", "x").action("frobnicate").build().unwrap();
  let (result, _) = run(EngineConfig::default(), unit);
  match result.unwrap_err().action_error() {
    Some(ActionError::Unsupported { handler, action }) => {
      assert_eq!(handler.as_str(), EXECUTE_HANDLER);
      assert_eq!(action, "frobnicate");
    }
    other => panic!("unexpected error: {other:?}"),
  }
}
