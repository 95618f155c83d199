//! Tests for `ConvergenceEngine`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{ConvergenceEngine, UnitCollection};
use crate::config::EngineConfig;
use crate::error::{ActionError, ConvergeError, ResolutionError, SinkError};
use crate::events::{Event, EventSink};
use crate::handler::{Handler, HandlerCatalog};
use crate::registry::{HandlerRegistry, Provides};
use crate::resolver::HandlerResolver;
use crate::tracker::OutcomeTracker;
use crate::types::{Guard, NodeFacts, OutcomeStatus, Properties, Timing, Unit, UnitRef};

use super::ActionContext;

#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
  fn record(&self, entry: String) -> usize {
    let mut entries = self.0.lock().unwrap();
    let before = entries.iter().filter(|e| **e == entry).count();
    entries.push(entry);
    before
  }

  fn entries(&self) -> Vec<String> {
    self.0.lock().unwrap().clone()
  }
}

/// Journals every run. Fails the first `fail_times` attempts of a unit
/// action; reports a change unless the unit sets `changes = false`.
struct Scripted {
  journal: Journal,
}

impl Handler for Scripted {
  fn load_current_state(&self, unit: &Unit) -> Result<Option<Properties>, ActionError> {
    Ok(unit.properties().contains_key("stateful").then(|| Properties::new().with("present", false)))
  }

  fn run(&self, ctx: &mut ActionContext<'_, '_>, action: &str) -> Result<bool, ActionError> {
    let unit = ctx.unit();
    let previous = self.journal.record(format!("{}:{action}", unit.reference()));
    let fail_times = unit.properties().get_u64("fail_times").unwrap_or(0);
    if (previous as u64) < fail_times {
      return Err(ActionError::failed("transient"));
    }
    Ok(unit.properties().get_bool("changes").unwrap_or(true))
  }
}

/// Converges one `file` child per name listed in `children`; children named
/// `bad*` always fail.
struct Composite {
  journal: Journal,
}

impl Handler for Composite {
  fn run(&self, ctx: &mut ActionContext<'_, '_>, action: &str) -> Result<bool, ActionError> {
    self.journal.record(format!("{}:{action}", ctx.unit().reference()));
    let names: Vec<String> = ctx
      .unit()
      .properties()
      .get_str_list("children")
      .unwrap_or_default()
      .into_iter()
      .map(str::to_string)
      .collect();
    let mut children: UnitCollection = names
      .iter()
      .map(|n| {
        let child = Unit::builder("file", n.as_str()).action("create");
        if n.starts_with("bad") {
          child.property("fail_times", 100).build()
        } else {
          child.build()
        }
      })
      .collect::<Result<_, _>>()
      .map_err(|e| ActionError::failed(e.to_string()))?;
    ctx.converge_nested(&mut children)?;
    Ok(children.iter().any(Unit::updated))
  }
}

/// Like `Scripted`, but can preview itself: a why-run call journals
/// `preview <unit>:<action>` and changes nothing.
struct Previewing {
  journal: Journal,
}

impl Handler for Previewing {
  fn supports_why_run(&self) -> bool {
    true
  }

  fn run(&self, ctx: &mut ActionContext<'_, '_>, action: &str) -> Result<bool, ActionError> {
    let unit = ctx.unit();
    let entry = format!("{}:{action}", unit.reference());
    if ctx.why_run() {
      self.journal.record(format!("preview {entry}"));
    } else {
      self.journal.record(entry);
    }
    Ok(unit.properties().get_bool("changes").unwrap_or(true))
  }
}

/// Rejects `resource_action_start` for one unit.
struct RejectStart {
  unit: UnitRef,
}

impl EventSink for RejectStart {
  fn name(&self) -> &str {
    "reject-start"
  }

  fn handle(&mut self, event: &Event<'_>) -> Result<(), SinkError> {
    if matches!(event, Event::ActionStart { unit, .. } if unit.reference() == self.unit) {
      return Err(SinkError::new("reject-start", "refused"));
    }
    Ok(())
  }
}

struct RecordingSink {
  seen: Arc<Mutex<Vec<String>>>,
  fail_on: Option<&'static str>,
}

impl EventSink for RecordingSink {
  fn name(&self) -> &str {
    "recording"
  }

  fn handle(&mut self, event: &Event<'_>) -> Result<(), SinkError> {
    self.seen.lock().unwrap().push(event.name().to_string());
    if self.fail_on == Some(event.name()) {
      return Err(SinkError::new("recording", "rejected"));
    }
    Ok(())
  }
}

struct Fixture {
  registry: HandlerRegistry,
  catalog: HandlerCatalog,
  facts: NodeFacts,
  journal: Journal,
}

fn fixture() -> Fixture {
  let journal = Journal::default();
  let mut registry = HandlerRegistry::new();
  for key in ["package", "service", "template", "file"] {
    registry.register(Provides::new(key, "scripted"));
  }
  registry.register(Provides::new("composite", "composite"));
  registry.register(Provides::new("config", "previewing"));
  let catalog = HandlerCatalog::new()
    .with("previewing", Previewing { journal: journal.clone() })
    .with("scripted", Scripted { journal: journal.clone() })
    .with("composite", Composite { journal: journal.clone() });
  Fixture {
    registry,
    catalog,
    facts: NodeFacts::new().with("platform", "ubuntu").with("platform_version", "22.04"),
    journal,
  }
}

fn converge(
  f: &Fixture,
  config: EngineConfig,
  units: &mut UnitCollection,
) -> (Result<(), ConvergeError>, OutcomeTracker) {
  let resolver = HandlerResolver::new(&f.registry, &f.catalog);
  let mut engine = ConvergenceEngine::new(resolver, &f.facts, config);
  let result = engine.converge(units);
  (result, engine.into_tracker())
}

fn r(type_name: &str, name: &str) -> UnitRef {
  UnitRef::new(type_name, name)
}

fn statuses(tracker: &OutcomeTracker) -> Vec<(String, OutcomeStatus)> {
  tracker
    .top_level()
    .iter()
    .map(|rec| (format!("{}:{}", rec.unit, rec.action), rec.status))
    .collect()
}

#[test]
fn immediate_notification_runs_before_next_unit() {
  let f = fixture();
  let mut units = UnitCollection::new()
    .with(
      Unit::builder("template", "nginx.conf")
        .action("create")
        .notifies("restart", r("service", "nginx"), Timing::Immediate)
        .build()
        .unwrap(),
    )
    .with(Unit::builder("file", "index.html").action("create").build().unwrap())
    .with(Unit::builder("service", "nginx").build().unwrap());

  let (result, tracker) = converge(&f, EngineConfig::default(), &mut units);
  result.unwrap();
  assert_eq!(
    f.journal.entries(),
    vec![
      "template[nginx.conf]:create",
      "service[nginx]:restart",
      "file[index.html]:create"
    ]
  );
  assert!(units.get(&r("service", "nginx")).unwrap().updated());
  assert_eq!(
    statuses(&tracker),
    vec![
      ("template[nginx.conf]:create".to_string(), OutcomeStatus::Updated),
      ("service[nginx]:restart".to_string(), OutcomeStatus::Updated),
      ("file[index.html]:create".to_string(), OutcomeStatus::Updated),
      ("service[nginx]:nothing".to_string(), OutcomeStatus::Skipped),
    ]
  );
}

#[test]
fn delayed_notifications_are_deduplicated_and_run_after_batch() {
  let f = fixture();
  let mut units = UnitCollection::new()
    .with(
      Unit::builder("template", "a.conf")
        .action("create")
        .notifies("reload", r("service", "nginx"), Timing::Delayed)
        .build()
        .unwrap(),
    )
    .with(
      Unit::builder("template", "b.conf")
        .action("create")
        .notifies("reload", r("service", "nginx"), Timing::Delayed)
        .build()
        .unwrap(),
    )
    .with(Unit::builder("service", "nginx").build().unwrap());

  let (result, _) = converge(&f, EngineConfig::default(), &mut units);
  result.unwrap();
  assert_eq!(
    f.journal.entries(),
    vec![
      "template[a.conf]:create",
      "template[b.conf]:create",
      "service[nginx]:reload"
    ]
  );
}

#[test]
fn notifications_need_an_update() {
  let f = fixture();
  let mut units = UnitCollection::new()
    .with(
      Unit::builder("template", "a.conf")
        .action("create")
        .property("changes", false)
        .notifies("restart", r("service", "nginx"), Timing::Immediate)
        .notifies("reload", r("service", "nginx"), Timing::Delayed)
        .build()
        .unwrap(),
    )
    .with(Unit::builder("service", "nginx").build().unwrap());

  let (result, tracker) = converge(&f, EngineConfig::default(), &mut units);
  result.unwrap();
  assert_eq!(f.journal.entries(), vec!["template[a.conf]:create"]);
  assert_eq!(tracker.top_level()[0].status, OutcomeStatus::UpToDate);
}

#[test]
fn retries_then_succeeds() {
  let f = fixture();
  let mut units = UnitCollection::new().with(
    Unit::builder("package", "curl")
      .action("install")
      .property("fail_times", 1)
      .retries(2)
      .retry_delay(Duration::ZERO)
      .build()
      .unwrap(),
  );
  let (result, tracker) = converge(&f, EngineConfig::default(), &mut units);
  result.unwrap();
  assert_eq!(f.journal.entries().len(), 2);
  assert_eq!(tracker.top_level()[0].status, OutcomeStatus::Updated);
}

#[test]
fn retries_exhausted_propagates_with_unit_context() {
  let f = fixture();
  let mut units = UnitCollection::new().with(
    Unit::builder("package", "curl")
      .action("install")
      .property("fail_times", 100)
      .retries(2)
      .retry_delay(Duration::ZERO)
      .defined_at("base.rs:7")
      .build()
      .unwrap(),
  );
  let (result, tracker) = converge(&f, EngineConfig::default(), &mut units);
  let err = result.unwrap_err();
  assert_eq!(f.journal.entries().len(), 3);
  assert_eq!(
    err.to_string(),
    "package[curl] (base.rs:7) had an error: ActionError::Failed: transient"
  );
  assert!(matches!(err.action_error(), Some(ActionError::Failed(m)) if m == "transient"));
  let record = &tracker.top_level()[0];
  assert_eq!(record.status, OutcomeStatus::Failed);
  assert_eq!(record.failure.as_deref(), Some("transient"));
}

#[test]
fn ignore_failure_continues() {
  let f = fixture();
  let mut units = UnitCollection::new()
    .with(
      Unit::builder("package", "flaky")
        .action("install")
        .property("fail_times", 100)
        .retries(3)
        .ignore_failure(true)
        .build()
        .unwrap(),
    )
    .with(Unit::builder("file", "next").action("create").build().unwrap());
  let (result, tracker) = converge(&f, EngineConfig::default(), &mut units);
  result.unwrap();
  // ignore_failure wins over retries: one attempt only
  assert_eq!(f.journal.entries(), vec!["package[flaky]:install", "file[next]:create"]);
  assert_eq!(
    statuses(&tracker),
    vec![
      ("package[flaky]:install".to_string(), OutcomeStatus::Failed),
      ("file[next]:create".to_string(), OutcomeStatus::Updated),
    ]
  );
}

#[test]
fn batch_and_delayed_failures_are_combined() {
  let f = fixture();
  let mut units = UnitCollection::new()
    .with(
      Unit::builder("template", "a.conf")
        .action("create")
        .notifies("reload", r("service", "nginx"), Timing::Delayed)
        .build()
        .unwrap(),
    )
    .with(
      Unit::builder("package", "broken")
        .action("install")
        .property("fail_times", 100)
        .build()
        .unwrap(),
    )
    .with(Unit::builder("file", "never").action("create").build().unwrap())
    .with(
      Unit::builder("service", "nginx")
        .property("fail_times", 100)
        .build()
        .unwrap(),
    );

  let (result, tracker) = converge(&f, EngineConfig::default(), &mut units);
  let err = result.unwrap_err();
  let ConvergeError::Multiple(failures) = &err else {
    panic!("expected a composite failure, got {err}");
  };
  assert_eq!(failures.len(), 2);
  assert_eq!(
    err.to_string(),
    "Multiple failures occurred:\n\
     * ActionError::Failed occurred in converge run: package[broken] (dynamically defined) had an error: ActionError::Failed: transient\n\
     * ActionError::Failed occurred in delayed notification: service[nginx] (dynamically defined) had an error: ActionError::Failed: transient\n"
  );
  assert_eq!(failures.backtrace().len(), 2);
  assert_eq!(
    f.journal.entries(),
    vec!["template[a.conf]:create", "package[broken]:install", "service[nginx]:reload"]
  );
  let unprocessed: Vec<_> = tracker
    .filtered(0, &[OutcomeStatus::Unprocessed])
    .iter()
    .map(|rec| rec.unit.clone())
    .collect();
  assert_eq!(unprocessed, vec![r("file", "never"), r("service", "nginx")]);
}

#[test]
fn single_delayed_failure_is_returned_as_is() {
  let f = fixture();
  let mut units = UnitCollection::new()
    .with(
      Unit::builder("template", "a.conf")
        .action("create")
        .notifies("reload", r("service", "nginx"), Timing::Delayed)
        .build()
        .unwrap(),
    )
    .with(
      Unit::builder("service", "nginx")
        .property("fail_times", 100)
        .build()
        .unwrap(),
    );
  let (result, _) = converge(&f, EngineConfig::default(), &mut units);
  assert!(matches!(result, Err(ConvergeError::Action { ref unit, .. }) if *unit == r("service", "nginx")));
}

#[test]
fn unprocessed_units_after_abort() {
  let f = fixture();
  let mut units: UnitCollection = (0..6)
    .map(|i| {
      let mut b = Unit::builder("file", format!("f{i}")).action("create");
      if i == 2 {
        b = b.property("fail_times", 100);
      }
      b.build().unwrap()
    })
    .collect();
  let (result, tracker) = converge(&f, EngineConfig::default(), &mut units);
  assert!(result.is_err());
  assert_eq!(tracker.filtered(0, &[OutcomeStatus::Unprocessed]).len(), 3);
  assert_eq!(tracker.top_level().len(), 6);
}

#[test]
fn guards_skip_without_resolving() {
  let f = fixture();
  let mut units = UnitCollection::new()
    .with(
      Unit::builder("file", "guarded")
        .action("create")
        .guard(Guard::only_if(|_| false))
        .build()
        .unwrap(),
    )
    // no handler for this type, but the guard vetoes first
    .with(
      Unit::builder("unknown", "x")
        .action("create")
        .guard(Guard::not_if(|_| true))
        .build()
        .unwrap(),
    );
  let (result, tracker) = converge(&f, EngineConfig::default(), &mut units);
  result.unwrap();
  assert!(f.journal.entries().is_empty());
  let records = tracker.top_level();
  assert!(records.iter().all(|rec| rec.status == OutcomeStatus::Skipped));
  assert_eq!(records[0].skip_reason.as_deref(), Some("only_if { block }"));
}

#[test]
fn missing_handler_fails_the_run() {
  let f = fixture();
  let mut units = UnitCollection::new()
    .with(Unit::builder("cron", "backup").action("create").build().unwrap());
  let (result, tracker) = converge(&f, EngineConfig::default(), &mut units);
  match result {
    Err(ConvergeError::Resolution(ResolutionError::NoHandlerAvailable { type_name, platform, version })) => {
      assert_eq!(type_name, "cron");
      assert_eq!(platform, "ubuntu");
      assert_eq!(version, "22.04");
    }
    other => panic!("unexpected result: {other:?}"),
  }
  assert_eq!(tracker.top_level()[0].status, OutcomeStatus::Failed);
}

#[test]
fn unresolved_notification_stops_before_running() {
  let f = fixture();
  let mut units = UnitCollection::new().with(
    Unit::builder("template", "a.conf")
      .action("create")
      .notifies("restart", r("service", "ghost"), Timing::Delayed)
      .build()
      .unwrap(),
  );
  let (result, tracker) = converge(&f, EngineConfig::default(), &mut units);
  assert!(matches!(result, Err(ConvergeError::UnresolvedNotification { .. })));
  assert!(f.journal.entries().is_empty());
  assert_eq!(tracker.filtered(0, &[OutcomeStatus::Unprocessed]).len(), 1);
}

#[test]
fn immediate_cycle_hits_depth_limit() {
  let f = fixture();
  let mut units = UnitCollection::new()
    .with(
      Unit::builder("service", "a")
        .action("restart")
        .notifies("restart", r("service", "b"), Timing::Immediate)
        .build()
        .unwrap(),
    )
    .with(
      Unit::builder("service", "b")
        .notifies("restart", r("service", "a"), Timing::Immediate)
        .build()
        .unwrap(),
    );
  let config = EngineConfig {
    max_notification_depth: 3,
    ..EngineConfig::default()
  };
  let (result, _) = converge(&f, config, &mut units);
  assert!(matches!(
    result,
    Err(ConvergeError::NotificationDepthExceeded { limit: 3, .. })
  ));
  assert_eq!(f.journal.entries().len(), 4);
}

#[test]
fn delayed_cycle_terminates() {
  let f = fixture();
  let mut units = UnitCollection::new()
    .with(
      Unit::builder("service", "a")
        .action("restart")
        .notifies("restart", r("service", "b"), Timing::Delayed)
        .build()
        .unwrap(),
    )
    .with(
      Unit::builder("service", "b")
        .action("restart")
        .notifies("restart", r("service", "a"), Timing::Delayed)
        .build()
        .unwrap(),
    );
  let (result, _) = converge(&f, EngineConfig::default(), &mut units);
  result.unwrap();
  assert_eq!(
    f.journal.entries(),
    vec![
      "service[a]:restart",
      "service[b]:restart",
      "service[b]:restart",
      "service[a]:restart"
    ]
  );
}

#[test]
fn why_run_bypasses_handlers_without_support() {
  let f = fixture();
  let mut units = UnitCollection::new().with(Unit::builder("file", "x").action("create").build().unwrap());
  let config = EngineConfig {
    why_run: true,
    ..EngineConfig::default()
  };
  let seen = Arc::new(Mutex::new(Vec::new()));
  let resolver = HandlerResolver::new(&f.registry, &f.catalog);
  let mut engine = ConvergenceEngine::new(resolver, &f.facts, config);
  engine.add_sink(RecordingSink { seen: seen.clone(), fail_on: None });
  engine.converge(&mut units).unwrap();
  assert!(f.journal.entries().is_empty());
  assert_eq!(
    *seen.lock().unwrap(),
    vec![
      "resource_action_start",
      "resource_current_state_load_bypassed",
      "resource_bypassed",
      "resource_completed"
    ]
  );
  let record = &engine.tracker().top_level()[0];
  assert_eq!(record.status, OutcomeStatus::Skipped);
  assert_eq!(record.skip_reason.as_deref(), Some("why-run not supported by handler"));
}

#[test]
fn sinks_see_lifecycle_in_order() {
  let f = fixture();
  let mut units = UnitCollection::new().with(
    Unit::builder("file", "x")
      .action("create")
      .property("stateful", true)
      .build()
      .unwrap(),
  );
  let seen = Arc::new(Mutex::new(Vec::new()));
  let resolver = HandlerResolver::new(&f.registry, &f.catalog);
  let mut engine = ConvergenceEngine::new(resolver, &f.facts, EngineConfig::default());
  engine.add_sink(RecordingSink { seen: seen.clone(), fail_on: None });
  let outcome = engine.converge(&mut units);
  assert!(outcome.is_ok());
  assert_eq!(
    *seen.lock().unwrap(),
    vec![
      "resource_action_start",
      "resource_current_state_loaded",
      "resource_updated",
      "resource_completed"
    ]
  );
  let report = engine.report(&outcome);
  assert_eq!(report.updated_res_count, 1);
  assert_eq!(
    report.resources[0].before,
    Some(Properties::new().with("present", false))
  );
}

#[test]
fn sink_errors_abort_the_run() {
  let f = fixture();
  let mut units = UnitCollection::new()
    .with(Unit::builder("file", "x").action("create").build().unwrap())
    .with(Unit::builder("file", "y").action("create").build().unwrap());
  let resolver = HandlerResolver::new(&f.registry, &f.catalog);
  let mut engine = ConvergenceEngine::new(resolver, &f.facts, EngineConfig::default());
  engine.add_sink(RecordingSink {
    seen: Arc::new(Mutex::new(Vec::new())),
    fail_on: Some("resource_updated"),
  });
  let err = engine.converge(&mut units).unwrap_err();
  assert!(matches!(err, ConvergeError::Sink(_)));
  assert_eq!(f.journal.entries(), vec!["file[x]:create"]);
}

#[test]
fn nested_units_are_tracked_below_their_parent() {
  let f = fixture();
  let mut units = UnitCollection::new().with(
    Unit::builder("composite", "web")
      .action("deploy")
      .property("children", serde_json::json!(["a", "b"]))
      .build()
      .unwrap(),
  );
  let (result, tracker) = converge(&f, EngineConfig::default(), &mut units);
  result.unwrap();
  assert_eq!(
    f.journal.entries(),
    vec!["composite[web]:deploy", "file[a]:create", "file[b]:create"]
  );
  assert_eq!(
    statuses(&tracker),
    vec![("composite[web]:deploy".to_string(), OutcomeStatus::Updated)]
  );
  let nested: Vec<_> = tracker
    .filtered(1, &[])
    .into_iter()
    .filter(|rec| rec.nesting_level == 1)
    .map(|rec| rec.unit.clone())
    .collect();
  assert_eq!(nested, vec![r("file", "a"), r("file", "b")]);
  assert_eq!(tracker.total_count(), 3);
}

#[test]
fn nested_failure_fails_the_parent() {
  let f = fixture();
  let mut units = UnitCollection::new()
    .with(
      Unit::builder("composite", "web")
        .action("deploy")
        .property("children", serde_json::json!(["ok", "bad"]))
        .build()
        .unwrap(),
    )
    .with(Unit::builder("file", "after").action("create").build().unwrap());
  let (result, tracker) = converge(&f, EngineConfig::default(), &mut units);
  let err = result.unwrap_err();
  let ConvergeError::Action { unit, source, .. } = &err else {
    panic!("expected an action failure, got {err}");
  };
  assert_eq!(*unit, r("composite", "web"));
  assert!(matches!(source, ActionError::Nested(inner) if matches!(**inner, ConvergeError::Action { .. })));
  assert_eq!(
    statuses(&tracker),
    vec![
      ("composite[web]:deploy".to_string(), OutcomeStatus::Failed),
      ("file[after]:create".to_string(), OutcomeStatus::Unprocessed),
    ]
  );
}

#[test]
fn sink_rejecting_a_start_still_closes_the_record() {
  let f = fixture();
  let mut units = UnitCollection::new()
    .with(
      Unit::builder("template", "a")
        .action("create")
        .notifies("reload", r("service", "nginx"), Timing::Delayed)
        .build()
        .unwrap(),
    )
    .with(Unit::builder("file", "b").action("create").build().unwrap())
    .with(Unit::builder("service", "nginx").build().unwrap());
  let resolver = HandlerResolver::new(&f.registry, &f.catalog);
  let mut engine = ConvergenceEngine::new(resolver, &f.facts, EngineConfig::default());
  engine.add_sink(RejectStart { unit: r("file", "b") });

  let err = engine.converge(&mut units).unwrap_err();
  assert!(matches!(err, ConvergeError::Sink(_)));
  assert_eq!(f.journal.entries(), vec!["template[a]:create", "service[nginx]:reload"]);
  let tracker = engine.tracker();
  assert!(tracker.records().iter().all(|rec| rec.nesting_level == 0));
  assert_eq!(
    statuses(tracker),
    vec![
      ("template[a]:create".to_string(), OutcomeStatus::Updated),
      ("file[b]:create".to_string(), OutcomeStatus::Unprocessed),
      ("service[nginx]:reload".to_string(), OutcomeStatus::Updated),
      ("service[nginx]:nothing".to_string(), OutcomeStatus::Unprocessed),
    ]
  );
}

#[test]
fn repeated_declaration_is_accounted_separately() {
  let f = fixture();
  let mut units = UnitCollection::new()
    .with(Unit::builder("file", "x").action("create").build().unwrap())
    .with(
      Unit::builder("package", "broken")
        .action("install")
        .property("fail_times", 100)
        .build()
        .unwrap(),
    )
    .with(Unit::builder("file", "x").action("create").build().unwrap());

  let (result, tracker) = converge(&f, EngineConfig::default(), &mut units);
  assert!(result.is_err());
  let top = tracker.top_level();
  assert_eq!(top.len(), units.len());
  let unprocessed = tracker.filtered(0, &[OutcomeStatus::Unprocessed]);
  assert_eq!(unprocessed.len(), 1);
  assert_eq!(unprocessed[0].unit, r("file", "x"));
  assert_eq!(unprocessed[0].position, Some(2));
}

#[test]
fn before_notification_runs_ahead_of_an_updating_action() {
  let f = fixture();
  let mut units = UnitCollection::new()
    .with(
      Unit::builder("config", "app")
        .action("create")
        .notifies("stop", r("service", "app"), Timing::Before)
        .build()
        .unwrap(),
    )
    .with(Unit::builder("service", "app").build().unwrap());

  let (result, tracker) = converge(&f, EngineConfig::default(), &mut units);
  result.unwrap();
  assert_eq!(
    f.journal.entries(),
    vec!["preview config[app]:create", "service[app]:stop", "config[app]:create"]
  );
  assert_eq!(
    statuses(&tracker),
    vec![
      ("service[app]:stop".to_string(), OutcomeStatus::Updated),
      ("config[app]:create".to_string(), OutcomeStatus::Updated),
      ("service[app]:nothing".to_string(), OutcomeStatus::Skipped),
    ]
  );
}

#[test]
fn before_notification_needs_a_predicted_update() {
  let f = fixture();
  let mut units = UnitCollection::new()
    .with(
      Unit::builder("config", "app")
        .action("create")
        .property("changes", false)
        .notifies("stop", r("service", "app"), Timing::Before)
        .build()
        .unwrap(),
    )
    // no why-run support, so no preview and no notification
    .with(
      Unit::builder("template", "motd")
        .action("create")
        .notifies("stop", r("service", "app"), Timing::Before)
        .build()
        .unwrap(),
    )
    .with(Unit::builder("service", "app").build().unwrap());

  let (result, _) = converge(&f, EngineConfig::default(), &mut units);
  result.unwrap();
  assert_eq!(
    f.journal.entries(),
    vec!["preview config[app]:create", "config[app]:create", "template[motd]:create"]
  );
}
