//! Tests for `Notification`.

use super::{Notification, Timing, UnitRef};

fn restart(source: &str, timing: Timing) -> Notification {
  Notification::new(
    UnitRef::new("service", "nginx"),
    "restart",
    UnitRef::new("template", source),
    timing,
  )
}

#[test]
fn duplicates_ignores_source_and_timing() {
  let a = restart("a.conf", Timing::Delayed);
  let b = restart("b.conf", Timing::Immediate);
  assert!(a.duplicates(&b));
  assert_ne!(a, b);
}

#[test]
fn different_action_is_not_duplicate() {
  let a = restart("a.conf", Timing::Delayed);
  let mut b = a.clone();
  b.action = "reload".to_string();
  assert!(!a.duplicates(&b));
}

#[test]
fn display_names_both_ends() {
  let n = restart("a.conf", Timing::Delayed);
  assert_eq!(
    n.to_string(),
    "template[a.conf] notifies restart on service[nginx] (delayed)"
  );
}

#[test]
fn timing_serializes_snake_case() {
  assert_eq!(serde_json::to_string(&Timing::Before).unwrap(), "\"before\"");
  assert_eq!(Timing::Before.to_string(), "before");
  let n = restart("a.conf", Timing::Before);
  assert!(n.to_string().ends_with("(before)"));
}
