//! Registry entries and the specificity order they are kept in.

use std::cmp::Ordering;

use crate::filter::FilterSet;
use crate::handler::HandlerId;

/// One candidate handler for a dispatch key.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
  pub handler: HandlerId,
  pub filters: FilterSet,
  /// Default/reference handler for the key.
  pub canonical: bool,
  /// Registered with explicit permission to supersede locked entries.
  pub allow_override: bool,
  /// Set by [super::HandlerRegistry::lock].
  pub locked: bool,
}

impl RegistryEntry {
  pub fn new(handler: HandlerId, filters: FilterSet) -> Self {
    Self {
      handler,
      filters,
      canonical: false,
      allow_override: false,
      locked: false,
    }
  }
}

/// Presence of one filter tier: `None` when absent, `Some(negated)` otherwise.
fn tier(values: &[String]) -> Option<bool> {
  if values.is_empty() {
    None
  } else {
    Some(values.iter().any(|v| v.starts_with('!')))
  }
}

/// Present beats absent; an allow filter beats a filter carrying deny values.
fn compare_tier(a: Option<bool>, b: Option<bool>) -> Ordering {
  match (a, b) {
    (Some(a_neg), Some(b_neg)) => a_neg.cmp(&b_neg),
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (None, None) => Ordering::Equal,
  }
}

fn presence(present: bool) -> Option<bool> {
  present.then_some(false)
}

/// Orders `a` against `b` by specificity. `Less` means `a` is more specific
/// and sorts first.
///
/// Tiers, highest first: predicate, platform_version, platform,
/// platform_family, os, then non-override over override. `Equal` on every
/// tier is a tie; the registry keeps the newest tied entry first.
pub fn compare_specificity(a: &RegistryEntry, b: &RegistryEntry) -> Ordering {
  let (fa, fb) = (&a.filters, &b.filters);
  compare_tier(presence(fa.predicate.is_some()), presence(fb.predicate.is_some()))
    .then_with(|| {
      compare_tier(
        presence(!fa.platform_version.is_empty()),
        presence(!fb.platform_version.is_empty()),
      )
    })
    .then_with(|| compare_tier(tier(&fa.platform), tier(&fb.platform)))
    .then_with(|| compare_tier(tier(&fa.platform_family), tier(&fb.platform_family)))
    .then_with(|| compare_tier(tier(&fa.os), tier(&fb.os)))
    .then_with(|| a.allow_override.cmp(&b.allow_override))
}
