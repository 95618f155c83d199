//! Ordered batch of declared units with lookup by reference.

use std::collections::HashMap;

use crate::error::ConvergeError;
use crate::types::{Unit, UnitRef};

/// Units in declaration order. Declaring the same reference twice keeps both
/// in the batch; lookups by reference find the later one.
#[derive(Debug, Clone, Default)]
pub struct UnitCollection {
  units: Vec<Unit>,
  index: HashMap<UnitRef, usize>,
}

impl UnitCollection {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, mut unit: Unit) {
    unit.set_position(self.units.len());
    self.index.insert(unit.reference(), self.units.len());
    self.units.push(unit);
  }

  pub fn with(mut self, unit: Unit) -> Self {
    self.push(unit);
    self
  }

  pub fn get(&self, reference: &UnitRef) -> Option<&Unit> {
    self.index_of(reference).and_then(|i| self.units.get(i))
  }

  pub fn index_of(&self, reference: &UnitRef) -> Option<usize> {
    self.index.get(reference).copied()
  }

  pub fn get_index(&self, index: usize) -> Option<&Unit> {
    self.units.get(index)
  }

  pub(crate) fn replace(&mut self, index: usize, unit: Unit) {
    if let Some(slot) = self.units.get_mut(index) {
      *slot = unit;
    }
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Unit> {
    self.units.iter()
  }

  pub fn len(&self) -> usize {
    self.units.len()
  }

  pub fn is_empty(&self) -> bool {
    self.units.is_empty()
  }

  /// Checks that every notification names a declared unit. Notifications may
  /// point forward in the batch, so this runs once the batch is complete.
  pub fn resolve_notifications(&self) -> Result<(), ConvergeError> {
    for unit in &self.units {
      for n in unit.notifications() {
        if !self.index.contains_key(&n.target) {
          return Err(ConvergeError::UnresolvedNotification {
            notifier: n.source.clone(),
            target: n.target.clone(),
            action: n.action.clone(),
          });
        }
      }
    }
    Ok(())
  }

  pub(crate) fn set_nesting_level(&mut self, level: usize) {
    for unit in &mut self.units {
      unit.set_nesting_level(level);
    }
  }
}

impl FromIterator<Unit> for UnitCollection {
  fn from_iter<T: IntoIterator<Item = Unit>>(iter: T) -> Self {
    let mut collection = UnitCollection::new();
    for unit in iter {
      collection.push(unit);
    }
    collection
  }
}

impl<'a> IntoIterator for &'a UnitCollection {
  type Item = &'a Unit;
  type IntoIter = std::slice::Iter<'a, Unit>;

  fn into_iter(self) -> Self::IntoIter {
    self.units.iter()
  }
}
