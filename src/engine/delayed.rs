//! Queue of delayed notifications for one converge call.

use crate::types::Notification;

/// FIFO of delayed notifications, deduplicated on `(target, action)` against
/// everything queued during the run, including entries already delivered.
#[derive(Debug, Clone, Default)]
pub struct DelayedQueue {
  items: Vec<Notification>,
}

impl DelayedQueue {
  pub fn new() -> Self {
    Self::default()
  }

  /// Queues `notification`. Returns `false` if an equivalent one was already
  /// queued.
  pub fn push(&mut self, notification: Notification) -> bool {
    if self.items.iter().any(|n| n.duplicates(&notification)) {
      return false;
    }
    self.items.push(notification);
    true
  }

  pub fn get(&self, index: usize) -> Option<&Notification> {
    self.items.get(index)
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Notification> {
    self.items.iter()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}
