use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// FIFO of card ids a user asked to refresh ahead of background work.
/// A card is queued at most once.
#[derive(Debug, Default)]
pub struct UrgentQueue {
  inner: Mutex<VecDeque<String>>,
}

impl UrgentQueue {
  pub fn new() -> Self {
    Self::default()
  }

  /// Queue a card and return its 1-based position. Re-enqueueing a queued
  /// card returns its current position without adding it again.
  pub fn enqueue(&self, card_id: &str) -> usize {
    let mut queue = self.lock();
    if let Some(pos) = queue.iter().position(|id| id == card_id) {
      return pos + 1;
    }
    queue.push_back(card_id.to_string());
    queue.len()
  }

  /// Remove and return up to `max` ids from the front
  pub fn drain(&self, max: usize) -> Vec<String> {
    let mut queue = self.lock();
    let take = max.min(queue.len());
    queue.drain(..take).collect()
  }

  /// Put ids back at the front, keeping their order, skipping any already queued
  pub fn requeue_front(&self, card_ids: &[String]) {
    let mut queue = self.lock();
    for id in card_ids.iter().rev() {
      if !queue.contains(id) {
        queue.push_front(id.clone());
      }
    }
  }

  pub fn position(&self, card_id: &str) -> Option<usize> {
    self.lock().iter().position(|id| id == card_id).map(|pos| pos + 1)
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }
}
