//! Cycle tracking for monitoring the price worker.
//! History is kept in memory and bounded.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
  Running,
  Success,
  /// Quota gate closed; nothing was attempted
  Skipped,
  Failed,
  CompletedWithErrors,
}

/// Counts gathered while a cycle runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleCounts {
  pub selected: usize,
  pub urgent: usize,
  pub without_price: usize,
  pub oldest_priced: usize,
  pub sets_synced: usize,
  pub ids_discovered: usize,
  pub newly_unmatched: usize,
  pub deferred: usize,
  pub cards_updated: usize,
  pub requests_used: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
  pub start_time: DateTime<Utc>,
  pub end_time: Option<DateTime<Utc>>,
  pub state: CycleState,
  pub counts: CycleCounts,
  pub error_message: Option<String>,
}

impl CycleReport {
  pub fn duration_ms(&self) -> Option<i64> {
    self.end_time.map(|end| (end - self.start_time).num_milliseconds())
  }
}

/// In-memory cycle tracker
pub struct CycleTracker {
  cycles: Arc<Mutex<VecDeque<CycleReport>>>,
  capacity: usize,
}

impl CycleTracker {
  pub fn new(capacity: usize) -> Self {
    Self { cycles: Arc::new(Mutex::new(VecDeque::new())), capacity: capacity.max(1) }
  }

  pub async fn start(&self, at: DateTime<Utc>) {
    let mut cycles = self.cycles.lock().await;
    if cycles.len() >= self.capacity {
      cycles.pop_front();
    }
    cycles.push_back(CycleReport {
      start_time: at,
      end_time: None,
      state: CycleState::Running,
      counts: CycleCounts::default(),
      error_message: None,
    });
  }

  pub async fn complete(
    &self,
    state: CycleState,
    counts: CycleCounts,
    error_message: Option<String>,
    at: DateTime<Utc>,
  ) -> Option<CycleReport> {
    let mut cycles = self.cycles.lock().await;
    let last = cycles.back_mut()?;
    last.state = state;
    last.counts = counts;
    last.error_message = error_message;
    last.end_time = Some(at);
    Some(last.clone())
  }

  pub async fn last(&self) -> Option<CycleReport> {
    self.cycles.lock().await.back().cloned()
  }

  pub async fn get_all(&self) -> Vec<CycleReport> {
    self.cycles.lock().await.iter().cloned().collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  #[tokio::test]
  async fn test_start_complete() {
    let tracker = CycleTracker::new(10);
    let t0 = Utc::now();
    tracker.start(t0).await;
    assert_eq!(tracker.last().await.unwrap().state, CycleState::Running);

    let counts = CycleCounts { selected: 3, cards_updated: 2, ..Default::default() };
    let report = tracker
      .complete(CycleState::Success, counts, None, t0 + Duration::milliseconds(1500))
      .await
      .unwrap();
    assert_eq!(report.counts.cards_updated, 2);
    assert_eq!(report.duration_ms(), Some(1500));
  }

  #[tokio::test]
  async fn test_history_is_bounded() {
    let tracker = CycleTracker::new(2);
    for _ in 0..3 {
      tracker.start(Utc::now()).await;
      tracker.complete(CycleState::Skipped, CycleCounts::default(), None, Utc::now()).await;
    }
    assert_eq!(tracker.get_all().await.len(), 2);
  }

  #[tokio::test]
  async fn test_complete_without_start() {
    let tracker = CycleTracker::new(2);
    let report = tracker.complete(CycleState::Failed, CycleCounts::default(), None, Utc::now()).await;
    assert!(report.is_none());
  }
}
