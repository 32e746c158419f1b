/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

use chrono::{DateTime, Local};
use tcg_database_postgres::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
  #[error("API error: {0}")]
  Api(#[from] tcg_core::Error),

  #[error("Database error: {0}")]
  Database(#[from] RepositoryError),

  #[error("Request quota exhausted, resets at {resets_at}")]
  QuotaExhausted { resets_at: DateTime<Local> },

  #[error("Card not found: {0}")]
  CardNotFound(String),

  #[error("Sync already running")]
  AlreadyRunning,

  #[error("Sync cancelled")]
  Cancelled,
}

impl SyncError {
  /// Lift a client error, keeping quota exhaustion and cancellation distinct
  pub fn from_api(err: tcg_core::Error) -> Self {
    match err {
      tcg_core::Error::QuotaExhausted { resets_at } => SyncError::QuotaExhausted { resets_at },
      tcg_core::Error::Cancelled => SyncError::Cancelled,
      other => SyncError::Api(other),
    }
  }
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Why a set could not be turned into an identifier index
#[derive(Error, Debug)]
pub enum ResolveError {
  /// No translation to the provider's set key. Retrying cannot help.
  #[error("Unknown set mapping: {set_key}")]
  UnknownSetMapping { set_key: String },

  /// The first page could not be fetched; a later cycle may succeed
  #[error("Set fetch failed: {0}")]
  Transient(tcg_core::Error),

  #[error("Set resolution cancelled")]
  Cancelled,
}

impl ResolveError {
  pub fn is_permanent(&self) -> bool {
    matches!(self, ResolveError::UnknownSetMapping { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sync_error_display_card_not_found() {
    let err = SyncError::CardNotFound("card-9".to_string());
    assert_eq!(err.to_string(), "Card not found: card-9");
  }

  #[test]
  fn test_sync_error_display_already_running() {
    assert_eq!(SyncError::AlreadyRunning.to_string(), "Sync already running");
  }

  #[test]
  fn test_sync_error_from_database() {
    let err: SyncError = RepositoryError::NotFound("card x".to_string()).into();
    assert!(matches!(err, SyncError::Database(_)));
  }

  #[test]
  fn test_from_api_keeps_quota_distinct() {
    let resets_at = Local::now();
    let err = SyncError::from_api(tcg_core::Error::QuotaExhausted { resets_at });
    assert!(matches!(err, SyncError::QuotaExhausted { .. }));

    let err = SyncError::from_api(tcg_core::Error::Cancelled);
    assert!(matches!(err, SyncError::Cancelled));

    let err = SyncError::from_api(tcg_core::Error::Transport("reset".to_string()));
    assert_eq!(err.to_string(), "API error: Transport error: reset");
  }

  #[test]
  fn test_resolve_error_permanence() {
    let unknown = ResolveError::UnknownSetMapping { set_key: "foo-set".to_string() };
    assert!(unknown.is_permanent());
    assert_eq!(unknown.to_string(), "Unknown set mapping: foo-set");

    let transient = ResolveError::Transient(tcg_core::Error::Transport("timeout".to_string()));
    assert!(!transient.is_permanent());
    assert!(!ResolveError::Cancelled.is_permanent());
  }
}
