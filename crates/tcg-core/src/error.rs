use chrono::{DateTime, Local};
use std::time::Duration;
use thiserror::Error;

/// The main error type for tcg-* crates
#[derive(Error, Debug)]
pub enum Error {
  /// Environment variable error
  #[error("Environment variable error: {0}")]
  EnvVar(#[from] std::env::VarError),

  /// Configuration error
  #[error("Configuration error: {0}")]
  Config(String),

  /// Serialization/Deserialization error
  #[error("Serialization error: {0}")]
  Serde(#[from] serde_json::Error),

  /// Network failure or timeout before a response arrived
  #[error("Transport error: {0}")]
  Transport(String),

  /// Non-success HTTP status from the provider
  #[error("HTTP status {status}: {body}")]
  Status { status: u16, body: String },

  /// Response body could not be understood
  #[error("Malformed response: {0}")]
  Malformed(String),

  /// Provider answered with an error payload
  #[error("Provider error: {message}")]
  Provider { code: Option<String>, message: String },

  /// Too many lookups for one batched call
  #[error("Batch too large: {size} lookups exceeds max {max}")]
  BatchTooLarge { size: usize, max: usize },

  /// Daily or monthly request budget is spent
  #[error("Request quota exhausted, resets at {resets_at}")]
  QuotaExhausted { resets_at: DateTime<Local> },

  /// No rate limiter slot became free within the allowed wait
  #[error("Rate limit wait timed out after {0:?}")]
  RateLimitTimeout(Duration),

  /// Caller asked to stop while waiting
  #[error("Operation cancelled")]
  Cancelled,
}

/// Coarse failure classes used by the scheduler to pick a reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Config,
  Transport,
  QuotaExhausted,
  ProviderRejected,
  Malformed,
  Cancelled,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::EnvVar(_) | Error::Config(_) => ErrorKind::Config,
      Error::Transport(_) | Error::RateLimitTimeout(_) => ErrorKind::Transport,
      // 429 and 5xx are the provider being busy, not the request being wrong
      Error::Status { status, .. } if *status == 429 || *status >= 500 => ErrorKind::Transport,
      Error::Status { .. } | Error::Provider { .. } | Error::BatchTooLarge { .. } => {
        ErrorKind::ProviderRejected
      }
      Error::Serde(_) | Error::Malformed(_) => ErrorKind::Malformed,
      Error::QuotaExhausted { .. } => ErrorKind::QuotaExhausted,
      Error::Cancelled => ErrorKind::Cancelled,
    }
  }

  /// Whether the same call may succeed on a later cycle without anything changing
  pub fn is_transient(&self) -> bool {
    matches!(self.kind(), ErrorKind::Transport | ErrorKind::QuotaExhausted | ErrorKind::Malformed)
  }
}

/// Result type alias for tcg-* crates
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_display() {
    let err = Error::BatchTooLarge { size: 25, max: 20 };
    assert_eq!(err.to_string(), "Batch too large: 25 lookups exceeds max 20");

    let err = Error::Status { status: 400, body: "bad".to_string() };
    assert_eq!(err.to_string(), "HTTP status 400: bad");
  }

  #[test]
  fn test_status_classification() {
    let busy = Error::Status { status: 503, body: String::new() };
    assert_eq!(busy.kind(), ErrorKind::Transport);
    assert!(busy.is_transient());

    let throttled = Error::Status { status: 429, body: String::new() };
    assert_eq!(throttled.kind(), ErrorKind::Transport);

    let rejected = Error::Status { status: 400, body: String::new() };
    assert_eq!(rejected.kind(), ErrorKind::ProviderRejected);
    assert!(!rejected.is_transient());
  }

  #[test]
  fn test_quota_and_cancel_kinds() {
    let quota = Error::QuotaExhausted { resets_at: Local::now() };
    assert_eq!(quota.kind(), ErrorKind::QuotaExhausted);
    assert!(quota.is_transient());
    assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
    assert_eq!(Error::RateLimitTimeout(Duration::from_secs(1)).kind(), ErrorKind::Transport);
  }

  #[test]
  fn test_provider_error_is_rejection() {
    let err = Error::Provider { code: Some("INVALID_SET".to_string()), message: "nope".to_string() };
    assert_eq!(err.kind(), ErrorKind::ProviderRejected);
    assert_eq!(err.to_string(), "Provider error: nope");
  }
}
