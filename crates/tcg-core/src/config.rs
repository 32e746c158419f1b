//! Configuration management for the pricing provider client

use crate::error::{Error, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Main configuration struct for the pricing provider client
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
  /// Provider API key, sent as `X-API-Key` when present
  pub api_key: Option<String>,

  /// Base URL for the provider API
  pub base_url: String,

  /// API rate limit (requests per minute)
  pub rate_limit: u32,

  /// Requests allowed per local calendar day
  pub daily_limit: u32,

  /// Requests allowed per calendar month, if the plan has a monthly cap
  pub monthly_limit: Option<u32>,

  /// Request timeout in seconds for price lookups
  pub timeout_secs: u64,

  /// Request timeout in seconds for set listing pages
  pub set_timeout_secs: u64,

  /// Maximum lookups per batched call
  pub max_batch_size: usize,

  /// Cards requested per set listing page
  pub set_page_size: usize,

  /// Longest time a caller waits for a rate limiter slot
  pub rate_wait_secs: u64,
}

impl Config {
  /// Load configuration from environment variables
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let api_key = env::var("TCG_API_KEY").ok().filter(|k| !k.trim().is_empty());
    let base_url = env::var("TCG_BASE_URL").unwrap_or_else(|_| crate::DEFAULT_BASE_URL.to_string());

    let monthly_limit = match env::var("TCG_MONTHLY_LIMIT") {
      Ok(raw) if !raw.trim().is_empty() => Some(
        raw.trim().parse().map_err(|_| Error::Config("Invalid TCG_MONTHLY_LIMIT".to_string()))?,
      ),
      _ => None,
    };

    let config = Config {
      api_key,
      base_url,
      rate_limit: env_or("TCG_RATE_LIMIT", crate::DEFAULT_RATE_LIMIT)?,
      daily_limit: env_or("TCG_DAILY_LIMIT", crate::DEFAULT_DAILY_LIMIT)?,
      monthly_limit,
      timeout_secs: env_or("TCG_TIMEOUT_SECS", 30)?,
      set_timeout_secs: env_or("TCG_SET_TIMEOUT_SECS", 60)?,
      max_batch_size: env_or("TCG_MAX_BATCH_SIZE", crate::DEFAULT_MAX_BATCH_SIZE)?,
      set_page_size: env_or("TCG_SET_PAGE_SIZE", crate::DEFAULT_SET_PAGE_SIZE)?,
      rate_wait_secs: env_or("TCG_RATE_WAIT_SECS", 30)?,
    };

    config.validate()?;
    Ok(config)
  }

  /// Create a config with default values (for testing)
  pub fn default_with_key(api_key: impl Into<String>) -> Self {
    Config {
      api_key: Some(api_key.into()),
      base_url: crate::DEFAULT_BASE_URL.to_string(),
      rate_limit: crate::DEFAULT_RATE_LIMIT,
      daily_limit: crate::DEFAULT_DAILY_LIMIT,
      monthly_limit: None,
      timeout_secs: 30,
      set_timeout_secs: 60,
      max_batch_size: crate::DEFAULT_MAX_BATCH_SIZE,
      set_page_size: crate::DEFAULT_SET_PAGE_SIZE,
      rate_wait_secs: 30,
    }
  }

  /// Point the config at a different host, e.g. a local mock server
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  pub fn with_daily_limit(mut self, limit: u32) -> Self {
    self.daily_limit = limit;
    self
  }

  pub fn with_monthly_limit(mut self, limit: Option<u32>) -> Self {
    self.monthly_limit = limit;
    self
  }

  pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
    self.rate_limit = per_minute;
    self
  }

  /// Reject values the client cannot operate with
  pub fn validate(&self) -> Result<()> {
    url::Url::parse(&self.base_url)
      .map_err(|e| Error::Config(format!("Invalid TCG_BASE_URL {}: {}", self.base_url, e)))?;

    if self.rate_limit == 0 {
      return Err(Error::Config("TCG_RATE_LIMIT must be greater than zero".to_string()));
    }
    if self.max_batch_size == 0 {
      return Err(Error::Config("TCG_MAX_BATCH_SIZE must be greater than zero".to_string()));
    }
    if self.set_page_size == 0 {
      return Err(Error::Config("TCG_SET_PAGE_SIZE must be greater than zero".to_string()));
    }
    Ok(())
  }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
  match env::var(name) {
    Ok(raw) if !raw.trim().is_empty() => {
      raw.trim().parse().map_err(|_| Error::Config(format!("Invalid {}", name)))
    }
    _ => Ok(default),
  }
}
