use anyhow::{Context, Result};
use std::env;
use std::time::Duration;
use tcg_core::Config as CoreConfig;
use tcg_sync::WorkerConfig;

pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 900;
pub const DEFAULT_STALE_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct Config {
  pub api_config: CoreConfig,
  pub database_url: String,
  pub sync_interval_secs: u64,
  pub batch_size: usize,
  pub stale_hours: i64,
}

impl Config {
  pub fn from_env() -> Result<Self> {
    let api_config = CoreConfig::from_env().context("invalid pricing provider configuration")?;

    let database_url =
      env::var("DATABASE_URL").context("DATABASE_URL environment variable not set")?;

    let sync_interval_secs = parse_var("TCG_SYNC_INTERVAL_SECS", DEFAULT_SYNC_INTERVAL_SECS)?;
    let batch_size = parse_var("TCG_BATCH_SIZE", api_config.max_batch_size)?;
    let stale_hours = parse_var("TCG_STALE_HOURS", DEFAULT_STALE_HOURS)?;

    Ok(Self { api_config, database_url, sync_interval_secs, batch_size, stale_hours })
  }

  pub fn worker_config(&self) -> WorkerConfig {
    WorkerConfig {
      interval: Duration::from_secs(self.sync_interval_secs.max(1)),
      batch_size: self.batch_size,
      stale_after: chrono::Duration::hours(self.stale_hours.max(1)),
      ..WorkerConfig::default()
    }
  }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  match env::var(name) {
    Ok(raw) => {
      raw.trim().parse::<T>().map_err(|e| anyhow::anyhow!("{} must be a number: {}", name, e))
    }
    Err(_) => Ok(default),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_worker_config_from_settings() {
    let config = Config {
      api_config: CoreConfig::default_with_key("k"),
      database_url: "postgres://localhost/cards".to_string(),
      sync_interval_secs: 60,
      batch_size: 10,
      stale_hours: 12,
    };
    let worker = config.worker_config();
    assert_eq!(worker.interval, Duration::from_secs(60));
    assert_eq!(worker.batch_size, 10);
    assert_eq!(worker.stale_after, chrono::Duration::hours(12));
  }

  #[test]
  fn test_parse_var_default_when_unset() {
    let value: u64 = parse_var("TCG_CLI_TEST_UNSET_VARIABLE", 7).unwrap();
    assert_eq!(value, 7);
  }
}
