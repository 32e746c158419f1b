use crate::config::Config;
use anyhow::Result;
use serde_json::{json, Value};

/// Print the configured schedule and request limits as JSON.
///
/// Queue size, quota used and unmatched cards live in the running worker's
/// memory, so a separate process cannot report them.
pub fn execute(config: Config) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(&settings_report(&config))?);
  Ok(())
}

fn settings_report(config: &Config) -> Value {
  let api = &config.api_config;
  let worker = config.worker_config();
  json!({
    "sync_interval_secs": worker.interval.as_secs(),
    "batch_size": worker.batch_size.clamp(1, api.max_batch_size.max(1)),
    "stale_hours": worker.stale_after.num_hours(),
    "daily_limit": api.daily_limit,
    "monthly_limit": api.monthly_limit,
    "rate_limit_per_minute": api.rate_limit,
    "base_url": api.base_url,
    "api_key_configured": api.api_key.is_some(),
  })
}
