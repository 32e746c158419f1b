use super::{shutdown_token, AppContext};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use tcg_sync::CycleState;

#[derive(Args, Debug)]
pub struct WorkerArgs {
  /// Seconds between cycles
  #[arg(long, env = "TCG_SYNC_INTERVAL_SECS")]
  interval_secs: Option<u64>,

  /// Cards per cycle
  #[arg(long, env = "TCG_BATCH_SIZE")]
  batch_size: Option<usize>,
}

/// Run the price worker until Ctrl-C
pub async fn execute(args: WorkerArgs, mut config: Config) -> Result<()> {
  if let Some(secs) = args.interval_secs {
    config.sync_interval_secs = secs;
  }
  if let Some(size) = args.batch_size {
    config.batch_size = size;
  }

  let ctx = AppContext::build(&config)?;
  ctx.worker.run(shutdown_token()).await;
  Ok(())
}

/// Run exactly one cycle and print its report
pub async fn execute_once(config: Config) -> Result<()> {
  let ctx = AppContext::build(&config)?;
  let report = ctx.worker.run_cycle(&shutdown_token()).await;

  let counts = &report.counts;
  println!("Cycle:            {:?}", report.state);
  println!(
    "Selected:         {} ({} urgent, {} unpriced, {} oldest)",
    counts.selected, counts.urgent, counts.without_price, counts.oldest_priced
  );
  println!("Sets synced:      {}", counts.sets_synced);
  println!("Ids discovered:   {}", counts.ids_discovered);
  println!("Newly unmatched:  {}", counts.newly_unmatched);
  println!("Deferred:         {}", counts.deferred);
  println!("Cards updated:    {}", counts.cards_updated);
  println!("Requests used:    {}", counts.requests_used);
  if let Some(ms) = report.duration_ms() {
    println!("Duration:         {} ms", ms);
  }
  if let Some(message) = &report.error_message {
    println!("Error:            {}", message);
  }

  if report.state == CycleState::Failed {
    anyhow::bail!("price cycle failed");
  }
  Ok(())
}
