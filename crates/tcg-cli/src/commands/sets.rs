use super::{shutdown_token, AppContext};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use tcg_sync::SetSyncResult;

#[derive(Args, Debug)]
pub struct SyncSetsArgs {
  /// Only this set (name or code); otherwise every set with cards missing identifiers
  #[arg(short, long)]
  set: Option<String>,
}

pub async fn execute(args: SyncSetsArgs, config: Config) -> Result<()> {
  let ctx = AppContext::build(&config)?;
  let cancel = shutdown_token();

  let result = match args.set {
    Some(set_name) => ctx.set_sync.sync_set(&set_name, &cancel).await?,
    None => match ctx.set_sync.sync_missing(&cancel).await? {
      Some(result) => result,
      None => {
        println!("A set sync is already running");
        return Ok(());
      }
    },
  };

  print_result(&result);
  Ok(())
}

fn print_result(result: &SetSyncResult) {
  println!("Sets processed:   {}", result.sets_processed);
  println!("Cards updated:    {}", result.cards_updated);
  println!("Cards skipped:    {}", result.cards_skipped);
  println!("Requests used:    {}", result.requests_used);
  println!("Quota remaining:  {}", result.quota_remaining);
  println!("Duration:         {:?}", result.duration);
  for error in &result.errors {
    println!("  error: {}", error);
  }
}
