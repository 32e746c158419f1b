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

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

mod commands;
use commands::{
  prices::{CardArgs, PriceArgs},
  sets::SyncSetsArgs,
  worker::WorkerArgs,
};

mod config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "tcgp")]
#[command(propagate_version = true)]
struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// Verbose output
  #[arg(short, long, global = true)]
  verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Run the background price worker until Ctrl-C
  Worker(WorkerArgs),
  /// Run a single sync cycle
  SyncOnce,
  /// Price for one condition and printing
  Price(PriceArgs),
  /// Every cached price for a card
  Prices(CardArgs),
  /// Fetch fresh prices for one card now
  Refresh(CardArgs),
  /// Discover provider identifiers by set
  SyncSets(SyncSetsArgs),
  /// Configured schedule and request limits
  Status,
}

#[tokio::main]
async fn main() -> Result<()> {
  // Load environment variables
  dotenv().ok();

  // Parse CLI arguments
  let cli = Cli::parse();

  // Initialize logging; RUST_LOG wins over --verbose
  let log_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
  tracing_subscriber::fmt().with_env_filter(filter).init();

  // Load configuration
  let config = config::Config::from_env()?;

  // Execute command
  match cli.command {
    Commands::Worker(args) => commands::worker::execute(args, config).await?,
    Commands::SyncOnce => commands::worker::execute_once(config).await?,
    Commands::Price(args) => commands::prices::price(args, config).await?,
    Commands::Prices(args) => commands::prices::prices(args, config).await?,
    Commands::Refresh(args) => commands::prices::refresh(args, config).await?,
    Commands::SyncSets(args) => commands::sets::execute(args, config).await?,
    Commands::Status => commands::status::execute(config)?,
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cli_parses_subcommands() {
    let cli = Cli::try_parse_from(["tcgp", "price", "card-1", "-c", "LP", "-p", "Foil"]).unwrap();
    assert!(matches!(cli.command, Commands::Price(_)));

    let cli = Cli::try_parse_from(["tcgp", "sync-sets", "--set", "base1"]).unwrap();
    assert!(matches!(cli.command, Commands::SyncSets(_)));

    let cli = Cli::try_parse_from(["tcgp", "-v", "sync-once"]).unwrap();
    assert!(cli.verbose);
  }

  #[test]
  fn test_cli_rejects_missing_card_id() {
    assert!(Cli::try_parse_from(["tcgp", "refresh"]).is_err());
  }
}
