use super::{shutdown_token, AppContext};
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use tcg_core::{Condition, PriceEntry, Printing};

#[derive(Args, Debug)]
pub struct PriceArgs {
  /// Card id
  card_id: String,

  /// Condition code or label (NM, LP, MP, HP, DMG)
  #[arg(short, long, default_value = "NM")]
  condition: String,

  /// Printing (Normal, Foil, 1st Edition, Unlimited, Reverse Holofoil)
  #[arg(short, long, default_value = "Normal")]
  printing: String,
}

#[derive(Args, Debug)]
pub struct CardArgs {
  /// Card id
  card_id: String,
}

pub async fn price(args: PriceArgs, config: Config) -> Result<()> {
  let condition = Condition::parse(&args.condition)
    .ok_or_else(|| anyhow!("unknown condition {:?}", args.condition))?;
  let printing = Printing::parse(&args.printing)
    .ok_or_else(|| anyhow!("unknown printing {:?}", args.printing))?;

  let ctx = AppContext::build(&config)?;
  match ctx.worker.get_price(&args.card_id, condition, printing).await {
    Some(quote) => {
      let stale = if quote.is_stale { " (stale)" } else { "" };
      println!(
        "{} {} {}: ${:.2} from {}{} [{} row]",
        args.card_id, condition, printing, quote.price_usd, quote.source, stale, quote.condition
      );
    }
    None => println!("{} {} {}: no price", args.card_id, condition, printing),
  }
  Ok(())
}

pub async fn prices(args: CardArgs, config: Config) -> Result<()> {
  let ctx = AppContext::build(&config)?;
  let rows = ctx.worker.get_all_prices(&args.card_id).await;
  if rows.is_empty() {
    println!("{}: no prices", args.card_id);
    return Ok(());
  }
  print_rows(&rows);
  Ok(())
}

pub async fn refresh(args: CardArgs, config: Config) -> Result<()> {
  let ctx = AppContext::build(&config)?;
  let rows = ctx.worker.refresh_card(&args.card_id, &shutdown_token()).await?;
  if rows.is_empty() {
    println!("{}: provider returned no prices", args.card_id);
    return Ok(());
  }
  println!("Refreshed {} prices for {}", rows.len(), args.card_id);
  print_rows(&rows);
  Ok(())
}

fn print_rows(rows: &[PriceEntry]) {
  println!(
    "{:<5} {:<18} {:<10} {:>10}  {:<8} Updated",
    "Cond", "Printing", "Language", "USD", "Source"
  );
  for row in rows {
    let updated = row.updated_at.map(|at| at.to_rfc3339()).unwrap_or_else(|| "-".to_string());
    println!(
      "{:<5} {:<18} {:<10} {:>10.2}  {:<8} {}",
      row.condition.as_str(),
      row.printing.as_str(),
      row.language.as_str(),
      row.price_usd,
      row.source,
      updated
    );
  }
}
