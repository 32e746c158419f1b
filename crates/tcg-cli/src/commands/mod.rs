pub mod prices;
pub mod sets;
pub mod status;
pub mod worker;

use crate::config::Config;
use anyhow::{Context, Result};
use std::sync::Arc;
use tcg_client::PriceClient;
use tcg_core::{Clock, SystemClock};
use tcg_database_postgres::DatabaseContext;
use tcg_sync::{PriceWorker, SetSyncService, StaticSetTable};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Everything a command needs, wired from one config
pub struct AppContext {
  pub worker: Arc<PriceWorker>,
  pub set_sync: SetSyncService,
}

impl AppContext {
  pub fn build(config: &Config) -> Result<Self> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let client = Arc::new(
      PriceClient::new(config.api_config.clone(), Arc::clone(&clock))
        .context("failed to create pricing client")?,
    );
    let db = DatabaseContext::new(&config.database_url).context("failed to connect to database")?;
    let translator = Arc::new(StaticSetTable::builtin());

    let worker = Arc::new(PriceWorker::new(
      client.clone(),
      db.card_repository(),
      db.price_repository(),
      translator.clone(),
      clock,
      config.worker_config(),
    ));
    let set_sync = SetSyncService::new(client, db.card_repository(), translator)
      .with_unmatched(Arc::clone(worker.unmatched()));

    Ok(Self { worker, set_sync })
  }
}

/// A token cancelled on Ctrl-C
pub fn shutdown_token() -> CancellationToken {
  let token = CancellationToken::new();
  let trigger = token.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      info!("shutdown requested");
      trigger.cancel();
    }
  });
  token
}
