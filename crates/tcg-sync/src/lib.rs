//! # tcg-sync
//!
//! Keeps a collection's card prices fresh against a request-capped pricing
//! provider.
//!
//! - [`PriceWorker`] runs the sync cycle: quota gate, prioritized selection,
//!   set-based identifier discovery and one batched price call.
//! - [`PriceCache`] answers price reads with fallback and staleness flags.
//! - [`SetSyncService`] discovers identifiers on demand.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tcg_client::PriceClient;
//! use tcg_core::{Config, SystemClock};
//! use tcg_database_postgres::DatabaseContext;
//! use tcg_sync::{PriceWorker, StaticSetTable, WorkerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let clock = Arc::new(SystemClock);
//! let client = Arc::new(PriceClient::new(Config::from_env()?, clock.clone())?);
//! let db = DatabaseContext::new("postgres://localhost/cards")?;
//!
//! let worker = PriceWorker::new(
//!     client,
//!     db.card_repository(),
//!     db.price_repository(),
//!     Arc::new(StaticSetTable::builtin()),
//!     clock,
//!     WorkerConfig::default(),
//! );
//! worker.run(CancellationToken::new()).await;
//! # Ok(())
//! # }
//! ```

pub mod cycle_tracker;
pub mod error;
pub mod normalize;
pub mod price_cache;
pub mod price_worker;
pub mod provider;
pub mod resolver;
pub mod set_mapping;
pub mod set_sync;
pub mod unmatched;
pub mod urgent_queue;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cycle_tracker::{CycleCounts, CycleReport, CycleState, CycleTracker};
pub use error::{ResolveError, SyncError, SyncResult};
pub use price_cache::{PriceCache, PriceQuote};
pub use price_worker::{PriceWorker, WorkerConfig, WorkerStatus};
pub use provider::PriceProvider;
pub use resolver::{Resolver, SetIdentifierIndex};
pub use set_mapping::{normalize_set_key, SetKeyTranslator, StaticSetTable};
pub use set_sync::{SetSyncResult, SetSyncService};
pub use unmatched::{UnmatchedCard, UnmatchedReason, UnmatchedRegistry};
pub use urgent_queue::UrgentQueue;

/// Quota units set pagination leaves untouched for the price call that follows
pub const BATCH_QUOTA_RESERVE: u32 = 1;

/// Quota units a set sync needs: one page at least, plus the batch reserve
pub const MIN_SET_SYNC_QUOTA: u32 = BATCH_QUOTA_RESERVE + 1;
