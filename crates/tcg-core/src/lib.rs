//! Core types shared by the tcg-* crates: configuration, the error type,
//! the closed card/price vocabularies and the clock used for quota rollover.

pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use types::{CardRef, Condition, Game, Language, LookupRequest, PriceEntry, Printing};

/// Base URL for the pricing provider API
pub const DEFAULT_BASE_URL: &str = "https://api.justtcg.com/v1";

/// API rate limits
pub const DEFAULT_RATE_LIMIT: u32 = 10; // requests per minute
pub const DEFAULT_DAILY_LIMIT: u32 = 100;

/// Largest number of lookups the provider accepts in one batched call
pub const DEFAULT_MAX_BATCH_SIZE: usize = 20;
pub const DEFAULT_SET_PAGE_SIZE: usize = 100;

/// Source tag stamped on prices fetched from the provider
pub const PROVIDER_SOURCE: &str = "justtcg";
/// Source tag for rows synthesized from a card's base price fields
pub const CACHED_SOURCE: &str = "cached";
