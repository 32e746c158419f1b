//! # tcg-client
//!
//! A trading card pricing provider client with no database dependencies.
//!
//! ## Features
//!
//! - **Batched lookups**: up to 20 cards per call, matched back by identifier
//! - **Set listings**: paginated discovery of provider identifiers
//! - **Budget aware**: daily and monthly request caps, synced from provider usage
//! - **Rate limiting**: evenly spaced calls via `governor`
//! - **Type safe**: provider vocabulary normalized into closed enums from tcg-core
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tcg_client::PriceClient;
//! use tcg_core::{Config, SystemClock};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PriceClient::new(Config::from_env()?, Arc::new(SystemClock))?;
//!
//!     let page = client.fetch_set_page("base-set-pokemon", 0, &CancellationToken::new()).await?;
//!     println!("{} cards on the first page", page.cards.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All methods return `Result<T, tcg_core::Error>`. Use `Error::kind()` to
//! separate transient failures from rejected requests.

pub mod admission;
pub mod client;
pub mod endpoints;
pub mod normalize;
pub mod quota;
pub mod rate;
pub mod transport;

pub use admission::RequestGovernor;
pub use client::PriceClient;
pub use endpoints::{
  cards::{CardEndpoints, PriceMap},
  sets::{SetEndpoints, SetPage},
};
pub use quota::{QuotaGovernor, QuotaSnapshot};
pub use tcg_core::{Config, Error, Result};
