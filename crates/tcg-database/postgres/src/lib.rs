//! PostgreSQL persistence for card references and the price cache.

pub mod models;
pub mod repository;
pub mod schema;

pub use repository::{
  dedupe_by_key, CardRepository, DatabaseContext, MissingIdFilter, PriceRepository,
  RepositoryError, RepositoryResult,
};
