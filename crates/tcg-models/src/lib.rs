//! # tcg-models
//!
//! Data models for the TCG pricing provider API.
//!
//! These are wire shapes only: field names follow the provider's JSON and
//! free-text vocabularies (condition, printing, language) are kept as
//! strings. Mapping onto the closed enums in `tcg-core` happens in the client.
//!
//! ## Usage
//!
//! ```ignore
//! use tcg_models::{ApiResponse, ProviderCard};
//!
//! let page: ApiResponse<Vec<ProviderCard>> = serde_json::from_str(&body)?;
//! let has_more = page.has_more();
//! ```

#![warn(clippy::all)]

pub mod cards;
pub mod common;

pub use cards::*;
pub use common::*;
