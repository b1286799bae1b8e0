//! Core business logic: the asset model, tree building, valuation and the
//! dashboard state that ties them to the backend.

pub mod api;
pub mod asset;
pub mod config;
pub mod currency;
pub mod dashboard;
pub mod distribution;
pub mod error;
pub mod log;
pub mod mutation;
pub mod notice;
pub mod selection;
pub mod task;
pub mod transaction;
pub mod tree;
pub mod valuation;

// Re-export main types for cleaner imports
pub use currency::CurrencyRateProvider;
pub use dashboard::{Dashboard, ReloadOutcome};
pub use error::{ApiError, Result};
pub use tree::Forest;
