pub mod backend;
pub mod caching;
pub mod util;

pub use backend::{BackendClient, BackendCurrencyProvider};
pub use caching::CachingCurrencyRateProvider;
