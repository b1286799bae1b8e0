//! Backend abstractions consumed by the dashboard.

use crate::core::asset::AssetRecord;
use crate::core::error::Result;
use crate::core::mutation::{AssetUpdate, NewAsset};
use crate::core::transaction::{NewTransaction, PriceHistory, TransactionPage, TransactionQuery};
use async_trait::async_trait;

#[async_trait]
pub trait AssetApi: Send + Sync {
    async fn list_assets(&self, user_id: &str) -> Result<Vec<AssetRecord>>;
    async fn add_asset(&self, asset: &NewAsset) -> Result<()>;
    async fn update_asset(&self, update: &AssetUpdate) -> Result<()>;
    async fn delete_asset(&self, id: &str, user_id: &str) -> Result<()>;
}

#[async_trait]
pub trait TransactionApi: Send + Sync {
    async fn list_transactions(&self, query: &TransactionQuery) -> Result<TransactionPage>;
    async fn create_transaction(&self, tx: &NewTransaction) -> Result<()>;
    async fn delete_transaction(&self, id: &str, user_id: &str) -> Result<()>;
}

#[async_trait]
pub trait PriceHistoryApi: Send + Sync {
    async fn price_history(&self, account_id: &str) -> Result<PriceHistory>;
}
