use crate::core::api::{AssetApi, PriceHistoryApi, TransactionApi};
use crate::core::asset::{AssetRecord, de};
use crate::core::currency::CurrencyRateProvider;
use crate::core::error::{ApiError, Result};
use crate::core::mutation::{AssetUpdate, NewAsset};
use crate::core::transaction::{
    NewTransaction, Pagination, PriceHistory, Transaction, TransactionPage, TransactionQuery,
};
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const USER_AGENT: &str = "fintree/0.1";

/// `{success, data?, error?, message?}` wrapper used by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    error: Option<String>,
    message: Option<String>,
    pagination: Option<Pagination>,
}

impl<T> Envelope<T> {
    fn failure_message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "Request failed".to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RateData {
    #[serde(deserialize_with = "de::lenient_f64")]
    converted_amount: f64,
}

/// JSON REST client for the asset backend.
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    client: Client,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let raw = format!("{}{}", self.base_url, path);
        let parsed = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };
        parsed.map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<Envelope<T>> {
        debug!(%method, %url, "Backend request");
        let mut request = self.client.request(method, url.clone());
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.error.or(b.message))
                .unwrap_or_else(|| {
                    format!("HTTP {}: {}", status.as_u16(), status.canonical_reason().unwrap_or(""))
                });
            return Err(ApiError::http(status.as_u16(), message));
        }

        let envelope: Envelope<T> = serde_json::from_str(&text)
            .map_err(|e| ApiError::Decode(format!("{url}: {e}")))?;
        if !envelope.success {
            return Err(ApiError::Backend(envelope.failure_message()));
        }
        Ok(envelope)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<Envelope<T>> {
        let url = self.url(path, params)?;
        self.call(Method::GET, url, None).await
    }

    async fn send_json(&self, method: Method, path: &str, body: serde_json::Value) -> Result<()> {
        let url = self.url(path, &[])?;
        self.call::<serde_json::Value>(method, url, Some(body)).await?;
        Ok(())
    }

    /// True when anything answers at the health endpoint, whatever the status.
    pub async fn check_connection(&self) -> bool {
        let Ok(url) = self.url("/api/v1/health", &[]) else {
            return false;
        };
        match self.client.get(url).send().await {
            Ok(response) => {
                debug!(status = %response.status(), "Health check answered");
                true
            }
            Err(e) => {
                debug!("Health check failed: {e}");
                false
            }
        }
    }

    /// Amount of `to` one unit of `from` buys, as reported by the backend.
    #[instrument(name = "BackendRateFetch", skip(self))]
    pub async fn fetch_rate(&self, from: &str, to: &str) -> Result<f64> {
        let params = [
            ("from_currency", from.to_string()),
            ("to_currency", to.to_string()),
            ("amount", "1".to_string()),
        ];
        let envelope: Envelope<RateData> = self.get("/api/v1/get_foreign_currency_rate", &params).await?;
        let rate = envelope
            .data
            .ok_or_else(|| ApiError::Decode(format!("No rate data for {from}-{to}")))?
            .converted_amount;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ApiError::Decode(format!("Invalid rate {rate} for {from}-{to}")));
        }
        Ok(rate)
    }
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

#[async_trait]
impl AssetApi for BackendClient {
    #[instrument(name = "ListAssets", skip(self))]
    async fn list_assets(&self, user_id: &str) -> Result<Vec<AssetRecord>> {
        let envelope: Envelope<Vec<AssetRecord>> = self
            .get("/api/v1/assets/info", &[("userId", user_id.to_string())])
            .await?;
        let records = envelope.data.unwrap_or_default();
        debug!(count = records.len(), "Fetched asset records");
        Ok(records)
    }

    #[instrument(name = "AddAsset", skip(self, asset), fields(name = %asset.description))]
    async fn add_asset(&self, asset: &NewAsset) -> Result<()> {
        self.send_json(Method::POST, "/api/v1/assets/add", to_body(asset)?)
            .await
    }

    #[instrument(name = "UpdateAsset", skip(self, update), fields(id = %update.id))]
    async fn update_asset(&self, update: &AssetUpdate) -> Result<()> {
        self.send_json(Method::PUT, "/api/v1/assets/update", to_body(update)?)
            .await
    }

    #[instrument(name = "DeleteAsset", skip(self))]
    async fn delete_asset(&self, id: &str, user_id: &str) -> Result<()> {
        let body = serde_json::json!({ "id": id, "userId": user_id });
        self.send_json(Method::POST, "/api/v1/assets/del", body).await
    }
}

#[async_trait]
impl TransactionApi for BackendClient {
    #[instrument(name = "ListTransactions", skip(self))]
    async fn list_transactions(&self, query: &TransactionQuery) -> Result<TransactionPage> {
        query.validate()?;
        let envelope: Envelope<Vec<Transaction>> =
            self.get("/api/v1/transactions", &query.params()).await?;
        let transactions = envelope.data.unwrap_or_default();
        let pagination = envelope.pagination.unwrap_or_else(|| {
            Pagination::single_page(query.page_index, query.page_size, transactions.len())
        });
        Ok(TransactionPage {
            transactions,
            pagination,
        })
    }

    #[instrument(name = "CreateTransaction", skip(self, tx), fields(account = %tx.account_id))]
    async fn create_transaction(&self, tx: &NewTransaction) -> Result<()> {
        tx.validate()?;
        self.send_json(Method::POST, "/api/v1/transactions", to_body(tx)?)
            .await
    }

    #[instrument(name = "DeleteTransaction", skip(self))]
    async fn delete_transaction(&self, id: &str, user_id: &str) -> Result<()> {
        let url = self.url(
            &format!("/api/v1/transactions/{id}"),
            &[("userId", user_id.to_string())],
        )?;
        self.call::<serde_json::Value>(Method::DELETE, url, None)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PriceHistoryApi for BackendClient {
    #[instrument(name = "PriceHistory", skip(self))]
    async fn price_history(&self, account_id: &str) -> Result<PriceHistory> {
        let envelope: Envelope<PriceHistory> = self
            .get("/api/v1/get_price_tracing", &[("accountId", account_id.to_string())])
            .await?;
        Ok(envelope.data.unwrap_or(PriceHistory {
            account_id: account_id.to_string(),
            points: Vec::new(),
        }))
    }
}

/// Exchange rates served by the backend's conversion endpoint.
pub struct BackendCurrencyProvider {
    client: Arc<BackendClient>,
}

impl BackendCurrencyProvider {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CurrencyRateProvider for BackendCurrencyProvider {
    async fn get_rate(&self, from: &str, to: &str) -> anyhow::Result<f64> {
        Ok(self.client.fetch_rate(from, to).await?)
    }
}
