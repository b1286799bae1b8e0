//! Ledger transactions and price history points.

use crate::core::asset::de;
use crate::core::error::{ApiError, Result, ValidationError};
use serde::{Deserialize, Serialize};

pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Direction {
    /// Units coming in, e.g. a buy
    Inflow,
    /// Units going out, e.g. a sell
    Outflow,
}

impl TryFrom<u8> for Direction {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Direction::Inflow),
            1 => Ok(Direction::Outflow),
            other => Err(format!("Invalid transaction direction: {other}")),
        }
    }
}

impl From<Direction> for u8 {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Inflow => 0,
            Direction::Outflow => 1,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Inflow => write!(f, "IN"),
            Direction::Outflow => write!(f, "OUT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Transaction {
    #[serde(deserialize_with = "de::string_or_number")]
    pub id: String,
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(rename = "accountId", deserialize_with = "de::string_or_number")]
    pub account_id: String,
    #[serde(default)]
    pub description: String,
    pub date: String,
    pub direction: Direction,
    #[serde(deserialize_with = "de::lenient_f64")]
    pub quantity: f64,
    #[serde(deserialize_with = "de::lenient_f64")]
    pub price: f64,
    #[serde(default)]
    pub currency: String,
}

impl Transaction {
    pub fn amount(&self) -> f64 {
        self.quantity * self.price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTransaction {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "accountId")]
    pub account_id: String,
    pub direction: Direction,
    pub quantity: f64,
    pub price: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl NewTransaction {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.account_id.trim().is_empty() {
            errors.push(ValidationError::new("accountId", "must not be empty"));
        }
        if !(self.quantity.is_finite() && self.quantity > 0.0) {
            errors.push(ValidationError::new("quantity", "must be greater than 0"));
        }
        if !(self.price.is_finite() && self.price >= 0.0) {
            errors.push(ValidationError::new("price", "must be a non-negative number"));
        }
        if self.currency.trim().is_empty() {
            errors.push(ValidationError::new("currency", "must not be empty"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    pub page_index: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// Pagination for a response that returned everything at once.
    pub fn single_page(page_index: u32, page_size: u32, count: usize) -> Self {
        Self {
            page_index,
            page_size,
            total_count: count as u64,
            total_pages: 1,
            has_next: false,
            has_prev: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionQuery {
    pub user_id: String,
    pub account_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page_index: u32,
    pub page_size: u32,
}

impl TransactionQuery {
    pub fn new(user_id: impl Into<String>, page_index: u32, page_size: u32) -> Self {
        Self {
            user_id: user_id.into(),
            account_id: None,
            start_date: None,
            end_date: None,
            page_index,
            page_size,
        }
    }

    /// Query for a page numbered from 1, as shown to users. The backend
    /// counts `page_index` from 0.
    pub fn for_page(user_id: impl Into<String>, page: u32, page_size: u32) -> Self {
        Self::new(user_id, page.saturating_sub(1), page_size)
    }

    /// Page number as shown to users.
    pub fn page_number(&self) -> u32 {
        self.page_index + 1
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.user_id.is_empty() {
            errors.push(ValidationError::new("userId", "must not be empty"));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            errors.push(ValidationError::new(
                "page_size",
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }
        for (field, value) in [("start_date", &self.start_date), ("end_date", &self.end_date)] {
            if let Some(date) = value {
                if !is_iso_date(date) {
                    errors.push(ValidationError::new(field, "must be an ISO date"));
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }

    /// Query pairs in the order the backend documents them.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("userId", self.user_id.clone()),
            ("page_index", self.page_index.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        if let Some(account) = &self.account_id {
            params.push(("accountId", account.clone()));
        }
        if let Some(start) = &self.start_date {
            params.push(("start_date", start.clone()));
        }
        if let Some(end) = &self.end_date {
            params.push(("end_date", end.clone()));
        }
        params
    }
}

fn is_iso_date(s: &str) -> bool {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PricePoint {
    pub date: String,
    #[serde(deserialize_with = "de::lenient_f64")]
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceHistory {
    #[serde(rename = "accountId", deserialize_with = "de::string_or_number")]
    pub account_id: String,
    #[serde(rename = "price_tracing", default)]
    pub points: Vec<PricePoint>,
}
