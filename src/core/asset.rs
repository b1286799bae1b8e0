//! Asset records as served by the backend and the nodes derived from them.

use serde::{Deserialize, Deserializer, Serialize};

pub const GROUP: &str = "group";
pub const DEFAULT_CURRENCY: &str = "CNY";

/// Leaf kinds known to the dashboard. The wire tag stays an open string;
/// anything not listed here maps to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Group,
    Cash,
    Stock,
    Bond,
    Fund,
    Crypto,
    RealEstate,
    Other,
    BrokerImport,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Group => GROUP,
            AssetKind::Cash => "cash",
            AssetKind::Stock => "stock",
            AssetKind::Bond => "bond",
            AssetKind::Fund => "fund",
            AssetKind::Crypto => "crypto",
            AssetKind::RealEstate => "real_estate",
            AssetKind::Other => "other",
            AssetKind::BrokerImport => "longport_import",
        }
    }

    /// Returns display name and icon for the kind
    pub fn display_info(&self) -> (&'static str, &'static str) {
        match self {
            AssetKind::Group => ("Group", "📁"),
            AssetKind::Cash => ("Cash", "💵"),
            AssetKind::Stock => ("Stock", "📈"),
            AssetKind::Bond => ("Bond", "📜"),
            AssetKind::Fund => ("Fund", "🎯"),
            AssetKind::Crypto => ("Crypto", "₿"),
            AssetKind::RealEstate => ("Real estate", "🏠"),
            AssetKind::Other => ("Other", "📦"),
            AssetKind::BrokerImport => ("Broker import", "🔗"),
        }
    }
}

impl From<&str> for AssetKind {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            GROUP => AssetKind::Group,
            "cash" => AssetKind::Cash,
            "stock" => AssetKind::Stock,
            "bond" => AssetKind::Bond,
            "fund" => AssetKind::Fund,
            "crypto" => AssetKind::Crypto,
            "real_estate" => AssetKind::RealEstate,
            "longport_import" => AssetKind::BrokerImport,
            _ => AssetKind::Other,
        }
    }
}

impl std::str::FromStr for AssetKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match AssetKind::from(s) {
            AssetKind::Other if !s.eq_ignore_ascii_case("other") => {
                Err(anyhow::anyhow!("Unknown asset kind: {}", s))
            }
            kind => Ok(kind),
        }
    }
}

/// Flat asset record, one row of the backend's asset table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    #[serde(deserialize_with = "de::string_or_number")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(
        rename = "belong_id",
        alias = "parentId",
        default,
        deserialize_with = "de::optional_id"
    )]
    pub parent_id: Option<String>,
    #[serde(rename = "description", alias = "name", default)]
    pub name: String,
    #[serde(default, deserialize_with = "de::lenient_f64")]
    pub quantity: f64,
    #[serde(rename = "remain_cost", alias = "unitCost", default, deserialize_with = "de::lenient_f64")]
    pub unit_cost: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(
        rename = "price",
        alias = "currentPrice",
        default,
        deserialize_with = "de::optional_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_price: Option<f64>,
}

impl AssetRecord {
    pub fn is_group(&self) -> bool {
        self.kind == GROUP
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.as_deref().is_none_or(str::is_empty)
    }
}

/// A node of the asset forest. Groups carry no valuation fields; leaves
/// carry no children.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetNode {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub symbol: Option<String>,
    pub quantity: Option<f64>,
    pub cost: Option<f64>,
    pub currency: Option<String>,
    pub value: Option<f64>,
    pub current_price: Option<f64>,
    pub children: Vec<AssetNode>,
}

impl AssetNode {
    pub fn is_group(&self) -> bool {
        self.kind == GROUP
    }

    pub fn asset_kind(&self) -> AssetKind {
        AssetKind::from(self.kind.as_str())
    }

    /// Native currency of a leaf, defaulting to CNY when the record had none.
    pub fn currency_or_default(&self) -> &str {
        self.currency
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
    }
}

impl From<&AssetRecord> for AssetNode {
    fn from(record: &AssetRecord) -> Self {
        let mut node = AssetNode {
            id: record.id.clone(),
            name: record.name.clone(),
            kind: record.kind.clone(),
            symbol: record.symbol.clone(),
            quantity: None,
            cost: None,
            currency: None,
            value: None,
            current_price: None,
            children: Vec::new(),
        };

        if !record.is_group() {
            let price = record.current_price.filter(|p| *p != 0.0);
            node.quantity = Some(record.quantity);
            node.cost = Some(record.unit_cost);
            node.currency = Some(record.currency.clone());
            node.value = Some(record.quantity * price.unwrap_or(record.unit_cost));
            node.current_price = price;
        }

        node
    }
}

pub(crate) mod de {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Str(String),
        Int(i64),
        Float(f64),
    }

    pub fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Loose::deserialize(d)? {
            Loose::Str(s) => s,
            Loose::Int(i) => i.to_string(),
            Loose::Float(f) => f.to_string(),
        })
    }

    pub fn optional_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Loose>::deserialize(d)?
            .map(|v| match v {
                Loose::Str(s) => s,
                Loose::Int(i) => i.to_string(),
                Loose::Float(f) => f.to_string(),
            })
            .filter(|s| !s.is_empty()))
    }

    pub fn optional_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Option::<Loose>::deserialize(d)? {
            None => Ok(None),
            Some(Loose::Int(i)) => Ok(Some(i as f64)),
            Some(Loose::Float(f)) => Ok(Some(f)),
            Some(Loose::Str(s)) if s.trim().is_empty() => Ok(None),
            Some(Loose::Str(s)) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }

    pub fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(optional_f64(d)?.unwrap_or(0.0))
    }
}
