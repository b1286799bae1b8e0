//! Payloads and local precondition checks for tree mutations.

use crate::core::asset::{AssetKind, DEFAULT_CURRENCY, GROUP};
use crate::core::error::{ApiError, Result, ValidationError};
use crate::core::tree::{Forest, find_parent_id, is_in_subtree};
use chrono::NaiveDate;
use serde::Serialize;

/// Body of `POST /assets/add`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAsset {
    #[serde(rename = "type")]
    pub kind: String,
    pub belong_id: String,
    pub description: String,
    pub quantity: f64,
    pub remain_cost: f64,
    pub currency: String,
    pub symbol: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

impl NewAsset {
    pub fn group(name: &str, parent_id: Option<&str>, user_id: &str) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(ApiError::Validation(vec![ValidationError::new(
                "name",
                "must not be empty",
            )]));
        }
        Ok(Self {
            kind: GROUP.to_string(),
            belong_id: parent_id.unwrap_or_default().to_string(),
            description: name.trim().to_string(),
            quantity: 0.0,
            remain_cost: 0.0,
            currency: DEFAULT_CURRENCY.to_string(),
            symbol: generate_symbol("GROUP", name),
            user_id: user_id.to_string(),
        })
    }

    /// Validates the draft and lays it out the way the backend expects.
    pub fn from_draft(draft: &AssetDraft, user_id: &str) -> Result<Self> {
        let errors = validate_draft(draft);
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        let kind = draft.form.kind();
        let (quantity, remain_cost, symbol) = match &draft.form {
            AssetForm::Cash { amount } => (*amount, 1.0, format!("CASH_{}", millis())),
            AssetForm::Stock {
                quantity,
                unit_cost,
                symbol,
            }
            | AssetForm::Crypto {
                quantity,
                unit_cost,
                symbol,
            } => (
                *quantity,
                *unit_cost,
                symbol
                    .clone()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| generate_symbol("ASSET", &draft.name)),
            ),
            AssetForm::Fund {
                shares,
                unit_cost,
                fund_code,
            } => (*shares, *unit_cost, fund_code.clone()),
            AssetForm::Bond {
                quantity,
                face_value,
            } => (
                quantity.unwrap_or(1.0),
                *face_value,
                format!("BOND_{}", millis()),
            ),
            AssetForm::RealEstate { total_value } | AssetForm::Other { total_value } => (
                1.0,
                *total_value,
                format!("{}_{}", kind.as_str().to_uppercase(), millis()),
            ),
        };

        Ok(Self {
            kind: kind.as_str().to_string(),
            belong_id: draft.parent_id.clone(),
            description: draft.name.trim().to_string(),
            quantity,
            remain_cost,
            currency: draft.currency.clone(),
            symbol,
            user_id: user_id.to_string(),
        })
    }
}

/// Kind-specific fields of a holding being added.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetForm {
    Cash {
        amount: f64,
    },
    Stock {
        quantity: f64,
        unit_cost: f64,
        symbol: Option<String>,
    },
    Crypto {
        quantity: f64,
        unit_cost: f64,
        symbol: Option<String>,
    },
    Fund {
        shares: f64,
        unit_cost: f64,
        fund_code: String,
    },
    Bond {
        quantity: Option<f64>,
        face_value: f64,
    },
    RealEstate {
        total_value: f64,
    },
    Other {
        total_value: f64,
    },
}

impl AssetForm {
    pub fn kind(&self) -> AssetKind {
        match self {
            AssetForm::Cash { .. } => AssetKind::Cash,
            AssetForm::Stock { .. } => AssetKind::Stock,
            AssetForm::Crypto { .. } => AssetKind::Crypto,
            AssetForm::Fund { .. } => AssetKind::Fund,
            AssetForm::Bond { .. } => AssetKind::Bond,
            AssetForm::RealEstate { .. } => AssetKind::RealEstate,
            AssetForm::Other { .. } => AssetKind::Other,
        }
    }

    fn requires_purchase_date(&self) -> bool {
        !matches!(self, AssetForm::Cash { .. } | AssetForm::Other { .. })
    }

    /// (quantity, unit cost) as entered, for validation.
    fn quantity_and_cost(&self) -> (f64, f64) {
        match self {
            AssetForm::Cash { amount } => (*amount, 1.0),
            AssetForm::Stock {
                quantity,
                unit_cost,
                ..
            }
            | AssetForm::Crypto {
                quantity,
                unit_cost,
                ..
            } => (*quantity, *unit_cost),
            AssetForm::Fund {
                shares, unit_cost, ..
            } => (*shares, *unit_cost),
            AssetForm::Bond {
                quantity,
                face_value,
            } => (quantity.unwrap_or(1.0), *face_value),
            AssetForm::RealEstate { total_value } | AssetForm::Other { total_value } => {
                (1.0, *total_value)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetDraft {
    pub name: String,
    pub parent_id: String,
    pub currency: String,
    pub purchase_date: Option<NaiveDate>,
    pub form: AssetForm,
}

/// Per-field problems with a draft; empty when the draft can be submitted.
pub fn validate_draft(draft: &AssetDraft) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if draft.name.trim().is_empty() {
        errors.push(ValidationError::new("name", "must not be empty"));
    }
    if draft.parent_id.trim().is_empty() {
        errors.push(ValidationError::new("parent", "a parent group is required"));
    }
    if draft.currency.trim().is_empty() {
        errors.push(ValidationError::new("currency", "must not be empty"));
    }

    let (quantity, cost) = draft.form.quantity_and_cost();
    if !(quantity.is_finite() && quantity > 0.0) {
        errors.push(ValidationError::new("quantity", "must be greater than 0"));
    }
    if !(cost.is_finite() && cost > 0.0) {
        errors.push(ValidationError::new("cost", "unit cost must be greater than 0"));
    }
    if let AssetForm::Fund { fund_code, .. } = &draft.form {
        if fund_code.trim().is_empty() {
            errors.push(ValidationError::new("fund_code", "must not be empty"));
        }
    }
    if draft.form.requires_purchase_date() && draft.purchase_date.is_none() {
        errors.push(ValidationError::new("purchase_date", "is required"));
    }

    errors
}

/// Body of `PUT /assets/update`: either a move or a rename.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssetUpdate {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    /// `Some("")` moves the asset to the root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub belong_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AssetUpdate {
    pub fn reparent(id: &str, user_id: &str, target: &MoveTarget) -> Self {
        Self {
            id: id.to_string(),
            user_id: user_id.to_string(),
            belong_id: Some(target.parent_id().to_string()),
            ..Default::default()
        }
    }

    pub fn rename(id: &str, user_id: &str, name: &str) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(ApiError::Validation(vec![ValidationError::new(
                "name",
                "must not be empty",
            )]));
        }
        Ok(Self {
            id: id.to_string(),
            user_id: user_id.to_string(),
            description: Some(name.trim().to_string()),
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveTarget {
    Root,
    Group(String),
}

impl MoveTarget {
    pub fn parent_id(&self) -> &str {
        match self {
            MoveTarget::Root => "",
            MoveTarget::Group(id) => id,
        }
    }
}

impl std::fmt::Display for MoveTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoveTarget::Root => write!(f, "<root>"),
            MoveTarget::Group(id) => write!(f, "{id}"),
        }
    }
}

/// Checks a move against the current forest before anything is sent.
///
/// Returns `Ok(false)` when the node already sits under `target`.
pub fn check_move(forest: &Forest, node_id: &str, target: &MoveTarget) -> Result<bool> {
    let node = forest
        .find(node_id)
        .ok_or_else(|| ApiError::NotFound(node_id.to_string()))?;

    if let MoveTarget::Group(target_id) = target {
        let target_node = forest
            .find(target_id)
            .ok_or_else(|| ApiError::NotFound(target_id.clone()))?;
        if !target_node.is_group() {
            return Err(ApiError::InvalidTarget(target_id.clone()));
        }
        if is_in_subtree(node, target_id) {
            return Err(ApiError::SelfMove {
                node: node_id.to_string(),
                target: target_id.clone(),
            });
        }
    }

    let current = find_parent_id(forest, node_id).unwrap_or_default();
    Ok(current != target.parent_id())
}

/// Outcome of a non-transactional batch operation.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub unchanged: Vec<String>,
    pub failed: Vec<(String, ApiError)>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

fn millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// `<PREFIX>_<first three alphanumerics>_<millis>_<random>`, unique enough for the backend.
pub fn generate_symbol(prefix: &str, name: &str) -> String {
    let short: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(3)
        .collect::<String>()
        .to_uppercase();
    let random: String = uuid::Uuid::new_v4().simple().to_string().chars().take(5).collect();
    format!("{prefix}_{short}_{}_{random}", millis())
}
