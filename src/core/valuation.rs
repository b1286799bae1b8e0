//! Aggregate values over asset subtrees.
use crate::core::asset::AssetNode;
use crate::core::currency::{self, CurrencyRateProvider};
use futures::future::BoxFuture;
use futures::FutureExt;

/// Own leaf value plus every descendant's, in native units. Missing or
/// non-positive values contribute nothing.
pub fn total_value(node: &AssetNode) -> f64 {
    let own = if node.is_group() {
        0.0
    } else {
        node.value.filter(|v| *v > 0.0).unwrap_or(0.0)
    };
    own + node.children.iter().map(total_value).sum::<f64>()
}

/// Converted value of a single leaf; groups are worth 0 on their own.
pub async fn converted_leaf_value(
    node: &AssetNode,
    provider: &(dyn CurrencyRateProvider + Send + Sync),
    target_currency: &str,
) -> f64 {
    match node.value {
        Some(value) if value > 0.0 && !node.is_group() => {
            currency::convert(provider, value, node.currency_or_default(), target_currency).await
        }
        _ => 0.0,
    }
}

/// Subtree total with every leaf converted into `target_currency` first.
pub fn converted_total_value<'a>(
    node: &'a AssetNode,
    provider: &'a (dyn CurrencyRateProvider + Send + Sync),
    target_currency: &'a str,
) -> BoxFuture<'a, f64> {
    async move {
        let mut total = converted_leaf_value(node, provider, target_currency).await;
        for child in &node.children {
            total += converted_total_value(child, provider, target_currency).await;
        }
        total
    }
    .boxed()
}
