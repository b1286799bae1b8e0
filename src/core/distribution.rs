//! Works out which nodes make up the distribution breakdown and what share
//! each of them holds.
use crate::core::asset::AssetNode;
use crate::core::currency::CurrencyRateProvider;
use crate::core::selection::Selection;
use crate::core::tree::{Forest, find_node};
use crate::core::valuation::converted_total_value;
use tracing::debug;

pub const CHART_COLORS: [&str; 10] = [
    "#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#06b6d4", "#84cc16", "#f97316",
    "#ec4899", "#6366f1",
];

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionEntry {
    pub name: String,
    pub value: f64,
    pub currency: String,
    pub color: &'static str,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    pub entries: Vec<DistributionEntry>,
    pub total: f64,
    /// True when a selection narrowed the view
    pub filtered: bool,
}

/// Nodes participating in the breakdown for the given selection.
///
/// An empty selection yields the whole forest, a single selected group
/// yields its direct children, anything else yields the selected nodes in
/// selection order. Ids that do not resolve are skipped.
pub fn distribution_nodes<'a>(selection: &Selection, forest: &'a Forest) -> Vec<&'a AssetNode> {
    if selection.is_empty() {
        return forest.roots.iter().collect();
    }

    if selection.len() == 1 {
        if let Some(node) = selection
            .iter()
            .next()
            .and_then(|id| find_node(&forest.roots, id))
        {
            if node.is_group() {
                return node.children.iter().collect();
            }
        }
    }

    selection
        .iter()
        .filter_map(|id| find_node(&forest.roots, id))
        .collect()
}

/// Builds one slice per node, dropping those with a non-positive converted total.
pub async fn compute_distribution(
    nodes: &[&AssetNode],
    provider: &(dyn CurrencyRateProvider + Send + Sync),
    target_currency: &str,
) -> Distribution {
    let mut entries = Vec::new();
    let mut total = 0.0;

    for (index, node) in nodes.iter().enumerate() {
        let value = converted_total_value(node, provider, target_currency).await;
        if value <= 0.0 {
            debug!(node = %node.id, value, "Skipping non-positive slice");
            continue;
        }
        entries.push(DistributionEntry {
            name: node.name.clone(),
            value,
            currency: target_currency.to_string(),
            color: CHART_COLORS[index % CHART_COLORS.len()],
            percentage: 0.0,
        });
        total += value;
    }

    for entry in &mut entries {
        entry.percentage = if total > 0.0 {
            entry.value / total * 100.0
        } else {
            0.0
        };
    }

    Distribution {
        entries,
        total,
        filtered: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::{AssetRecord, GROUP};
    use crate::core::tree::build_tree;
    use anyhow::Result;
    use async_trait::async_trait;

    struct FixedRateProvider(f64);

    #[async_trait]
    impl CurrencyRateProvider for FixedRateProvider {
        async fn get_rate(&self, _from: &str, _to: &str) -> Result<f64> {
            Ok(self.0)
        }
    }

    fn record(id: &str, parent: Option<&str>, kind: &str, value: f64) -> AssetRecord {
        AssetRecord {
            id: id.into(),
            kind: kind.into(),
            parent_id: parent.map(Into::into),
            name: id.to_uppercase(),
            quantity: 1.0,
            unit_cost: value,
            currency: "CNY".into(),
            symbol: None,
            user_id: None,
            current_price: None,
        }
    }

    // A(group, children=[B, C]), D
    fn forest() -> Forest {
        build_tree(&[
            record("a", None, GROUP, 0.0),
            record("b", Some("a"), "stock", 30.0),
            record("c", Some("a"), "stock", 10.0),
            record("d", None, "cash", 60.0),
        ])
    }

    fn ids(nodes: &[&AssetNode]) -> Vec<String> {
        nodes.iter().map(|n| n.id.clone()).collect()
    }

    #[test]
    fn test_empty_selection_returns_whole_forest() {
        let forest = forest();
        let nodes = distribution_nodes(&Selection::new(), &forest);
        assert_eq!(ids(&nodes), vec!["a", "d"]);
    }

    #[test]
    fn test_single_group_selection_drills_down() {
        let forest = forest();
        let selection: Selection = ["a"].into_iter().collect();
        assert_eq!(ids(&distribution_nodes(&selection, &forest)), vec!["b", "c"]);
    }

    #[test]
    fn test_single_leaf_selection_returns_leaf() {
        let forest = forest();
        let selection: Selection = ["c"].into_iter().collect();
        assert_eq!(ids(&distribution_nodes(&selection, &forest)), vec!["c"]);
    }

    #[test]
    fn test_multi_selection_keeps_selection_order() {
        let forest = forest();
        let selection: Selection = ["d", "b", "missing"].into_iter().collect();
        assert_eq!(ids(&distribution_nodes(&selection, &forest)), vec!["d", "b"]);
    }

    #[tokio::test]
    async fn test_percentages_over_included_slices() {
        let forest = build_tree(&[
            record("a", None, GROUP, 0.0),
            record("b", Some("a"), "stock", 30.0),
            record("d", None, "cash", 10.0),
            record("e", None, GROUP, 0.0),
        ]);
        let nodes = distribution_nodes(&Selection::new(), &forest);
        let dist = compute_distribution(&nodes, &FixedRateProvider(2.0), "USD").await;

        assert_eq!(dist.entries.len(), 2);
        assert_eq!(dist.total, 80.0);
        assert_eq!(dist.entries[0].name, "A");
        assert_eq!(dist.entries[0].value, 60.0);
        assert_eq!(dist.entries[0].percentage, 75.0);
        assert_eq!(dist.entries[0].currency, "USD");
        assert_eq!(dist.entries[1].percentage, 25.0);
        assert_eq!(dist.entries[0].color, CHART_COLORS[0]);
        // forest order is a, e, d; e is dropped but still consumes its color slot
        assert_eq!(dist.entries[1].color, CHART_COLORS[2]);
    }

    #[tokio::test]
    async fn test_no_positive_slices_gives_empty_distribution() {
        let forest = build_tree(&[record("e", None, GROUP, 0.0)]);
        let nodes = distribution_nodes(&Selection::new(), &forest);
        let dist = compute_distribution(&nodes, &FixedRateProvider(1.0), "CNY").await;
        assert!(dist.entries.is_empty());
        assert_eq!(dist.total, 0.0);
    }
}
