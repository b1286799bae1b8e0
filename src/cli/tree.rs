use super::ui;
use crate::App;
use crate::core::asset::AssetNode;
use crate::core::currency::CurrencyRateProvider;
use crate::core::tree::Forest;
use crate::core::valuation::{converted_total_value, total_value};
use anyhow::{Result, bail};
use comfy_table::Cell;

/// One rendered line of the tree with its converted subtree value.
pub struct TreeRow<'a> {
    pub depth: usize,
    pub node: &'a AssetNode,
    pub converted: f64,
}

pub async fn tree_rows<'a>(
    forest: &'a Forest,
    rates: &(dyn CurrencyRateProvider + Send + Sync),
    target_currency: &str,
) -> Vec<TreeRow<'a>> {
    let mut rows = Vec::with_capacity(forest.node_count());
    for (depth, node) in forest.iter() {
        let converted = converted_total_value(node, rates, target_currency).await;
        rows.push(TreeRow {
            depth,
            node,
            converted,
        });
    }
    rows
}

pub fn render_tree(rows: &[TreeRow<'_>], target_currency: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Asset"),
        ui::header_cell("ID"),
        ui::header_cell("Quantity"),
        ui::header_cell("Unit cost"),
        ui::header_cell("Price"),
        ui::header_cell("Value"),
        ui::header_cell(&format!("Value ({target_currency})")),
    ]);

    for row in rows {
        let node = row.node;
        let (_, icon) = node.asset_kind().display_info();
        let name = format!("{}{} {}", "  ".repeat(row.depth), icon, node.name);
        let currency = node.currency.clone().unwrap_or_default();
        let native_value = if node.is_group() {
            Some(total_value(node))
        } else {
            node.value
        };

        table.add_row(vec![
            Cell::new(name),
            Cell::new(&node.id),
            ui::format_optional_cell(node.quantity, |q| format!("{q:.2}")),
            ui::format_optional_cell(node.cost, |c| format!("{c:.2}{currency}")),
            ui::format_optional_cell(node.current_price, |p| format!("{p:.2}{currency}")),
            ui::format_optional_cell(native_value, |v| format!("{v:.2}")),
            ui::amount_cell(row.converted),
        ]);
    }

    table.to_string()
}

pub async fn run(app: &App) -> Result<()> {
    app.load_assets().await?;
    let forest = app.dashboard.forest().await;
    let target = app.target_currency();

    if forest.is_empty() {
        println!("{}", ui::style_text("No assets yet", ui::StyleType::Subtle));
        return Ok(());
    }

    let rows = tree_rows(&forest, app.rates.as_ref(), target).await;
    println!(
        "{}\n",
        ui::style_text(&format!("Assets of {}", app.config.user_id), ui::StyleType::Title)
    );
    println!("{}", render_tree(&rows, target));

    let total = app.dashboard.total(target).await;
    println!("\n{}", ui::total_line("Total Value", target, total));
    Ok(())
}

/// Prints the converted value of one node, or of the whole forest.
pub async fn run_value(app: &App, id: Option<&str>) -> Result<()> {
    app.load_assets().await?;
    let target = app.target_currency();

    let (label, value) = match id {
        None => ("Total Value".to_string(), app.dashboard.total(target).await),
        Some(id) => {
            let forest = app.dashboard.forest().await;
            let Some(node) = forest.find(id) else {
                bail!("Asset not found: {id}");
            };
            let value = converted_total_value(node, app.rates.as_ref(), target).await;
            (node.name.clone(), value)
        }
    };

    println!("{}", ui::total_line(&label, target, value));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::{AssetRecord, GROUP};
    use crate::core::tree::build_tree;
    use async_trait::async_trait;

    struct DoubleRates;

    #[async_trait]
    impl CurrencyRateProvider for DoubleRates {
        async fn get_rate(&self, _from: &str, _to: &str) -> anyhow::Result<f64> {
            Ok(2.0)
        }
    }

    fn record(id: &str, parent: Option<&str>, kind: &str, ccy: &str) -> AssetRecord {
        AssetRecord {
            id: id.into(),
            kind: kind.into(),
            parent_id: parent.map(Into::into),
            name: format!("{id} name"),
            quantity: 10.0,
            unit_cost: 5.0,
            currency: ccy.into(),
            symbol: None,
            user_id: None,
            current_price: None,
        }
    }

    #[tokio::test]
    async fn rows_follow_the_tree_and_convert_values() {
        let forest = build_tree(&[
            record("g", None, GROUP, ""),
            record("usd", Some("g"), "stock", "USD"),
            record("cny", Some("g"), "cash", "CNY"),
        ]);

        let rows = tree_rows(&forest, &DoubleRates, "CNY").await;

        let summary: Vec<_> = rows
            .iter()
            .map(|r| (r.depth, r.node.id.as_str(), r.converted))
            .collect();
        // same-currency leaves skip the provider
        assert_eq!(summary, vec![(0, "g", 150.0), (1, "usd", 100.0), (1, "cny", 50.0)]);

        console::set_colors_enabled(false);
        let rendered = render_tree(&rows, "CNY");
        assert!(rendered.contains("Value (CNY)"));
        assert!(rendered.contains("usd name"));
        assert!(rendered.contains("150.00"));
    }
}
