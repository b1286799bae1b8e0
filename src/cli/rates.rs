use super::ui;
use crate::App;
use anyhow::Result;
use comfy_table::Cell;

pub fn render_rates(rates: &[(String, f64)]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Pair"), ui::header_cell("Rate")]);
    for (pair, rate) in rates {
        table.add_row(vec![
            Cell::new(pair),
            ui::format_optional_cell(Some(*rate), |r| format!("{r:.4}")),
        ]);
    }
    table.to_string()
}

/// Warms every supported pair and prints what ended up in the cache.
pub async fn run(app: &App) -> Result<()> {
    let currencies = &app.config.supported_currencies;
    let pb = ui::new_spinner("Fetching exchange rates...");
    app.rates.refresh_rates(currencies).await;
    pb.finish_and_clear();

    let rates = app.rates.cached_rates().await;
    if rates.is_empty() {
        println!(
            "{}",
            ui::style_text("No exchange rates available", ui::StyleType::Error)
        );
        return Ok(());
    }
    println!("{}", render_rates(&rates));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_use_four_decimals() {
        let rendered = render_rates(&[("USD-CNY".to_string(), 7.1234567)]);
        assert!(rendered.contains("USD-CNY"));
        assert!(rendered.contains("7.1235"));
    }
}
