use super::ui;
use crate::App;
use crate::core::distribution::Distribution;
use anyhow::Result;
use comfy_table::{Cell, Color};

/// Maps a palette hex color onto the terminal.
fn swatch(hex: &str) -> Cell {
    let rgb = hex.strip_prefix('#').and_then(|h| {
        let value = u32::from_str_radix(h, 16).ok()?;
        Some(((value >> 16) as u8, (value >> 8) as u8, value as u8))
    });
    match rgb {
        Some((r, g, b)) => Cell::new("■").fg(Color::Rgb { r, g, b }),
        None => Cell::new(" "),
    }
}

pub fn render_distribution(distribution: &Distribution) -> String {
    if distribution.entries.is_empty() {
        return ui::style_text("Nothing to show", ui::StyleType::Subtle);
    }

    let currency = distribution
        .entries
        .first()
        .map(|e| e.currency.as_str())
        .unwrap_or_default();

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell(""),
        ui::header_cell("Asset"),
        ui::header_cell(&format!("Value ({currency})")),
        ui::header_cell("Share"),
    ]);
    for entry in &distribution.entries {
        table.add_row(vec![
            swatch(entry.color),
            Cell::new(&entry.name),
            ui::amount_cell(entry.value),
            ui::format_percentage_cell(entry.percentage),
        ]);
    }

    let title = if distribution.filtered {
        "Distribution (selection)"
    } else {
        "Distribution"
    };
    format!(
        "{}\n\n{}\n\n{}",
        ui::style_text(title, ui::StyleType::Title),
        table,
        ui::total_line("Total", currency, distribution.total)
    )
}

pub async fn run(app: &App, select: &[String]) -> Result<()> {
    app.load_assets().await?;
    for id in select {
        app.dashboard.select(id.as_str());
    }
    let distribution = app.dashboard.distribution(app.target_currency()).await;
    println!("{}", render_distribution(&distribution));
    Ok(())
}
