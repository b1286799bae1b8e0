use super::ui;
use crate::core::api::{PriceHistoryApi, TransactionApi};
use crate::core::transaction::{
    Direction, NewTransaction, PriceHistory, TransactionPage, TransactionQuery,
};
use crate::{App, TransactionInput};
use anyhow::{Context, Result};
use comfy_table::{Cell, CellAlignment, Color};

pub fn render_transactions(page: &TransactionPage) -> String {
    if page.transactions.is_empty() {
        return ui::style_text("No transactions", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Account"),
        ui::header_cell("Direction"),
        ui::header_cell("Quantity"),
        ui::header_cell("Price"),
        ui::header_cell("Amount"),
        ui::header_cell("Description"),
    ]);
    for tx in &page.transactions {
        let direction_color = match tx.direction {
            Direction::Inflow => Color::Green,
            Direction::Outflow => Color::Red,
        };
        table.add_row(vec![
            Cell::new(&tx.date),
            Cell::new(&tx.account_id),
            Cell::new(tx.direction).fg(direction_color),
            ui::amount_cell(tx.quantity),
            Cell::new(format!("{:.2}{}", tx.price, tx.currency))
                .set_alignment(CellAlignment::Right),
            ui::amount_cell(tx.amount()),
            Cell::new(&tx.description),
        ]);
    }

    let p = &page.pagination;
    format!(
        "{table}\n{}",
        ui::style_text(
            &format!(
                "Page {} of {} ({} transactions)",
                p.page_index + 1,
                p.total_pages.max(1),
                p.total_count
            ),
            ui::StyleType::Subtle
        )
    )
}

pub fn render_price_history(history: &PriceHistory) -> String {
    if history.points.is_empty() {
        return ui::style_text(
            &format!("No price history for {}", history.account_id),
            ui::StyleType::Subtle,
        );
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Date"), ui::header_cell("Price")]);
    for point in &history.points {
        table.add_row(vec![Cell::new(&point.date), ui::amount_cell(point.price)]);
    }
    table.to_string()
}

pub async fn run_list(app: &App, account: Option<&str>, page: u32) -> Result<()> {
    let mut query = TransactionQuery::for_page(&app.config.user_id, page, app.config.page_size);
    query.account_id = account.map(str::to_string);

    let pb = ui::new_spinner("Fetching transactions...");
    let result = app.client.list_transactions(&query).await;
    pb.finish_and_clear();

    let page = result.context("Failed to list transactions")?;
    println!("{}", render_transactions(&page));
    Ok(())
}

pub fn new_transaction(app: &App, input: &TransactionInput) -> NewTransaction {
    NewTransaction {
        user_id: app.config.user_id.clone(),
        account_id: input.account.clone(),
        direction: input.direction,
        quantity: input.quantity,
        price: input.price,
        currency: input
            .currency
            .clone()
            .unwrap_or_else(|| app.config.currency.clone()),
        description: input.description.clone(),
        date: input.date.clone(),
    }
}

pub async fn run_record(app: &App, input: &TransactionInput) -> Result<()> {
    let tx = new_transaction(app, input);
    app.client
        .create_transaction(&tx)
        .await
        .with_context(|| format!("Failed to record transaction for {}", tx.account_id))?;
    println!(
        "Recorded {} {} x {:.2}{} on {}",
        tx.direction, tx.quantity, tx.price, tx.currency, tx.account_id
    );
    Ok(())
}

pub async fn run_delete(app: &App, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        anyhow::bail!("Transaction id must not be empty");
    }
    app.client
        .delete_transaction(id, &app.config.user_id)
        .await
        .with_context(|| format!("Failed to delete transaction {id}"))?;
    println!("Deleted transaction {id}");
    Ok(())
}

pub async fn run_prices(app: &App, account: &str) -> Result<()> {
    let history = app
        .client
        .price_history(account)
        .await
        .with_context(|| format!("Failed to fetch price history for {account}"))?;
    println!("{}", render_price_history(&history));
    Ok(())
}
