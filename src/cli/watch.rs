use super::ui;
use crate::App;
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Keeps the forest fresh until Ctrl-C, printing the total after every tick.
pub async fn run(app: &App) -> Result<()> {
    let interval = app.config.refresh_interval();
    let target = app.target_currency();
    info!(?interval, "Watching assets");

    let refresh = app.dashboard.start_auto_refresh(interval);
    let purge = app.rates.spawn_purge_task(PURGE_INTERVAL);
    println!(
        "{}",
        ui::style_text(
            &format!("Refreshing every {}s, press Ctrl-C to stop", interval.as_secs()),
            ui::StyleType::Subtle
        )
    );

    let mut ticker = tokio::time::interval(interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
            _ = ticker.tick() => {
                let stamp = app
                    .dashboard
                    .last_refresh()
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "never".to_string());
                let forest = app.dashboard.forest().await;
                let total = app.dashboard.total(target).await;
                println!(
                    "[{stamp}] {} assets, {}",
                    forest.node_count(),
                    ui::total_line("Total Value", target, total)
                );
            }
        }
    }

    refresh.stop();
    purge.stop();
    info!("Stopped watching");
    Ok(())
}
