use super::ui;
use crate::App;
use crate::core::mutation::{AssetDraft, BatchReport, MoveTarget};
use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Color};

pub fn render_report(action: &str, report: &BatchReport) -> String {
    let mut output = format!(
        "{action}: {} succeeded, {} unchanged, {} failed",
        report.success_count(),
        report.unchanged.len(),
        report.failure_count()
    );
    if !report.failed.is_empty() {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("ID"), ui::header_cell("Error")]);
        for (id, err) in &report.failed {
            table.add_row(vec![Cell::new(id), Cell::new(err).fg(Color::Red)]);
        }
        output.push_str(&format!("\n\n{table}"));
    }
    output
}

fn finish(action: &str, report: &BatchReport) -> Result<()> {
    println!("{}", render_report(action, report));
    if !report.is_complete_success() {
        bail!("{action} failed for {} asset(s)", report.failure_count());
    }
    Ok(())
}

pub async fn run_move(app: &App, ids: &[String], target: &MoveTarget) -> Result<()> {
    app.load_assets().await?;
    if let [id] = ids {
        let moved = app
            .dashboard
            .move_node(id, target)
            .await
            .with_context(|| format!("Failed to move {id}"))?;
        if moved {
            println!("Moved {id} to {}", describe_target(target));
        } else {
            println!("{id} is already under {}", describe_target(target));
        }
        return Ok(());
    }
    let report = app.dashboard.move_many(ids, target).await?;
    finish("Move", &report)
}

fn describe_target(target: &MoveTarget) -> String {
    match target {
        MoveTarget::Root => "the root".to_string(),
        MoveTarget::Group(id) => id.clone(),
    }
}

pub async fn run_add_group(app: &App, name: &str, parent: Option<&str>) -> Result<()> {
    app.load_assets().await?;
    app.dashboard
        .add_group(name, parent)
        .await
        .with_context(|| format!("Failed to add group {name}"))?;
    println!("Added group {name}");
    Ok(())
}

pub async fn run_add(app: &App, draft: &AssetDraft) -> Result<()> {
    app.load_assets().await?;
    app.dashboard
        .add_asset(draft)
        .await
        .with_context(|| format!("Failed to add {}", draft.name))?;
    println!("Added {} {}", draft.form.kind().as_str(), draft.name);
    Ok(())
}

pub async fn run_rename(app: &App, id: &str, name: &str) -> Result<()> {
    app.load_assets().await?;
    app.dashboard
        .rename(id, name)
        .await
        .with_context(|| format!("Failed to rename {id}"))?;
    println!("Renamed {id} to {}", name.trim());
    Ok(())
}

pub async fn run_delete(app: &App, ids: &[String]) -> Result<()> {
    app.load_assets().await?;
    let report = app.dashboard.delete_many(ids).await?;
    finish("Delete", &report)
}
