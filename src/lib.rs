pub mod cli;
pub mod core;
pub mod providers;

pub use crate::cli::ui;
pub use crate::core::config;

use crate::core::config::AppConfig;
use crate::core::dashboard::Dashboard;
use crate::core::mutation::{AssetDraft, MoveTarget};
use crate::core::notice::Notifier;
use crate::core::transaction::Direction;
use crate::providers::{BackendClient, BackendCurrencyProvider, CachingCurrencyRateProvider};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Tree,
    Dist {
        select: Vec<String>,
    },
    Value {
        id: Option<String>,
    },
    Move {
        ids: Vec<String>,
        target: MoveTarget,
    },
    AddGroup {
        name: String,
        parent: Option<String>,
    },
    Add(AssetDraft),
    Rename {
        id: String,
        name: String,
    },
    Delete {
        ids: Vec<String>,
    },
    Transactions {
        account: Option<String>,
        page: u32,
    },
    Record(TransactionInput),
    DeleteTransaction {
        id: String,
    },
    Prices {
        account: String,
    },
    Rates,
    Watch,
}

/// A transaction as entered on the command line; the owner and the default
/// currency come from the config.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionInput {
    pub account: String,
    pub direction: Direction,
    pub quantity: f64,
    pub price: f64,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
}

pub type RateProvider = CachingCurrencyRateProvider<BackendCurrencyProvider>;

/// Everything a command needs, wired once from the config.
pub struct App {
    pub config: AppConfig,
    pub client: Arc<BackendClient>,
    pub rates: Arc<RateProvider>,
    pub dashboard: Arc<Dashboard>,
}

impl App {
    pub fn new(config: AppConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let client = Arc::new(
            BackendClient::new(&config.backend.base_url, config.request_timeout())
                .context("Failed to create backend client")?,
        );
        let rates = Arc::new(CachingCurrencyRateProvider::with_settings(
            BackendCurrencyProvider::new(Arc::clone(&client)),
            config.rates.ttl(),
            config.rates.timeout(),
            Arc::clone(&notifier),
        ));
        let dashboard = Arc::new(Dashboard::new(
            client.clone(),
            rates.clone(),
            notifier,
            config.user_id.clone(),
        ));
        Ok(Self {
            config,
            client,
            rates,
            dashboard,
        })
    }

    /// Fetches the asset forest, failing the command when the backend is unusable.
    pub async fn load_assets(&self) -> Result<()> {
        let pb = ui::new_spinner("Loading assets...");
        let result = self.dashboard.force_reload().await;
        pb.finish_and_clear();
        let nodes = result.context("Failed to load assets")?;
        debug!(nodes, "Assets loaded");
        Ok(())
    }

    pub fn target_currency(&self) -> &str {
        &self.config.currency
    }
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fintree starting...");
    let config = load_config(config_path)?;
    let app = App::new(config, Arc::new(ui::TerminalNotifier))?;
    run_with_app(&app, command).await
}

pub async fn run_with_app(app: &App, command: AppCommand) -> Result<()> {
    match command {
        AppCommand::Tree => cli::tree::run(app).await,
        AppCommand::Dist { select } => cli::dist::run(app, &select).await,
        AppCommand::Value { id } => cli::tree::run_value(app, id.as_deref()).await,
        AppCommand::Move { ids, target } => cli::ops::run_move(app, &ids, &target).await,
        AppCommand::AddGroup { name, parent } => {
            cli::ops::run_add_group(app, &name, parent.as_deref()).await
        }
        AppCommand::Add(draft) => cli::ops::run_add(app, &draft).await,
        AppCommand::Rename { id, name } => cli::ops::run_rename(app, &id, &name).await,
        AppCommand::Delete { ids } => cli::ops::run_delete(app, &ids).await,
        AppCommand::Transactions { account, page } => {
            cli::transactions::run_list(app, account.as_deref(), page).await
        }
        AppCommand::Record(input) => cli::transactions::run_record(app, &input).await,
        AppCommand::DeleteTransaction { id } => cli::transactions::run_delete(app, &id).await,
        AppCommand::Prices { account } => cli::transactions::run_prices(app, &account).await,
        AppCommand::Rates => cli::rates::run(app).await,
        AppCommand::Watch => cli::watch::run(app).await,
    }
}
