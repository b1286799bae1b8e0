use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use fintree::core::asset::{AssetKind, DEFAULT_CURRENCY};
use fintree::core::log::init_logging;
use fintree::core::mutation::{AssetDraft, AssetForm, MoveTarget};
use fintree::core::transaction::Direction;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display the asset tree
    Tree,
    /// Display the value distribution
    Dist {
        /// Restrict the breakdown to these nodes
        #[arg(long = "select", num_args = 1..)]
        select: Vec<String>,
    },
    /// Display the converted value of one node or of everything
    Value { id: Option<String> },
    /// Move assets under another group
    Move {
        #[arg(required = true)]
        ids: Vec<String>,
        #[command(flatten)]
        destination: Destination,
    },
    /// Create a group
    AddGroup {
        name: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Create an asset inside a group
    Add(AddArgs),
    /// Rename an asset or group
    Rename { id: String, name: String },
    /// Delete assets or groups
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// List transactions
    Transactions {
        #[arg(long)]
        account: Option<String>,
        /// Page number, starting at 1
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
    },
    /// Record a buy or sell
    Record(RecordArgs),
    /// Delete a recorded transaction
    DeleteTransaction { id: String },
    /// Display the price history of an account
    Prices { account: String },
    /// Fetch and display exchange rates
    Rates,
    /// Keep refreshing the assets until Ctrl-C
    Watch,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Destination {
    /// Destination group
    #[arg(long)]
    to: Option<String>,
    /// Move to the top level
    #[arg(long)]
    root: bool,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Side {
    #[arg(long)]
    buy: bool,
    #[arg(long)]
    sell: bool,
}

impl Side {
    fn direction(&self) -> Direction {
        if self.sell && !self.buy {
            Direction::Outflow
        } else {
            Direction::Inflow
        }
    }
}

#[derive(Args)]
struct AddArgs {
    /// cash, stock, crypto, fund, bond, real_estate or other
    kind: AssetKind,
    name: String,
    #[arg(long)]
    parent: String,
    #[arg(long, default_value = DEFAULT_CURRENCY)]
    currency: String,
    /// Purchase date, YYYY-MM-DD
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Cash amount
    #[arg(long)]
    amount: Option<f64>,
    /// Units held (stock, crypto, fund shares, bonds)
    #[arg(long)]
    quantity: Option<f64>,
    #[arg(long)]
    unit_cost: Option<f64>,
    #[arg(long)]
    symbol: Option<String>,
    #[arg(long)]
    fund_code: Option<String>,
    #[arg(long)]
    face_value: Option<f64>,
    /// Total value (real_estate, other)
    #[arg(long)]
    total_value: Option<f64>,
}

#[derive(Args)]
struct RecordArgs {
    account: String,
    #[command(flatten)]
    side: Side,
    #[arg(long)]
    quantity: f64,
    #[arg(long)]
    price: f64,
    #[arg(long)]
    currency: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    date: Option<String>,
}

impl TryFrom<AddArgs> for AssetDraft {
    type Error = anyhow::Error;

    fn try_from(args: AddArgs) -> Result<Self> {
        // Missing numbers become 0 so validation reports them per field
        let form = match args.kind {
            AssetKind::Cash => AssetForm::Cash {
                amount: args.amount.unwrap_or_default(),
            },
            AssetKind::Stock => AssetForm::Stock {
                quantity: args.quantity.unwrap_or_default(),
                unit_cost: args.unit_cost.unwrap_or_default(),
                symbol: args.symbol,
            },
            AssetKind::Crypto => AssetForm::Crypto {
                quantity: args.quantity.unwrap_or_default(),
                unit_cost: args.unit_cost.unwrap_or_default(),
                symbol: args.symbol,
            },
            AssetKind::Fund => AssetForm::Fund {
                shares: args.quantity.unwrap_or_default(),
                unit_cost: args.unit_cost.unwrap_or_default(),
                fund_code: args.fund_code.unwrap_or_default(),
            },
            AssetKind::Bond => AssetForm::Bond {
                quantity: args.quantity,
                face_value: args.face_value.unwrap_or_default(),
            },
            AssetKind::RealEstate => AssetForm::RealEstate {
                total_value: args.total_value.unwrap_or_default(),
            },
            AssetKind::Other => AssetForm::Other {
                total_value: args.total_value.unwrap_or_default(),
            },
            AssetKind::Group => bail!("Use `add-group` to create groups"),
            AssetKind::BrokerImport => bail!("Broker imports cannot be created by hand"),
        };
        Ok(AssetDraft {
            name: args.name,
            parent_id: args.parent,
            currency: args.currency,
            purchase_date: args.date,
            form,
        })
    }
}

impl From<RecordArgs> for fintree::TransactionInput {
    fn from(args: RecordArgs) -> Self {
        fintree::TransactionInput {
            account: args.account,
            direction: args.side.direction(),
            quantity: args.quantity,
            price: args.price,
            currency: args.currency,
            description: args.description,
            date: args.date,
        }
    }
}

impl TryFrom<Commands> for fintree::AppCommand {
    type Error = anyhow::Error;

    fn try_from(cmd: Commands) -> Result<fintree::AppCommand> {
        use fintree::AppCommand;

        Ok(match cmd {
            Commands::Tree => AppCommand::Tree,
            Commands::Dist { select } => AppCommand::Dist { select },
            Commands::Value { id } => AppCommand::Value { id },
            Commands::Move { ids, destination } => {
                let target = match (destination.to, destination.root) {
                    (_, true) => MoveTarget::Root,
                    (Some(group), false) => MoveTarget::Group(group),
                    (None, false) => bail!("Either --to or --root is required"),
                };
                AppCommand::Move { ids, target }
            }
            Commands::AddGroup { name, parent } => AppCommand::AddGroup { name, parent },
            Commands::Add(args) => AppCommand::Add(args.try_into()?),
            Commands::Rename { id, name } => AppCommand::Rename { id, name },
            Commands::Delete { ids } => AppCommand::Delete { ids },
            Commands::Transactions { account, page } => {
                AppCommand::Transactions { account, page }
            }
            Commands::Record(args) => AppCommand::Record(args.into()),
            Commands::DeleteTransaction { id } => AppCommand::DeleteTransaction { id },
            Commands::Prices { account } => AppCommand::Prices { account },
            Commands::Rates => AppCommand::Rates,
            Commands::Watch => AppCommand::Watch,
            Commands::Setup => bail!("Setup command should be handled separately"),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => fintree::cli::setup::setup_at_path(path),
            None => fintree::cli::setup::setup(),
        },
        Some(cmd) => match fintree::AppCommand::try_from(cmd) {
            Ok(command) => fintree::run_command(command, cli.config_path.as_deref()).await,
            Err(e) => Err(e),
        },
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
