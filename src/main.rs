use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use skinarb::core::log::init_logging;

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

impl From<Commands> for skinarb::AppCommand {
    fn from(cmd: Commands) -> skinarb::AppCommand {
        match cmd {
            Commands::Key { api_key } => skinarb::AppCommand::Key { api_key },
            Commands::Rates {
                usdt_to_rub,
                cny_to_usdt,
            } => skinarb::AppCommand::Rates {
                usdt_to_rub,
                cny_to_usdt,
            },
            Commands::Lookup { name } => skinarb::AppCommand::Lookup { name },
            Commands::Scan {
                name,
                usdt_to_rub,
                cny_to_usdt,
            } => skinarb::AppCommand::Scan {
                name,
                usdt_to_rub,
                cny_to_usdt,
            },
            Commands::Export { out } => skinarb::AppCommand::Export { out },
            Commands::Sheet => skinarb::AppCommand::Sheet,
            Commands::History { name } => skinarb::AppCommand::History { name },
            Commands::Orders { page } => skinarb::AppCommand::Orders { page },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Store the market.csgo API key
    Key { api_key: String },
    /// Store the exchange rates used for valuation
    Rates {
        #[arg(long)]
        usdt_to_rub: f64,
        #[arg(long)]
        cny_to_usdt: f64,
    },
    /// Resolve an item name and list its Buff sell orders
    Lookup { name: String },
    /// Compare an item's prices across Buff and market.csgo
    Scan {
        name: String,
        /// Override the session USDT/RUB rate
        #[arg(long)]
        usdt_to_rub: Option<f64>,
        /// Override the session CNY/USDT rate
        #[arg(long)]
        cny_to_usdt: Option<f64>,
    },
    /// Export the last scan results to a CSV file
    Export {
        /// Output file path
        #[arg(short, long)]
        out: Option<String>,
    },
    /// Valuate the first scanned row and append it to the remote sheet
    Sheet,
    /// Show sales info for an item from market.csgo
    History { name: String },
    /// Show one page of the market.csgo order log
    Orders {
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => skinarb::run_command(cmd.into(), cli.config_path.as_deref()).await,
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

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = skinarb::core::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
goods_file: "goods_data.json"

providers:
  buff:
    base_url: "https://buff.163.com"
  market:
    base_url: "https://market.csgo.com"

# Remote spreadsheet used by `skinarb sheet`:
# sheet:
#   spreadsheet_id: "your-spreadsheet-id"
#   token: "your-api-token"
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
