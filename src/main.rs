use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use ledgerline::cli::{
    handle_budget_command, handle_config_command, handle_month_command,
    handle_reconcile_command, handle_template_command, handle_transaction_command,
    ConfigCommands, MonthCommands, TemplateCommands, TransactionCommands,
};
use ledgerline::config::{paths::DATA_DIR_ENV, LedgerPaths, Settings};
use ledgerline::storage::Storage;

#[derive(Parser)]
#[command(
    name = "ledgerline",
    author = "Kaylee Beyene",
    version,
    about = "Recurring obligation projection and reconciliation",
    long_about = "Ledgerline projects recurring income and expenses into each month, \
                  lets you adjust or skip individual months, records projected \
                  items as they happen and reconciles what you expected against \
                  what actually happened."
)]
struct Cli {
    /// Base directory for settings and data
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize settings and data files
    Init,

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },

    /// Recurring template management
    #[command(subcommand, alias = "tpl")]
    Template(TemplateCommands),

    /// Month view and per-month adjustments
    #[command(subcommand)]
    Month(MonthCommands),

    /// Recorded transaction management
    #[command(subcommand, alias = "transaction")]
    Txn(TransactionCommands),

    /// Match a month's obligations against recorded transactions
    Reconcile {
        /// Month (YYYY-MM), defaults to the current month
        month: Option<String>,
    },

    /// Compare expected and actual amounts per kind and category
    Budget {
        /// Month (YYYY-MM), defaults to the current month
        month: Option<String>,
    },
}

/// Diagnostics go to stderr so command output stays clean
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ledgerline=warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let paths = match cli.data_dir {
        Some(dir) => LedgerPaths::with_base_dir(dir),
        None => LedgerPaths::new()?,
    };
    let mut settings = Settings::load_or_create(&paths)?;

    let Some(command) = cli.command else {
        println!("Ledgerline - recurring obligations and reconciliation");
        println!();
        println!("Run 'ledgerline --help' for usage information.");
        return Ok(());
    };

    // The owner id lives in the settings file, so it must exist before any
    // record is written.
    let was_initialized = paths.is_initialized();
    if !was_initialized {
        settings.save(&paths)?;
    }

    match command {
        Commands::Init => {
            paths.ensure_directories()?;
            if was_initialized {
                println!("Ledgerline is already initialized at: {}", paths.base_dir().display());
            } else {
                println!("Initialized Ledgerline at: {}", paths.base_dir().display());
            }
            println!();
            println!("Run 'ledgerline template add --help' to create your first template.");
        }
        Commands::Config { command } => {
            handle_config_command(&paths, &mut settings, command)?;
        }
        Commands::Template(cmd) => {
            let storage = Storage::open(paths)?;
            handle_template_command(&storage, &settings, cmd)?;
        }
        Commands::Month(cmd) => {
            let storage = Storage::open(paths)?;
            handle_month_command(&storage, &settings, cmd)?;
        }
        Commands::Txn(cmd) => {
            let storage = Storage::open(paths)?;
            handle_transaction_command(&storage, &settings, cmd)?;
        }
        Commands::Reconcile { month } => {
            let storage = Storage::open(paths)?;
            handle_reconcile_command(&storage, &settings, month)?;
        }
        Commands::Budget { month } => {
            let storage = Storage::open(paths)?;
            handle_budget_command(&storage, &settings, month)?;
        }
    }

    Ok(())
}
