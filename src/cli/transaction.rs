//! Transaction CLI commands

use clap::Subcommand;

use super::{parse_amount, parse_date_or_today, parse_kind, parse_month_or_current};
use crate::config::Settings;
use crate::display::format_transaction_list;
use crate::error::LedgerResult;
use crate::services::{CreateTransactionInput, TransactionService};
use crate::storage::Storage;

/// Transaction subcommands
#[derive(Subcommand)]
pub enum TransactionCommands {
    /// Record a transaction
    Add {
        /// Amount (e.g., "45" or "12.50")
        amount: String,
        /// Category
        #[arg(short, long)]
        category: String,
        /// income or expense
        #[arg(short = 't', long = "type", default_value = "expense")]
        kind: String,
        /// Description
        #[arg(short, long)]
        description: Option<String>,
        /// Transaction date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// List recorded transactions
    List {
        /// Month (YYYY-MM), defaults to the current month
        month: Option<String>,
        /// List every month
        #[arg(short, long, conflicts_with = "month")]
        all: bool,
    },
}

/// Handle a transaction command
pub fn handle_transaction_command(
    storage: &Storage,
    settings: &Settings,
    cmd: TransactionCommands,
) -> LedgerResult<()> {
    let owner = settings.owner_id;
    let currency = settings.currency_symbol.as_str();
    let service = TransactionService::new(storage);

    match cmd {
        TransactionCommands::Add {
            amount,
            category,
            kind,
            description,
            date,
        } => {
            let txn = service.create(
                owner,
                CreateTransactionInput {
                    kind: parse_kind(&kind)?,
                    amount: parse_amount(&amount)?,
                    category,
                    description,
                    date: parse_date_or_today(date.as_deref())?,
                },
            )?;

            println!("Created transaction: {}", txn.id);
            println!("  Date:      {}", txn.date.format(&settings.date_format));
            println!("  Amount:    {}", txn.signed_amount().format_with_symbol(currency));
            println!("  Category:  {}", txn.category);
        }

        TransactionCommands::List { month, all } => {
            let transactions = if all {
                service.list_all(owner)?
            } else {
                let month = parse_month_or_current(month.as_deref())?;
                service.list_for_month(owner, month)?
            };
            print!("{}", format_transaction_list(&transactions, currency));
        }
    }

    Ok(())
}
