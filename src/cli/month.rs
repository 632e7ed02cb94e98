//! Month CLI commands
//!
//! The merged month view and the per-month ledger: overrides, skips and
//! converting a projected instance into a recorded transaction.

use clap::Subcommand;

use super::{parse_amount, parse_month_or_current};
use crate::config::Settings;
use crate::display::format_month_view;
use crate::error::LedgerResult;
use crate::models::{MonthKey, MonthOverride};
use crate::services::{
    ConversionService, MonthViewService, OverrideInput, OverrideLedgerService, TemplateService,
};
use crate::storage::Storage;

/// Month subcommands
#[derive(Subcommand)]
pub enum MonthCommands {
    /// Show recorded and projected transactions for a month
    Show {
        /// Month (YYYY-MM), defaults to the current month
        month: Option<String>,
    },
    /// Override a template's values for one month
    Override {
        /// Template name or ID
        template: String,
        /// Month (YYYY-MM)
        month: String,
        /// Replacement amount
        #[arg(short, long)]
        amount: Option<String>,
        /// Replacement category
        #[arg(short, long)]
        category: Option<String>,
        /// Replacement name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Skip a template for one month
    Skip {
        /// Template name or ID
        template: String,
        /// Month (YYYY-MM)
        month: String,
    },
    /// Remove a month's override or skip
    Clear {
        /// Template name or ID
        template: String,
        /// Month (YYYY-MM)
        month: String,
    },
    /// Record a projected instance as an actual transaction
    Convert {
        /// Template name or ID
        template: String,
        /// Month (YYYY-MM)
        month: String,
    },
}

/// Handle a month command
pub fn handle_month_command(
    storage: &Storage,
    settings: &Settings,
    cmd: MonthCommands,
) -> LedgerResult<()> {
    let owner = settings.owner_id;
    let currency = settings.currency_symbol.as_str();
    let templates = TemplateService::new(storage);
    let ledger = OverrideLedgerService::new(storage);

    match cmd {
        MonthCommands::Show { month } => {
            let month = parse_month_or_current(month.as_deref())?;
            let items = MonthViewService::new(storage).project_month(owner, month)?;
            print!("{}", format_month_view(month, &items, currency));
        }

        MonthCommands::Override {
            template,
            month,
            amount,
            category,
            name,
        } => {
            let template = templates.find(owner, &template)?;
            let month = MonthKey::parse(&month)?;
            let amount = match amount {
                Some(amount) => Some(parse_amount(&amount)?),
                None => None,
            };

            let values = ledger.set_month_override(
                template.id,
                month,
                OverrideInput {
                    amount,
                    category,
                    name,
                },
            )?;
            println!(
                "Override for '{}' in {}: {} {} ({})",
                template.name,
                month,
                values.name,
                values.amount.format_with_symbol(currency),
                values.category
            );
        }

        MonthCommands::Skip { template, month } => {
            let template = templates.find(owner, &template)?;
            let month = MonthKey::parse(&month)?;
            ledger.set_month_skip(template.id, month)?;
            println!("Skipped '{}' for {}", template.name, month);
        }

        MonthCommands::Clear { template, month } => {
            let template = templates.find(owner, &template)?;
            let month = MonthKey::parse(&month)?;
            match ledger.clear_month_override(template.id, month)? {
                Some(MonthOverride::Skip) => {
                    println!("Removed skip for '{}' in {}", template.name, month)
                }
                Some(MonthOverride::Override(_)) => {
                    println!("Removed override for '{}' in {}", template.name, month)
                }
                None => println!("'{}' has no entry for {}", template.name, month),
            }
        }

        MonthCommands::Convert { template, month } => {
            let template = templates.find(owner, &template)?;
            let month = MonthKey::parse(&month)?;
            let id = ConversionService::new(storage).convert_projected_to_actual(
                owner,
                template.id,
                month,
            )?;
            println!(
                "Recorded '{}' for {} as transaction {}",
                template.name, month, id
            );
        }
    }

    Ok(())
}
