//! Template CLI commands
//!
//! Creating, listing and inspecting recurring templates, and their lifecycle:
//! stopping recurrence, deleting, purging and promoting a transaction.

use clap::Subcommand;

use super::{parse_amount, parse_date_or_today, parse_frequency, parse_kind};
use crate::config::Settings;
use crate::display::{format_template_details, format_template_list};
use crate::error::LedgerResult;
use crate::services::{
    monthly_commitment, CreateTemplateInput, DeleteScope, LifecycleService, TemplateService,
    TransactionService,
};
use crate::storage::Storage;

/// Template subcommands
#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Create a recurring template
    Add {
        /// Template name (e.g., "Rent")
        name: String,
        /// Amount per occurrence (e.g., "1200" or "12.50")
        amount: String,
        /// Category
        #[arg(short, long)]
        category: String,
        /// income or expense
        #[arg(short = 't', long = "type", default_value = "expense")]
        kind: String,
        /// weekly, biweekly, monthly, quarterly or yearly
        #[arg(short, long, default_value = "monthly")]
        frequency: String,
        /// First occurrence (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        start: Option<String>,
        /// Last day of recurrence (YYYY-MM-DD)
        #[arg(short, long)]
        end: Option<String>,
    },
    /// List templates with the monthly commitment
    List {
        /// Include inactive templates
        #[arg(short, long)]
        all: bool,
    },
    /// Show template details and its month ledger
    Show {
        /// Template name or ID
        template: String,
    },
    /// End recurrence after the month of the given date
    Stop {
        /// Template name or ID
        template: String,
        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Delete a template for one month or for all future months
    Delete {
        /// Template name or ID
        template: String,
        /// Deactivate the template instead of skipping only the current month
        #[arg(long)]
        all_future: bool,
        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Remove a template record entirely
    Purge {
        /// Template name or ID
        template: String,
        /// Confirm removal
        #[arg(long)]
        force: bool,
    },
    /// Turn a recorded transaction into a template
    Promote {
        /// Transaction ID
        transaction: String,
        /// weekly, biweekly, monthly, quarterly or yearly
        #[arg(short, long, default_value = "monthly")]
        frequency: String,
    },
}

/// Handle a template command
pub fn handle_template_command(
    storage: &Storage,
    settings: &Settings,
    cmd: TemplateCommands,
) -> LedgerResult<()> {
    let owner = settings.owner_id;
    let currency = settings.currency_symbol.as_str();
    let service = TemplateService::new(storage);
    let lifecycle = LifecycleService::new(storage);

    match cmd {
        TemplateCommands::Add {
            name,
            amount,
            category,
            kind,
            frequency,
            start,
            end,
        } => {
            let end_date = match end {
                Some(end) => Some(parse_date_or_today(Some(end.as_str()))?),
                None => None,
            };
            let template = service.create(
                owner,
                CreateTemplateInput {
                    name,
                    kind: parse_kind(&kind)?,
                    amount: parse_amount(&amount)?,
                    category,
                    frequency: parse_frequency(&frequency)?,
                    start_date: parse_date_or_today(start.as_deref())?,
                    end_date,
                },
            )?;

            println!("Created template: {}", template.name);
            println!("  ID:        {}", template.id);
            println!(
                "  Amount:    {} {}",
                template.amount.format_with_symbol(currency),
                template.frequency
            );
            println!("  Starts:    {}", template.start_date);
        }

        TemplateCommands::List { all } => {
            let templates = service.list(owner, all)?;
            let commitment = monthly_commitment(&templates);
            print!("{}", format_template_list(&templates, &commitment, currency));
        }

        TemplateCommands::Show { template } => {
            let template = service.find(owner, &template)?;
            print!("{}", format_template_details(&template, currency));
        }

        TemplateCommands::Stop { template, date } => {
            let template = service.find(owner, &template)?;
            let reference_date = parse_date_or_today(date.as_deref())?;
            let updated = lifecycle.stop_future_recurrence(template.id, reference_date)?;

            if let Some(end) = updated.end_date {
                println!("'{}' now ends on {}", updated.name, end);
            }
        }

        TemplateCommands::Delete {
            template,
            all_future,
            date,
        } => {
            let template = service.find(owner, &template)?;
            let reference_date = parse_date_or_today(date.as_deref())?;
            let scope = if all_future {
                DeleteScope::AllFuture
            } else {
                DeleteScope::CurrentMonthOnly
            };
            let updated = lifecycle.delete_template(template.id, scope, reference_date)?;

            match scope {
                DeleteScope::CurrentMonthOnly => println!(
                    "Skipped '{}' for {}",
                    updated.name,
                    reference_date.format("%Y-%m")
                ),
                DeleteScope::AllFuture => {
                    println!("Deactivated '{}'; it no longer projects", updated.name)
                }
            }
        }

        TemplateCommands::Purge { template, force } => {
            let template = service.find(owner, &template)?;
            if !force {
                println!(
                    "This removes '{}' and its month ledger permanently.",
                    template.name
                );
                println!("Re-run with --force to confirm.");
                return Ok(());
            }

            let removed = lifecycle.purge_template(template.id)?;
            println!("Purged template: {}", removed.name);
        }

        TemplateCommands::Promote {
            transaction,
            frequency,
        } => {
            let txn = TransactionService::new(storage).find(owner, &transaction)?;
            let template =
                lifecycle.promote_transaction_to_template(txn.id, parse_frequency(&frequency)?)?;

            println!("Promoted transaction {} to template '{}'", txn.id, template.name);
            println!("  ID:        {}", template.id);
            println!(
                "  Amount:    {} {}",
                template.amount.format_with_symbol(currency),
                template.frequency
            );
        }
    }

    Ok(())
}
