//! Configuration CLI commands

use clap::Subcommand;

use crate::config::{LedgerPaths, Settings, SimilarityMode};
use crate::error::{LedgerError, LedgerResult};

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show paths and settings
    Show,
    /// Set the currency symbol used in output
    Currency {
        /// Symbol (e.g., "$", "€")
        symbol: String,
    },
    /// Set the reconciliation similarity mode
    Similarity {
        /// exact or fuzzy
        mode: String,
    },
}

/// Handle a config command; no subcommand shows the configuration
pub fn handle_config_command(
    paths: &LedgerPaths,
    settings: &mut Settings,
    cmd: Option<ConfigCommands>,
) -> LedgerResult<()> {
    match cmd.unwrap_or(ConfigCommands::Show) {
        ConfigCommands::Show => {
            println!("Ledgerline Configuration");
            println!("========================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Audit log:        {}", paths.audit_log().display());
            println!();
            println!("Settings:");
            println!("  Owner:          {}", settings.owner_id);
            println!("  Currency:       {}", settings.currency_symbol);
            println!("  Date format:    {}", settings.date_format);
            println!("  Similarity:     {}", settings.similarity);
        }

        ConfigCommands::Currency { symbol } => {
            let symbol = symbol.trim();
            if symbol.is_empty() {
                return Err(LedgerError::Validation(
                    "Currency symbol cannot be empty".into(),
                ));
            }
            settings.currency_symbol = symbol.to_string();
            settings.save(paths)?;
            println!("Currency symbol set to '{}'", settings.currency_symbol);
        }

        ConfigCommands::Similarity { mode } => {
            settings.similarity = SimilarityMode::parse(&mode).ok_or_else(|| {
                LedgerError::Validation(format!(
                    "Invalid similarity mode: '{}'. Use 'exact' or 'fuzzy'",
                    mode
                ))
            })?;
            settings.save(paths)?;
            println!("Similarity mode set to {}", settings.similarity);
        }
    }

    Ok(())
}
