//! Template display formatting
//!
//! Formats templates for terminal output in table and detail views.

use crate::models::{MonthOverride, RecurringTemplate};
use crate::services::MonthlyCommitment;

use super::truncate;

/// Format a list of templates as a table, followed by the monthly commitment
pub fn format_template_list(
    templates: &[RecurringTemplate],
    commitment: &MonthlyCommitment,
    currency: &str,
) -> String {
    if templates.is_empty() {
        return "No templates found.\n".to_string();
    }

    let name_width = templates
        .iter()
        .map(|t| t.name.chars().count().min(28))
        .max()
        .unwrap_or(4)
        .max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<10}  {:<name_width$}  {:<8}  {:<10}  {:>12}  {:>12}  {}\n",
        "ID",
        "Name",
        "Type",
        "Frequency",
        "Amount",
        "Per month",
        "Status",
        name_width = name_width,
    ));
    output.push_str(&format!(
        "{:-<10}  {:-<name_width$}  {:-<8}  {:-<10}  {:->12}  {:->12}  {:-<10}\n",
        "",
        "",
        "",
        "",
        "",
        "",
        "",
        name_width = name_width,
    ));

    for template in templates {
        let status = if !template.is_active {
            "Inactive".to_string()
        } else if let Some(end) = template.end_date {
            format!("Ends {}", end)
        } else {
            "Active".to_string()
        };

        output.push_str(&format!(
            "{:<10}  {:<name_width$}  {:<8}  {:<10}  {:>12}  {:>12}  {}\n",
            template.id.to_string(),
            truncate(&template.name, 28),
            template.kind.to_string(),
            template.frequency.to_string(),
            template.amount.format_with_symbol(currency),
            template.monthly_equivalent().format_with_symbol(currency),
            status,
            name_width = name_width,
        ));
    }

    output.push('\n');
    output.push_str(&format!(
        "Monthly commitment: {} income, {} expenses, {} net\n",
        commitment.income.format_with_symbol(currency),
        commitment.expenses.format_with_symbol(currency),
        commitment.net().format_with_symbol(currency),
    ));

    output
}

/// Format template details, including its month ledger
pub fn format_template_details(template: &RecurringTemplate, currency: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("Template:   {}\n", template.name));
    output.push_str(&format!("ID:         {}\n", template.id));
    output.push_str(&format!("Type:       {}\n", template.kind));
    output.push_str(&format!(
        "Amount:     {} {} ({} per month)\n",
        template.amount.format_with_symbol(currency),
        template.frequency,
        template.monthly_equivalent().format_with_symbol(currency)
    ));
    output.push_str(&format!("Category:   {}\n", template.category));
    output.push_str(&format!("Starts:     {}\n", template.start_date));
    if let Some(end) = template.end_date {
        output.push_str(&format!("Ends:       {}\n", end));
    }
    output.push_str(&format!(
        "Status:     {}\n",
        if template.is_active { "Active" } else { "Inactive" }
    ));
    if let Some(source) = template.promoted_from {
        output.push_str(&format!("Promoted from transaction {}\n", source));
    }

    if !template.month_overrides.is_empty() {
        output.push_str("\nMonth ledger:\n");
        for (month, entry) in &template.month_overrides {
            match entry {
                MonthOverride::Skip => output.push_str(&format!("  {}  skip\n", month)),
                MonthOverride::Override(values) => output.push_str(&format!(
                    "  {}  {} {} ({})\n",
                    month,
                    values.name,
                    values.amount.format_with_symbol(currency),
                    values.category
                )),
            }
        }
    }

    output
}
