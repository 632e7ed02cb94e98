//! Display formatting for terminal output
//!
//! Plain-text tables and detail views for month views, templates,
//! reconciliation results and budget comparisons. Every formatter takes the
//! currency symbol from the user's settings.

pub mod budget;
pub mod month;
pub mod reconciliation;
pub mod template;

pub use budget::format_budget_table;
pub use month::{format_month_view, format_transaction_list};
pub use reconciliation::format_reconciliation;
pub use template::{format_template_details, format_template_list};

/// Truncate to `max_len` characters, marking the cut with "..."
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
