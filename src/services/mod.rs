//! Service layer for Ledgerline
//!
//! The service layer provides business logic on top of the storage layer:
//! projection, the month ledger, conversion, template lifecycle,
//! reconciliation and budget comparison.

pub mod budget;
pub mod conversion;
pub mod ledger;
pub mod lifecycle;
pub mod projection;
pub mod reconciliation;
pub mod similarity;
pub mod template;
pub mod transaction;

pub use budget::{compare_budget, compare_budget_marked, BudgetComparison, BudgetStatus, BudgetTotals};
pub use conversion::ConversionService;
pub use ledger::{OverrideInput, OverrideLedgerService};
pub use lifecycle::{DeleteScope, LifecycleService};
pub use projection::{project_month, BudgetInputs, MonthViewService};
pub use reconciliation::{reconcile, ReconciliationMatch, ReconciliationResult, Reconciler};
pub use similarity::{ExactTable, FuzzyTable, SimilarityProvider};
pub use template::{monthly_commitment, CreateTemplateInput, MonthlyCommitment, TemplateService};
pub use transaction::{CreateTransactionInput, TransactionService};
