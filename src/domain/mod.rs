//! Domain layer - Business vocabulary and rules
//!
//! Status enums and their transition tables, billing rules, error types and
//! the traits behind which post-commit side effects live. Nothing here
//! opens a connection or knows about HTTP.

pub mod billing;
pub mod errors;
pub mod hooks;
pub mod status;

pub use billing::{BillingRates, InvoiceAmounts, InvoiceMonth};
pub use errors::{ConflictKind, DomainError};
pub use hooks::{
    ActivityEntry, ActivitySink, EmailMessage, Notifier, NotifyError, Receipt, Recipient,
    flush_activity,
};
pub use status::*;
