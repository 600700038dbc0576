//! Services Layer
//!
//! Business operations over the relational store. Every multi-row mutation
//! runs inside one scoped transaction; audit entries are gathered while it
//! runs and flushed only after commit.

use std::future::Future;
use std::pin::Pin;

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::domain::DomainError;

pub mod activity_service;
pub mod auth_service;
pub mod building_service;
pub mod contract_service;
pub mod dashboard;
pub mod expiration;
pub mod invoice_service;
pub mod maintenance_service;
pub mod occupancy;
pub mod room_service;
pub mod student_service;

/// Run `work` in a transaction: commit on `Ok`, roll back on `Err`.
///
/// The closure only sees the transaction handle, so nothing inside it can
/// accidentally write through the pool outside the transaction.
pub async fn in_transaction<T, F>(db: &DatabaseConnection, work: F) -> Result<T, DomainError>
where
    F: for<'c> FnOnce(
            &'c DatabaseTransaction,
        ) -> Pin<Box<dyn Future<Output = Result<T, DomainError>> + Send + 'c>>
        + Send,
    T: Send,
{
    db.transaction::<F, T, DomainError>(work)
        .await
        .map_err(DomainError::from)
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
