//! Post-commit side-effect seams: the audit trail and outbound mail.
//!
//! Services collect [`ActivityEntry`] values while their transaction runs and
//! hand them to an [`ActivitySink`] only after commit. Neither sink nor
//! notifier failures ever reach the caller of a business operation.

use async_trait::async_trait;
use serde::Serialize;

use super::DomainError;

/// One audit-trail record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    /// Acting user; `None` for the scheduler.
    pub user_id: Option<i32>,
    pub action: String,
    pub entity_type: &'static str,
    pub entity_id: i32,
    pub description: String,
}

impl ActivityEntry {
    pub fn new(
        user_id: Option<i32>,
        action: &str,
        entity_type: &'static str,
        entity_id: i32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            action: action.to_owned(),
            entity_type,
            entity_id,
            description: description.into(),
        }
    }
}

/// Append-only audit sink.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn record(&self, entry: ActivityEntry) -> Result<(), DomainError>;
}

/// Write every entry, logging and skipping the ones the sink refuses.
pub async fn flush_activity(sink: &dyn ActivitySink, entries: Vec<ActivityEntry>) {
    for entry in entries {
        let (action, entity_type, entity_id) = (entry.action.clone(), entry.entity_type, entry.entity_id);
        if let Err(e) = sink.record(entry).await {
            tracing::warn!(
                %action,
                entity_type,
                entity_id,
                "Failed to record activity: {}",
                e
            );
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub to: Recipient,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub message_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("mail transport failed: {0}")]
    Transport(String),
    #[error("mail provider rejected message: {0}")]
    Rejected(String),
}

/// Outbound transactional mail.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<Receipt, NotifyError>;
}
