//! SeaORM implementation of ActivitySink

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use crate::domain::{ActivityEntry, ActivitySink, DomainError};
use crate::models::activity_log;

/// Writes audit entries to the `activity_logs` table
pub struct SeaOrmActivitySink {
    db: DatabaseConnection,
}

impl SeaOrmActivitySink {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActivitySink for SeaOrmActivitySink {
    async fn record(&self, entry: ActivityEntry) -> Result<(), DomainError> {
        activity_log::ActiveModel {
            user_id: Set(entry.user_id),
            action: Set(entry.action),
            entity_type: Set(entry.entity_type.to_owned()),
            entity_id: Set(entry.entity_id),
            description: Set(entry.description),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        Ok(())
    }
}
