//! Activity log queries

use sea_orm::*;
use serde::Deserialize;

use crate::domain::DomainError;
use crate::models::activity_log::{self, Entity as ActivityLog};

const DEFAULT_LIMIT: u64 = 100;
const MAX_LIMIT: u64 = 500;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ActivityFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<i32>,
    pub user_id: Option<i32>,
    pub limit: Option<u64>,
}

/// Most recent entries first
pub async fn list_activity_logs(
    db: &DatabaseConnection,
    filter: ActivityFilter,
) -> Result<Vec<activity_log::Model>, DomainError> {
    let mut query = ActivityLog::find();

    if let Some(entity_type) = filter.entity_type {
        query = query.filter(activity_log::Column::EntityType.eq(entity_type));
    }
    if let Some(entity_id) = filter.entity_id {
        query = query.filter(activity_log::Column::EntityId.eq(entity_id));
    }
    if let Some(user_id) = filter.user_id {
        query = query.filter(activity_log::Column::UserId.eq(user_id));
    }

    let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    Ok(query
        .order_by_desc(activity_log::Column::Id)
        .limit(limit)
        .all(db)
        .await?)
}
