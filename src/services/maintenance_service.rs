//! Maintenance Service - repair requests raised against rooms

use sea_orm::*;
use serde::Deserialize;

use super::{in_transaction, now_rfc3339};
use crate::domain::{
    ActivityEntry, ActivitySink, ContractStatus, DomainError, MaintenancePriority,
    MaintenanceStatus, StateMachine, flush_activity,
};
use crate::models::contract::{self, Entity as Contract};
use crate::models::maintenance_request::{self, Entity as MaintenanceRequest};
use crate::models::room::Entity as Room;
use crate::models::student::Entity as Student;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMaintenanceInput {
    pub room_id: i32,
    pub student_id: Option<i32>,
    pub title: String,
    pub description: String,
    pub priority: Option<MaintenancePriority>,
}

impl CreateMaintenanceInput {
    fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("title is required"));
        }
        if self.title.len() > 200 {
            return Err(DomainError::validation("title must be at most 200 characters"));
        }
        if self.description.trim().is_empty() {
            return Err(DomainError::validation("description is required"));
        }
        Ok(())
    }
}

/// Filter parameters for listing maintenance requests
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MaintenanceFilter {
    pub status: Option<MaintenanceStatus>,
    pub room_id: Option<i32>,
    pub student_id: Option<i32>,
}

pub async fn create_request(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    input: CreateMaintenanceInput,
) -> Result<maintenance_request::Model, DomainError> {
    input.validate()?;

    let room = Room::find_by_id(input.room_id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("room"))?;

    if let Some(student_id) = input.student_id {
        Student::find_by_id(student_id)
            .one(db)
            .await?
            .ok_or(DomainError::NotFound("student"))?;

        let resident = Contract::find()
            .filter(contract::Column::StudentId.eq(student_id))
            .filter(contract::Column::RoomId.eq(room.id))
            .filter(contract::Column::Status.eq(ContractStatus::Active))
            .count(db)
            .await?;
        if resident == 0 {
            return Err(DomainError::invalid_state(
                "student",
                "student does not hold an active contract on this room",
            ));
        }
    }

    let now = now_rfc3339();
    let saved = maintenance_request::ActiveModel {
        room_id: Set(room.id),
        student_id: Set(input.student_id),
        title: Set(input.title.trim().to_owned()),
        description: Set(input.description.trim().to_owned()),
        priority: Set(input.priority.unwrap_or(MaintenancePriority::Normal)),
        status: Set(MaintenanceStatus::Pending),
        resolution_note: Set(None),
        resolved_at: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    flush_activity(
        activity,
        vec![ActivityEntry::new(
            actor,
            "CREATE_MAINTENANCE_REQUEST",
            "maintenance_request",
            saved.id,
            format!(
                "Maintenance request '{}' opened for room {} ({})",
                saved.title, room.room_number, saved.priority
            ),
        )],
    )
    .await;
    Ok(saved)
}

/// Admin workflow step. `completed` stamps `resolved_at`.
pub async fn update_status(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    id: i32,
    status: MaintenanceStatus,
    resolution_note: Option<String>,
) -> Result<maintenance_request::Model, DomainError> {
    let (request, entries) = in_transaction(db, move |txn| {
        Box::pin(async move {
            let existing = MaintenanceRequest::find_by_id(id)
                .lock_exclusive()
                .one(txn)
                .await?
                .ok_or(DomainError::NotFound("maintenance_request"))?;

            let from = existing.status;
            from.transition_to(status)?;
            if from == status && resolution_note.is_none() {
                return Ok((existing, Vec::new()));
            }

            let now = now_rfc3339();
            let mut active: maintenance_request::ActiveModel = existing.into();
            active.status = Set(status);
            if let Some(note) = resolution_note {
                active.resolution_note = Set(Some(note));
            }
            if status == MaintenanceStatus::Completed && from != status {
                active.resolved_at = Set(Some(now.clone()));
            }
            active.updated_at = Set(now);
            let request = active.update(txn).await?;

            let entry = ActivityEntry::new(
                actor,
                "UPDATE_MAINTENANCE_STATUS",
                "maintenance_request",
                request.id,
                format!("Request '{}' moved from {} to {}", request.title, from, status),
            );
            Ok((request, vec![entry]))
        })
    })
    .await?;

    flush_activity(activity, entries).await;
    Ok(request)
}

/// A student withdraws their own request while nobody has picked it up.
pub async fn cancel_request(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    id: i32,
    student_id: i32,
) -> Result<maintenance_request::Model, DomainError> {
    let (request, entries) = in_transaction(db, move |txn| {
        Box::pin(async move {
            let existing = MaintenanceRequest::find_by_id(id)
                .lock_exclusive()
                .one(txn)
                .await?
                .ok_or(DomainError::NotFound("maintenance_request"))?;

            if existing.student_id != Some(student_id) {
                return Err(DomainError::Forbidden(
                    "only the requesting student may cancel this request".into(),
                ));
            }
            if existing.status != MaintenanceStatus::Pending {
                return Err(DomainError::invalid_state(
                    "maintenance_request",
                    format!("request is '{}', only pending requests can be canceled", existing.status),
                ));
            }

            let mut active: maintenance_request::ActiveModel = existing.into();
            active.status = Set(MaintenanceStatus::Canceled);
            active.updated_at = Set(now_rfc3339());
            let request = active.update(txn).await?;

            let entry = ActivityEntry::new(
                actor,
                "CANCEL_MAINTENANCE_REQUEST",
                "maintenance_request",
                request.id,
                format!("Request '{}' canceled by student", request.title),
            );
            Ok((request, vec![entry]))
        })
    })
    .await?;

    flush_activity(activity, entries).await;
    Ok(request)
}

pub async fn get_request(
    db: &DatabaseConnection,
    id: i32,
) -> Result<maintenance_request::Model, DomainError> {
    MaintenanceRequest::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("maintenance_request"))
}

pub async fn list_requests(
    db: &DatabaseConnection,
    filter: MaintenanceFilter,
) -> Result<Vec<maintenance_request::Model>, DomainError> {
    let mut query = MaintenanceRequest::find();

    if let Some(status) = filter.status {
        query = query.filter(maintenance_request::Column::Status.eq(status));
    }
    if let Some(room_id) = filter.room_id {
        query = query.filter(maintenance_request::Column::RoomId.eq(room_id));
    }
    if let Some(student_id) = filter.student_id {
        query = query.filter(maintenance_request::Column::StudentId.eq(student_id));
    }

    Ok(query
        .order_by_desc(maintenance_request::Column::CreatedAt)
        .all(db)
        .await?)
}
