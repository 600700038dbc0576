//! Room Service - room inventory, admin status changes and resident removal

use sea_orm::*;
use serde::{Deserialize, Serialize};

use super::contract_service::{ContractWithDetails, with_details};
use super::occupancy::{count_active_contracts, lock_room, sync_room};
use super::{in_transaction, now_rfc3339};
use crate::domain::{
    ActivityEntry, ActivitySink, ConflictKind, ContractStatus, DomainError, RoomStatus, RoomType,
    StateMachine, flush_activity,
};
use crate::models::building::{self, Entity as Building};
use crate::models::contract::{self, Entity as Contract};
use crate::models::room::{self, Entity as Room};
use crate::models::student::Entity as Student;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomInput {
    pub building_id: i32,
    pub room_number: String,
    pub room_type: RoomType,
    pub capacity: i32,
    pub price_per_month: f64,
}

impl CreateRoomInput {
    fn validate(&self) -> Result<(), DomainError> {
        if self.room_number.trim().is_empty() {
            return Err(DomainError::validation("room_number is required"));
        }
        validate_capacity(self.capacity)?;
        validate_price(self.price_per_month)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRoomInput {
    pub room_number: Option<String>,
    pub room_type: Option<RoomType>,
    pub capacity: Option<i32>,
    pub price_per_month: Option<f64>,
}

fn validate_capacity(capacity: i32) -> Result<(), DomainError> {
    if capacity <= 0 {
        return Err(DomainError::validation("capacity must be greater than zero"));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<(), DomainError> {
    if !price.is_finite() || price < 0.0 {
        return Err(DomainError::validation(
            "price_per_month must be a non-negative amount",
        ));
    }
    Ok(())
}

/// Filter parameters for listing rooms
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RoomFilter {
    pub building_id: Option<i32>,
    pub status: Option<RoomStatus>,
    pub room_type: Option<RoomType>,
    /// Only rooms with at least one free place
    pub available_only: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomWithBuilding {
    #[serde(flatten)]
    pub room: room::Model,
    pub building_name: String,
}

pub async fn create_room(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    input: CreateRoomInput,
) -> Result<room::Model, DomainError> {
    input.validate()?;

    Building::find_by_id(input.building_id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("building"))?;

    let now = now_rfc3339();
    let saved = room::ActiveModel {
        building_id: Set(input.building_id),
        room_number: Set(input.room_number.trim().to_owned()),
        room_type: Set(input.room_type),
        capacity: Set(input.capacity),
        current_occupancy: Set(0),
        price_per_month: Set(input.price_per_month),
        status: Set(RoomStatus::Available),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            DomainError::validation("room number already exists in this building")
        }
        _ => DomainError::from(e),
    })?;

    flush_activity(
        activity,
        vec![ActivityEntry::new(
            actor,
            "CREATE_ROOM",
            "room",
            saved.id,
            format!("Room {} created", saved.room_number),
        )],
    )
    .await;
    Ok(saved)
}

/// Edit a room. Capacity may not drop below the number of active contracts.
pub async fn update_room(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    id: i32,
    input: UpdateRoomInput,
) -> Result<room::Model, DomainError> {
    if let Some(capacity) = input.capacity {
        validate_capacity(capacity)?;
    }
    if let Some(price) = input.price_per_month {
        validate_price(price)?;
    }
    if matches!(&input.room_number, Some(n) if n.trim().is_empty()) {
        return Err(DomainError::validation("room_number cannot be empty"));
    }

    let (updated, entries) = in_transaction(db, move |txn| {
        Box::pin(async move {
            let room = lock_room(txn, id).await?;
            let occupancy = count_active_contracts(txn, room.id).await?;

            if let Some(capacity) = input.capacity {
                if capacity < occupancy {
                    return Err(DomainError::Conflict(ConflictKind::CapacityBelowOccupancy));
                }
            }

            let mut active: room::ActiveModel = room.into();
            if let Some(number) = input.room_number {
                active.room_number = Set(number.trim().to_owned());
            }
            if let Some(room_type) = input.room_type {
                active.room_type = Set(room_type);
            }
            if let Some(capacity) = input.capacity {
                active.capacity = Set(capacity);
            }
            if let Some(price) = input.price_per_month {
                active.price_per_month = Set(price);
            }
            active.updated_at = Set(now_rfc3339());
            let room = active.update(txn).await?;

            // capacity may have moved the full/available boundary
            let room = sync_room(txn, room).await?;

            let entry = ActivityEntry::new(
                actor,
                "UPDATE_ROOM",
                "room",
                room.id,
                format!("Room {} updated", room.room_number),
            );
            Ok((room, vec![entry]))
        })
    })
    .await?;

    flush_activity(activity, entries).await;
    Ok(updated)
}

pub async fn delete_room(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    id: i32,
) -> Result<(), DomainError> {
    let number = in_transaction(db, move |txn| {
        Box::pin(async move {
            let room = lock_room(txn, id).await?;
            if count_active_contracts(txn, room.id).await? > 0 {
                return Err(DomainError::Conflict(ConflictKind::HasActiveContracts));
            }
            Room::delete_by_id(room.id).exec(txn).await?;
            Ok(room.room_number)
        })
    })
    .await?;

    flush_activity(
        activity,
        vec![ActivityEntry::new(
            actor,
            "DELETE_ROOM",
            "room",
            id,
            format!("Room {} deleted", number),
        )],
    )
    .await;
    Ok(())
}

/// Explicit admin status change. Only `available` and `maintenance` may be
/// requested; `full` is always derived from occupancy.
pub async fn set_room_status(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    id: i32,
    requested: RoomStatus,
) -> Result<room::Model, DomainError> {
    if requested == RoomStatus::Full {
        return Err(DomainError::validation(
            "status 'full' is derived from occupancy and cannot be set directly",
        ));
    }

    let (room, entries) = in_transaction(db, move |txn| {
        Box::pin(async move {
            let room = lock_room(txn, id).await?;
            let from = room.status;

            let room = match requested {
                RoomStatus::Maintenance => {
                    if count_active_contracts(txn, room.id).await? > 0 {
                        return Err(DomainError::Conflict(ConflictKind::HasActiveContracts));
                    }
                    from.transition_to(RoomStatus::Maintenance)?;
                    let mut active: room::ActiveModel = room.into();
                    active.status = Set(RoomStatus::Maintenance);
                    active.updated_at = Set(now_rfc3339());
                    active.update(txn).await?
                }
                _ => {
                    // Leaving maintenance: drop the sticky flag and let occupancy decide.
                    let room = if from == RoomStatus::Maintenance {
                        let mut active: room::ActiveModel = room.into();
                        active.status = Set(RoomStatus::Available);
                        active.updated_at = Set(now_rfc3339());
                        active.update(txn).await?
                    } else {
                        room
                    };
                    sync_room(txn, room).await?
                }
            };

            let entries = if room.status != from {
                vec![ActivityEntry::new(
                    actor,
                    "UPDATE_ROOM_STATUS",
                    "room",
                    room.id,
                    format!(
                        "Room {} status changed from {} to {}",
                        room.room_number, from, room.status
                    ),
                )]
            } else {
                Vec::new()
            };
            Ok((room, entries))
        })
    })
    .await?;

    flush_activity(activity, entries).await;
    Ok(room)
}

/// Terminate the active contract linking a student to a room.
pub async fn remove_resident(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    room_id: i32,
    student_id: i32,
) -> Result<contract::Model, DomainError> {
    let (contract, entries) = in_transaction(db, move |txn| {
        Box::pin(async move {
            let room = lock_room(txn, room_id).await?;
            let existing = Contract::find()
                .filter(contract::Column::RoomId.eq(room_id))
                .filter(contract::Column::StudentId.eq(student_id))
                .filter(contract::Column::Status.eq(ContractStatus::Active))
                .lock_exclusive()
                .one(txn)
                .await?
                .ok_or(DomainError::NotFound("active_contract"))?;

            existing.status.transition_to(ContractStatus::Terminated)?;
            let mut active: contract::ActiveModel = existing.into();
            active.status = Set(ContractStatus::Terminated);
            active.updated_at = Set(now_rfc3339());
            let contract = active.update(txn).await?;

            let room = sync_room(txn, room).await?;

            let student_name = Student::find_by_id(student_id)
                .one(txn)
                .await?
                .map(|s| s.full_name)
                .unwrap_or_else(|| format!("#{}", student_id));

            let entries = vec![
                ActivityEntry::new(
                    actor,
                    "REMOVE_FROM_ROOM",
                    "student",
                    student_id,
                    format!(
                        "{} removed from room {} (contract {})",
                        student_name, room.room_number, contract.contract_number
                    ),
                ),
                ActivityEntry::new(
                    actor,
                    "REMOVE_RESIDENT",
                    "room",
                    room.id,
                    format!("{} removed from room {}", student_name, room.room_number),
                ),
            ];
            Ok((contract, entries))
        })
    })
    .await?;

    tracing::info!(room_id, student_id, contract_id = contract.id, "Resident removed");
    flush_activity(activity, entries).await;
    Ok(contract)
}

/// Active contracts on a room, with student details
pub async fn list_residents(
    db: &DatabaseConnection,
    room_id: i32,
) -> Result<Vec<ContractWithDetails>, DomainError> {
    Room::find_by_id(room_id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("room"))?;

    let contracts = Contract::find()
        .filter(contract::Column::RoomId.eq(room_id))
        .filter(contract::Column::Status.eq(ContractStatus::Active))
        .order_by_asc(contract::Column::StartDate)
        .all(db)
        .await?;

    with_details(db, contracts).await
}

pub async fn get_room(db: &DatabaseConnection, id: i32) -> Result<RoomWithBuilding, DomainError> {
    let (room, building) = Room::find_by_id(id)
        .find_also_related(Building)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("room"))?;

    Ok(RoomWithBuilding {
        room,
        building_name: building.map(|b| b.name).unwrap_or_default(),
    })
}

pub async fn list_rooms(
    db: &DatabaseConnection,
    filter: RoomFilter,
) -> Result<Vec<RoomWithBuilding>, DomainError> {
    let mut condition = Condition::all();

    if let Some(building_id) = filter.building_id {
        condition = condition.add(room::Column::BuildingId.eq(building_id));
    }

    if let Some(status) = filter.status {
        condition = condition.add(room::Column::Status.eq(status));
    }

    if let Some(room_type) = filter.room_type {
        condition = condition.add(room::Column::RoomType.eq(room_type));
    }

    if filter.available_only.unwrap_or(false) {
        condition = condition.add(room::Column::Status.eq(RoomStatus::Available));
    }

    let rooms = Room::find()
        .filter(condition)
        .order_by_asc(room::Column::BuildingId)
        .order_by_asc(room::Column::RoomNumber)
        .find_also_related(Building)
        .all(db)
        .await?;

    Ok(rooms
        .into_iter()
        .map(|(room, building): (room::Model, Option<building::Model>)| RoomWithBuilding {
            room,
            building_name: building.map(|b| b.name).unwrap_or_default(),
        })
        .collect())
}
