//! Contract Service - the contract/room/student consistency rules
//!
//! A contract being `active` is what puts a student in a room. Creating,
//! reactivating, terminating or deleting one therefore always happens in the
//! same transaction as the room recount and, when needed, the student's
//! promotion to `active`.

use chrono::{NaiveDate, Utc};
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

use super::occupancy::{count_active_contracts, lock_room, sync_room, sync_room_after_admission};
use super::student_service::promote_to_active;
use super::{in_transaction, now_rfc3339};
use crate::domain::billing::contract_number;
use crate::domain::{
    ActivityEntry, ActivitySink, ConflictKind, ContractStatus, DomainError, RoomStatus,
    StateMachine, flush_activity,
};
use crate::models::building::Entity as Building;
use crate::models::contract::{self, Entity as Contract};
use crate::models::room::{self, Entity as Room};
use crate::models::student::{self, Entity as Student};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateContractInput {
    pub student_id: i32,
    pub room_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub deposit_amount: f64,
    pub monthly_fee: f64,
}

impl CreateContractInput {
    fn validate(&self) -> Result<(), DomainError> {
        validate_period(self.start_date, self.end_date)?;
        validate_amount("deposit_amount", self.deposit_amount)?;
        validate_amount("monthly_fee", self.monthly_fee)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateContractInput {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub deposit_amount: Option<f64>,
    pub monthly_fee: Option<f64>,
    pub status: Option<ContractStatus>,
}

fn validate_period(start: NaiveDate, end: NaiveDate) -> Result<(), DomainError> {
    if end <= start {
        return Err(DomainError::validation("end_date must be after start_date"));
    }
    Ok(())
}

fn validate_amount(field: &str, value: f64) -> Result<(), DomainError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DomainError::validation(format!(
            "{} must be a non-negative amount",
            field
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatedContract {
    pub contract_id: i32,
    pub contract_number: String,
}

/// Contract with denormalized student/room info for listings
#[derive(Debug, Clone, Serialize)]
pub struct ContractWithDetails {
    #[serde(flatten)]
    pub contract: contract::Model,
    pub student_name: String,
    pub student_email: String,
    pub room_number: String,
    pub building_name: String,
}

/// Filter parameters for listing contracts
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ContractFilter {
    pub status: Option<ContractStatus>,
    pub student_id: Option<i32>,
    pub room_id: Option<i32>,
}

async fn find_active_contract_for_student<C: ConnectionTrait>(
    conn: &C,
    student_id: i32,
    excluding: Option<i32>,
) -> Result<Option<contract::Model>, DomainError> {
    let mut query = Contract::find()
        .filter(contract::Column::StudentId.eq(student_id))
        .filter(contract::Column::Status.eq(ContractStatus::Active));
    if let Some(id) = excluding {
        query = query.filter(contract::Column::Id.ne(id));
    }
    Ok(query.one(conn).await?)
}

/// Admission checks shared by creation and reactivation, in their fixed order.
///
/// The room must already be locked by the caller.
async fn check_admission<C: ConnectionTrait>(
    conn: &C,
    student: &student::Model,
    room: &room::Model,
    contract_id: Option<i32>,
) -> Result<(), DomainError> {
    if room.status == RoomStatus::Maintenance {
        return Err(DomainError::invalid_state(
            "room",
            format!("room {} is under maintenance", room.room_number),
        ));
    }

    if count_active_contracts(conn, room.id).await? >= room.capacity {
        return Err(DomainError::Conflict(ConflictKind::RoomFull));
    }

    if !room.room_type.accepts(student.gender) {
        return Err(DomainError::Conflict(ConflictKind::GenderMismatch));
    }

    if find_active_contract_for_student(conn, student.id, contract_id)
        .await?
        .is_some()
    {
        return Err(DomainError::Conflict(ConflictKind::DuplicateActiveContract));
    }

    Ok(())
}

async fn lock_student<C: ConnectionTrait>(
    conn: &C,
    student_id: i32,
) -> Result<student::Model, DomainError> {
    Student::find_by_id(student_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(DomainError::NotFound("student"))
}

/// Create an active contract, activating the student if needed.
pub async fn create_contract(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    input: CreateContractInput,
) -> Result<CreatedContract, DomainError> {
    input.validate()?;

    let (created, entries) = in_transaction(db, move |txn| {
        Box::pin(async move {
            let mut entries = Vec::new();

            let student = lock_student(txn, input.student_id).await?;
            let room = lock_room(txn, input.room_id).await?;
            check_admission(txn, &student, &room, None).await?;

            let student =
                promote_to_active(txn, student, actor, "contract assigned", &mut entries).await?;

            let now = now_rfc3339();
            let number = contract_number(student.id, room.id, Utc::now());
            let saved = contract::ActiveModel {
                contract_number: Set(number.clone()),
                student_id: Set(student.id),
                room_id: Set(room.id),
                start_date: Set(input.start_date),
                end_date: Set(input.end_date),
                deposit_amount: Set(input.deposit_amount),
                monthly_fee: Set(input.monthly_fee),
                status: Set(ContractStatus::Active),
                created_by: Set(actor),
                created_at: Set(now.clone()),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(txn)
            .await
            .map_err(DomainError::unique_or(ConflictKind::DuplicateActiveContract))?;

            let room = sync_room_after_admission(txn, room).await?;

            entries.push(ActivityEntry::new(
                actor,
                "CREATE_CONTRACT",
                "contract",
                saved.id,
                format!(
                    "Contract {} created for {} in room {}",
                    number, student.full_name, room.room_number
                ),
            ));

            Ok((
                CreatedContract {
                    contract_id: saved.id,
                    contract_number: number,
                },
                entries,
            ))
        })
    })
    .await?;

    tracing::info!(
        contract_id = created.contract_id,
        contract_number = %created.contract_number,
        "Contract created"
    );
    flush_activity(activity, entries).await;
    Ok(created)
}

/// Edit contract fields and/or move it through its state machine.
pub async fn update_contract(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    id: i32,
    input: UpdateContractInput,
) -> Result<contract::Model, DomainError> {
    if let Some(amount) = input.deposit_amount {
        validate_amount("deposit_amount", amount)?;
    }
    if let Some(amount) = input.monthly_fee {
        validate_amount("monthly_fee", amount)?;
    }

    let (updated, entries) = in_transaction(db, move |txn| {
        Box::pin(async move {
            let mut entries = Vec::new();

            let existing = Contract::find_by_id(id)
                .lock_exclusive()
                .one(txn)
                .await?
                .ok_or(DomainError::NotFound("contract"))?;
            let room = lock_room(txn, existing.room_id).await?;

            let from = existing.status;
            let to = match input.status {
                Some(next) => from.transition_to(next)?,
                None => from,
            };

            let start_date = input.start_date.unwrap_or(existing.start_date);
            let end_date = input.end_date.unwrap_or(existing.end_date);
            validate_period(start_date, end_date)?;

            let reactivating = to == ContractStatus::Active && from != ContractStatus::Active;
            if reactivating {
                let student = lock_student(txn, existing.student_id).await?;
                check_admission(txn, &student, &room, Some(existing.id)).await?;
                promote_to_active(txn, student, actor, "contract reactivated", &mut entries)
                    .await?;
            }

            let mut active: contract::ActiveModel = existing.into();
            active.start_date = Set(start_date);
            active.end_date = Set(end_date);
            if let Some(amount) = input.deposit_amount {
                active.deposit_amount = Set(amount);
            }
            if let Some(amount) = input.monthly_fee {
                active.monthly_fee = Set(amount);
            }
            active.status = Set(to);
            active.updated_at = Set(now_rfc3339());
            let updated = active.update(txn).await?;

            if from != to {
                if reactivating {
                    sync_room_after_admission(txn, room).await?;
                } else {
                    sync_room(txn, room).await?;
                }
            }

            let (action, description) = match (from, to) {
                (f, t) if f == t => (
                    "UPDATE_CONTRACT",
                    format!("Contract {} updated", updated.contract_number),
                ),
                (_, ContractStatus::Terminated) => (
                    "TERMINATE_CONTRACT",
                    format!("Contract {} terminated", updated.contract_number),
                ),
                (f, t) => (
                    "UPDATE_CONTRACT_STATUS",
                    format!("Contract {} moved from {} to {}", updated.contract_number, f, t),
                ),
            };
            entries.push(ActivityEntry::new(
                actor,
                action,
                "contract",
                updated.id,
                description,
            ));

            Ok((updated, entries))
        })
    })
    .await?;

    flush_activity(activity, entries).await;
    Ok(updated)
}

/// Convenience for `update_contract(status = terminated)`
pub async fn terminate_contract(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    id: i32,
) -> Result<contract::Model, DomainError> {
    update_contract(
        db,
        activity,
        actor,
        id,
        UpdateContractInput {
            status: Some(ContractStatus::Terminated),
            ..Default::default()
        },
    )
    .await
}

/// Delete a contract; an active one frees its place in the room.
pub async fn delete_contract(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    id: i32,
) -> Result<(), DomainError> {
    let entries = in_transaction(db, move |txn| {
        Box::pin(async move {
            let existing = Contract::find_by_id(id)
                .lock_exclusive()
                .one(txn)
                .await?
                .ok_or(DomainError::NotFound("contract"))?;
            let room = lock_room(txn, existing.room_id).await?;

            Contract::delete_by_id(existing.id).exec(txn).await?;

            if existing.status == ContractStatus::Active {
                sync_room(txn, room).await?;
            }

            Ok(vec![ActivityEntry::new(
                actor,
                "DELETE_CONTRACT",
                "contract",
                existing.id,
                format!(
                    "Contract {} ({}) deleted",
                    existing.contract_number, existing.status
                ),
            )])
        })
    })
    .await?;

    flush_activity(activity, entries).await;
    Ok(())
}

pub async fn get_contract(
    db: &DatabaseConnection,
    id: i32,
) -> Result<ContractWithDetails, DomainError> {
    let contract = Contract::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("contract"))?;

    with_details(db, vec![contract])
        .await?
        .pop()
        .ok_or(DomainError::NotFound("contract"))
}

/// The student's current active contract, if any
pub async fn active_contract_for_student(
    db: &DatabaseConnection,
    student_id: i32,
) -> Result<Option<contract::Model>, DomainError> {
    find_active_contract_for_student(db, student_id, None).await
}

pub async fn list_contracts(
    db: &DatabaseConnection,
    filter: ContractFilter,
) -> Result<Vec<ContractWithDetails>, DomainError> {
    let mut condition = Condition::all();

    if let Some(status) = filter.status {
        condition = condition.add(contract::Column::Status.eq(status));
    }

    if let Some(student_id) = filter.student_id {
        condition = condition.add(contract::Column::StudentId.eq(student_id));
    }

    if let Some(room_id) = filter.room_id {
        condition = condition.add(contract::Column::RoomId.eq(room_id));
    }

    let contracts = Contract::find()
        .filter(condition)
        .order_by_desc(contract::Column::CreatedAt)
        .all(db)
        .await?;

    with_details(db, contracts).await
}

/// Attach student, room and building names to contracts
pub(crate) async fn with_details<C: ConnectionTrait>(
    conn: &C,
    contracts: Vec<contract::Model>,
) -> Result<Vec<ContractWithDetails>, DomainError> {
    if contracts.is_empty() {
        return Ok(Vec::new());
    }

    let student_ids: Vec<i32> = contracts.iter().map(|c| c.student_id).collect();
    let room_ids: Vec<i32> = contracts.iter().map(|c| c.room_id).collect();

    let students: HashMap<i32, student::Model> = Student::find()
        .filter(student::Column::Id.is_in(student_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let mut room_map: HashMap<i32, (String, String)> = HashMap::new();
    let rooms_with_buildings = Room::find()
        .filter(room::Column::Id.is_in(room_ids))
        .find_also_related(Building)
        .all(conn)
        .await?;
    for (room, building) in rooms_with_buildings {
        let building_name = building
            .map(|b| b.name)
            .unwrap_or_else(|| "Unknown".to_string());
        room_map.insert(room.id, (room.room_number, building_name));
    }

    Ok(contracts
        .into_iter()
        .map(|contract| {
            let (student_name, student_email) = students
                .get(&contract.student_id)
                .map(|s| (s.full_name.clone(), s.email.clone()))
                .unwrap_or_else(|| ("Unknown".to_string(), String::new()));
            let (room_number, building_name) = room_map
                .get(&contract.room_id)
                .cloned()
                .unwrap_or_else(|| ("Unknown".to_string(), "Unknown".to_string()));

            ContractWithDetails {
                contract,
                student_name,
                student_email,
                room_number,
                building_name,
            }
        })
        .collect())
}
