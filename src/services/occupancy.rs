//! Room occupancy invariant maintainer
//!
//! `rooms.current_occupancy` is a cache of the number of active contracts
//! referencing the room. Every path that can change that number ends by
//! calling [`sync_room`], which recounts from `contracts` instead of trusting
//! the cached value, so a write can never drift from a full recompute.

use sea_orm::*;

use super::{in_transaction, now_rfc3339};
use crate::domain::{ConflictKind, ContractStatus, DomainError};
use crate::models::contract::{self, Entity as Contract};
use crate::models::room::{self, Entity as Room};

/// Number of active contracts on a room, straight from the source of truth
pub async fn count_active_contracts<C: ConnectionTrait>(
    conn: &C,
    room_id: i32,
) -> Result<i32, DomainError> {
    let count = Contract::find()
        .filter(contract::Column::RoomId.eq(room_id))
        .filter(contract::Column::Status.eq(ContractStatus::Active))
        .count(conn)
        .await?;
    Ok(count as i32)
}

/// Load a room for update (`SELECT ... FOR UPDATE` where the backend has it)
pub(crate) async fn lock_room<C: ConnectionTrait>(
    conn: &C,
    room_id: i32,
) -> Result<room::Model, DomainError> {
    Room::find_by_id(room_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(DomainError::NotFound("room"))
}

/// Recount occupancy and re-derive status; writes only when something changed.
pub(crate) async fn sync_room<C: ConnectionTrait>(
    conn: &C,
    room: room::Model,
) -> Result<room::Model, DomainError> {
    let occupancy = count_active_contracts(conn, room.id).await?;
    let status = room.status.derived(occupancy, room.capacity);

    if occupancy == room.current_occupancy && status == room.status {
        return Ok(room);
    }

    if occupancy != room.current_occupancy {
        tracing::debug!(
            room_id = room.id,
            cached = room.current_occupancy,
            actual = occupancy,
            "Room occupancy updated"
        );
    }
    if status != room.status {
        tracing::info!(room_id = room.id, from = %room.status, to = %status, "Room status changed");
    }

    let mut active: room::ActiveModel = room.into();
    active.current_occupancy = Set(occupancy);
    active.status = Set(status);
    active.updated_at = Set(now_rfc3339());
    Ok(active.update(conn).await?)
}

/// [`sync_room`] after a contract became active: refuses to leave the room over capacity.
pub(crate) async fn sync_room_after_admission<C: ConnectionTrait>(
    conn: &C,
    room: room::Model,
) -> Result<room::Model, DomainError> {
    let room = sync_room(conn, room).await?;
    if room.current_occupancy > room.capacity {
        return Err(DomainError::Conflict(ConflictKind::RoomFull));
    }
    Ok(room)
}

/// Canonical repair: set a room's occupancy and status from its contracts.
pub async fn recompute_occupancy(
    db: &DatabaseConnection,
    room_id: i32,
) -> Result<room::Model, DomainError> {
    in_transaction(db, move |txn| {
        Box::pin(async move {
            let room = lock_room(txn, room_id).await?;
            sync_room(txn, room).await
        })
    })
    .await
}

/// Recompute every room. Returns how many rows were corrected.
pub async fn recompute_all(db: &DatabaseConnection) -> Result<usize, DomainError> {
    let room_ids: Vec<i32> = Room::find()
        .select_only()
        .column(room::Column::Id)
        .into_tuple()
        .all(db)
        .await?;

    let mut corrected = 0;
    for room_id in room_ids {
        let before = Room::find_by_id(room_id).one(db).await?;
        let after = recompute_occupancy(db, room_id).await?;
        if before.as_ref() != Some(&after) {
            corrected += 1;
        }
    }

    if corrected > 0 {
        tracing::warn!("Occupancy repair corrected {} room(s)", corrected);
    }
    Ok(corrected)
}
