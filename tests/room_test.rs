mod common;

use common::*;
use dormkeeper::domain::{
    ConflictKind, ContractStatus, DomainError, Gender, RoomStatus, RoomType, StudentStatus,
};
use dormkeeper::infrastructure::SeaOrmActivitySink;
use dormkeeper::services::activity_service::{self, ActivityFilter};
use dormkeeper::services::building_service;
use dormkeeper::services::contract_service;
use dormkeeper::services::occupancy;
use dormkeeper::services::room_service::{self, CreateRoomInput, RoomFilter, UpdateRoomInput};
use dormkeeper::models::room;
use sea_orm::{ActiveModelTrait, Set};

#[tokio::test]
async fn test_maintenance_only_when_empty() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let empty = create_test_room(&db, building, "101", RoomType::Male, 2).await;
    let occupied = create_test_room(&db, building, "102", RoomType::Male, 2).await;
    let student = create_test_student(&db, "resident", Gender::Male, StudentStatus::Active).await;

    let closed = room_service::set_room_status(&db, &sink, None, empty.id, RoomStatus::Maintenance)
        .await
        .unwrap();
    assert_eq!(closed.status, RoomStatus::Maintenance);

    contract_service::create_contract(&db, &sink, None, contract_input(student.id, occupied.id))
        .await
        .unwrap();
    let err = room_service::set_room_status(&db, &sink, None, occupied.id, RoomStatus::Maintenance)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(ConflictKind::HasActiveContracts)));
    assert_eq!(reload_room(&db, occupied.id).await.status, RoomStatus::Available);

    assert_eq!(sink.actions().iter().filter(|a| *a == "UPDATE_ROOM_STATUS").count(), 1);
    assert_invariants(&db).await;
}

#[tokio::test]
async fn test_full_cannot_be_requested() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let room = create_test_room(&db, building, "103", RoomType::Male, 2).await;

    let err = room_service::set_room_status(&db, &sink, None, room.id, RoomStatus::Full)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_leaving_maintenance_rederives_status() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let room = create_test_room(&db, building, "104", RoomType::Male, 2).await;

    room_service::set_room_status(&db, &sink, None, room.id, RoomStatus::Maintenance)
        .await
        .unwrap();
    let reopened = room_service::set_room_status(&db, &sink, None, room.id, RoomStatus::Available)
        .await
        .unwrap();
    assert_eq!(reopened.status, RoomStatus::Available);

    // Asking for the current status changes nothing and logs nothing
    let before = sink.entries().len();
    room_service::set_room_status(&db, &sink, None, room.id, RoomStatus::Available)
        .await
        .unwrap();
    assert_eq!(sink.entries().len(), before);
}

#[tokio::test]
async fn test_capacity_changes_respect_occupancy() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let room = create_test_room(&db, building, "105", RoomType::Female, 3).await;
    for name in ["hanh", "thu"] {
        let student = create_test_student(&db, name, Gender::Female, StudentStatus::Active).await;
        contract_service::create_contract(&db, &sink, None, contract_input(student.id, room.id))
            .await
            .unwrap();
    }
    assert_eq!(reload_room(&db, room.id).await.status, RoomStatus::Available);

    let err = room_service::update_room(
        &db,
        &sink,
        None,
        room.id,
        UpdateRoomInput {
            capacity: Some(1),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(ConflictKind::CapacityBelowOccupancy)));

    let shrunk = room_service::update_room(
        &db,
        &sink,
        None,
        room.id,
        UpdateRoomInput {
            capacity: Some(2),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(shrunk.status, RoomStatus::Full);

    let grown = room_service::update_room(
        &db,
        &sink,
        None,
        room.id,
        UpdateRoomInput {
            capacity: Some(4),
            price_per_month: Some(1_500_000.0),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(grown.status, RoomStatus::Available);
    assert_eq!(grown.price_per_month, 1_500_000.0);
    assert_invariants(&db).await;
}

#[tokio::test]
async fn test_room_input_validation() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    create_test_room(&db, building, "106", RoomType::Male, 2).await;

    let input = |number: &str, capacity: i32, building_id: i32| CreateRoomInput {
        building_id,
        room_number: number.to_string(),
        room_type: RoomType::Male,
        capacity,
        price_per_month: 900_000.0,
    };

    let err = room_service::create_room(&db, &sink, None, input("107", 0, building))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let err = room_service::create_room(&db, &sink, None, input("106", 2, building))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let err = room_service::create_room(&db, &sink, None, input("107", 2, 9_999))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound("building")));
}

#[tokio::test]
async fn test_remove_resident_terminates_and_logs_twice() {
    let db = setup_test_db().await;
    let sink = SeaOrmActivitySink::new(db.clone());
    let building = create_test_building(&db, "Block A").await;
    let room = create_test_room(&db, building, "108", RoomType::Male, 1).await;
    let student = create_test_student(&db, "moving", Gender::Male, StudentStatus::Active).await;

    contract_service::create_contract(&db, &sink, Some(1), contract_input(student.id, room.id))
        .await
        .unwrap();
    assert_eq!(reload_room(&db, room.id).await.status, RoomStatus::Full);

    let terminated = room_service::remove_resident(&db, &sink, Some(1), room.id, student.id)
        .await
        .unwrap();
    assert_eq!(terminated.status, ContractStatus::Terminated);

    let room_after = reload_room(&db, room.id).await;
    assert_eq!(room_after.current_occupancy, 0);
    assert_eq!(room_after.status, RoomStatus::Available);

    let student_log = activity_service::list_activity_logs(
        &db,
        ActivityFilter {
            entity_type: Some("student".into()),
            entity_id: Some(student.id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(student_log[0].action, "REMOVE_FROM_ROOM");

    let room_log = activity_service::list_activity_logs(
        &db,
        ActivityFilter {
            entity_type: Some("room".into()),
            entity_id: Some(room.id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(room_log[0].action, "REMOVE_RESIDENT");
    assert_eq!(room_log[0].user_id, Some(1));

    let err = room_service::remove_resident(&db, &sink, Some(1), room.id, student.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound("active_contract")));
}

#[tokio::test]
async fn test_delete_refused_while_occupied() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let room = create_test_room(&db, building, "109", RoomType::Male, 2).await;
    let student = create_test_student(&db, "tenant", Gender::Male, StudentStatus::Active).await;

    let created =
        contract_service::create_contract(&db, &sink, None, contract_input(student.id, room.id))
            .await
            .unwrap();

    let err = room_service::delete_room(&db, &sink, None, room.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(ConflictKind::HasActiveContracts)));
    let err = building_service::delete_building(&db, &sink, None, building)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(ConflictKind::HasActiveContracts)));

    contract_service::terminate_contract(&db, &sink, None, created.contract_id)
        .await
        .unwrap();
    room_service::delete_room(&db, &sink, None, room.id).await.unwrap();
    building_service::delete_building(&db, &sink, None, building)
        .await
        .unwrap();

    let err = building_service::get_building(&db, building).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound("building")));
}

#[tokio::test]
async fn test_list_residents_and_available_filter() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let single = create_test_room(&db, building, "110", RoomType::Mixed, 1).await;
    let double = create_test_room(&db, building, "111", RoomType::Mixed, 2).await;
    let student = create_test_student(&db, "solo", Gender::Other, StudentStatus::Active).await;

    contract_service::create_contract(&db, &sink, None, contract_input(student.id, single.id))
        .await
        .unwrap();

    let residents = room_service::list_residents(&db, single.id).await.unwrap();
    assert_eq!(residents.len(), 1);
    assert_eq!(residents[0].student_name, "Student solo");
    assert!(room_service::list_residents(&db, double.id).await.unwrap().is_empty());

    let available = room_service::list_rooms(
        &db,
        RoomFilter {
            available_only: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].room.room_number, "111");
    assert_eq!(available[0].building_name, "Block A");
}

#[tokio::test]
async fn test_recompute_repairs_corrupted_room() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let room_model = create_test_room(&db, building, "112", RoomType::Male, 2).await;
    let student = create_test_student(&db, "counted", Gender::Male, StudentStatus::Active).await;
    contract_service::create_contract(&db, &sink, None, contract_input(student.id, room_model.id))
        .await
        .unwrap();

    let mut corrupted: room::ActiveModel = reload_room(&db, room_model.id).await.into();
    corrupted.current_occupancy = Set(2);
    corrupted.status = Set(RoomStatus::Full);
    corrupted.update(&db).await.unwrap();

    assert_eq!(occupancy::recompute_all(&db).await.unwrap(), 1);
    let repaired = reload_room(&db, room_model.id).await;
    assert_eq!(repaired.current_occupancy, 1);
    assert_eq!(repaired.status, RoomStatus::Available);

    // Nothing left to fix
    assert_eq!(occupancy::recompute_all(&db).await.unwrap(), 0);
}
