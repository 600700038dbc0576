mod common;

use common::*;
use dormkeeper::domain::{
    BillingRates, DomainError, Gender, InvoiceStatus, MaintenancePriority, MaintenanceStatus,
    RoomStatus, RoomType, StudentStatus,
};
use dormkeeper::models::user;
use dormkeeper::services::contract_service;
use dormkeeper::services::dashboard;
use dormkeeper::services::invoice_service::{self, CreateInvoiceInput};
use dormkeeper::services::maintenance_service::{self, CreateMaintenanceInput, MaintenanceFilter};
use dormkeeper::services::room_service;
use dormkeeper::services::student_service::{self, StudentFilter, UpdateStudentProfileInput};
use sea_orm::EntityTrait;

fn leak_report(room_id: i32, student_id: Option<i32>) -> CreateMaintenanceInput {
    CreateMaintenanceInput {
        room_id,
        student_id,
        title: "Leaking tap".to_string(),
        description: "The bathroom tap drips all night".to_string(),
        priority: None,
    }
}

#[tokio::test]
async fn test_approval_only_from_pending() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let applicant = create_test_student(&db, "applicant", Gender::Female, StudentStatus::Pending).await;
    let refused = create_test_student(&db, "refused", Gender::Male, StudentStatus::Pending).await;

    let approved = student_service::activate_student(&db, &sink, Some(1), applicant.id)
        .await
        .unwrap();
    assert_eq!(approved.status, StudentStatus::Active);
    let account = user::Entity::find_by_id(approved.user_id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.status, StudentStatus::Active);

    let err = student_service::activate_student(&db, &sink, Some(1), applicant.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState { entity: "student", .. }));

    let rejected = student_service::reject_student(&db, &sink, Some(1), refused.id)
        .await
        .unwrap();
    assert_eq!(rejected.status, StudentStatus::Inactive);

    assert_eq!(sink.actions(), vec!["APPROVE_STUDENT", "REJECT_STUDENT"]);
}

#[tokio::test]
async fn test_status_changes_follow_transition_table() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let student = create_test_student(&db, "moody", Gender::Male, StudentStatus::Pending).await;

    let err = student_service::set_student_status(&db, &sink, None, student.id, StudentStatus::Blocked)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState { .. }));

    student_service::set_student_status(&db, &sink, None, student.id, StudentStatus::Active)
        .await
        .unwrap();
    let blocked =
        student_service::set_student_status(&db, &sink, None, student.id, StudentStatus::Blocked)
            .await
            .unwrap();
    assert_eq!(blocked.status, StudentStatus::Blocked);

    // Same status again is accepted without a new log line
    let logged = sink.entries().len();
    student_service::set_student_status(&db, &sink, None, student.id, StudentStatus::Blocked)
        .await
        .unwrap();
    assert_eq!(sink.entries().len(), logged);
}

#[tokio::test]
async fn test_profile_email_is_mirrored_to_account() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let student = create_test_student(&db, "mover", Gender::Female, StudentStatus::Active).await;

    let updated = student_service::update_profile(
        &db,
        &sink,
        None,
        student.id,
        UpdateStudentProfileInput {
            email: Some(" new.mail@uni.test ".into()),
            phone: Some("0901234567".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.email, "new.mail@uni.test");
    assert_eq!(updated.phone.as_deref(), Some("0901234567"));

    let account = user::Entity::find_by_id(student.user_id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.email, "new.mail@uni.test");

    let err = student_service::update_profile(
        &db,
        &sink,
        None,
        student.id,
        UpdateStudentProfileInput {
            full_name: Some("   ".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_list_students_by_status_and_search() {
    let db = setup_test_db().await;
    create_test_student(&db, "waiting_one", Gender::Female, StudentStatus::Pending).await;
    create_test_student(&db, "waiting_two", Gender::Male, StudentStatus::Pending).await;
    create_test_student(&db, "settled", Gender::Male, StudentStatus::Active).await;

    let pending = student_service::list_students(
        &db,
        StudentFilter {
            status: Some(StudentStatus::Pending),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(pending.len(), 2);

    let found = student_service::list_students(
        &db,
        StudentFilter {
            search: Some("settled".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].full_name, "Student settled");
}

#[tokio::test]
async fn test_resident_files_request_and_admin_completes_it() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let room = create_test_room(&db, building, "101", RoomType::Male, 2).await;
    let resident = create_test_student(&db, "resident", Gender::Male, StudentStatus::Active).await;
    contract_service::create_contract(&db, &sink, None, contract_input(resident.id, room.id))
        .await
        .unwrap();

    let request = maintenance_service::create_request(
        &db,
        &sink,
        Some(resident.user_id),
        leak_report(room.id, Some(resident.id)),
    )
    .await
    .unwrap();
    assert_eq!(request.status, MaintenanceStatus::Pending);
    assert_eq!(request.priority, MaintenancePriority::Normal);

    maintenance_service::update_status(&db, &sink, Some(1), request.id, MaintenanceStatus::Processing, None)
        .await
        .unwrap();
    let done = maintenance_service::update_status(
        &db,
        &sink,
        Some(1),
        request.id,
        MaintenanceStatus::Completed,
        Some("Washer replaced".into()),
    )
    .await
    .unwrap();
    assert_eq!(done.status, MaintenanceStatus::Completed);
    assert!(done.resolved_at.is_some());
    assert_eq!(done.resolution_note.as_deref(), Some("Washer replaced"));

    let err = maintenance_service::update_status(&db, &sink, Some(1), request.id, MaintenanceStatus::Processing, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState { entity: "maintenance_request", .. }));

    // Maintenance requests never touch the room's own status
    assert_eq!(reload_room(&db, room.id).await.status, RoomStatus::Available);
}

#[tokio::test]
async fn test_request_needs_residency_and_valid_text() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let room = create_test_room(&db, building, "102", RoomType::Male, 2).await;
    let outsider = create_test_student(&db, "outsider", Gender::Male, StudentStatus::Active).await;

    let err = maintenance_service::create_request(&db, &sink, None, leak_report(room.id, Some(outsider.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState { entity: "student", .. }));

    let mut untitled = leak_report(room.id, None);
    untitled.title = " ".into();
    let err = maintenance_service::create_request(&db, &sink, None, untitled)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let mut long_title = leak_report(room.id, None);
    long_title.title = "x".repeat(201);
    let err = maintenance_service::create_request(&db, &sink, None, long_title)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    // Staff may file a request without a student attached
    let staff = maintenance_service::create_request(&db, &sink, Some(1), leak_report(room.id, None))
        .await
        .unwrap();
    assert!(staff.student_id.is_none());
}

#[tokio::test]
async fn test_only_requester_cancels_pending_request() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let room = create_test_room(&db, building, "103", RoomType::Female, 2).await;
    let owner = create_test_student(&db, "owner", Gender::Female, StudentStatus::Active).await;
    let roommate = create_test_student(&db, "roommate", Gender::Female, StudentStatus::Active).await;
    for student in [&owner, &roommate] {
        contract_service::create_contract(&db, &sink, None, contract_input(student.id, room.id))
            .await
            .unwrap();
    }

    let first = maintenance_service::create_request(&db, &sink, None, leak_report(room.id, Some(owner.id)))
        .await
        .unwrap();

    let err = maintenance_service::cancel_request(&db, &sink, None, first.id, roommate.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    let canceled = maintenance_service::cancel_request(&db, &sink, None, first.id, owner.id)
        .await
        .unwrap();
    assert_eq!(canceled.status, MaintenanceStatus::Canceled);

    let second = maintenance_service::create_request(&db, &sink, None, leak_report(room.id, Some(owner.id)))
        .await
        .unwrap();
    maintenance_service::update_status(&db, &sink, Some(1), second.id, MaintenanceStatus::Processing, None)
        .await
        .unwrap();
    let err = maintenance_service::cancel_request(&db, &sink, None, second.id, owner.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState { .. }));

    let open = maintenance_service::list_requests(
        &db,
        MaintenanceFilter {
            status: Some(MaintenanceStatus::Processing),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(open.len(), 1);
}

#[tokio::test]
async fn test_dashboard_reflects_current_state() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let single = create_test_room(&db, building, "104", RoomType::Male, 1).await;
    let double = create_test_room(&db, building, "105", RoomType::Male, 2).await;
    let closed = create_test_room(&db, building, "106", RoomType::Male, 3).await;
    let resident = create_test_student(&db, "dash", Gender::Male, StudentStatus::Active).await;
    create_test_student(&db, "queued", Gender::Male, StudentStatus::Pending).await;

    contract_service::create_contract(&db, &sink, None, contract_input(resident.id, single.id))
        .await
        .unwrap();
    room_service::set_room_status(&db, &sink, None, closed.id, RoomStatus::Maintenance)
        .await
        .unwrap();

    let invoice = invoice_service::create_invoice(
        &db,
        &sink,
        None,
        &BillingRates::default(),
        CreateInvoiceInput {
            room_id: single.id,
            invoice_month: "2024-03".into(),
            electric_units: 0.0,
            water_units: 0.0,
            service_fee: Some(0.0),
            due_date: date(2024, 3, 15),
        },
    )
    .await
    .unwrap();
    invoice_service::create_invoice(
        &db,
        &sink,
        None,
        &BillingRates::default(),
        CreateInvoiceInput {
            room_id: double.id,
            invoice_month: "2024-03".into(),
            electric_units: 0.0,
            water_units: 0.0,
            service_fee: Some(0.0),
            due_date: date(2024, 3, 15),
        },
    )
    .await
    .unwrap();
    invoice_service::update_invoice_status(&db, &sink, None, invoice.id, InvoiceStatus::Overdue)
        .await
        .unwrap();
    maintenance_service::create_request(&db, &sink, None, leak_report(double.id, None))
        .await
        .unwrap();

    let summary = dashboard::summary(&db).await.unwrap();
    assert_eq!(summary.buildings, 1);
    assert_eq!(summary.rooms.total, 3);
    assert_eq!(summary.rooms.full, 1);
    assert_eq!(summary.rooms.available, 1);
    assert_eq!(summary.rooms.maintenance, 1);
    assert_eq!(summary.total_capacity, 6);
    assert_eq!(summary.total_occupancy, 1);
    assert_eq!(summary.active_contracts, 1);
    assert_eq!(summary.pending_students, 1);
    assert_eq!(summary.pending_invoices, 1);
    assert_eq!(summary.overdue_invoices, 1);
    assert_eq!(summary.outstanding_amount, 2_000_000.0);
    assert_eq!(summary.open_maintenance_requests, 1);
}
