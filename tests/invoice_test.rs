mod common;

use common::*;
use dormkeeper::domain::{BillingRates, ConflictKind, DomainError, InvoiceStatus, RoomType};
use dormkeeper::models::invoice;
use dormkeeper::services::invoice_service::{self, CreateInvoiceInput, InvoiceFilter};
use sea_orm::{EntityTrait, PaginatorTrait};

fn invoice_for(room_id: i32, month: &str) -> CreateInvoiceInput {
    CreateInvoiceInput {
        room_id,
        invoice_month: month.to_string(),
        electric_units: 100.0,
        water_units: 5.0,
        service_fee: None,
        due_date: date(2024, 3, 15),
    }
}

#[tokio::test]
async fn test_invoice_totals_use_room_price_and_rates() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let room = create_test_room(&db, building, "101", RoomType::Male, 4).await;

    let created = invoice_service::create_invoice(
        &db,
        &sink,
        Some(1),
        &BillingRates::default(),
        invoice_for(room.id, "2024-03"),
    )
    .await
    .unwrap();

    assert_eq!(created.room_fee, 1_000_000.0);
    assert_eq!(created.electric_fee, 350_000.0);
    assert_eq!(created.water_fee, 75_000.0);
    assert_eq!(created.service_fee, 100_000.0);
    assert_eq!(created.total_amount, 1_525_000.0);
    assert_eq!(created.payment_status, InvoiceStatus::Pending);
    assert!(created.payment_date.is_none());
    assert_eq!(sink.actions(), vec!["CREATE_INVOICE"]);
}

#[tokio::test]
async fn test_explicit_service_fee_overrides_default() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let room = create_test_room(&db, building, "102", RoomType::Male, 4).await;

    let mut input = invoice_for(room.id, "2024-04");
    input.service_fee = Some(0.0);
    let created =
        invoice_service::create_invoice(&db, &sink, None, &BillingRates::default(), input)
            .await
            .unwrap();

    assert_eq!(created.service_fee, 0.0);
    assert_eq!(created.total_amount, 1_425_000.0);
}

#[tokio::test]
async fn test_second_invoice_for_same_month_is_rejected() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let room = create_test_room(&db, building, "103", RoomType::Male, 4).await;

    let first = invoice_service::create_invoice(
        &db,
        &sink,
        None,
        &BillingRates::default(),
        invoice_for(room.id, "2024-03"),
    )
    .await
    .unwrap();

    let mut retry = invoice_for(room.id, "2024-03");
    retry.electric_units = 999.0;
    let err = invoice_service::create_invoice(&db, &sink, None, &BillingRates::default(), retry)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(ConflictKind::DuplicateInvoice)));

    assert_eq!(invoice::Entity::find().count(&db).await.unwrap(), 1);
    let stored = invoice::Entity::find_by_id(first.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, first);

    // Another month for the same room is fine
    invoice_service::create_invoice(
        &db,
        &sink,
        None,
        &BillingRates::default(),
        invoice_for(room.id, "2024-04"),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_malformed_month_and_negative_units_are_rejected() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let room = create_test_room(&db, building, "104", RoomType::Male, 4).await;

    for month in ["2024-13", "03-2024", "2024-3", "march"] {
        let err = invoice_service::create_invoice(
            &db,
            &sink,
            None,
            &BillingRates::default(),
            invoice_for(room.id, month),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)), "month {}", month);
    }

    let mut negative = invoice_for(room.id, "2024-03");
    negative.water_units = -1.0;
    let err = invoice_service::create_invoice(&db, &sink, None, &BillingRates::default(), negative)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let err = invoice_service::create_invoice(
        &db,
        &sink,
        None,
        &BillingRates::default(),
        invoice_for(9_999, "2024-03"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::NotFound("room")));
}

#[tokio::test]
async fn test_payment_date_follows_status() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let room = create_test_room(&db, building, "105", RoomType::Male, 4).await;

    let created = invoice_service::create_invoice(
        &db,
        &sink,
        None,
        &BillingRates::default(),
        invoice_for(room.id, "2024-03"),
    )
    .await
    .unwrap();

    let paid = invoice_service::update_invoice_status(&db, &sink, None, created.id, InvoiceStatus::Paid)
        .await
        .unwrap();
    assert_eq!(paid.payment_status, InvoiceStatus::Paid);
    assert!(paid.payment_date.is_some());

    // Paying twice is a no-op and keeps the original stamp
    let again = invoice_service::update_invoice_status(&db, &sink, None, created.id, InvoiceStatus::Paid)
        .await
        .unwrap();
    assert_eq!(again.payment_date, paid.payment_date);

    let reverted =
        invoice_service::update_invoice_status(&db, &sink, None, created.id, InvoiceStatus::Pending)
            .await
            .unwrap();
    assert_eq!(reverted.payment_status, InvoiceStatus::Pending);
    assert!(reverted.payment_date.is_none());

    let status_logs = sink
        .actions()
        .into_iter()
        .filter(|a| a == "UPDATE_INVOICE_STATUS")
        .count();
    assert_eq!(status_logs, 2);
}

#[tokio::test]
async fn test_paid_invoice_cannot_go_overdue_or_be_deleted() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let room = create_test_room(&db, building, "106", RoomType::Male, 4).await;

    let created = invoice_service::create_invoice(
        &db,
        &sink,
        None,
        &BillingRates::default(),
        invoice_for(room.id, "2024-03"),
    )
    .await
    .unwrap();
    invoice_service::update_invoice_status(&db, &sink, None, created.id, InvoiceStatus::Paid)
        .await
        .unwrap();

    let err = invoice_service::update_invoice_status(&db, &sink, None, created.id, InvoiceStatus::Overdue)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState { entity: "invoice", .. }));

    let err = invoice_service::delete_invoice(&db, &sink, None, created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState { entity: "invoice", .. }));
    assert_eq!(invoice::Entity::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_unpaid_invoice_can_be_deleted() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block A").await;
    let room = create_test_room(&db, building, "107", RoomType::Male, 4).await;

    let created = invoice_service::create_invoice(
        &db,
        &sink,
        None,
        &BillingRates::default(),
        invoice_for(room.id, "2024-03"),
    )
    .await
    .unwrap();

    invoice_service::delete_invoice(&db, &sink, None, created.id)
        .await
        .unwrap();
    let err = invoice_service::get_invoice(&db, created.id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound("invoice")));
}

#[tokio::test]
async fn test_list_invoices_filters_and_names_rooms() {
    let db = setup_test_db().await;
    let sink = RecordingSink::default();
    let building = create_test_building(&db, "Block B").await;
    let room_a = create_test_room(&db, building, "201", RoomType::Female, 2).await;
    let room_b = create_test_room(&db, building, "202", RoomType::Female, 2).await;

    for (room_id, month) in [(room_a.id, "2024-03"), (room_a.id, "2024-04"), (room_b.id, "2024-03")] {
        invoice_service::create_invoice(
            &db,
            &sink,
            None,
            &BillingRates::default(),
            invoice_for(room_id, month),
        )
        .await
        .unwrap();
    }

    let march = invoice_service::list_invoices(
        &db,
        InvoiceFilter {
            month: Some("2024-03".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(march.len(), 2);
    assert!(march.iter().all(|i| i.building_name == "Block B"));

    let room_a_only = invoice_service::list_invoices(
        &db,
        InvoiceFilter {
            room_id: Some(room_a.id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(room_a_only.len(), 2);
    assert_eq!(room_a_only[0].invoice.invoice_month, "2024-04");
    assert_eq!(room_a_only[0].room_number, "201");
}
