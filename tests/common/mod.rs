#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use dormkeeper::db;
use dormkeeper::domain::{
    ActivityEntry, ActivitySink, ContractStatus, DomainError, EmailMessage, Gender, Notifier,
    NotifyError, Receipt, RoomStatus, RoomType, StudentStatus, UserRole,
};
use dormkeeper::models::{building, contract, room, student, user};
use dormkeeper::services::contract_service::CreateContractInput;
use dormkeeper::services::room_service::{self, CreateRoomInput};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

// Helper to create a test database
pub async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Activity sink that keeps entries in memory
#[derive(Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<ActivityEntry>>,
}

impl RecordingSink {
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.action).collect()
    }
}

#[async_trait]
impl ActivitySink for RecordingSink {
    async fn record(&self, entry: ActivityEntry) -> Result<(), DomainError> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

/// Activity sink that refuses everything
pub struct BrokenSink;

#[async_trait]
impl ActivitySink for BrokenSink {
    async fn record(&self, _entry: ActivityEntry) -> Result<(), DomainError> {
        Err(DomainError::Internal("audit store offline".into()))
    }
}

/// Notifier that records messages and fails for chosen addresses
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<EmailMessage>>,
    failing: HashSet<String>,
}

impl RecordingNotifier {
    pub fn failing_for(addresses: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: addresses.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        let mut emails: Vec<String> = self.sent().into_iter().map(|m| m.to.email).collect();
        emails.sort();
        emails
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: EmailMessage) -> Result<Receipt, NotifyError> {
        if self.failing.contains(&message.to.email) {
            return Err(NotifyError::Rejected(format!("mailbox {} unavailable", message.to.email)));
        }
        self.sent.lock().unwrap().push(message);
        Ok(Receipt {
            message_id: uuid::Uuid::new_v4().to_string(),
        })
    }
}

pub async fn create_test_building(db: &DatabaseConnection, name: &str) -> i32 {
    let now = Utc::now().to_rfc3339();
    building::ActiveModel {
        name: Set(name.to_string()),
        address: Set(Some("1 Campus Road".to_string())),
        description: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create building")
    .id
}

pub async fn create_test_room(
    db: &DatabaseConnection,
    building_id: i32,
    number: &str,
    room_type: RoomType,
    capacity: i32,
) -> room::Model {
    room_service::create_room(
        db,
        &RecordingSink::default(),
        None,
        CreateRoomInput {
            building_id,
            room_number: number.to_string(),
            room_type,
            capacity,
            price_per_month: 1_000_000.0,
        },
    )
    .await
    .expect("Failed to create room")
}

/// Inserts a user + student pair directly (no password hashing)
pub async fn create_test_student(
    db: &DatabaseConnection,
    username: &str,
    gender: Gender,
    status: StudentStatus,
) -> student::Model {
    let now = Utc::now().to_rfc3339();
    let email = format!("{}@students.test", username);
    let account = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(email.clone()),
        password_hash: Set("$argon2id$dummy".to_string()),
        role: Set(UserRole::Student),
        status: Set(status),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create user");

    student::ActiveModel {
        user_id: Set(account.id),
        student_code: Set(None),
        full_name: Set(format!("Student {}", username)),
        gender: Set(gender),
        email: Set(email),
        phone: Set(None),
        status: Set(status),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create student")
}

/// A contract running from a month ago to half a year from now
pub fn contract_input(student_id: i32, room_id: i32) -> CreateContractInput {
    let today = Utc::now().date_naive();
    CreateContractInput {
        student_id,
        room_id,
        start_date: today - Duration::days(30),
        end_date: today + Duration::days(180),
        deposit_amount: 500_000.0,
        monthly_fee: 1_000_000.0,
    }
}

pub async fn reload_room(db: &DatabaseConnection, id: i32) -> room::Model {
    room::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .expect("room exists")
}

pub async fn reload_student(db: &DatabaseConnection, id: i32) -> student::Model {
    student::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .expect("student exists")
}

/// Occupancy equals active contracts, status agrees with occupancy, and no
/// student holds two active contracts.
pub async fn assert_invariants(db: &DatabaseConnection) {
    for room in room::Entity::find().all(db).await.unwrap() {
        let active = contract::Entity::find()
            .filter(contract::Column::RoomId.eq(room.id))
            .filter(contract::Column::Status.eq(ContractStatus::Active))
            .count(db)
            .await
            .unwrap() as i32;
        assert_eq!(
            room.current_occupancy, active,
            "room {} occupancy drifted from its contracts",
            room.room_number
        );
        if room.status != RoomStatus::Maintenance {
            assert_eq!(
                room.status == RoomStatus::Full,
                room.current_occupancy >= room.capacity,
                "room {} status {} disagrees with occupancy {}/{}",
                room.room_number,
                room.status,
                room.current_occupancy,
                room.capacity
            );
        }
    }

    for student in student::Entity::find().all(db).await.unwrap() {
        let active = contract::Entity::find()
            .filter(contract::Column::StudentId.eq(student.id))
            .filter(contract::Column::Status.eq(ContractStatus::Active))
            .count(db)
            .await
            .unwrap();
        assert!(active <= 1, "student {} has {} active contracts", student.id, active);
    }
}
