//! Student Service - registration, approval and profile edits

use sea_orm::*;
use serde::Deserialize;

use super::{in_transaction, now_rfc3339};
use crate::auth::hash_password;
use crate::domain::{
    ActivityEntry, ActivitySink, ConflictKind, DomainError, Gender, StateMachine, StudentStatus,
    UserRole, flush_activity,
};
use crate::models::student::{self, Entity as Student};
use crate::models::user::{self, Entity as User};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterStudentInput {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
    pub gender: Gender,
    pub phone: Option<String>,
    pub student_code: Option<String>,
}

impl RegisterStudentInput {
    fn validate(&self) -> Result<(), DomainError> {
        let username = self.username.trim();
        if username.len() < 3 || username.len() > 50 {
            return Err(DomainError::validation(
                "username must be between 3 and 50 characters",
            ));
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(DomainError::validation(
                "username may only contain letters, digits, '_' and '.'",
            ));
        }
        if self.password.len() < 6 {
            return Err(DomainError::validation(
                "password must be at least 6 characters",
            ));
        }
        validate_email(&self.email)?;
        if self.full_name.trim().is_empty() {
            return Err(DomainError::validation("full_name is required"));
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<(), DomainError> {
    match email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(DomainError::validation(format!(
            "'{}' is not a valid email address",
            email
        ))),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStudentProfileInput {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub student_code: Option<String>,
}

/// Filter parameters for listing students
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StudentFilter {
    pub status: Option<StudentStatus>,
    pub search: Option<String>,
}

/// Create the user account and the pending student profile together.
pub async fn register_student(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    input: RegisterStudentInput,
) -> Result<student::Model, DomainError> {
    input.validate()?;
    let password_hash = hash_password(&input.password).map_err(DomainError::Internal)?;

    let (student, entries) = in_transaction(db, move |txn| {
        Box::pin(async move {
            let username = input.username.trim().to_owned();
            let taken = User::find()
                .filter(user::Column::Username.eq(username.as_str()))
                .count(txn)
                .await?;
            if taken > 0 {
                return Err(DomainError::Conflict(ConflictKind::DuplicateUsername));
            }

            let now = now_rfc3339();
            let email = input.email.trim().to_owned();

            let account = user::ActiveModel {
                username: Set(username),
                email: Set(email.clone()),
                password_hash: Set(password_hash),
                role: Set(UserRole::Student),
                status: Set(StudentStatus::Pending),
                created_at: Set(now.clone()),
                updated_at: Set(now.clone()),
                ..Default::default()
            }
            .insert(txn)
            .await
            .map_err(DomainError::unique_or(ConflictKind::DuplicateUsername))?;

            let student = student::ActiveModel {
                user_id: Set(account.id),
                student_code: Set(input.student_code),
                full_name: Set(input.full_name.trim().to_owned()),
                gender: Set(input.gender),
                email: Set(email),
                phone: Set(input.phone),
                status: Set(StudentStatus::Pending),
                created_at: Set(now.clone()),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(txn)
            .await?;

            let entry = ActivityEntry::new(
                Some(account.id),
                "REGISTER_STUDENT",
                "student",
                student.id,
                format!("Student {} registered", student.full_name),
            );
            Ok((student, vec![entry]))
        })
    })
    .await?;

    tracing::info!(student_id = student.id, "Student registered, awaiting approval");
    flush_activity(activity, entries).await;
    Ok(student)
}

pub async fn get_student(db: &DatabaseConnection, id: i32) -> Result<student::Model, DomainError> {
    Student::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("student"))
}

pub async fn find_by_user_id(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Option<student::Model>, DomainError> {
    Ok(Student::find()
        .filter(student::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}

pub async fn list_students(
    db: &DatabaseConnection,
    filter: StudentFilter,
) -> Result<Vec<student::Model>, DomainError> {
    let mut condition = Condition::all();

    if let Some(status) = filter.status {
        condition = condition.add(student::Column::Status.eq(status));
    }

    if let Some(search) = filter.search.filter(|s| !s.trim().is_empty()) {
        let pattern = search.trim().to_owned();
        condition = condition.add(
            Condition::any()
                .add(student::Column::FullName.contains(&pattern))
                .add(student::Column::Email.contains(&pattern))
                .add(student::Column::StudentCode.contains(&pattern)),
        );
    }

    Ok(Student::find()
        .filter(condition)
        .order_by_asc(student::Column::FullName)
        .all(db)
        .await?)
}

pub async fn update_profile(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    id: i32,
    input: UpdateStudentProfileInput,
) -> Result<student::Model, DomainError> {
    if let Some(email) = &input.email {
        validate_email(email)?;
    }
    if matches!(&input.full_name, Some(name) if name.trim().is_empty()) {
        return Err(DomainError::validation("full_name cannot be empty"));
    }

    let (student, entries) = in_transaction(db, move |txn| {
        Box::pin(async move {
            let existing = Student::find_by_id(id)
                .one(txn)
                .await?
                .ok_or(DomainError::NotFound("student"))?;
            let user_id = existing.user_id;
            let now = now_rfc3339();

            let mut active: student::ActiveModel = existing.into();
            if let Some(full_name) = input.full_name {
                active.full_name = Set(full_name.trim().to_owned());
            }
            if let Some(phone) = input.phone {
                active.phone = Set(Some(phone));
            }
            if let Some(code) = input.student_code {
                active.student_code = Set(Some(code));
            }
            if let Some(email) = input.email.map(|e| e.trim().to_owned()) {
                active.email = Set(email.clone());
                User::update_many()
                    .set(user::ActiveModel {
                        email: Set(email),
                        updated_at: Set(now.clone()),
                        ..Default::default()
                    })
                    .filter(user::Column::Id.eq(user_id))
                    .exec(txn)
                    .await?;
            }
            active.updated_at = Set(now);
            let student = active.update(txn).await?;

            let entry = ActivityEntry::new(
                actor,
                "UPDATE_STUDENT",
                "student",
                student.id,
                format!("Profile of {} updated", student.full_name),
            );
            Ok((student, vec![entry]))
        })
    })
    .await?;

    flush_activity(activity, entries).await;
    Ok(student)
}

/// Move a student (and their account) to `active` inside an open transaction.
///
/// Used by approval and implicitly whenever a contract becomes active.
pub(crate) async fn promote_to_active<C: ConnectionTrait>(
    conn: &C,
    student: student::Model,
    actor: Option<i32>,
    reason: &str,
    entries: &mut Vec<ActivityEntry>,
) -> Result<student::Model, DomainError> {
    if student.status == StudentStatus::Active {
        return Ok(student);
    }
    student.status.transition_to(StudentStatus::Active)?;

    let student = write_status(conn, student, StudentStatus::Active).await?;
    entries.push(ActivityEntry::new(
        actor,
        "ACTIVATE_STUDENT",
        "student",
        student.id,
        format!("Student {} activated ({})", student.full_name, reason),
    ));
    Ok(student)
}

async fn write_status<C: ConnectionTrait>(
    conn: &C,
    student: student::Model,
    status: StudentStatus,
) -> Result<student::Model, DomainError> {
    let now = now_rfc3339();
    let user_id = student.user_id;

    let mut active: student::ActiveModel = student.into();
    active.status = Set(status);
    active.updated_at = Set(now.clone());
    let student = active.update(conn).await?;

    User::update_many()
        .set(user::ActiveModel {
            status: Set(status),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(user::Column::Id.eq(user_id))
        .exec(conn)
        .await?;

    Ok(student)
}

async fn change_status(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    id: i32,
    next: StudentStatus,
    pending_only: bool,
    action: &'static str,
) -> Result<student::Model, DomainError> {
    let (student, entries) = in_transaction(db, move |txn| {
        Box::pin(async move {
            let student = Student::find_by_id(id)
                .lock_exclusive()
                .one(txn)
                .await?
                .ok_or(DomainError::NotFound("student"))?;

            if pending_only && student.status != StudentStatus::Pending {
                return Err(DomainError::invalid_state(
                    "student",
                    format!("student is '{}', expected 'pending'", student.status),
                ));
            }
            let from = student.status;
            from.transition_to(next)?;
            if from == next {
                return Ok((student, Vec::new()));
            }

            let student = write_status(txn, student, next).await?;
            let entry = ActivityEntry::new(
                actor,
                action,
                "student",
                student.id,
                format!("Student {} moved from {} to {}", student.full_name, from, next),
            );
            Ok((student, vec![entry]))
        })
    })
    .await?;

    flush_activity(activity, entries).await;
    Ok(student)
}

/// Approve a pending registration
pub async fn activate_student(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    id: i32,
) -> Result<student::Model, DomainError> {
    change_status(db, activity, actor, id, StudentStatus::Active, true, "APPROVE_STUDENT").await
}

/// Reject a pending registration (student becomes `inactive`)
pub async fn reject_student(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    id: i32,
) -> Result<student::Model, DomainError> {
    change_status(db, activity, actor, id, StudentStatus::Inactive, true, "REJECT_STUDENT").await
}

/// Admin status change (block, unblock, deactivate) through the transition table
pub async fn set_student_status(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    id: i32,
    status: StudentStatus,
) -> Result<student::Model, DomainError> {
    change_status(db, activity, actor, id, status, false, "UPDATE_STUDENT_STATUS").await
}
