//! Closed status vocabularies and their transition tables.
//!
//! The string values are part of the wire format and are stored verbatim in
//! the database; never rename them.

use std::fmt;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::DomainError;

/// Status enum with an explicit table of legal transitions.
pub trait StateMachine: Copy + PartialEq + fmt::Display + 'static {
    /// Entity name used in error messages.
    const ENTITY: &'static str;

    /// States reachable in one step from `self`.
    fn successors(self) -> &'static [Self];

    fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    fn can_transition_to(self, next: Self) -> bool {
        self.successors().contains(&next)
    }

    /// Validate `self -> next`. Staying in the same state is always accepted.
    fn transition_to(self, next: Self) -> Result<Self, DomainError> {
        if self == next || self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::invalid_state(
                Self::ENTITY,
                format!("cannot move {} from '{}' to '{}'", Self::ENTITY, self, next),
            ))
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

/// Lifecycle of a student (and of the backing user account).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "blocked")]
    Blocked,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Pending => "pending",
            StudentStatus::Active => "active",
            StudentStatus::Inactive => "inactive",
            StudentStatus::Blocked => "blocked",
        }
    }
}

impl StateMachine for StudentStatus {
    const ENTITY: &'static str = "student";

    fn successors(self) -> &'static [Self] {
        use StudentStatus::*;
        match self {
            Pending => &[Active, Inactive],
            Active => &[Inactive, Blocked],
            Inactive => &[Active],
            Blocked => &[Active],
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "full")]
    Full,
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Available => "available",
            RoomStatus::Full => "full",
            RoomStatus::Maintenance => "maintenance",
        }
    }

    /// Status implied by an occupancy count. Maintenance is sticky.
    pub fn derived(self, occupancy: i32, capacity: i32) -> RoomStatus {
        match self {
            RoomStatus::Maintenance => RoomStatus::Maintenance,
            _ if occupancy >= capacity => RoomStatus::Full,
            _ => RoomStatus::Available,
        }
    }
}

impl StateMachine for RoomStatus {
    const ENTITY: &'static str = "room";

    fn successors(self) -> &'static [Self] {
        use RoomStatus::*;
        match self {
            Available => &[Full, Maintenance],
            Full => &[Available],
            Maintenance => &[Available],
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "terminated")]
    Terminated,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Active => "active",
            ContractStatus::Expired => "expired",
            ContractStatus::Terminated => "terminated",
        }
    }
}

impl StateMachine for ContractStatus {
    const ENTITY: &'static str = "contract";

    // Expired and terminated contracts may be reactivated by an admin.
    fn successors(self) -> &'static [Self] {
        use ContractStatus::*;
        match self {
            Active => &[Expired, Terminated],
            Expired => &[Active],
            Terminated => &[Active],
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "overdue")]
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }
}

impl StateMachine for InvoiceStatus {
    const ENTITY: &'static str = "invoice";

    // paid -> pending reverses a payment recorded by mistake
    fn successors(self) -> &'static [Self] {
        use InvoiceStatus::*;
        match self {
            Pending => &[Paid, Overdue],
            Overdue => &[Paid],
            Paid => &[Pending],
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "canceled")]
    Canceled,
}

impl MaintenanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceStatus::Pending => "pending",
            MaintenanceStatus::Processing => "processing",
            MaintenanceStatus::Completed => "completed",
            MaintenanceStatus::Rejected => "rejected",
            MaintenanceStatus::Canceled => "canceled",
        }
    }
}

impl StateMachine for MaintenanceStatus {
    const ENTITY: &'static str = "maintenance_request";

    fn successors(self) -> &'static [Self] {
        use MaintenanceStatus::*;
        match self {
            Pending => &[Processing, Completed, Rejected, Canceled],
            Processing => &[Completed, Canceled],
            Completed | Rejected | Canceled => &[],
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum MaintenancePriority {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "normal")]
    Normal,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

impl MaintenancePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenancePriority::Low => "low",
            MaintenancePriority::Normal => "normal",
            MaintenancePriority::High => "high",
            MaintenancePriority::Urgent => "urgent",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "student")]
    Student,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Student => "student",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[sea_orm(string_value = "male")]
    Male,
    #[sea_orm(string_value = "female")]
    Female,
    #[sea_orm(string_value = "other")]
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    #[sea_orm(string_value = "male")]
    Male,
    #[sea_orm(string_value = "female")]
    Female,
    #[sea_orm(string_value = "mixed")]
    Mixed,
}

impl RoomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Male => "male",
            RoomType::Female => "female",
            RoomType::Mixed => "mixed",
        }
    }

    /// A male room rejects female students and vice versa; `other` fits anywhere.
    pub fn accepts(self, gender: Gender) -> bool {
        !matches!(
            (self, gender),
            (RoomType::Male, Gender::Female) | (RoomType::Female, Gender::Male)
        )
    }
}

display_as_str!(
    StudentStatus,
    RoomStatus,
    ContractStatus,
    InvoiceStatus,
    MaintenanceStatus,
    MaintenancePriority,
    UserRole,
    Gender,
    RoomType,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_can_only_leave_active_towards_closed_states() {
        assert!(ContractStatus::Active.can_transition_to(ContractStatus::Expired));
        assert!(ContractStatus::Active.can_transition_to(ContractStatus::Terminated));
        assert!(!ContractStatus::Expired.can_transition_to(ContractStatus::Terminated));
        assert!(ContractStatus::Terminated.transition_to(ContractStatus::Active).is_ok());
    }

    #[test]
    fn invoice_overdue_is_only_reachable_from_pending() {
        assert!(InvoiceStatus::Pending.can_transition_to(InvoiceStatus::Overdue));
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Overdue));

        let err = InvoiceStatus::Paid
            .transition_to(InvoiceStatus::Overdue)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { entity: "invoice", .. }));
    }

    #[test]
    fn same_state_transition_is_a_no_op() {
        assert_eq!(
            MaintenanceStatus::Completed.transition_to(MaintenanceStatus::Completed).unwrap(),
            MaintenanceStatus::Completed
        );
    }

    #[test]
    fn maintenance_terminal_states_have_no_successors() {
        for status in [
            MaintenanceStatus::Completed,
            MaintenanceStatus::Rejected,
            MaintenanceStatus::Canceled,
        ] {
            assert!(status.is_terminal());
        }
        assert!(!MaintenanceStatus::Processing.can_transition_to(MaintenanceStatus::Pending));
    }

    #[test]
    fn room_status_follows_occupancy_unless_under_maintenance() {
        assert_eq!(RoomStatus::Available.derived(2, 2), RoomStatus::Full);
        assert_eq!(RoomStatus::Full.derived(1, 2), RoomStatus::Available);
        assert_eq!(RoomStatus::Maintenance.derived(0, 2), RoomStatus::Maintenance);
    }

    #[test]
    fn room_type_gender_compatibility() {
        assert!(!RoomType::Male.accepts(Gender::Female));
        assert!(!RoomType::Female.accepts(Gender::Male));
        assert!(RoomType::Male.accepts(Gender::Other));
        assert!(RoomType::Mixed.accepts(Gender::Female));
    }

    #[test]
    fn wire_strings_match_serde() {
        assert_eq!(
            serde_json::to_string(&MaintenanceStatus::Canceled).unwrap(),
            "\"canceled\""
        );
        let parsed: StudentStatus = serde_json::from_str("\"blocked\"").unwrap();
        assert_eq!(parsed, StudentStatus::Blocked);
    }
}
