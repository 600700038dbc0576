//! Dashboard aggregation

use sea_orm::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    ContractStatus, DomainError, InvoiceStatus, MaintenanceStatus, RoomStatus, StudentStatus,
};
use crate::models::building::Entity as Building;
use crate::models::contract::{self, Entity as Contract};
use crate::models::invoice::{self, Entity as Invoice};
use crate::models::maintenance_request::{self, Entity as MaintenanceRequest};
use crate::models::room::{self, Entity as Room};
use crate::models::student::{self, Entity as Student};

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct RoomCounts {
    pub total: u64,
    pub available: u64,
    pub full: u64,
    pub maintenance: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub buildings: u64,
    pub rooms: RoomCounts,
    pub total_capacity: i64,
    pub total_occupancy: i64,
    pub active_contracts: u64,
    pub pending_students: u64,
    pub pending_invoices: u64,
    pub overdue_invoices: u64,
    /// Sum of unpaid (pending and overdue) invoice totals
    pub outstanding_amount: f64,
    /// Pending and processing maintenance requests
    pub open_maintenance_requests: u64,
}

pub async fn summary(db: &DatabaseConnection) -> Result<DashboardSummary, DomainError> {
    let rooms: Vec<(RoomStatus, i32, i32)> = Room::find()
        .select_only()
        .column(room::Column::Status)
        .column(room::Column::Capacity)
        .column(room::Column::CurrentOccupancy)
        .into_tuple()
        .all(db)
        .await?;

    let mut room_counts = RoomCounts {
        total: rooms.len() as u64,
        ..Default::default()
    };
    let mut total_capacity = 0i64;
    let mut total_occupancy = 0i64;
    for (status, capacity, occupancy) in rooms {
        match status {
            RoomStatus::Available => room_counts.available += 1,
            RoomStatus::Full => room_counts.full += 1,
            RoomStatus::Maintenance => room_counts.maintenance += 1,
        }
        total_capacity += i64::from(capacity);
        total_occupancy += i64::from(occupancy);
    }

    let unpaid: Vec<(InvoiceStatus, f64)> = Invoice::find()
        .select_only()
        .column(invoice::Column::PaymentStatus)
        .column(invoice::Column::TotalAmount)
        .filter(
            invoice::Column::PaymentStatus.is_in([InvoiceStatus::Pending, InvoiceStatus::Overdue]),
        )
        .into_tuple()
        .all(db)
        .await?;
    let pending_invoices = unpaid
        .iter()
        .filter(|(status, _)| *status == InvoiceStatus::Pending)
        .count() as u64;
    let overdue_invoices = unpaid.len() as u64 - pending_invoices;
    let outstanding_amount = unpaid.iter().map(|(_, amount)| amount).sum();

    Ok(DashboardSummary {
        buildings: Building::find().count(db).await?,
        rooms: room_counts,
        total_capacity,
        total_occupancy,
        active_contracts: Contract::find()
            .filter(contract::Column::Status.eq(ContractStatus::Active))
            .count(db)
            .await?,
        pending_students: Student::find()
            .filter(student::Column::Status.eq(StudentStatus::Pending))
            .count(db)
            .await?,
        pending_invoices,
        overdue_invoices,
        outstanding_amount,
        open_maintenance_requests: MaintenanceRequest::find()
            .filter(maintenance_request::Column::Status.is_in([
                MaintenanceStatus::Pending,
                MaintenanceStatus::Processing,
            ]))
            .count(db)
            .await?,
    })
}
