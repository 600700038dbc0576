//! Invoice Service - monthly room invoices and their payment status

use chrono::NaiveDate;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{in_transaction, now_rfc3339};
use crate::domain::{
    ActivityEntry, ActivitySink, BillingRates, ConflictKind, DomainError, InvoiceAmounts,
    InvoiceMonth, InvoiceStatus, StateMachine, flush_activity,
};
use crate::models::building::{self, Entity as Building};
use crate::models::invoice::{self, Entity as Invoice};
use crate::models::room::{self, Entity as Room};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateInvoiceInput {
    pub room_id: i32,
    /// `YYYY-MM`
    pub invoice_month: String,
    pub electric_units: f64,
    pub water_units: f64,
    pub service_fee: Option<f64>,
    pub due_date: NaiveDate,
}

impl CreateInvoiceInput {
    fn validate(&self) -> Result<InvoiceMonth, DomainError> {
        let month = InvoiceMonth::parse(&self.invoice_month)?;
        for (field, value) in [
            ("electric_units", self.electric_units),
            ("water_units", self.water_units),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DomainError::validation(format!(
                    "{} must be a non-negative number",
                    field
                )));
            }
        }
        if let Some(fee) = self.service_fee {
            if !fee.is_finite() || fee < 0.0 {
                return Err(DomainError::validation("service_fee must be non-negative"));
            }
        }
        Ok(month)
    }
}

/// Filter parameters for listing invoices
#[derive(Debug, Default, Clone, Deserialize)]
pub struct InvoiceFilter {
    pub room_id: Option<i32>,
    pub status: Option<InvoiceStatus>,
    pub month: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceWithRoom {
    #[serde(flatten)]
    pub invoice: invoice::Model,
    pub room_number: String,
    pub building_name: String,
}

pub async fn create_invoice(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    rates: &BillingRates,
    input: CreateInvoiceInput,
) -> Result<invoice::Model, DomainError> {
    let month = input.validate()?;
    let rates = *rates;

    let (saved, entries) = in_transaction(db, move |txn| {
        Box::pin(async move {
            let room = Room::find_by_id(input.room_id)
                .one(txn)
                .await?
                .ok_or(DomainError::NotFound("room"))?;

            let key = month.key();
            let existing = Invoice::find()
                .filter(invoice::Column::RoomId.eq(room.id))
                .filter(invoice::Column::InvoiceMonth.eq(key.as_str()))
                .count(txn)
                .await?;
            if existing > 0 {
                return Err(DomainError::Conflict(ConflictKind::DuplicateInvoice));
            }

            let amounts = InvoiceAmounts::compute(
                room.price_per_month,
                input.electric_units,
                input.water_units,
                input.service_fee,
                &rates,
            );
            let now = now_rfc3339();

            let saved = invoice::ActiveModel {
                room_id: Set(room.id),
                invoice_month: Set(key),
                electric_units: Set(input.electric_units),
                water_units: Set(input.water_units),
                room_fee: Set(amounts.room_fee),
                electric_fee: Set(amounts.electric_fee),
                water_fee: Set(amounts.water_fee),
                service_fee: Set(amounts.service_fee),
                total_amount: Set(amounts.total_amount),
                due_date: Set(input.due_date),
                payment_status: Set(InvoiceStatus::Pending),
                payment_date: Set(None),
                created_by: Set(actor),
                created_at: Set(now.clone()),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(txn)
            .await
            // the UNIQUE(room_id, invoice_month) index settles concurrent creators
            .map_err(DomainError::unique_or(ConflictKind::DuplicateInvoice))?;

            let entry = ActivityEntry::new(
                actor,
                "CREATE_INVOICE",
                "invoice",
                saved.id,
                format!(
                    "Invoice {} for room {} created, total {:.0}",
                    saved.invoice_month, room.room_number, saved.total_amount
                ),
            );
            Ok((saved, vec![entry]))
        })
    })
    .await?;

    tracing::info!(
        invoice_id = saved.id,
        room_id = saved.room_id,
        month = %saved.invoice_month,
        "Invoice created"
    );
    flush_activity(activity, entries).await;
    Ok(saved)
}

/// Move an invoice through the payment table. `paid` stamps the payment date,
/// every other status clears it. Room and contract state are untouched.
pub async fn update_invoice_status(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    id: i32,
    status: InvoiceStatus,
) -> Result<invoice::Model, DomainError> {
    let (invoice, entries) = in_transaction(db, move |txn| {
        Box::pin(async move {
            let existing = Invoice::find_by_id(id)
                .lock_exclusive()
                .one(txn)
                .await?
                .ok_or(DomainError::NotFound("invoice"))?;

            let from = existing.payment_status;
            from.transition_to(status)?;
            if from == status {
                return Ok((existing, Vec::new()));
            }

            let mut active: invoice::ActiveModel = existing.into();
            active.payment_status = Set(status);
            active.payment_date = Set(match status {
                InvoiceStatus::Paid => Some(now_rfc3339()),
                _ => None,
            });
            active.updated_at = Set(now_rfc3339());
            let invoice = active.update(txn).await?;

            let entry = ActivityEntry::new(
                actor,
                "UPDATE_INVOICE_STATUS",
                "invoice",
                invoice.id,
                format!(
                    "Invoice {} moved from {} to {}",
                    invoice.invoice_month, from, status
                ),
            );
            Ok((invoice, vec![entry]))
        })
    })
    .await?;

    flush_activity(activity, entries).await;
    Ok(invoice)
}

pub async fn delete_invoice(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    id: i32,
) -> Result<(), DomainError> {
    let existing = Invoice::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("invoice"))?;

    if existing.payment_status == InvoiceStatus::Paid {
        return Err(DomainError::invalid_state(
            "invoice",
            "paid invoices cannot be deleted",
        ));
    }

    Invoice::delete_by_id(id).exec(db).await?;

    flush_activity(
        activity,
        vec![ActivityEntry::new(
            actor,
            "DELETE_INVOICE",
            "invoice",
            id,
            format!(
                "Invoice {} for room #{} deleted",
                existing.invoice_month, existing.room_id
            ),
        )],
    )
    .await;
    Ok(())
}

pub async fn get_invoice(db: &DatabaseConnection, id: i32) -> Result<InvoiceWithRoom, DomainError> {
    let invoice = Invoice::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("invoice"))?;

    let mut details = attach_rooms(db, vec![invoice]).await?;
    details.pop().ok_or(DomainError::NotFound("invoice"))
}

pub async fn list_invoices(
    db: &DatabaseConnection,
    filter: InvoiceFilter,
) -> Result<Vec<InvoiceWithRoom>, DomainError> {
    let mut condition = Condition::all();

    if let Some(room_id) = filter.room_id {
        condition = condition.add(invoice::Column::RoomId.eq(room_id));
    }

    if let Some(status) = filter.status {
        condition = condition.add(invoice::Column::PaymentStatus.eq(status));
    }

    if let Some(month) = filter.month {
        let month = InvoiceMonth::parse(&month)?;
        condition = condition.add(invoice::Column::InvoiceMonth.eq(month.key()));
    }

    let invoices = Invoice::find()
        .filter(condition)
        .order_by_desc(invoice::Column::InvoiceMonth)
        .order_by_asc(invoice::Column::RoomId)
        .all(db)
        .await?;

    attach_rooms(db, invoices).await
}

async fn attach_rooms(
    db: &DatabaseConnection,
    invoices: Vec<invoice::Model>,
) -> Result<Vec<InvoiceWithRoom>, DomainError> {
    let mut room_ids: Vec<i32> = invoices.iter().map(|i| i.room_id).collect();
    room_ids.sort_unstable();
    room_ids.dedup();

    let rooms: Vec<(room::Model, Option<building::Model>)> = Room::find()
        .filter(room::Column::Id.is_in(room_ids))
        .find_also_related(Building)
        .all(db)
        .await?;

    Ok(invoices
        .into_iter()
        .map(|invoice| {
            let (room_number, building_name) = rooms
                .iter()
                .find(|(r, _)| r.id == invoice.room_id)
                .map(|(r, b)| {
                    (
                        r.room_number.clone(),
                        b.as_ref().map(|b| b.name.clone()).unwrap_or_default(),
                    )
                })
                .unwrap_or_default();
            InvoiceWithRoom {
                invoice,
                room_number,
                building_name,
            }
        })
        .collect())
}
