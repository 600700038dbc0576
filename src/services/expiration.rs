//! Expiration batch
//!
//! Flips contracts past their end date to `expired` and pending invoices past
//! their due date to `overdue`. Each batch commits on its own; the notices go
//! out afterwards and a failed send is logged and counted, never rolled back.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use futures::future::join_all;
use sea_orm::*;
use serde::Serialize;
use utoipa::ToSchema;

use super::contract_service::{ContractWithDetails, with_details};
use super::in_transaction;
use super::occupancy::{lock_room, sync_room};
use crate::domain::{
    ActivityEntry, ActivitySink, ContractStatus, DomainError, EmailMessage, InvoiceMonth,
    InvoiceStatus, Notifier, Recipient, flush_activity,
};
use crate::models::contract::{self, Entity as Contract};
use crate::models::invoice::{self, Entity as Invoice};
use crate::models::room::Entity as Room;
use crate::models::student::{self, Entity as Student};

/// An invoice that just became overdue, with everyone who should hear about it.
#[derive(Debug, Clone, Serialize)]
pub struct OverdueInvoice {
    pub invoice: invoice::Model,
    pub room_number: String,
    pub recipients: Vec<Recipient>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotificationOutcome {
    pub sent: usize,
    pub failed: usize,
}

impl NotificationOutcome {
    fn absorb(&mut self, other: NotificationOutcome) {
        self.sent += other.sent;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ExpirationReport {
    pub contracts_expired: usize,
    pub invoices_overdue: usize,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
    /// Batches that failed as a whole; retried on the next run.
    pub errors: Vec<String>,
}

/// Expire every active contract whose end date is before `today`.
///
/// Occupancy of the touched rooms is recounted from scratch, which also
/// repairs any drift left by earlier writes.
pub async fn expire_contracts(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    today: NaiveDate,
) -> Result<Vec<ContractWithDetails>, DomainError> {
    let (expired, entries) = in_transaction(db, move |txn| {
        Box::pin(async move {
            let due = Contract::find()
                .filter(contract::Column::Status.eq(ContractStatus::Active))
                .filter(contract::Column::EndDate.lt(today))
                .order_by_asc(contract::Column::Id)
                .lock_exclusive()
                .all(txn)
                .await?;

            if due.is_empty() {
                return Ok((Vec::new(), Vec::new()));
            }

            let ids: Vec<i32> = due.iter().map(|c| c.id).collect();
            let now = super::now_rfc3339();
            Contract::update_many()
                .set(contract::ActiveModel {
                    status: Set(ContractStatus::Expired),
                    updated_at: Set(now.clone()),
                    ..Default::default()
                })
                .filter(contract::Column::Id.is_in(ids))
                .filter(contract::Column::Status.eq(ContractStatus::Active))
                .exec(txn)
                .await?;

            let room_ids: BTreeSet<i32> = due.iter().map(|c| c.room_id).collect();
            for room_id in room_ids {
                let room = lock_room(txn, room_id).await?;
                sync_room(txn, room).await?;
            }

            let expired: Vec<contract::Model> = due
                .into_iter()
                .map(|mut c| {
                    c.status = ContractStatus::Expired;
                    c.updated_at = now.clone();
                    c
                })
                .collect();

            let entries = expired
                .iter()
                .map(|c| {
                    ActivityEntry::new(
                        None,
                        "EXPIRE_CONTRACT",
                        "contract",
                        c.id,
                        format!("Contract {} expired (ended {})", c.contract_number, c.end_date),
                    )
                })
                .collect::<Vec<_>>();

            let detailed = with_details(txn, expired).await?;
            Ok((detailed, entries))
        })
    })
    .await?;

    if !expired.is_empty() {
        tracing::info!("Expired {} contract(s)", expired.len());
    }
    flush_activity(activity, entries).await;
    Ok(expired)
}

/// Mark every pending invoice whose due date is before `today` as overdue.
///
/// Recipients are the students holding an active contract on the room that
/// started no later than the last day of the billed month.
pub async fn expire_invoices(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    today: NaiveDate,
) -> Result<Vec<OverdueInvoice>, DomainError> {
    let (overdue, entries) = in_transaction(db, move |txn| {
        Box::pin(async move {
            let due = Invoice::find()
                .filter(invoice::Column::PaymentStatus.eq(InvoiceStatus::Pending))
                .filter(invoice::Column::DueDate.lt(today))
                .order_by_asc(invoice::Column::Id)
                .lock_exclusive()
                .all(txn)
                .await?;

            if due.is_empty() {
                return Ok((Vec::new(), Vec::new()));
            }

            let ids: Vec<i32> = due.iter().map(|i| i.id).collect();
            let now = super::now_rfc3339();
            Invoice::update_many()
                .set(invoice::ActiveModel {
                    payment_status: Set(InvoiceStatus::Overdue),
                    updated_at: Set(now.clone()),
                    ..Default::default()
                })
                .filter(invoice::Column::Id.is_in(ids))
                .filter(invoice::Column::PaymentStatus.eq(InvoiceStatus::Pending))
                .exec(txn)
                .await?;

            let mut overdue = Vec::with_capacity(due.len());
            let mut entries = Vec::with_capacity(due.len());
            for mut invoice in due {
                invoice.payment_status = InvoiceStatus::Overdue;
                invoice.updated_at = now.clone();

                let room_number = Room::find_by_id(invoice.room_id)
                    .one(txn)
                    .await?
                    .map(|r| r.room_number)
                    .unwrap_or_default();
                let recipients = billed_occupants(txn, &invoice).await?;

                entries.push(ActivityEntry::new(
                    None,
                    "INVOICE_OVERDUE",
                    "invoice",
                    invoice.id,
                    format!(
                        "Invoice {} for room {} is overdue (due {})",
                        invoice.invoice_month, room_number, invoice.due_date
                    ),
                ));
                overdue.push(OverdueInvoice {
                    invoice,
                    room_number,
                    recipients,
                });
            }
            Ok((overdue, entries))
        })
    })
    .await?;

    if !overdue.is_empty() {
        tracing::info!("Marked {} invoice(s) overdue", overdue.len());
    }
    flush_activity(activity, entries).await;
    Ok(overdue)
}

async fn billed_occupants<C: ConnectionTrait>(
    conn: &C,
    invoice: &invoice::Model,
) -> Result<Vec<Recipient>, DomainError> {
    let mut query = Contract::find()
        .filter(contract::Column::RoomId.eq(invoice.room_id))
        .filter(contract::Column::Status.eq(ContractStatus::Active));

    // Stored months are always canonical; an unparsable one falls back to all occupants.
    if let Ok(month) = InvoiceMonth::parse(&invoice.invoice_month) {
        query = query.filter(contract::Column::StartDate.lte(month.last_day));
    }

    let student_ids: Vec<i32> = query.all(conn).await?.iter().map(|c| c.student_id).collect();
    if student_ids.is_empty() {
        return Ok(Vec::new());
    }

    Ok(Student::find()
        .filter(student::Column::Id.is_in(student_ids))
        .order_by_asc(student::Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(|s| Recipient {
            email: s.email,
            name: s.full_name,
        })
        .collect())
}

fn contract_expired_message(contract: &ContractWithDetails) -> EmailMessage {
    let subject = format!("Your dormitory contract {} has expired", contract.contract.contract_number);
    let text_body = format!(
        "Hello {},\n\nYour contract {} for room {} ({}) ended on {} and is now expired.\n\
         Please contact the dormitory office to renew it or arrange your move-out.\n",
        contract.student_name,
        contract.contract.contract_number,
        contract.room_number,
        contract.building_name,
        contract.contract.end_date,
    );
    let html_body = format!(
        "<p>Hello {},</p><p>Your contract <strong>{}</strong> for room {} ({}) ended on {} \
         and is now expired.</p><p>Please contact the dormitory office to renew it or arrange \
         your move-out.</p>",
        contract.student_name,
        contract.contract.contract_number,
        contract.room_number,
        contract.building_name,
        contract.contract.end_date,
    );

    EmailMessage {
        to: Recipient {
            email: contract.student_email.clone(),
            name: contract.student_name.clone(),
        },
        subject,
        text_body,
        html_body,
    }
}

fn invoice_overdue_message(overdue: &OverdueInvoice, to: &Recipient) -> EmailMessage {
    let invoice = &overdue.invoice;
    let subject = format!("Invoice {} for room {} is overdue", invoice.invoice_month, overdue.room_number);
    let text_body = format!(
        "Hello {},\n\nThe invoice for room {} ({}) was due on {} and has not been paid.\n\
         Amount due: {:.0}\n",
        to.name, overdue.room_number, invoice.invoice_month, invoice.due_date, invoice.total_amount,
    );
    let html_body = format!(
        "<p>Hello {},</p><p>The invoice for room {} ({}) was due on {} and has not been paid.</p>\
         <p>Amount due: <strong>{:.0}</strong></p>",
        to.name, overdue.room_number, invoice.invoice_month, invoice.due_date, invoice.total_amount,
    );

    EmailMessage {
        to: to.clone(),
        subject,
        text_body,
        html_body,
    }
}

/// Send every message concurrently; failures are logged per recipient.
async fn dispatch(notifier: &dyn Notifier, messages: Vec<EmailMessage>) -> NotificationOutcome {
    let sends = messages.into_iter().map(|message| async move {
        let email = message.to.email.clone();
        if email.trim().is_empty() {
            tracing::warn!(recipient = %message.to.name, "Skipping notice: recipient has no email");
            return false;
        }
        match notifier.send(message).await {
            Ok(receipt) => {
                tracing::debug!(%email, message_id = %receipt.message_id, "Notice sent");
                true
            }
            Err(e) => {
                tracing::warn!(%email, "Failed to send notice: {}", e);
                false
            }
        }
    });

    let results = join_all(sends).await;
    let sent = results.iter().filter(|ok| **ok).count();
    NotificationOutcome {
        sent,
        failed: results.len() - sent,
    }
}

pub async fn notify_expired_contracts(
    notifier: &dyn Notifier,
    contracts: &[ContractWithDetails],
) -> NotificationOutcome {
    dispatch(notifier, contracts.iter().map(contract_expired_message).collect()).await
}

pub async fn notify_overdue_invoices(
    notifier: &dyn Notifier,
    invoices: &[OverdueInvoice],
) -> NotificationOutcome {
    let messages = invoices
        .iter()
        .flat_map(|overdue| {
            overdue
                .recipients
                .iter()
                .map(move |to| invoice_overdue_message(overdue, to))
        })
        .collect();
    dispatch(notifier, messages).await
}

/// One full expiration run: contracts, then invoices, each followed by its notices.
///
/// A failing batch is reported and left for the next run; it does not stop
/// the other batch.
pub async fn run_expiration_cycle(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    notifier: &dyn Notifier,
    today: NaiveDate,
) -> ExpirationReport {
    let mut report = ExpirationReport::default();
    let mut notices = NotificationOutcome::default();

    match expire_contracts(db, activity, today).await {
        Ok(expired) => {
            report.contracts_expired = expired.len();
            notices.absorb(notify_expired_contracts(notifier, &expired).await);
        }
        Err(e) => {
            tracing::error!("Contract expiration failed: {}", e);
            report.errors.push(format!("contracts: {}", e));
        }
    }

    match expire_invoices(db, activity, today).await {
        Ok(overdue) => {
            report.invoices_overdue = overdue.len();
            notices.absorb(notify_overdue_invoices(notifier, &overdue).await);
        }
        Err(e) => {
            tracing::error!("Invoice expiration failed: {}", e);
            report.errors.push(format!("invoices: {}", e));
        }
    }

    report.notifications_sent = notices.sent;
    report.notifications_failed = notices.failed;

    tracing::info!(
        contracts_expired = report.contracts_expired,
        invoices_overdue = report.invoices_overdue,
        notifications_sent = report.notifications_sent,
        notifications_failed = report.notifications_failed,
        "Expiration cycle finished"
    );
    report
}
