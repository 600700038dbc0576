//! Pure billing and identifier rules.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use super::DomainError;

/// Unit prices applied when an invoice is generated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillingRates {
    pub electric_per_unit: f64,
    pub water_per_unit: f64,
    pub default_service_fee: f64,
}

impl Default for BillingRates {
    fn default() -> Self {
        Self {
            electric_per_unit: 3_500.0,
            water_per_unit: 15_000.0,
            default_service_fee: 100_000.0,
        }
    }
}

/// Line items of a room invoice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InvoiceAmounts {
    pub room_fee: f64,
    pub electric_fee: f64,
    pub water_fee: f64,
    pub service_fee: f64,
    pub total_amount: f64,
}

impl InvoiceAmounts {
    pub fn compute(
        room_fee: f64,
        electric_units: f64,
        water_units: f64,
        service_fee: Option<f64>,
        rates: &BillingRates,
    ) -> Self {
        let electric_fee = electric_units * rates.electric_per_unit;
        let water_fee = water_units * rates.water_per_unit;
        let service_fee = service_fee.unwrap_or(rates.default_service_fee);

        Self {
            room_fee,
            electric_fee,
            water_fee,
            service_fee,
            total_amount: room_fee + electric_fee + water_fee + service_fee,
        }
    }
}

/// A `YYYY-MM` billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceMonth {
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
}

impl InvoiceMonth {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::validation(format!("invoice month '{}' must be YYYY-MM", raw));

        let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;

        let first_day = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next_month = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;

        Ok(Self {
            first_day,
            last_day: next_month.pred_opt().ok_or_else(invalid)?,
        })
    }

    /// Canonical `YYYY-MM` form used as the storage key.
    pub fn key(&self) -> String {
        format!("{:04}-{:02}", self.first_day.year(), self.first_day.month())
    }
}

/// Contract numbers combine room, student and creation instant; the column is UNIQUE.
pub fn contract_number(student_id: i32, room_id: i32, at: DateTime<Utc>) -> String {
    format!(
        "HD-{:04}-{:05}-{}",
        room_id,
        student_id,
        at.format("%Y%m%d%H%M%S%3f")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn total_is_sum_of_line_items() {
        let rates = BillingRates::default();
        let amounts = InvoiceAmounts::compute(1_200_000.0, 100.0, 5.0, None, &rates);

        assert_eq!(amounts.electric_fee, 350_000.0);
        assert_eq!(amounts.water_fee, 75_000.0);
        assert_eq!(amounts.service_fee, 100_000.0);
        assert_eq!(amounts.total_amount, 1_725_000.0);
    }

    #[test]
    fn explicit_service_fee_overrides_default() {
        let amounts = InvoiceAmounts::compute(0.0, 0.0, 0.0, Some(0.0), &BillingRates::default());
        assert_eq!(amounts.total_amount, 0.0);
    }

    #[test]
    fn invoice_month_bounds() {
        let feb = InvoiceMonth::parse("2024-02").unwrap();
        assert_eq!(feb.first_day, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(feb.last_day, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let dec = InvoiceMonth::parse("2023-12").unwrap();
        assert_eq!(dec.last_day, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(dec.key(), "2023-12");
    }

    #[test]
    fn invoice_month_rejects_garbage() {
        for raw in ["2024-13", "2024/03", "24-03", "2024-3", ""] {
            assert!(InvoiceMonth::parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn contract_number_encodes_room_student_and_time() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        assert_eq!(contract_number(7, 12, at), "HD-0012-00007-20240301083000000");
    }
}
