//! Work-item pricing: line totals and aggregate offer value.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tenderflow_core::{DomainError, DomainResult, Money, ValueObject};

/// EMD amount cap as a share of the aggregate offer value (5%).
const EMD_CAP_PERCENT: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// A priced line of a budgetary offer.
///
/// Owned exclusively by one offer; the list is replaced wholesale, never
/// patched per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit: String,
    pub base_rate: Money,
    /// Tax rate in percent, within [0, 100].
    pub tax_rate: Decimal,
}

impl WorkItem {
    /// `quantity * base_rate * (1 + tax_rate/100)`, rounded to currency scale.
    pub fn total_amount(&self) -> Money {
        let tax_multiplier = Decimal::ONE + self.tax_rate / Decimal::ONE_HUNDRED;
        self.base_rate.scale_by(self.quantity * tax_multiplier)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.description.trim().is_empty() {
            return Err(DomainError::validation("work item description is required"));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "work item quantity must be positive, got {}",
                self.quantity
            )));
        }
        if self.base_rate.is_negative() {
            return Err(DomainError::validation(format!(
                "work item base rate must be non-negative, got {}",
                self.base_rate
            )));
        }
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE_HUNDRED {
            return Err(DomainError::validation(format!(
                "work item tax rate must be within [0, 100], got {}",
                self.tax_rate
            )));
        }
        Ok(())
    }
}

impl ValueObject for WorkItem {}

/// Aggregate value of an offer: sum of its work-item totals.
pub fn offer_value(items: &[WorkItem]) -> Money {
    items.iter().map(WorkItem::total_amount).sum()
}

/// Earnest-money-deposit terms declared on an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmdDetails {
    pub amount: Money,
    pub due_date: NaiveDate,
}

impl ValueObject for EmdDetails {}

/// Validate declared EMD terms against the offer's aggregate value.
///
/// The deposit may not be negative and may not exceed 5% of the offer value.
pub fn validate_emd_details(emd: &EmdDetails, offer_value: Money) -> DomainResult<()> {
    if emd.amount.is_negative() {
        return Err(DomainError::validation(format!(
            "EMD amount must be non-negative, got {}",
            emd.amount
        )));
    }
    let cap = offer_value.percent(EMD_CAP_PERCENT);
    if emd.amount > cap {
        return Err(DomainError::validation(format!(
            "EMD amount {} exceeds 5% of offer value ({} of {})",
            emd.amount, cap, offer_value
        )));
    }
    Ok(())
}
