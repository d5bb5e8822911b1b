//! Derived LOA utilization and the allocation rule gating PO commitments.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use tenderflow_core::{DomainError, DomainResult, Money};

/// Derived (never stored) utilization snapshot of an LOA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaUtilization {
    /// Base value + sum of approved amendments.
    pub total_value: Money,
    /// Sum of committed (non-cancelled) purchase-order values.
    pub utilized_amount: Money,
    pub remaining_amount: Money,
    /// Percent utilized, 2 decimal places; 0 when `total_value` is 0.
    pub utilization_percentage: Decimal,
}

impl LoaUtilization {
    /// Compute utilization from the approved total and the committed PO values.
    pub fn compute(total_value: Money, committed: impl IntoIterator<Item = Money>) -> Self {
        let utilized_amount: Money = committed.into_iter().sum();
        let remaining_amount = total_value - utilized_amount;
        let utilization_percentage = if total_value.is_zero() {
            Decimal::ZERO
        } else {
            (utilized_amount.amount() / total_value.amount() * Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        };

        Self {
            total_value,
            utilized_amount,
            remaining_amount,
            utilization_percentage,
        }
    }
}

/// Allocation rule invoked from PO creation and draft updates.
///
/// `remaining` is the LOA's remaining amount computed *before* considering the
/// candidate itself. On creation the full `requested` value must fit; on an
/// update only the delta over `previous` must, since the previous value is
/// already counted in `remaining`.
pub fn check_allocation(
    remaining: Money,
    requested: Money,
    previous: Option<Money>,
) -> DomainResult<()> {
    let delta = requested - previous.unwrap_or(Money::ZERO);
    if delta > remaining {
        return Err(DomainError::insufficient_balance(requested, remaining));
    }
    Ok(())
}
