//! Purchase order line items.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tenderflow_core::{DomainError, DomainResult, Money, ValueObject};

/// One line of a purchase order.
///
/// `specifications` is an ordered map so serialized output is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    pub specifications: BTreeMap<String, String>,
}

impl PurchaseOrderItem {
    /// `quantity * unit_price`, rounded to currency scale.
    pub fn total_price(&self) -> Money {
        self.unit_price.scale_by(self.quantity)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.description.trim().is_empty() {
            return Err(DomainError::validation("item description is required"));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "item quantity must be positive, got {}",
                self.quantity
            )));
        }
        if self.unit_price.is_negative() {
            return Err(DomainError::validation(format!(
                "item unit price must be non-negative, got {}",
                self.unit_price
            )));
        }
        Ok(())
    }
}

impl ValueObject for PurchaseOrderItem {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_price_multiplies_quantity_by_unit_price() {
        let item = PurchaseOrderItem {
            description: "sleepers".to_string(),
            quantity: Decimal::from(250),
            unit_price: Money::new(Decimal::new(12050, 2)), // 120.50
            specifications: BTreeMap::new(),
        };
        assert_eq!(item.total_price(), Money::from_major(30_125));
    }

    #[test]
    fn zero_quantity_fails_validation() {
        let item = PurchaseOrderItem {
            description: "sleepers".to_string(),
            quantity: Decimal::ZERO,
            unit_price: Money::from_major(100),
            specifications: BTreeMap::new(),
        };
        assert!(matches!(item.validate(), Err(DomainError::Validation(_))));
    }
}
