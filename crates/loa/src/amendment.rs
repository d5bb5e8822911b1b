//! LOA amendments: additional value recorded in PENDING state, counted toward
//! the total only once approved.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tenderflow_core::{AggregateId, Entity, Money, UserId};

/// Amendment identifier (child entity of an LOA).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AmendmentId(pub AggregateId);

impl AmendmentId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for AmendmentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Amendment status. No reject path exists for amendments; a pending one is
/// simply excluded from utilization until approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmendmentStatus {
    Pending,
    Approved,
}

/// One amendment to an LOA's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amendment {
    pub id: AmendmentId,
    /// Monotonic per LOA, assigned as `last + 1` when recorded.
    pub amendment_no: u32,
    /// Additional value, >= 0.
    pub additional_value: Money,
    pub reason: String,
    pub effective_date: NaiveDate,
    pub status: AmendmentStatus,
    pub recorded_by: UserId,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl Amendment {
    pub fn is_approved(&self) -> bool {
        self.status == AmendmentStatus::Approved
    }
}

impl Entity for Amendment {
    type Id = AmendmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
