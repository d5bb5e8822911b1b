//! Approval-chain records: ordered levels and the append-only rejection trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tenderflow_core::UserId;

use crate::offer::OfferStatus;

/// Status of a single approval level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// One level of an offer's approval chain.
///
/// Collection ordering is significant — it defines the approval sequence.
/// Levels are mutated in place by the chain engine, never reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalLevel {
    /// 1-based position in the chain.
    pub level: u32,
    pub approver: UserId,
    pub status: ApprovalStatus,
    pub remarks: Option<String>,
    /// When the level's status was last stamped.
    pub updated_at: Option<DateTime<Utc>>,
}

impl ApprovalLevel {
    pub fn pending(level: u32, approver: UserId) -> Self {
        Self {
            level,
            approver,
            status: ApprovalStatus::Pending,
            remarks: None,
            updated_at: None,
        }
    }
}

/// Audit record of one rejection. Appended, never mutated or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionRecord {
    /// Level at the time of rejection (1-based).
    pub level: u32,
    pub rejected_by: UserId,
    pub rejected_at: DateTime<Utc>,
    pub remarks: String,
    /// The status the offer held immediately before the rejection.
    pub prior_status: OfferStatus,
}
