//! Letter-of-award module: base value + approved amendments as the total
//! available, and the allocation check that keeps purchase-order commitments
//! within that total.

pub mod amendment;
pub mod loa;
pub mod utilization;

pub use amendment::{Amendment, AmendmentId, AmendmentStatus};
pub use loa::{
    ApproveAmendment, Loa, LoaCommand, LoaEvent, LoaId, LoaStatus, RecordAmendment, RecordLoa,
    UpdateLoaStatus,
};
pub use utilization::{LoaUtilization, check_allocation};
