//! Budgetary offer module: work-item pricing and the sequential
//! approval-chain engine with draft-reset-on-rejection semantics.

pub mod approval;
pub mod offer;
pub mod work_item;

pub use approval::{ApprovalLevel, ApprovalStatus, RejectionRecord};
pub use offer::{
    BudgetaryOffer, CreateOffer, OfferCommand, OfferEvent, OfferId, OfferStatus, ProcessApproval,
    ReplaceWorkItems, SubmitForApproval,
};
pub use work_item::{EmdDetails, WorkItem, offer_value, validate_emd_details};
