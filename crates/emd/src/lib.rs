//! Earnest-money-deposit (EMD/FDR) tracking: a small one-directional state
//! machine tied to a budgetary offer.

pub mod tracking;

pub use tracking::{
    AttachDocument, EmdCommand, EmdEvent, EmdId, EmdStatus, EmdTracking, OpenTracking,
    UpdateEmdStatus, allowed_transitions,
};
