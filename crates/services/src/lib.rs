//! Application layer: wires the workflow aggregates to stores, a clock, and
//! the notification bus.
//!
//! Services are stateless coordinators. Each operation loads the aggregate,
//! runs service-level cross-aggregate checks (LOA-number uniqueness, one EMD
//! per offer, allocation against utilization), dispatches a command, saves
//! with optimistic concurrency, and publishes notifications.

pub mod clock;
pub mod emd;
pub mod error;
pub mod loa;
pub mod notify;
pub mod offers;
pub mod purchasing;
pub mod reference;
pub mod store;

mod integration_tests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use emd::EmdService;
pub use error::{WorkflowError, WorkflowResult};
pub use loa::{LoaService, RecordAmendmentInput, RecordLoaInput, utilization_of};
pub use notify::{NotificationEnvelope, WorkflowNotification};
pub use offers::{CreateOfferInput, OfferService};
pub use purchasing::{CreatePoInput, PurchasingService};
pub use reference::{Department, RailwayZone, ReferenceData};
pub use store::{InMemoryStore, Store, StoreError};
