//! Purchase order module: the draft → issued → in-progress →
//! completed/cancelled state machine, line items, and PO numbering.

pub mod item;
pub mod order;
pub mod po_number;

pub use item::PurchaseOrderItem;
pub use order::{
    CreatePurchaseOrder, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderEvent, PurchaseOrderId,
    PurchaseOrderStatus, StatusChange, UpdateDraft, UpdatePoStatus, VendorId, allowed_transitions,
};
pub use po_number::{format_po_number, parse_po_number};
