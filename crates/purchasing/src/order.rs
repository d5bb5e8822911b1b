use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tenderflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Money, UserId};
use tenderflow_events::Event;
use tenderflow_loa::LoaId;

use crate::item::PurchaseOrderItem;

/// Purchase order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOrderId(pub AggregateId);

impl PurchaseOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Vendor identifier (vendor master data is an external collaborator).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorId(pub AggregateId);

impl VendorId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for VendorId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    Draft,
    Issued,
    InProgress,
    Completed,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "draft",
            PurchaseOrderStatus::Issued => "issued",
            PurchaseOrderStatus::InProgress => "in_progress",
            PurchaseOrderStatus::Completed => "completed",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Fixed transition table enforced on every status-change request.
pub fn allowed_transitions(from: PurchaseOrderStatus) -> &'static [PurchaseOrderStatus] {
    match from {
        PurchaseOrderStatus::Draft => &[PurchaseOrderStatus::Issued],
        PurchaseOrderStatus::Issued => &[
            PurchaseOrderStatus::InProgress,
            PurchaseOrderStatus::Cancelled,
        ],
        PurchaseOrderStatus::InProgress => &[
            PurchaseOrderStatus::Completed,
            PurchaseOrderStatus::Cancelled,
        ],
        PurchaseOrderStatus::Completed | PurchaseOrderStatus::Cancelled => &[],
    }
}

/// One entry of the append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: PurchaseOrderStatus,
    pub to: PurchaseOrderStatus,
    pub remarks: Option<String>,
    pub changed_by: UserId,
    pub changed_at: DateTime<Utc>,
}

/// Aggregate root: PurchaseOrder.
///
/// Value and delivery-date updates are permitted only while DRAFT; the
/// allocation check against the linked LOA is the services layer's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    po_number: String,
    loa_id: Option<LoaId>,
    vendor_id: Option<VendorId>,
    value: Money,
    delivery_date: Option<NaiveDate>,
    status: PurchaseOrderStatus,
    items: Vec<PurchaseOrderItem>,
    status_history: Vec<StatusChange>,
    created_by: Option<UserId>,
    version: u64,
    created: bool,
}

impl PurchaseOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PurchaseOrderId) -> Self {
        Self {
            id,
            po_number: String::new(),
            loa_id: None,
            vendor_id: None,
            value: Money::ZERO,
            delivery_date: None,
            status: PurchaseOrderStatus::Draft,
            items: Vec::new(),
            status_history: Vec::new(),
            created_by: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn po_number(&self) -> &str {
        &self.po_number
    }

    pub fn loa_id(&self) -> Option<LoaId> {
        self.loa_id
    }

    pub fn vendor_id(&self) -> Option<VendorId> {
        self.vendor_id
    }

    pub fn value(&self) -> Money {
        self.value
    }

    pub fn delivery_date(&self) -> Option<NaiveDate> {
        self.delivery_date
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn items(&self) -> &[PurchaseOrderItem] {
        &self.items
    }

    pub fn status_history(&self) -> &[StatusChange] {
        &self.status_history
    }

    /// True while the order counts toward LOA utilization.
    pub fn is_committed(&self) -> bool {
        self.status != PurchaseOrderStatus::Cancelled
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseOrder {
    pub po_id: PurchaseOrderId,
    pub po_number: String,
    pub loa_id: LoaId,
    pub vendor_id: VendorId,
    pub value: Money,
    pub delivery_date: NaiveDate,
    pub items: Vec<PurchaseOrderItem>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateDraft (value, delivery date, and full item list; DRAFT only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDraft {
    pub po_id: PurchaseOrderId,
    pub value: Money,
    pub delivery_date: NaiveDate,
    pub items: Vec<PurchaseOrderItem>,
    pub updated_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdatePoStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePoStatus {
    pub po_id: PurchaseOrderId,
    pub to: PurchaseOrderStatus,
    pub remarks: Option<String>,
    pub changed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    CreatePurchaseOrder(CreatePurchaseOrder),
    UpdateDraft(UpdateDraft),
    UpdateStatus(UpdatePoStatus),
}

/// Event: PurchaseOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderCreated {
    pub po_id: PurchaseOrderId,
    pub po_number: String,
    pub loa_id: LoaId,
    pub vendor_id: VendorId,
    pub value: Money,
    pub delivery_date: NaiveDate,
    pub items: Vec<PurchaseOrderItem>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DraftUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftUpdated {
    pub po_id: PurchaseOrderId,
    pub value: Money,
    pub delivery_date: NaiveDate,
    pub items: Vec<PurchaseOrderItem>,
    pub updated_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged (appends to the status history).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoStatusChanged {
    pub po_id: PurchaseOrderId,
    pub from: PurchaseOrderStatus,
    pub to: PurchaseOrderStatus,
    pub remarks: Option<String>,
    pub changed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    PurchaseOrderCreated(PurchaseOrderCreated),
    DraftUpdated(DraftUpdated),
    StatusChanged(PoStatusChanged),
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(_) => "po.created",
            PurchaseOrderEvent::DraftUpdated(_) => "po.draft_updated",
            PurchaseOrderEvent::StatusChanged(_) => "po.status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => e.occurred_at,
            PurchaseOrderEvent::DraftUpdated(e) => e.occurred_at,
            PurchaseOrderEvent::StatusChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => {
                self.id = e.po_id;
                self.po_number = e.po_number.clone();
                self.loa_id = Some(e.loa_id);
                self.vendor_id = Some(e.vendor_id);
                self.value = e.value;
                self.delivery_date = Some(e.delivery_date);
                self.status = PurchaseOrderStatus::Draft;
                self.items = e.items.clone();
                self.status_history.clear();
                self.created_by = Some(e.created_by);
                self.created = true;
            }
            PurchaseOrderEvent::DraftUpdated(e) => {
                self.value = e.value;
                self.delivery_date = Some(e.delivery_date);
                self.items = e.items.clone();
            }
            PurchaseOrderEvent::StatusChanged(e) => {
                self.status = e.to;
                self.status_history.push(StatusChange {
                    from: e.from,
                    to: e.to,
                    remarks: e.remarks.clone(),
                    changed_by: e.changed_by,
                    changed_at: e.occurred_at,
                });
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseOrderCommand::CreatePurchaseOrder(cmd) => self.handle_create(cmd),
            PurchaseOrderCommand::UpdateDraft(cmd) => self.handle_update_draft(cmd),
            PurchaseOrderCommand::UpdateStatus(cmd) => self.handle_update_status(cmd),
        }
    }
}

impl PurchaseOrder {
    fn ensure_po_id(&self, po_id: PurchaseOrderId) -> Result<(), DomainError> {
        if self.id != po_id {
            return Err(DomainError::validation("po_id mismatch"));
        }
        Ok(())
    }

    fn validate_order(value: Money, items: &[PurchaseOrderItem]) -> Result<(), DomainError> {
        if value <= Money::ZERO {
            return Err(DomainError::validation(format!(
                "purchase order value must be positive, got {value}"
            )));
        }
        for item in items {
            item.validate()?;
        }
        Ok(())
    }

    fn handle_create(
        &self,
        cmd: &CreatePurchaseOrder,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("purchase order already exists"));
        }
        if cmd.po_number.trim().is_empty() {
            return Err(DomainError::validation("PO number is required"));
        }
        Self::validate_order(cmd.value, &cmd.items)?;

        Ok(vec![PurchaseOrderEvent::PurchaseOrderCreated(
            PurchaseOrderCreated {
                po_id: cmd.po_id,
                po_number: cmd.po_number.clone(),
                loa_id: cmd.loa_id,
                vendor_id: cmd.vendor_id,
                value: cmd.value,
                delivery_date: cmd.delivery_date,
                items: cmd.items.clone(),
                created_by: cmd.created_by,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_update_draft(
        &self,
        cmd: &UpdateDraft,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_po_id(cmd.po_id)?;

        if self.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::invalid_state(
                "purchase order can only be updated while draft",
            ));
        }
        Self::validate_order(cmd.value, &cmd.items)?;

        Ok(vec![PurchaseOrderEvent::DraftUpdated(DraftUpdated {
            po_id: cmd.po_id,
            value: cmd.value,
            delivery_date: cmd.delivery_date,
            items: cmd.items.clone(),
            updated_by: cmd.updated_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_status(
        &self,
        cmd: &UpdatePoStatus,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_po_id(cmd.po_id)?;

        let allowed = allowed_transitions(self.status);
        if !allowed.contains(&cmd.to) {
            return Err(DomainError::invalid_transition(
                self.status.as_str(),
                cmd.to.as_str(),
                allowed.iter().map(|s| s.as_str()),
            ));
        }

        Ok(vec![PurchaseOrderEvent::StatusChanged(PoStatusChanged {
            po_id: cmd.po_id,
            from: self.status,
            to: cmd.to,
            remarks: cmd.remarks.clone(),
            changed_by: cmd.changed_by,
            occurred_at: cmd.occurred_at,
        })])
    }
}
