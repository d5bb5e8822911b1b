//! Purchase order workflow service.

use chrono::{Datelike, NaiveDate};
use serde_json::json;

use tenderflow_auth::Actor;
use tenderflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ExpectedVersion, Money};
use tenderflow_events::{Event, EventBus};
use tenderflow_loa::{Loa, LoaId, LoaStatus, check_allocation};
use tenderflow_purchasing::{
    CreatePurchaseOrder, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId, PurchaseOrderItem,
    PurchaseOrderStatus, UpdateDraft, UpdatePoStatus, VendorId, format_po_number, parse_po_number,
};

use crate::clock::Clock;
use crate::error::{WorkflowError, WorkflowResult};
use crate::loa::utilization_of;
use crate::notify::{self, NotificationEnvelope};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePoInput {
    pub loa_id: LoaId,
    pub vendor_id: VendorId,
    pub value: Money,
    pub delivery_date: NaiveDate,
    pub items: Vec<PurchaseOrderItem>,
}

/// Stateless coordinator for purchase orders: creation against an active
/// LOA's remaining allocation, draft edits, and status transitions.
pub struct PurchasingService<SP, SL, B, C> {
    orders: SP,
    loas: SL,
    bus: B,
    clock: C,
}

impl<SP, SL, B, C> PurchasingService<SP, SL, B, C>
where
    SP: Store<PurchaseOrder>,
    SL: Store<Loa>,
    B: EventBus<NotificationEnvelope>,
    C: Clock,
{
    pub fn new(orders: SP, loas: SL, bus: B, clock: C) -> Self {
        Self {
            orders,
            loas,
            bus,
            clock,
        }
    }

    pub fn get(&self, po_id: PurchaseOrderId) -> WorkflowResult<PurchaseOrder> {
        self.orders.get(&po_id).ok_or(WorkflowError::NotFound)
    }

    /// Create a PO against an active LOA. The PO value must fit within the
    /// LOA's remaining allocation at this moment.
    pub fn create_po(&self, actor: &Actor, input: CreatePoInput) -> WorkflowResult<PurchaseOrder> {
        let loa = self.loas.get(&input.loa_id).ok_or(WorkflowError::NotFound)?;
        if loa.status() != LoaStatus::Active {
            return Err(DomainError::invalid_state(format!(
                "purchase orders can only be created against an active LOA (status: {})",
                loa.status().as_str()
            ))
            .into());
        }

        let utilization = utilization_of(&self.orders, &loa);
        check_allocation(utilization.remaining_amount, input.value, None)?;

        let po_id = PurchaseOrderId(AggregateId::new());
        let po_number = self.next_po_number();
        let mut order = PurchaseOrder::empty(po_id);
        self.dispatch(
            &mut order,
            &PurchaseOrderCommand::CreatePurchaseOrder(CreatePurchaseOrder {
                po_id,
                po_number: po_number.clone(),
                loa_id: input.loa_id,
                vendor_id: input.vendor_id,
                value: input.value,
                delivery_date: input.delivery_date,
                items: input.items,
                created_by: actor.user_id,
                occurred_at: self.clock.now(),
            }),
        )?;
        tracing::info!(po_id = ?po_id, po_number, "purchase order created");
        Ok(order)
    }

    /// Replace value, delivery date, and item list of a DRAFT order. The
    /// allocation check is re-run on the value delta only, so shrinking a
    /// draft is always allowed.
    pub fn update_draft(
        &self,
        actor: &Actor,
        po_id: PurchaseOrderId,
        value: Money,
        delivery_date: NaiveDate,
        items: Vec<PurchaseOrderItem>,
    ) -> WorkflowResult<PurchaseOrder> {
        let mut order = self.get(po_id)?;
        let loa_id = order.loa_id().ok_or(WorkflowError::NotFound)?;
        let loa = self.loas.get(&loa_id).ok_or(WorkflowError::NotFound)?;

        let utilization = utilization_of(&self.orders, &loa);
        check_allocation(utilization.remaining_amount, value, Some(order.value()))?;

        self.dispatch(
            &mut order,
            &PurchaseOrderCommand::UpdateDraft(UpdateDraft {
                po_id,
                value,
                delivery_date,
                items,
                updated_by: actor.user_id,
                occurred_at: self.clock.now(),
            }),
        )?;
        Ok(order)
    }

    pub fn update_status(
        &self,
        actor: &Actor,
        po_id: PurchaseOrderId,
        to: PurchaseOrderStatus,
        remarks: Option<String>,
    ) -> WorkflowResult<PurchaseOrder> {
        let mut order = self.get(po_id)?;
        self.dispatch(
            &mut order,
            &PurchaseOrderCommand::UpdateStatus(UpdatePoStatus {
                po_id,
                to,
                remarks,
                changed_by: actor.user_id,
                occurred_at: self.clock.now(),
            }),
        )?;
        tracing::info!(po_id = ?po_id, status = ?order.status(), "purchase order status changed");
        Ok(order)
    }

    /// Next number for the clock's current year: highest existing sequence
    /// for that year plus one. Cancelled orders keep their numbers.
    fn next_po_number(&self) -> String {
        let year = self.clock.now().year();
        let next_seq = self
            .orders
            .list()
            .iter()
            .filter_map(|po| parse_po_number(po.po_number()))
            .filter(|(y, _)| *y == year)
            .map(|(_, seq)| seq)
            .max()
            .unwrap_or(0)
            + 1;
        format_po_number(year, next_seq)
    }

    fn dispatch(
        &self,
        order: &mut PurchaseOrder,
        command: &PurchaseOrderCommand,
    ) -> WorkflowResult<()> {
        let expected = ExpectedVersion::Exact(order.version());
        let events = order.handle(command)?;
        for event in &events {
            order.apply(event);
        }
        self.orders.save(order.clone(), expected)?;
        for event in &events {
            notify::publish(
                &self.bus,
                order.id_typed().0,
                "purchase_order",
                order.version(),
                event.event_type(),
                json!({ "po_id": order.id_typed(), "status": order.status() }),
            );
        }
        Ok(())
    }
}
