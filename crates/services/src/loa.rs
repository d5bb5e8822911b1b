//! LOA (Letter of Acceptance) workflow service.

use chrono::NaiveDate;
use serde_json::json;

use tenderflow_auth::{Actor, Role, require_role};
use tenderflow_core::{Aggregate, AggregateId, AggregateRoot, ExpectedVersion, Money};
use tenderflow_events::{Event, EventBus};
use tenderflow_loa::{
    Amendment, AmendmentId, ApproveAmendment, Loa, LoaCommand, LoaId, LoaStatus, LoaUtilization,
    RecordAmendment, RecordLoa, UpdateLoaStatus,
};
use tenderflow_offers::OfferId;
use tenderflow_purchasing::PurchaseOrder;

use crate::clock::Clock;
use crate::error::{WorkflowError, WorkflowResult};
use crate::notify::{self, NotificationEnvelope};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLoaInput {
    pub loa_no: String,
    pub offer_id: OfferId,
    pub value: Money,
    pub scope: String,
    pub document_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordAmendmentInput {
    pub additional_value: Money,
    pub reason: String,
    pub effective_date: NaiveDate,
}

/// Current utilization of an LOA: committed (non-cancelled) purchase-order
/// values against the LOA's total (base + approved amendments).
pub fn utilization_of<S>(orders: &S, loa: &Loa) -> LoaUtilization
where
    S: Store<PurchaseOrder>,
{
    let committed = orders
        .list()
        .into_iter()
        .filter(|po| po.loa_id() == Some(loa.id_typed()) && po.is_committed())
        .map(|po| po.value());
    LoaUtilization::compute(loa.total_value(), committed)
}

/// Stateless coordinator for LOA recording, amendments, and lifecycle.
pub struct LoaService<SL, SP, B, C> {
    loas: SL,
    orders: SP,
    bus: B,
    clock: C,
}

impl<SL, SP, B, C> LoaService<SL, SP, B, C>
where
    SL: Store<Loa>,
    SP: Store<PurchaseOrder>,
    B: EventBus<NotificationEnvelope>,
    C: Clock,
{
    pub fn new(loas: SL, orders: SP, bus: B, clock: C) -> Self {
        Self {
            loas,
            orders,
            bus,
            clock,
        }
    }

    pub fn get(&self, loa_id: LoaId) -> WorkflowResult<Loa> {
        self.loas.get(&loa_id).ok_or(WorkflowError::NotFound)
    }

    /// Record an LOA received against an approved offer. LOA numbers are
    /// unique across the system.
    pub fn record_loa(&self, actor: &Actor, input: RecordLoaInput) -> WorkflowResult<Loa> {
        if self.loas.list().iter().any(|l| l.loa_no() == input.loa_no) {
            return Err(WorkflowError::Duplicate(format!(
                "LOA number '{}' is already recorded",
                input.loa_no
            )));
        }

        let loa_id = LoaId(AggregateId::new());
        let mut loa = Loa::empty(loa_id);
        self.dispatch(
            &mut loa,
            &LoaCommand::RecordLoa(RecordLoa {
                loa_id,
                loa_no: input.loa_no,
                offer_id: input.offer_id,
                value: input.value,
                scope: input.scope,
                document_key: input.document_key,
                recorded_by: actor.user_id,
                occurred_at: self.clock.now(),
            }),
        )?;
        tracing::info!(loa_id = ?loa_id, loa_no = loa.loa_no(), "LOA recorded");
        Ok(loa)
    }

    /// Record a value amendment. It stays PENDING (excluded from the total)
    /// until approved.
    pub fn record_amendment(
        &self,
        actor: &Actor,
        loa_id: LoaId,
        input: RecordAmendmentInput,
    ) -> WorkflowResult<Amendment> {
        let mut loa = self.get(loa_id)?;
        let amendment_id = AmendmentId(AggregateId::new());
        self.dispatch(
            &mut loa,
            &LoaCommand::RecordAmendment(RecordAmendment {
                loa_id,
                amendment_id,
                additional_value: input.additional_value,
                reason: input.reason,
                effective_date: input.effective_date,
                recorded_by: actor.user_id,
                occurred_at: self.clock.now(),
            }),
        )?;
        loa.amendment(amendment_id)
            .cloned()
            .ok_or(WorkflowError::NotFound)
    }

    /// Approve a pending amendment, folding its value into the LOA total.
    /// Requires the `admin` role.
    pub fn approve_amendment(
        &self,
        actor: &Actor,
        amendment_id: AmendmentId,
    ) -> WorkflowResult<Amendment> {
        require_role(actor, &Role::admin())?;

        let mut loa = self
            .loas
            .list()
            .into_iter()
            .find(|l| l.amendment(amendment_id).is_some())
            .ok_or(WorkflowError::NotFound)?;
        let loa_id = loa.id_typed();
        self.dispatch(
            &mut loa,
            &LoaCommand::ApproveAmendment(ApproveAmendment {
                loa_id,
                amendment_id,
                approved_by: actor.user_id,
                occurred_at: self.clock.now(),
            }),
        )?;
        tracing::info!(loa_id = ?loa_id, amendment_id = ?amendment_id, "amendment approved");
        loa.amendment(amendment_id)
            .cloned()
            .ok_or(WorkflowError::NotFound)
    }

    pub fn update_status(
        &self,
        actor: &Actor,
        loa_id: LoaId,
        to: LoaStatus,
    ) -> WorkflowResult<Loa> {
        let mut loa = self.get(loa_id)?;
        self.dispatch(
            &mut loa,
            &LoaCommand::UpdateStatus(UpdateLoaStatus {
                loa_id,
                to,
                changed_by: actor.user_id,
                occurred_at: self.clock.now(),
            }),
        )?;
        Ok(loa)
    }

    pub fn get_utilization(&self, loa_id: LoaId) -> WorkflowResult<LoaUtilization> {
        let loa = self.get(loa_id)?;
        Ok(utilization_of(&self.orders, &loa))
    }

    fn dispatch(&self, loa: &mut Loa, command: &LoaCommand) -> WorkflowResult<()> {
        let expected = ExpectedVersion::Exact(loa.version());
        let events = loa.handle(command)?;
        for event in &events {
            loa.apply(event);
        }
        self.loas.save(loa.clone(), expected)?;
        for event in &events {
            notify::publish(
                &self.bus,
                loa.id_typed().0,
                "loa",
                loa.version(),
                event.event_type(),
                json!({ "loa_id": loa.id_typed(), "status": loa.status() }),
            );
        }
        Ok(())
    }
}
