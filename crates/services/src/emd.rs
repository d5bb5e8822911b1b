//! EMD (earnest money deposit) tracking service.

use chrono::NaiveDate;
use serde_json::json;

use tenderflow_auth::Actor;
use tenderflow_core::{Aggregate, AggregateId, AggregateRoot, ExpectedVersion, Money};
use tenderflow_emd::{
    AttachDocument, EmdCommand, EmdId, EmdStatus, EmdTracking, OpenTracking, UpdateEmdStatus,
};
use tenderflow_events::{Event, EventBus};
use tenderflow_offers::{BudgetaryOffer, EmdDetails, OfferId, validate_emd_details};

use crate::clock::Clock;
use crate::error::{WorkflowError, WorkflowResult};
use crate::notify::{self, NotificationEnvelope};
use crate::store::Store;

/// Stateless coordinator for EMD deposits tied to offers.
pub struct EmdService<SE, SO, B, C> {
    emds: SE,
    offers: SO,
    bus: B,
    clock: C,
}

impl<SE, SO, B, C> EmdService<SE, SO, B, C>
where
    SE: Store<EmdTracking>,
    SO: Store<BudgetaryOffer>,
    B: EventBus<NotificationEnvelope>,
    C: Clock,
{
    pub fn new(emds: SE, offers: SO, bus: B, clock: C) -> Self {
        Self {
            emds,
            offers,
            bus,
            clock,
        }
    }

    pub fn get(&self, emd_id: EmdId) -> WorkflowResult<EmdTracking> {
        self.emds.get(&emd_id).ok_or(WorkflowError::NotFound)
    }

    /// Open a deposit record for an offer. At most one per offer, and the
    /// amount is capped at 5% of the offer's current value.
    pub fn submit_emd(
        &self,
        actor: &Actor,
        offer_id: OfferId,
        amount: Money,
        due_date: NaiveDate,
    ) -> WorkflowResult<EmdTracking> {
        let offer = self.offers.get(&offer_id).ok_or(WorkflowError::NotFound)?;
        if self
            .emds
            .list()
            .iter()
            .any(|e| e.offer_id() == Some(offer_id))
        {
            return Err(WorkflowError::Duplicate(
                "an EMD is already tracked for this offer".to_string(),
            ));
        }
        validate_emd_details(&EmdDetails { amount, due_date }, offer.value())?;

        let emd_id = EmdId(AggregateId::new());
        let mut emd = EmdTracking::empty(emd_id);
        self.dispatch(
            &mut emd,
            &EmdCommand::OpenTracking(OpenTracking {
                emd_id,
                offer_id,
                amount,
                due_date,
                opened_by: actor.user_id,
                occurred_at: self.clock.now(),
            }),
        )?;
        tracing::info!(emd_id = ?emd_id, offer_id = ?offer_id, "EMD tracking opened");
        Ok(emd)
    }

    pub fn update_status(
        &self,
        actor: &Actor,
        emd_id: EmdId,
        to: EmdStatus,
    ) -> WorkflowResult<EmdTracking> {
        let mut emd = self.get(emd_id)?;
        self.dispatch(
            &mut emd,
            &EmdCommand::UpdateStatus(UpdateEmdStatus {
                emd_id,
                to,
                changed_by: actor.user_id,
                occurred_at: self.clock.now(),
            }),
        )?;
        tracing::info!(emd_id = ?emd_id, status = ?emd.status(), "EMD status changed");
        Ok(emd)
    }

    /// Record the storage key of an uploaded receipt/instrument.
    pub fn attach_document(
        &self,
        actor: &Actor,
        emd_id: EmdId,
        document_key: String,
    ) -> WorkflowResult<EmdTracking> {
        let mut emd = self.get(emd_id)?;
        self.dispatch(
            &mut emd,
            &EmdCommand::AttachDocument(AttachDocument {
                emd_id,
                document_key,
                attached_by: actor.user_id,
                occurred_at: self.clock.now(),
            }),
        )?;
        Ok(emd)
    }

    fn dispatch(&self, emd: &mut EmdTracking, command: &EmdCommand) -> WorkflowResult<()> {
        let expected = ExpectedVersion::Exact(emd.version());
        let events = emd.handle(command)?;
        for event in &events {
            emd.apply(event);
        }
        self.emds.save(emd.clone(), expected)?;
        for event in &events {
            notify::publish(
                &self.bus,
                emd.id_typed().0,
                "emd_tracking",
                emd.version(),
                event.event_type(),
                json!({ "emd_id": emd.id_typed(), "status": emd.status() }),
            );
        }
        Ok(())
    }
}
