//! Budgetary offer workflow service.

use chrono::NaiveDate;
use serde_json::json;

use tenderflow_auth::{Actor, Role};
use tenderflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ExpectedVersion, UserId};
use tenderflow_events::{Event, EventBus};
use tenderflow_offers::{
    BudgetaryOffer, CreateOffer, EmdDetails, OfferCommand, OfferId, ProcessApproval,
    ReplaceWorkItems, SubmitForApproval, WorkItem,
};

use crate::clock::Clock;
use crate::error::{WorkflowError, WorkflowResult};
use crate::notify::{self, NotificationEnvelope};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOfferInput {
    pub subject: String,
    pub offer_date: NaiveDate,
    pub to_authority: String,
    pub work_items: Vec<WorkItem>,
    pub emd: EmdDetails,
    pub terms: String,
    /// Ordered approver identities (level 1 first).
    pub approvers: Vec<UserId>,
}

/// Stateless coordinator for the offer lifecycle: draft authoring,
/// submission, and walking the approval chain.
pub struct OfferService<S, B, C> {
    offers: S,
    bus: B,
    clock: C,
}

impl<S, B, C> OfferService<S, B, C>
where
    S: Store<BudgetaryOffer>,
    B: EventBus<NotificationEnvelope>,
    C: Clock,
{
    pub fn new(offers: S, bus: B, clock: C) -> Self {
        Self { offers, bus, clock }
    }

    pub fn get(&self, offer_id: OfferId) -> WorkflowResult<BudgetaryOffer> {
        self.offers.get(&offer_id).ok_or(WorkflowError::NotFound)
    }

    pub fn create_offer(
        &self,
        actor: &Actor,
        input: CreateOfferInput,
    ) -> WorkflowResult<BudgetaryOffer> {
        let offer_id = OfferId(AggregateId::new());
        let mut offer = BudgetaryOffer::empty(offer_id);
        self.dispatch(
            &mut offer,
            &OfferCommand::CreateOffer(CreateOffer {
                offer_id,
                subject: input.subject,
                offer_date: input.offer_date,
                to_authority: input.to_authority,
                work_items: input.work_items,
                emd: input.emd,
                terms: input.terms,
                approvers: input.approvers,
                created_by: actor.user_id,
                occurred_at: self.clock.now(),
            }),
        )?;
        tracing::info!(offer_id = ?offer_id, "budgetary offer created");
        Ok(offer)
    }

    /// Full-list replace of the work items (and EMD declaration), DRAFT only.
    pub fn replace_work_items(
        &self,
        actor: &Actor,
        offer_id: OfferId,
        work_items: Vec<WorkItem>,
        emd: EmdDetails,
    ) -> WorkflowResult<BudgetaryOffer> {
        let mut offer = self.get(offer_id)?;
        ensure_author_or_manager(&offer, actor)?;
        self.dispatch(
            &mut offer,
            &OfferCommand::ReplaceWorkItems(ReplaceWorkItems {
                offer_id,
                work_items,
                emd,
                occurred_at: self.clock.now(),
            }),
        )?;
        Ok(offer)
    }

    pub fn submit_for_approval(
        &self,
        actor: &Actor,
        offer_id: OfferId,
    ) -> WorkflowResult<BudgetaryOffer> {
        let mut offer = self.get(offer_id)?;
        ensure_author_or_manager(&offer, actor)?;
        self.dispatch(
            &mut offer,
            &OfferCommand::SubmitForApproval(SubmitForApproval {
                offer_id,
                submitted_by: actor.user_id,
                occurred_at: self.clock.now(),
            }),
        )?;
        tracing::info!(offer_id = ?offer_id, "offer submitted for approval");
        Ok(offer)
    }

    /// Approve or reject the currently pending level. The aggregate enforces
    /// that only the pending level's approver may act.
    pub fn process_approval(
        &self,
        actor: &Actor,
        offer_id: OfferId,
        approve: bool,
        remarks: Option<String>,
    ) -> WorkflowResult<BudgetaryOffer> {
        let mut offer = self.get(offer_id)?;
        self.dispatch(
            &mut offer,
            &OfferCommand::ProcessApproval(ProcessApproval {
                offer_id,
                acting_user: actor.user_id,
                approve,
                remarks,
                occurred_at: self.clock.now(),
            }),
        )?;
        tracing::info!(offer_id = ?offer_id, approve, status = ?offer.status(), "approval processed");
        Ok(offer)
    }

    fn dispatch(&self, offer: &mut BudgetaryOffer, command: &OfferCommand) -> WorkflowResult<()> {
        let expected = ExpectedVersion::Exact(offer.version());
        let events = offer.handle(command)?;
        for event in &events {
            offer.apply(event);
        }
        self.offers.save(offer.clone(), expected)?;
        for event in &events {
            notify::publish(
                &self.bus,
                offer.id_typed().0,
                "budgetary_offer",
                offer.version(),
                event.event_type(),
                json!({ "offer_id": offer.id_typed(), "status": offer.status() }),
            );
        }
        Ok(())
    }
}

fn ensure_author_or_manager(offer: &BudgetaryOffer, actor: &Actor) -> WorkflowResult<()> {
    let is_author = offer.created_by() == Some(actor.user_id);
    if is_author || actor.has_role(&Role::procurement_manager()) {
        Ok(())
    } else {
        Err(DomainError::forbidden("only the offer author or a procurement manager may act on this offer").into())
    }
}
