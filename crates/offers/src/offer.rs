use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tenderflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Money, UserId};
use tenderflow_events::Event;

use crate::approval::{ApprovalLevel, ApprovalStatus, RejectionRecord};
use crate::work_item::{EmdDetails, WorkItem, offer_value, validate_emd_details};

/// Budgetary offer identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferId(pub AggregateId);

impl OfferId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OfferId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Budgetary offer status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Draft,
    PendingApproval,
    Approved,
}

/// Aggregate root: BudgetaryOffer.
///
/// Invariant: `current_level` is defined iff status is `PendingApproval`, and
/// then points (1-based) at the single level awaiting action. Levels before it
/// are approved; levels after it are untouched pending placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetaryOffer {
    id: OfferId,
    subject: String,
    offer_date: Option<NaiveDate>,
    to_authority: String,
    work_items: Vec<WorkItem>,
    emd: Option<EmdDetails>,
    terms: String,
    status: OfferStatus,
    approval_levels: Vec<ApprovalLevel>,
    current_level: Option<u32>,
    rejection_history: Vec<RejectionRecord>,
    created_by: Option<UserId>,
    version: u64,
    created: bool,
}

impl BudgetaryOffer {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: OfferId) -> Self {
        Self {
            id,
            subject: String::new(),
            offer_date: None,
            to_authority: String::new(),
            work_items: Vec::new(),
            emd: None,
            terms: String::new(),
            status: OfferStatus::Draft,
            approval_levels: Vec::new(),
            current_level: None,
            rejection_history: Vec::new(),
            created_by: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OfferId {
        self.id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn offer_date(&self) -> Option<NaiveDate> {
        self.offer_date
    }

    pub fn to_authority(&self) -> &str {
        &self.to_authority
    }

    pub fn status(&self) -> OfferStatus {
        self.status
    }

    pub fn work_items(&self) -> &[WorkItem] {
        &self.work_items
    }

    pub fn emd(&self) -> Option<&EmdDetails> {
        self.emd.as_ref()
    }

    pub fn terms(&self) -> &str {
        &self.terms
    }

    pub fn approval_levels(&self) -> &[ApprovalLevel] {
        &self.approval_levels
    }

    /// 1-based index of the level awaiting action, defined only while
    /// `PendingApproval`.
    pub fn current_level(&self) -> Option<u32> {
        self.current_level
    }

    pub fn rejection_history(&self) -> &[RejectionRecord] {
        &self.rejection_history
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    /// Aggregate offer value: sum of work-item totals.
    pub fn value(&self) -> Money {
        offer_value(&self.work_items)
    }

    /// The approver whose action the offer is waiting on, if any.
    pub fn awaiting_approver(&self) -> Option<UserId> {
        let idx = self.current_level? as usize - 1;
        self.approval_levels.get(idx).map(|l| l.approver)
    }
}

impl AggregateRoot for BudgetaryOffer {
    type Id = OfferId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateOffer (chain construction happens here).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOffer {
    pub offer_id: OfferId,
    pub subject: String,
    pub offer_date: NaiveDate,
    pub to_authority: String,
    pub work_items: Vec<WorkItem>,
    pub emd: EmdDetails,
    pub terms: String,
    /// Ordered approver identities; defines the approval sequence.
    pub approvers: Vec<UserId>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReplaceWorkItems (full-list replace, DRAFT only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceWorkItems {
    pub offer_id: OfferId,
    pub work_items: Vec<WorkItem>,
    pub emd: EmdDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SubmitForApproval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitForApproval {
    pub offer_id: OfferId,
    pub submitted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ProcessApproval (approve or reject the pending level).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessApproval {
    pub offer_id: OfferId,
    pub acting_user: UserId,
    pub approve: bool,
    pub remarks: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferCommand {
    CreateOffer(CreateOffer),
    ReplaceWorkItems(ReplaceWorkItems),
    SubmitForApproval(SubmitForApproval),
    ProcessApproval(ProcessApproval),
}

/// Event: OfferCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferCreated {
    pub offer_id: OfferId,
    pub subject: String,
    pub offer_date: NaiveDate,
    pub to_authority: String,
    pub work_items: Vec<WorkItem>,
    pub emd: EmdDetails,
    pub terms: String,
    pub approvers: Vec<UserId>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WorkItemsReplaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemsReplaced {
    pub offer_id: OfferId,
    pub work_items: Vec<WorkItem>,
    pub emd: EmdDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OfferSubmitted (restarts the chain at level 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferSubmitted {
    pub offer_id: OfferId,
    pub submitted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ApprovalGranted at one level of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalGranted {
    pub offer_id: OfferId,
    /// 1-based level that was approved.
    pub level: u32,
    pub approver: UserId,
    pub remarks: Option<String>,
    /// True when this was the last level — the offer becomes APPROVED.
    pub final_level: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OfferRejected (full chain reset back to draft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRejected {
    pub offer_id: OfferId,
    /// 1-based level at which the rejection happened.
    pub level: u32,
    pub rejected_by: UserId,
    pub remarks: String,
    pub prior_status: OfferStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferEvent {
    OfferCreated(OfferCreated),
    WorkItemsReplaced(WorkItemsReplaced),
    OfferSubmitted(OfferSubmitted),
    ApprovalGranted(ApprovalGranted),
    OfferRejected(OfferRejected),
}

impl Event for OfferEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OfferEvent::OfferCreated(_) => "offer.created",
            OfferEvent::WorkItemsReplaced(_) => "offer.work_items_replaced",
            OfferEvent::OfferSubmitted(_) => "offer.submitted",
            OfferEvent::ApprovalGranted(_) => "offer.approval_granted",
            OfferEvent::OfferRejected(_) => "offer.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OfferEvent::OfferCreated(e) => e.occurred_at,
            OfferEvent::WorkItemsReplaced(e) => e.occurred_at,
            OfferEvent::OfferSubmitted(e) => e.occurred_at,
            OfferEvent::ApprovalGranted(e) => e.occurred_at,
            OfferEvent::OfferRejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for BudgetaryOffer {
    type Command = OfferCommand;
    type Event = OfferEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OfferEvent::OfferCreated(e) => {
                self.id = e.offer_id;
                self.subject = e.subject.clone();
                self.offer_date = Some(e.offer_date);
                self.to_authority = e.to_authority.clone();
                self.work_items = e.work_items.clone();
                self.emd = Some(e.emd.clone());
                self.terms = e.terms.clone();
                self.status = OfferStatus::Draft;
                self.approval_levels = e
                    .approvers
                    .iter()
                    .enumerate()
                    .map(|(i, approver)| ApprovalLevel::pending(i as u32 + 1, *approver))
                    .collect();
                self.current_level = None;
                self.rejection_history.clear();
                self.created_by = Some(e.created_by);
                self.created = true;
            }
            OfferEvent::WorkItemsReplaced(e) => {
                self.work_items = e.work_items.clone();
                self.emd = Some(e.emd.clone());
            }
            OfferEvent::OfferSubmitted(e) => {
                // Restart the chain: every level back to a pending placeholder,
                // level 1 stamped as the one awaiting action.
                for level in &mut self.approval_levels {
                    level.status = ApprovalStatus::Pending;
                    level.remarks = None;
                    level.updated_at = None;
                }
                if let Some(first) = self.approval_levels.first_mut() {
                    first.updated_at = Some(e.occurred_at);
                }
                self.status = OfferStatus::PendingApproval;
                self.current_level = Some(1);
            }
            OfferEvent::ApprovalGranted(e) => {
                let idx = e.level as usize - 1;
                if let Some(level) = self.approval_levels.get_mut(idx) {
                    level.status = ApprovalStatus::Approved;
                    level.remarks = e.remarks.clone();
                    level.updated_at = Some(e.occurred_at);
                }
                if e.final_level {
                    self.status = OfferStatus::Approved;
                    self.current_level = None;
                } else {
                    self.current_level = Some(e.level + 1);
                }
            }
            OfferEvent::OfferRejected(e) => {
                let idx = e.level as usize - 1;
                // Full chain reset: every level at or below the rejecting one
                // goes to REJECTED; later levels stay pending placeholders.
                for level in self.approval_levels.iter_mut().take(idx) {
                    level.status = ApprovalStatus::Rejected;
                }
                if let Some(level) = self.approval_levels.get_mut(idx) {
                    level.status = ApprovalStatus::Rejected;
                    level.remarks = Some(e.remarks.clone());
                    level.updated_at = Some(e.occurred_at);
                }
                self.status = OfferStatus::Draft;
                self.current_level = None;
                self.rejection_history.push(RejectionRecord {
                    level: e.level,
                    rejected_by: e.rejected_by,
                    rejected_at: e.occurred_at,
                    remarks: e.remarks.clone(),
                    prior_status: e.prior_status,
                });
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OfferCommand::CreateOffer(cmd) => self.handle_create(cmd),
            OfferCommand::ReplaceWorkItems(cmd) => self.handle_replace_work_items(cmd),
            OfferCommand::SubmitForApproval(cmd) => self.handle_submit(cmd),
            OfferCommand::ProcessApproval(cmd) => self.handle_process_approval(cmd),
        }
    }
}

impl BudgetaryOffer {
    fn ensure_offer_id(&self, offer_id: OfferId) -> Result<(), DomainError> {
        if self.id != offer_id {
            return Err(DomainError::validation("offer_id mismatch"));
        }
        Ok(())
    }

    fn validate_work_items(items: &[WorkItem], emd: &EmdDetails) -> Result<(), DomainError> {
        if items.is_empty() {
            return Err(DomainError::validation(
                "an offer must carry at least one work item",
            ));
        }
        for item in items {
            item.validate()?;
        }
        validate_emd_details(emd, offer_value(items))
    }

    fn handle_create(&self, cmd: &CreateOffer) -> Result<Vec<OfferEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("offer already exists"));
        }
        if cmd.subject.trim().is_empty() {
            return Err(DomainError::validation("offer subject is required"));
        }
        Self::validate_work_items(&cmd.work_items, &cmd.emd)?;

        if cmd.approvers.is_empty() {
            return Err(DomainError::validation(
                "an approval chain needs at least one approver",
            ));
        }
        let mut seen = HashSet::new();
        for approver in &cmd.approvers {
            if !seen.insert(*approver) {
                return Err(DomainError::validation(format!(
                    "duplicate approver in chain: {approver}"
                )));
            }
        }

        Ok(vec![OfferEvent::OfferCreated(OfferCreated {
            offer_id: cmd.offer_id,
            subject: cmd.subject.clone(),
            offer_date: cmd.offer_date,
            to_authority: cmd.to_authority.clone(),
            work_items: cmd.work_items.clone(),
            emd: cmd.emd.clone(),
            terms: cmd.terms.clone(),
            approvers: cmd.approvers.clone(),
            created_by: cmd.created_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_replace_work_items(
        &self,
        cmd: &ReplaceWorkItems,
    ) -> Result<Vec<OfferEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_offer_id(cmd.offer_id)?;

        if self.status != OfferStatus::Draft {
            return Err(DomainError::invalid_state(
                "offer can only be edited while draft",
            ));
        }
        Self::validate_work_items(&cmd.work_items, &cmd.emd)?;

        Ok(vec![OfferEvent::WorkItemsReplaced(WorkItemsReplaced {
            offer_id: cmd.offer_id,
            work_items: cmd.work_items.clone(),
            emd: cmd.emd.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit(&self, cmd: &SubmitForApproval) -> Result<Vec<OfferEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_offer_id(cmd.offer_id)?;

        if self.status != OfferStatus::Draft {
            return Err(DomainError::invalid_state(
                "only draft offers can be submitted for approval",
            ));
        }

        Ok(vec![OfferEvent::OfferSubmitted(OfferSubmitted {
            offer_id: cmd.offer_id,
            submitted_by: cmd.submitted_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_process_approval(
        &self,
        cmd: &ProcessApproval,
    ) -> Result<Vec<OfferEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_offer_id(cmd.offer_id)?;

        if self.status != OfferStatus::PendingApproval {
            return Err(DomainError::invalid_state(
                "offer is not awaiting approval",
            ));
        }
        let current = self
            .current_level
            .ok_or_else(|| DomainError::invalid_state("offer has no pending approval level"))?;
        let idx = current as usize - 1;
        let level = self
            .approval_levels
            .get(idx)
            .ok_or_else(|| DomainError::invalid_state("pending approval level out of range"))?;

        if level.approver != cmd.acting_user {
            return Err(DomainError::forbidden(format!(
                "user is not the pending approver for level {current}"
            )));
        }

        if cmd.approve {
            Ok(vec![OfferEvent::ApprovalGranted(ApprovalGranted {
                offer_id: cmd.offer_id,
                level: current,
                approver: cmd.acting_user,
                remarks: cmd.remarks.clone(),
                final_level: idx + 1 == self.approval_levels.len(),
                occurred_at: cmd.occurred_at,
            })])
        } else {
            let remarks = cmd
                .remarks
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or_else(|| DomainError::validation("rejection remarks are required"))?;

            Ok(vec![OfferEvent::OfferRejected(OfferRejected {
                offer_id: cmd.offer_id,
                level: current,
                rejected_by: cmd.acting_user,
                remarks: remarks.to_string(),
                prior_status: self.status,
                occurred_at: cmd.occurred_at,
            })])
        }
    }
}
