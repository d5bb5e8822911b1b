use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tenderflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Money, UserId};
use tenderflow_events::Event;
use tenderflow_offers::OfferId;

/// EMD tracking identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmdId(pub AggregateId);

impl EmdId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for EmdId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// EMD status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmdStatus {
    Pending,
    Submitted,
    Returned,
    Forfeited,
}

impl EmdStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmdStatus::Pending => "pending",
            EmdStatus::Submitted => "submitted",
            EmdStatus::Returned => "returned",
            EmdStatus::Forfeited => "forfeited",
        }
    }
}

/// Fixed transition table; deposits only ever move forward.
pub fn allowed_transitions(from: EmdStatus) -> &'static [EmdStatus] {
    match from {
        EmdStatus::Pending => &[EmdStatus::Submitted],
        EmdStatus::Submitted => &[EmdStatus::Returned, EmdStatus::Forfeited],
        EmdStatus::Returned | EmdStatus::Forfeited => &[],
    }
}

/// Aggregate root: EmdTracking. At most one per offer (enforced by the
/// services layer, which owns the cross-aggregate uniqueness check).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmdTracking {
    id: EmdId,
    offer_id: Option<OfferId>,
    amount: Money,
    due_date: Option<NaiveDate>,
    return_date: Option<DateTime<Utc>>,
    status: EmdStatus,
    document_key: Option<String>,
    version: u64,
    created: bool,
}

impl EmdTracking {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: EmdId) -> Self {
        Self {
            id,
            offer_id: None,
            amount: Money::ZERO,
            due_date: None,
            return_date: None,
            status: EmdStatus::Pending,
            document_key: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> EmdId {
        self.id
    }

    pub fn offer_id(&self) -> Option<OfferId> {
        self.offer_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn return_date(&self) -> Option<DateTime<Utc>> {
        self.return_date
    }

    pub fn status(&self) -> EmdStatus {
        self.status
    }

    pub fn document_key(&self) -> Option<&str> {
        self.document_key.as_deref()
    }
}

impl AggregateRoot for EmdTracking {
    type Id = EmdId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenTracking (one per offer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenTracking {
    pub emd_id: EmdId,
    pub offer_id: OfferId,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub opened_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateEmdStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEmdStatus {
    pub emd_id: EmdId,
    pub to: EmdStatus,
    pub changed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AttachDocument (opaque storage key; bytes live elsewhere).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachDocument {
    pub emd_id: EmdId,
    pub document_key: String,
    pub attached_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmdCommand {
    OpenTracking(OpenTracking),
    UpdateStatus(UpdateEmdStatus),
    AttachDocument(AttachDocument),
}

/// Event: TrackingOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingOpened {
    pub emd_id: EmdId,
    pub offer_id: OfferId,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub opened_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: EmdStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmdStatusChanged {
    pub emd_id: EmdId,
    pub from: EmdStatus,
    pub to: EmdStatus,
    pub changed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DocumentAttached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAttached {
    pub emd_id: EmdId,
    pub document_key: String,
    pub attached_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmdEvent {
    TrackingOpened(TrackingOpened),
    StatusChanged(EmdStatusChanged),
    DocumentAttached(DocumentAttached),
}

impl Event for EmdEvent {
    fn event_type(&self) -> &'static str {
        match self {
            EmdEvent::TrackingOpened(_) => "emd.tracking_opened",
            EmdEvent::StatusChanged(_) => "emd.status_changed",
            EmdEvent::DocumentAttached(_) => "emd.document_attached",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            EmdEvent::TrackingOpened(e) => e.occurred_at,
            EmdEvent::StatusChanged(e) => e.occurred_at,
            EmdEvent::DocumentAttached(e) => e.occurred_at,
        }
    }
}

impl Aggregate for EmdTracking {
    type Command = EmdCommand;
    type Event = EmdEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            EmdEvent::TrackingOpened(e) => {
                self.id = e.emd_id;
                self.offer_id = Some(e.offer_id);
                self.amount = e.amount;
                self.due_date = Some(e.due_date);
                self.return_date = None;
                self.status = EmdStatus::Pending;
                self.document_key = None;
                self.created = true;
            }
            EmdEvent::StatusChanged(e) => {
                self.status = e.to;
                if e.to == EmdStatus::Returned {
                    self.return_date = Some(e.occurred_at);
                }
            }
            EmdEvent::DocumentAttached(e) => {
                self.document_key = Some(e.document_key.clone());
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            EmdCommand::OpenTracking(cmd) => self.handle_open(cmd),
            EmdCommand::UpdateStatus(cmd) => self.handle_update_status(cmd),
            EmdCommand::AttachDocument(cmd) => self.handle_attach_document(cmd),
        }
    }
}

impl EmdTracking {
    fn ensure_emd_id(&self, emd_id: EmdId) -> Result<(), DomainError> {
        if self.id != emd_id {
            return Err(DomainError::validation("emd_id mismatch"));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenTracking) -> Result<Vec<EmdEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("EMD tracking already exists"));
        }
        if cmd.amount <= Money::ZERO {
            return Err(DomainError::validation(format!(
                "EMD amount must be positive, got {}",
                cmd.amount
            )));
        }

        Ok(vec![EmdEvent::TrackingOpened(TrackingOpened {
            emd_id: cmd.emd_id,
            offer_id: cmd.offer_id,
            amount: cmd.amount,
            due_date: cmd.due_date,
            opened_by: cmd.opened_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_status(&self, cmd: &UpdateEmdStatus) -> Result<Vec<EmdEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_emd_id(cmd.emd_id)?;

        let allowed = allowed_transitions(self.status);
        if !allowed.contains(&cmd.to) {
            return Err(DomainError::invalid_transition(
                self.status.as_str(),
                cmd.to.as_str(),
                allowed.iter().map(|s| s.as_str()),
            ));
        }

        Ok(vec![EmdEvent::StatusChanged(EmdStatusChanged {
            emd_id: cmd.emd_id,
            from: self.status,
            to: cmd.to,
            changed_by: cmd.changed_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_attach_document(&self, cmd: &AttachDocument) -> Result<Vec<EmdEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_emd_id(cmd.emd_id)?;

        if cmd.document_key.trim().is_empty() {
            return Err(DomainError::validation("document key is required"));
        }

        Ok(vec![EmdEvent::DocumentAttached(DocumentAttached {
            emd_id: cmd.emd_id,
            document_key: cmd.document_key.clone(),
            attached_by: cmd.attached_by,
            occurred_at: cmd.occurred_at,
        })])
    }
}
