use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tenderflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Money, UserId};
use tenderflow_events::Event;
use tenderflow_offers::OfferId;

use crate::amendment::{Amendment, AmendmentId, AmendmentStatus};

/// LOA identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoaId(pub AggregateId);

impl LoaId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for LoaId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// LOA status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaStatus {
    Active,
    Completed,
    Cancelled,
}

impl LoaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoaStatus::Active => "active",
            LoaStatus::Completed => "completed",
            LoaStatus::Cancelled => "cancelled",
        }
    }
}

/// Fixed transition table for LOA status changes.
pub fn allowed_transitions(from: LoaStatus) -> &'static [LoaStatus] {
    match from {
        LoaStatus::Active => &[LoaStatus::Completed, LoaStatus::Cancelled],
        LoaStatus::Completed | LoaStatus::Cancelled => &[],
    }
}

/// Aggregate root: Loa (letter of award).
///
/// The base `value` is immutable after creation; only approved amendments
/// change the effective total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loa {
    id: LoaId,
    loa_no: String,
    offer_id: Option<OfferId>,
    value: Money,
    scope: String,
    status: LoaStatus,
    amendments: Vec<Amendment>,
    document_key: Option<String>,
    recorded_by: Option<UserId>,
    version: u64,
    created: bool,
}

impl Loa {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: LoaId) -> Self {
        Self {
            id,
            loa_no: String::new(),
            offer_id: None,
            value: Money::ZERO,
            scope: String::new(),
            status: LoaStatus::Active,
            amendments: Vec::new(),
            document_key: None,
            recorded_by: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> LoaId {
        self.id
    }

    pub fn loa_no(&self) -> &str {
        &self.loa_no
    }

    pub fn offer_id(&self) -> Option<OfferId> {
        self.offer_id
    }

    pub fn value(&self) -> Money {
        self.value
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn status(&self) -> LoaStatus {
        self.status
    }

    pub fn amendments(&self) -> &[Amendment] {
        &self.amendments
    }

    pub fn document_key(&self) -> Option<&str> {
        self.document_key.as_deref()
    }

    pub fn amendment(&self, id: AmendmentId) -> Option<&Amendment> {
        self.amendments.iter().find(|a| a.id == id)
    }

    /// Base value plus the sum of approved amendments.
    pub fn total_value(&self) -> Money {
        self.value
            + self
                .amendments
                .iter()
                .filter(|a| a.is_approved())
                .map(|a| a.additional_value)
                .sum()
    }

    fn next_amendment_no(&self) -> u32 {
        self.amendments
            .iter()
            .map(|a| a.amendment_no)
            .max()
            .unwrap_or(0)
            + 1
    }
}

impl AggregateRoot for Loa {
    type Id = LoaId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordLoa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLoa {
    pub loa_id: LoaId,
    pub loa_no: String,
    pub offer_id: OfferId,
    pub value: Money,
    pub scope: String,
    pub document_key: Option<String>,
    pub recorded_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordAmendment (PENDING until approved).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordAmendment {
    pub loa_id: LoaId,
    pub amendment_id: AmendmentId,
    pub additional_value: Money,
    pub reason: String,
    pub effective_date: NaiveDate,
    pub recorded_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveAmendment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveAmendment {
    pub loa_id: LoaId,
    pub amendment_id: AmendmentId,
    pub approved_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateLoaStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLoaStatus {
    pub loa_id: LoaId,
    pub to: LoaStatus,
    pub changed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoaCommand {
    RecordLoa(RecordLoa),
    RecordAmendment(RecordAmendment),
    ApproveAmendment(ApproveAmendment),
    UpdateStatus(UpdateLoaStatus),
}

/// Event: LoaRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaRecorded {
    pub loa_id: LoaId,
    pub loa_no: String,
    pub offer_id: OfferId,
    pub value: Money,
    pub scope: String,
    pub document_key: Option<String>,
    pub recorded_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AmendmentRecorded (carries the assigned sequence number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendmentRecorded {
    pub loa_id: LoaId,
    pub amendment_id: AmendmentId,
    pub amendment_no: u32,
    pub additional_value: Money,
    pub reason: String,
    pub effective_date: NaiveDate,
    pub recorded_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AmendmentApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendmentApproved {
    pub loa_id: LoaId,
    pub amendment_id: AmendmentId,
    pub approved_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LoaStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaStatusChanged {
    pub loa_id: LoaId,
    pub from: LoaStatus,
    pub to: LoaStatus,
    pub changed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoaEvent {
    LoaRecorded(LoaRecorded),
    AmendmentRecorded(AmendmentRecorded),
    AmendmentApproved(AmendmentApproved),
    LoaStatusChanged(LoaStatusChanged),
}

impl Event for LoaEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LoaEvent::LoaRecorded(_) => "loa.recorded",
            LoaEvent::AmendmentRecorded(_) => "loa.amendment_recorded",
            LoaEvent::AmendmentApproved(_) => "loa.amendment_approved",
            LoaEvent::LoaStatusChanged(_) => "loa.status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LoaEvent::LoaRecorded(e) => e.occurred_at,
            LoaEvent::AmendmentRecorded(e) => e.occurred_at,
            LoaEvent::AmendmentApproved(e) => e.occurred_at,
            LoaEvent::LoaStatusChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Loa {
    type Command = LoaCommand;
    type Event = LoaEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LoaEvent::LoaRecorded(e) => {
                self.id = e.loa_id;
                self.loa_no = e.loa_no.clone();
                self.offer_id = Some(e.offer_id);
                self.value = e.value;
                self.scope = e.scope.clone();
                self.status = LoaStatus::Active;
                self.amendments.clear();
                self.document_key = e.document_key.clone();
                self.recorded_by = Some(e.recorded_by);
                self.created = true;
            }
            LoaEvent::AmendmentRecorded(e) => {
                self.amendments.push(Amendment {
                    id: e.amendment_id,
                    amendment_no: e.amendment_no,
                    additional_value: e.additional_value,
                    reason: e.reason.clone(),
                    effective_date: e.effective_date,
                    status: AmendmentStatus::Pending,
                    recorded_by: e.recorded_by,
                    approved_by: None,
                    approved_at: None,
                });
            }
            LoaEvent::AmendmentApproved(e) => {
                if let Some(amendment) =
                    self.amendments.iter_mut().find(|a| a.id == e.amendment_id)
                {
                    amendment.status = AmendmentStatus::Approved;
                    amendment.approved_by = Some(e.approved_by);
                    amendment.approved_at = Some(e.occurred_at);
                }
            }
            LoaEvent::LoaStatusChanged(e) => {
                self.status = e.to;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LoaCommand::RecordLoa(cmd) => self.handle_record(cmd),
            LoaCommand::RecordAmendment(cmd) => self.handle_record_amendment(cmd),
            LoaCommand::ApproveAmendment(cmd) => self.handle_approve_amendment(cmd),
            LoaCommand::UpdateStatus(cmd) => self.handle_update_status(cmd),
        }
    }
}

impl Loa {
    fn ensure_loa_id(&self, loa_id: LoaId) -> Result<(), DomainError> {
        if self.id != loa_id {
            return Err(DomainError::validation("loa_id mismatch"));
        }
        Ok(())
    }

    fn handle_record(&self, cmd: &RecordLoa) -> Result<Vec<LoaEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("LOA already exists"));
        }
        if cmd.loa_no.trim().is_empty() {
            return Err(DomainError::validation("LOA number is required"));
        }
        if cmd.value <= Money::ZERO {
            return Err(DomainError::validation(format!(
                "LOA value must be positive, got {}",
                cmd.value
            )));
        }

        Ok(vec![LoaEvent::LoaRecorded(LoaRecorded {
            loa_id: cmd.loa_id,
            loa_no: cmd.loa_no.clone(),
            offer_id: cmd.offer_id,
            value: cmd.value,
            scope: cmd.scope.clone(),
            document_key: cmd.document_key.clone(),
            recorded_by: cmd.recorded_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_amendment(
        &self,
        cmd: &RecordAmendment,
    ) -> Result<Vec<LoaEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_loa_id(cmd.loa_id)?;

        if self.status != LoaStatus::Active {
            return Err(DomainError::invalid_state(
                "amendments can only be recorded on an active LOA",
            ));
        }
        if self.amendment(cmd.amendment_id).is_some() {
            return Err(DomainError::conflict("amendment already exists"));
        }
        if cmd.additional_value.is_negative() {
            return Err(DomainError::validation(format!(
                "amendment value must be non-negative, got {}",
                cmd.additional_value
            )));
        }
        if cmd.reason.trim().is_empty() {
            return Err(DomainError::validation("amendment reason is required"));
        }

        Ok(vec![LoaEvent::AmendmentRecorded(AmendmentRecorded {
            loa_id: cmd.loa_id,
            amendment_id: cmd.amendment_id,
            amendment_no: self.next_amendment_no(),
            additional_value: cmd.additional_value,
            reason: cmd.reason.clone(),
            effective_date: cmd.effective_date,
            recorded_by: cmd.recorded_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve_amendment(
        &self,
        cmd: &ApproveAmendment,
    ) -> Result<Vec<LoaEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_loa_id(cmd.loa_id)?;

        if self.status != LoaStatus::Active {
            return Err(DomainError::invalid_state(
                "amendments can only be approved on an active LOA",
            ));
        }
        let amendment = self
            .amendment(cmd.amendment_id)
            .ok_or_else(DomainError::not_found)?;
        if amendment.status != AmendmentStatus::Pending {
            return Err(DomainError::invalid_state("amendment is not pending"));
        }

        Ok(vec![LoaEvent::AmendmentApproved(AmendmentApproved {
            loa_id: cmd.loa_id,
            amendment_id: cmd.amendment_id,
            approved_by: cmd.approved_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_status(&self, cmd: &UpdateLoaStatus) -> Result<Vec<LoaEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_loa_id(cmd.loa_id)?;

        let allowed = allowed_transitions(self.status);
        if !allowed.contains(&cmd.to) {
            return Err(DomainError::invalid_transition(
                self.status.as_str(),
                cmd.to.as_str(),
                allowed.iter().map(|s| s.as_str()),
            ));
        }

        Ok(vec![LoaEvent::LoaStatusChanged(LoaStatusChanged {
            loa_id: cmd.loa_id,
            from: self.status,
            to: cmd.to,
            changed_by: cmd.changed_by,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_loa_id() -> LoaId {
        LoaId::new(AggregateId::new())
    }

    fn test_offer_id() -> OfferId {
        OfferId::new(AggregateId::new())
    }

    fn test_user_id() -> UserId {
        UserId::new()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn effective_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn drive(loa: &mut Loa, cmd: LoaCommand) -> Vec<LoaEvent> {
        let events = loa.handle(&cmd).unwrap();
        for event in &events {
            loa.apply(event);
        }
        events
    }

    fn recorded_loa(value: i64) -> Loa {
        let loa_id = test_loa_id();
        let mut loa = Loa::empty(loa_id);
        drive(
            &mut loa,
            LoaCommand::RecordLoa(RecordLoa {
                loa_id,
                loa_no: "LOA/2026/001".to_string(),
                offer_id: test_offer_id(),
                value: Money::from_major(value),
                scope: "track renewal, section A".to_string(),
                document_key: None,
                recorded_by: test_user_id(),
                occurred_at: test_time(),
            }),
        );
        loa
    }

    fn amendment_cmd(loa: &Loa, value: i64) -> (AmendmentId, LoaCommand) {
        let amendment_id = AmendmentId::new(AggregateId::new());
        let cmd = LoaCommand::RecordAmendment(RecordAmendment {
            loa_id: loa.id_typed(),
            amendment_id,
            additional_value: Money::from_major(value),
            reason: "scope extension".to_string(),
            effective_date: effective_date(),
            recorded_by: test_user_id(),
            occurred_at: test_time(),
        });
        (amendment_id, cmd)
    }

    #[test]
    fn recording_creates_an_active_loa() {
        let loa = recorded_loa(100_000);
        assert_eq!(loa.status(), LoaStatus::Active);
        assert_eq!(loa.value(), Money::from_major(100_000));
        assert_eq!(loa.total_value(), Money::from_major(100_000));
    }

    #[test]
    fn non_positive_value_is_rejected() {
        let loa_id = test_loa_id();
        let loa = Loa::empty(loa_id);
        let err = loa
            .handle(&LoaCommand::RecordLoa(RecordLoa {
                loa_id,
                loa_no: "LOA/2026/002".to_string(),
                offer_id: test_offer_id(),
                value: Money::ZERO,
                scope: String::new(),
                document_key: None,
                recorded_by: test_user_id(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn amendment_numbers_are_monotonic() {
        let mut loa = recorded_loa(100_000);
        let (_, cmd1) = amendment_cmd(&loa, 10_000);
        drive(&mut loa, cmd1);
        let (_, cmd2) = amendment_cmd(&loa, 5_000);
        drive(&mut loa, cmd2);

        let numbers: Vec<u32> = loa.amendments().iter().map(|a| a.amendment_no).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn pending_amendments_do_not_count_toward_total() {
        let mut loa = recorded_loa(100_000);
        let (id, cmd) = amendment_cmd(&loa, 20_000);
        drive(&mut loa, cmd);
        assert_eq!(loa.total_value(), Money::from_major(100_000));

        let approve = LoaCommand::ApproveAmendment(ApproveAmendment {
            loa_id: loa.id_typed(),
            amendment_id: id,
            approved_by: test_user_id(),
            occurred_at: test_time(),
        });
        drive(&mut loa, approve);
        assert_eq!(loa.total_value(), Money::from_major(120_000));
        let approved = loa.amendment(id).unwrap();
        assert!(approved.approved_by.is_some());
        assert!(approved.approved_at.is_some());
    }

    #[test]
    fn approving_a_non_pending_amendment_is_invalid_state() {
        let mut loa = recorded_loa(100_000);
        let (id, cmd) = amendment_cmd(&loa, 20_000);
        drive(&mut loa, cmd);
        let approve = LoaCommand::ApproveAmendment(ApproveAmendment {
            loa_id: loa.id_typed(),
            amendment_id: id,
            approved_by: test_user_id(),
            occurred_at: test_time(),
        });
        drive(&mut loa, approve.clone());

        let err = loa.handle(&approve).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn approving_an_unknown_amendment_is_not_found() {
        let loa = recorded_loa(100_000);
        let err = loa
            .handle(&LoaCommand::ApproveAmendment(ApproveAmendment {
                loa_id: loa.id_typed(),
                amendment_id: AmendmentId::new(AggregateId::new()),
                approved_by: test_user_id(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }

    #[test]
    fn amendments_on_a_cancelled_loa_are_invalid_state() {
        let mut loa = recorded_loa(100_000);
        let cmd = LoaCommand::UpdateStatus(UpdateLoaStatus {
            loa_id: loa.id_typed(),
            to: LoaStatus::Cancelled,
            changed_by: test_user_id(),
            occurred_at: test_time(),
        });
        drive(&mut loa, cmd);

        let (_, cmd) = amendment_cmd(&loa, 10_000);
        let err = loa.handle(&cmd).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn out_of_table_status_change_reports_allowed_set() {
        let mut loa = recorded_loa(100_000);
        let cmd = LoaCommand::UpdateStatus(UpdateLoaStatus {
            loa_id: loa.id_typed(),
            to: LoaStatus::Completed,
            changed_by: test_user_id(),
            occurred_at: test_time(),
        });
        drive(&mut loa, cmd);

        let err = loa
            .handle(&LoaCommand::UpdateStatus(UpdateLoaStatus {
                loa_id: loa.id_typed(),
                to: LoaStatus::Cancelled,
                changed_by: test_user_id(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::InvalidTransition {
                current,
                requested,
                allowed,
            } => {
                assert_eq!(current, "completed");
                assert_eq!(requested, "cancelled");
                assert!(allowed.is_empty());
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: the effective total is the base value plus exactly the
        /// approved amendments, regardless of recording order.
        #[test]
        fn total_value_counts_only_approved_amendments(
            amounts in prop::collection::vec((1i64..50_000i64, any::<bool>()), 0..8)
        ) {
            let mut loa = recorded_loa(100_000);
            let mut expected = Money::from_major(100_000);

            for (amount, approve) in amounts {
                let (id, cmd) = amendment_cmd(&loa, amount);
                drive(&mut loa, cmd);
                if approve {
                    let approve_cmd = LoaCommand::ApproveAmendment(ApproveAmendment {
                        loa_id: loa.id_typed(),
                        amendment_id: id,
                        approved_by: test_user_id(),
                        occurred_at: test_time(),
                    });
                    drive(&mut loa, approve_cmd);
                    expected += Money::from_major(amount);
                }
            }

            prop_assert_eq!(loa.total_value(), expected);
        }
    }
}
