//! Workflow notifications published after each state change.
//!
//! Notifications fan out to interested consumers (dashboards, mail senders)
//! over the event bus. They are advisory: the store write has already
//! happened when a notification is published, so a publish failure is logged
//! and the operation still succeeds.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tenderflow_core::AggregateId;
use tenderflow_events::{EventBus, EventEnvelope};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowNotification {
    /// Stable topic string, same namespace as the domain event types
    /// (e.g. "offer.submitted", "po.status_changed").
    pub topic: String,
    pub payload: serde_json::Value,
}

pub type NotificationEnvelope = EventEnvelope<WorkflowNotification>;

pub(crate) fn publish<B>(
    bus: &B,
    aggregate_id: AggregateId,
    aggregate_type: &str,
    sequence_number: u64,
    topic: &str,
    payload: serde_json::Value,
) where
    B: EventBus<NotificationEnvelope>,
{
    let envelope = EventEnvelope::new(
        Uuid::now_v7(),
        aggregate_id,
        aggregate_type,
        sequence_number,
        WorkflowNotification {
            topic: topic.to_string(),
            payload,
        },
    );
    if let Err(err) = bus.publish(envelope) {
        tracing::warn!(
            ?err,
            topic,
            aggregate_type,
            "notification publish failed; state change already persisted"
        );
    }
}
