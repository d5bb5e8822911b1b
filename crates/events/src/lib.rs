//! Domain events and the fire-and-forget notification channel.
//!
//! Workflow services publish status-change notifications here after a
//! successful store write. Delivery is best-effort: a publish failure is
//! logged by the caller and never rolls back the state change that
//! triggered it.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
