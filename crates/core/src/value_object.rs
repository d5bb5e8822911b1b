//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value** — two `Money`
/// amounts or two work-item snapshots with the same attributes are equal, no
/// identity involved. To "modify" one, construct a new value.
///
/// The bound set is the minimum the workflow modules need: cheap cloning,
/// value comparison, and debuggability for logs and tests.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
