//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Used for child records that carry their own identity inside an aggregate
/// (e.g. an LOA amendment addressed by id from the approval operation).
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
