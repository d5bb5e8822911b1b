//! `tenderflow-auth` — acting-identity boundary.
//!
//! Credential verification and token issuance live in an external
//! collaborator; this crate only models the identity it hands us (user id +
//! granted roles) and a pure policy check over it.

pub mod actor;
pub mod authorize;
pub mod roles;

pub use actor::Actor;
pub use authorize::require_role;
pub use roles::Role;
