use tenderflow_core::{DomainError, DomainResult};

use crate::{Actor, Role};

/// Require the actor to hold `role`.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn require_role(actor: &Actor, role: &Role) -> DomainResult<()> {
    if actor.has_role(role) {
        Ok(())
    } else {
        Err(DomainError::forbidden(format!(
            "missing role '{role}'"
        )))
    }
}
