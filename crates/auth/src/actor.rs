use serde::{Deserialize, Serialize};

use tenderflow_core::UserId;

use crate::Role;

/// A fully resolved acting identity for authorization decisions.
///
/// Construction is decoupled from storage and transport: the calling layer
/// derives user id and roles from whatever credentials it validated. The
/// workflow core trusts this identity without re-verifying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn new(user_id: UserId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id,
            roles: roles.into_iter().collect(),
        }
    }

    /// An actor holding no roles (plain authenticated user).
    pub fn user(user_id: UserId) -> Self {
        Self::new(user_id, [])
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
