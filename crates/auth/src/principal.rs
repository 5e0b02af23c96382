use serde::{Deserialize, Serialize};

use crate::Role;

/// The stored identity an authenticated caller resolves to.
///
/// Built by the API layer from the user record matching the token email; a
/// user without a role is still a principal, just not an `hr` one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub email: String,
    pub role: Option<Role>,
}

impl Principal {
    pub fn new(email: impl Into<String>, role: Option<Role>) -> Self {
        Self { email: email.into(), role }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }
}
