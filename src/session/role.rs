use serde::{Deserialize, Serialize};

/// Closed set of account roles.
///
/// Derived once from the session's authorities and injected into the
/// components that gate behaviour on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// Actions that depend on the caller's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Remove every selected row in one staged batch.
    BulkDelete,
    /// List, create and delete user accounts.
    ManageUsers,
}

impl Role {
    /// Derive the role from the `authorities` claim.
    pub fn from_authorities<S: AsRef<str>>(authorities: &[S]) -> Self {
        if authorities
            .iter()
            .any(|a| a.as_ref().eq_ignore_ascii_case("ADMIN"))
        {
            Role::Admin
        } else {
            Role::User
        }
    }

    /// Capability predicate.
    pub fn allows(self, capability: Capability) -> bool {
        match capability {
            Capability::BulkDelete | Capability::ManageUsers => self == Role::Admin,
        }
    }
}
