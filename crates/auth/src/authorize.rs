//! Pure access policy: role gate and self-ownership.

use thiserror::Error;

use crate::{Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("no user record matches the token identity")]
    UnknownPrincipal,

    #[error("forbidden: role '{required}' required")]
    MissingRole { required: Role },

    #[error("forbidden: identity does not match requested resource")]
    IdentityMismatch,
}

/// Admit `principal` only if it holds `required`.
///
/// A missing principal (token email with no user record) is denied the same
/// way as a wrong role; the API maps both to 403.
pub fn authorize(principal: Option<&Principal>, required: Role) -> Result<&Principal, AuthzError> {
    let principal = principal.ok_or(AuthzError::UnknownPrincipal)?;
    if principal.has_role(required) {
        Ok(principal)
    } else {
        Err(AuthzError::MissingRole { required })
    }
}

/// Self-ownership: a caller may only address resources keyed by its own email.
///
/// Comparison is exact; no case folding.
pub fn ensure_self(identity_email: &str, requested_email: &str) -> Result<(), AuthzError> {
    if identity_email == requested_email {
        Ok(())
    } else {
        Err(AuthzError::IdentityMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hr_is_admitted() {
        let p = Principal::new("hr@acme.io", Some(Role::Hr));
        assert_eq!(authorize(Some(&p), Role::Hr), Ok(&p));
    }

    #[test]
    fn employee_and_roleless_users_are_denied() {
        let emp = Principal::new("e@acme.io", Some(Role::Employee));
        let none = Principal::new("n@acme.io", None);

        assert_eq!(
            authorize(Some(&emp), Role::Hr),
            Err(AuthzError::MissingRole { required: Role::Hr })
        );
        assert_eq!(
            authorize(Some(&none), Role::Hr),
            Err(AuthzError::MissingRole { required: Role::Hr })
        );
    }

    #[test]
    fn unknown_principal_is_denied() {
        assert_eq!(authorize(None, Role::Hr), Err(AuthzError::UnknownPrincipal));
    }

    #[test]
    fn self_check_is_exact() {
        assert_eq!(ensure_self("a@x.com", "a@x.com"), Ok(()));
        assert_eq!(ensure_self("a@x.com", "b@x.com"), Err(AuthzError::IdentityMismatch));
        assert_eq!(ensure_self("a@x.com", "A@x.com"), Err(AuthzError::IdentityMismatch));
    }
}
