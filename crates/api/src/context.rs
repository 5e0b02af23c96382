use assetdesk_auth::IdentityClaims;
use assetdesk_directory::User;

/// Decoded token identity for a request.
///
/// Inserted by the authenticator; present on every guarded route.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityContext {
    claims: IdentityClaims,
}

impl IdentityContext {
    pub fn new(claims: IdentityClaims) -> Self {
        Self { claims }
    }

    pub fn email(&self) -> &str {
        self.claims.email()
    }

    pub fn claims(&self) -> &IdentityClaims {
        &self.claims
    }
}

/// The stored user behind an admin request, already checked to be `hr`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalContext {
    user: User,
}

impl PrincipalContext {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }

    pub fn user(&self) -> &User {
        &self.user
    }
}
