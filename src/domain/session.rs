//! Session logic management.

use std::fmt;

use serde::{Deserialize, Serialize};

/// User as reported by the identity provider.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    /// Provider-issued token proving the sign-in.
    #[serde(skip_serializing)]
    pub id_token: Option<String>,
}

impl CurrentUser {
    /// Create a new [`CurrentUser`] with only `uid` set.
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Default::default()
        }
    }

    /// Update `display_name` of [`CurrentUser`].
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Update `email` of [`CurrentUser`].
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Update `id_token` of [`CurrentUser`].
    pub fn with_id_token(mut self, token: impl Into<String>) -> Self {
        self.id_token = Some(token.into());
        self
    }
}

impl fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentUser")
            .field("uid", &self.uid)
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("id_token", &self.id_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Context handed to every identity call.
///
/// Callers own it: sign-in operations return a new context rather than
/// mutating shared state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthContext {
    /// Tenant on multi-tenant identity projects.
    pub tenant_id: Option<String>,
    pub current_user: Option<CurrentUser>,
}

impl AuthContext {
    /// Create an empty, signed-out [`AuthContext`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Update `tenant_id` field on [`AuthContext`].
    pub fn tenant(mut self, tenant_id: Option<String>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    /// Same context with `user` signed in.
    pub fn signed_in(&self, user: CurrentUser) -> Self {
        Self {
            tenant_id: self.tenant_id.clone(),
            current_user: Some(user),
        }
    }

    /// Same context without any user.
    pub fn signed_out(&self) -> Self {
        Self {
            tenant_id: self.tenant_id.clone(),
            current_user: None,
        }
    }

    #[inline]
    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.current_user.as_ref()
    }
}

/// Federated identity providers supported by popup sign-in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FederatedProvider {
    Google,
}

impl FederatedProvider {
    /// Provider identifier as understood by identity services.
    pub fn id(&self) -> &'static str {
        match self {
            FederatedProvider::Google => "google.com",
        }
    }
}

impl fmt::Display for FederatedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Result of a successful sign-in or sign-up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserCredential {
    pub user: CurrentUser,
    /// `None` for email and password.
    pub provider: Option<FederatedProvider>,
}

/// Fields to change on a user profile. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_token() {
        let user = CurrentUser::new("123").with_id_token("secret-token");
        let output = format!("{user:?}");

        assert!(output.contains("123"));
        assert!(!output.contains("secret-token"));
    }

    #[test]
    fn test_sign_in_keeps_tenant() {
        let ctx = AuthContext::new().tenant(Some("blog".into()));
        let signed = ctx.signed_in(CurrentUser::new("123"));

        assert_eq!(signed.tenant_id.as_deref(), Some("blog"));
        assert_eq!(signed.current_user().map(|u| u.uid.as_str()), Some("123"));
        assert_eq!(signed.signed_out(), ctx);
    }
}
