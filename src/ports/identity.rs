//! Identity provider port.

use async_trait::async_trait;

use crate::domain::{
    AuthContext, CurrentUser, FederatedProvider, ProfileUpdate, UserCredential,
};

pub type Result<T> = std::result::Result<T, IdentityError>;

/// Errors raised by identity providers.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email is already used by another account")]
    EmailExists,
    #[error("user account is disabled")]
    UserDisabled,
    #[error("no interactive prompt available for federated sign-in")]
    PopupUnavailable,
    #[error("federated provider {0} is not supported")]
    UnsupportedProvider(FederatedProvider),

    #[error("identity provider rejected the request: {code}")]
    Rejected { code: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Port for authentication operations.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current auth context of this provider.
    fn auth(&self) -> AuthContext;

    /// Interactive sign-in through a federated provider.
    async fn sign_in_with_popup(
        &self,
        auth: &AuthContext,
        provider: FederatedProvider,
    ) -> Result<UserCredential>;

    async fn sign_in_with_email_and_password(
        &self,
        auth: &AuthContext,
        email: &str,
        password: &str,
    ) -> Result<UserCredential>;

    /// Create an account and sign it in.
    async fn create_user_with_email_and_password(
        &self,
        auth: &AuthContext,
        email: &str,
        password: &str,
    ) -> Result<UserCredential>;

    async fn update_profile(
        &self,
        user: &CurrentUser,
        update: &ProfileUpdate,
    ) -> Result<()>;

    async fn sign_out(&self, auth: &AuthContext) -> Result<()>;
}
