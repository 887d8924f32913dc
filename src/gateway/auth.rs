//! Account operations forwarded to the identity provider.

use std::sync::Arc;

use crate::domain::{
    AuthContext, FederatedProvider, ProfileUpdate, UserCredential,
};
use crate::error::Result;
use crate::ports::{IdentityError, IdentityProvider, TelemetryPort};

/// Login, registration and logoff.
#[derive(Clone)]
pub struct AuthGateway {
    identity: Arc<dyn IdentityProvider>,
    telemetry: Arc<dyn TelemetryPort>,
}

impl AuthGateway {
    /// Create a new [`AuthGateway`].
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        telemetry: Arc<dyn TelemetryPort>,
    ) -> Self {
        Self {
            identity,
            telemetry,
        }
    }

    /// Current auth context of the identity provider.
    pub fn auth(&self) -> AuthContext {
        self.identity.auth()
    }

    /// Sign in through the Google popup flow.
    pub async fn login_with_google(
        &self,
        ctx: &AuthContext,
    ) -> Result<AuthContext> {
        let credential = self
            .identity
            .sign_in_with_popup(ctx, FederatedProvider::Google)
            .await
            .inspect_err(|err| self.failed("google", err))?;

        Ok(self.signed_in(ctx, credential, "google"))
    }

    pub async fn login_with_email_and_password(
        &self,
        ctx: &AuthContext,
        email: &str,
        password: &str,
    ) -> Result<AuthContext> {
        let credential = self
            .identity
            .sign_in_with_email_and_password(ctx, email, password)
            .await
            .inspect_err(|err| self.failed("password", err))?;

        Ok(self.signed_in(ctx, credential, "password"))
    }

    /// Create an account, then set its display name to `name`.
    ///
    /// The account is kept if naming it fails.
    pub async fn register_with_email_and_password(
        &self,
        ctx: &AuthContext,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthContext> {
        let mut credential = self
            .identity
            .create_user_with_email_and_password(ctx, email, password)
            .await
            .inspect_err(|err| self.failed("register", err))?;
        self.telemetry.record_account_created(&credential.user.uid);

        let update = ProfileUpdate {
            display_name: Some(name.to_owned()),
            ..Default::default()
        };
        self.identity
            .update_profile(&credential.user, &update)
            .await
            .inspect_err(|err| self.failed("register", err))?;

        credential.user.display_name = Some(name.to_owned());
        Ok(self.signed_in(ctx, credential, "register"))
    }

    /// Sign the current user out.
    pub async fn logoff(&self, ctx: &AuthContext) -> Result<AuthContext> {
        self.identity.sign_out(ctx).await?;
        self.telemetry
            .record_sign_out(ctx.current_user().map(|user| user.uid.as_str()));

        Ok(ctx.signed_out())
    }

    fn signed_in(
        &self,
        ctx: &AuthContext,
        credential: UserCredential,
        method: &str,
    ) -> AuthContext {
        self.telemetry
            .record_auth_success(&credential.user.uid, method);
        ctx.signed_in(credential.user)
    }

    fn failed(&self, method: &str, err: &IdentityError) {
        self.telemetry.record_auth_failure(method, &err.to_string());
    }
}
