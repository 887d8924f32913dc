//! Identity Toolkit REST adapter.
//!
//! Speaks the `accounts:*` endpoints used by hosted identity platforms.
//! Sessions only live client-side, so sign-out never reaches the network.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AuthContext, CurrentUser, FederatedProvider, ProfileUpdate, UserCredential,
};
use crate::ports::identity::{IdentityError, IdentityProvider, Result};

pub const DEFAULT_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_REQUEST_URI: &str = "http://localhost";

/// Obtain a provider id token from an interactive flow (browser popup,
/// device code, ...).
#[async_trait]
pub trait FederatedPrompt: Send + Sync {
    async fn authorize(&self, provider: FederatedProvider) -> Result<String>;
}

/// Identity provider backed by the Identity Toolkit REST API.
#[derive(Clone)]
pub struct IdentityToolkit {
    client: Client,
    endpoint: String,
    api_key: String,
    tenant_id: Option<String>,
    request_uri: String,
    prompt: Option<Arc<dyn FederatedPrompt>>,
}

impl IdentityToolkit {
    /// Create a new [`IdentityToolkit`] on the default endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            api_key: api_key.into(),
            tenant_id: None,
            request_uri: DEFAULT_REQUEST_URI.to_owned(),
            prompt: None,
        }
    }

    /// Update `endpoint`, e.g. to target a local emulator.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_owned();
        self
    }

    /// Update `tenant_id`.
    pub fn tenant(mut self, tenant_id: Option<String>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    /// Update the URI reported to federated providers.
    pub fn request_uri(mut self, request_uri: impl Into<String>) -> Self {
        self.request_uri = request_uri.into();
        self
    }

    /// Set the interactive flow used by popup sign-in.
    pub fn prompt(mut self, prompt: Arc<dyn FederatedPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    fn url(&self, method: &str) -> String {
        format!("{}/accounts:{method}", self.endpoint)
    }

    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        tracing::debug!(method, "identity toolkit request");

        let response = self
            .client
            .post(self.url(method))
            .query(&[("key", &self.api_key)])
            .json(body)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json::<R>().await?)
        } else {
            let status = response.status();
            let error = response
                .json::<ErrorResponse>()
                .await
                .map(|e| e.error.message)
                .unwrap_or_else(|_| status.to_string());
            tracing::debug!(
                method,
                %status,
                %error,
                "identity toolkit rejected request"
            );
            Err(map_error(&error))
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tenant_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    request_uri: &'a str,
    post_body: String,
    return_secure_token: bool,
    return_idp_credential: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tenant_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    id_token: Option<String>,
}

impl From<AccountResponse> for CurrentUser {
    fn from(response: AccountResponse) -> Self {
        CurrentUser {
            uid: response.local_id,
            display_name: response.display_name.filter(|name| !name.is_empty()),
            email: response.email,
            id_token: response.id_token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Map an error message such as `EMAIL_EXISTS` or
/// `WEAK_PASSWORD : Password should be at least 6 characters`.
fn map_error(message: &str) -> IdentityError {
    let code = message.split(':').next().unwrap_or(message).trim();
    match code {
        "EMAIL_EXISTS" => IdentityError::EmailExists,
        "EMAIL_NOT_FOUND"
        | "INVALID_PASSWORD"
        | "INVALID_LOGIN_CREDENTIALS" => IdentityError::InvalidCredentials,
        "USER_DISABLED" => IdentityError::UserDisabled,
        code => IdentityError::Rejected {
            code: code.to_owned(),
        },
    }
}

fn idp_post_body(provider: FederatedProvider, id_token: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("id_token", id_token)
        .append_pair("providerId", provider.id())
        .finish()
}

#[async_trait]
impl IdentityProvider for IdentityToolkit {
    fn auth(&self) -> AuthContext {
        AuthContext::new().tenant(self.tenant_id.clone())
    }

    async fn sign_in_with_popup(
        &self,
        auth: &AuthContext,
        provider: FederatedProvider,
    ) -> Result<UserCredential> {
        let prompt =
            self.prompt.as_ref().ok_or(IdentityError::PopupUnavailable)?;
        let id_token = prompt.authorize(provider).await?;

        let request = IdpRequest {
            request_uri: &self.request_uri,
            post_body: idp_post_body(provider, &id_token),
            return_secure_token: true,
            return_idp_credential: true,
            tenant_id: auth.tenant_id.as_deref(),
        };
        let response: AccountResponse =
            self.call("signInWithIdp", &request).await?;

        Ok(UserCredential {
            user: response.into(),
            provider: Some(provider),
        })
    }

    async fn sign_in_with_email_and_password(
        &self,
        auth: &AuthContext,
        email: &str,
        password: &str,
    ) -> Result<UserCredential> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
            tenant_id: auth.tenant_id.as_deref(),
        };
        let response: AccountResponse =
            self.call("signInWithPassword", &request).await?;

        Ok(UserCredential {
            user: response.into(),
            provider: None,
        })
    }

    async fn create_user_with_email_and_password(
        &self,
        auth: &AuthContext,
        email: &str,
        password: &str,
    ) -> Result<UserCredential> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
            tenant_id: auth.tenant_id.as_deref(),
        };
        let response: AccountResponse = self.call("signUp", &request).await?;

        Ok(UserCredential {
            user: response.into(),
            provider: None,
        })
    }

    async fn update_profile(
        &self,
        user: &CurrentUser,
        update: &ProfileUpdate,
    ) -> Result<()> {
        let Some(id_token) = user.id_token.as_deref() else {
            return Err(IdentityError::Rejected {
                code: "MISSING_ID_TOKEN".into(),
            });
        };

        let request = UpdateRequest {
            id_token,
            display_name: update.display_name.as_deref(),
            photo_url: update.photo_url.as_deref(),
            return_secure_token: false,
        };
        let _: AccountResponse = self.call("update", &request).await?;
        Ok(())
    }

    async fn sign_out(&self, auth: &AuthContext) -> Result<()> {
        tracing::debug!(
            user_id = auth.current_user().map(|u| u.uid.as_str()),
            "dropping identity toolkit session"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_map_error() {
        assert!(matches!(
            map_error("EMAIL_EXISTS"),
            IdentityError::EmailExists
        ));
        assert!(matches!(
            map_error("INVALID_LOGIN_CREDENTIALS"),
            IdentityError::InvalidCredentials
        ));
        assert!(matches!(
            map_error("USER_DISABLED"),
            IdentityError::UserDisabled
        ));
        assert!(matches!(
            map_error("WEAK_PASSWORD : Password should be at least 6 chars"),
            IdentityError::Rejected { code } if code == "WEAK_PASSWORD"
        ));
    }

    #[test]
    fn test_password_request_body() {
        let request = PasswordRequest {
            email: "peba@demais.com",
            password: "pebademais",
            return_secure_token: true,
            tenant_id: None,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "email": "peba@demais.com",
                "password": "pebademais",
                "returnSecureToken": true,
            })
        );
    }

    #[test]
    fn test_update_request_body() {
        let request = UpdateRequest {
            id_token: "token",
            display_name: Some("peba"),
            photo_url: None,
            return_secure_token: false,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "idToken": "token",
                "displayName": "peba",
                "returnSecureToken": false,
            })
        );
    }

    #[test]
    fn test_account_response_into_user() {
        let response: AccountResponse = serde_json::from_value(json!({
            "kind": "identitytoolkit#SignupNewUserResponse",
            "localId": "123",
            "email": "peba@demais.com",
            "displayName": "",
            "idToken": "token",
            "refreshToken": "refresh",
            "expiresIn": "3600",
        }))
        .unwrap();

        let user = CurrentUser::from(response);
        assert_eq!(user.uid, "123");
        assert_eq!(user.display_name, None);
        assert_eq!(user.id_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_idp_post_body() {
        assert_eq!(
            idp_post_body(FederatedProvider::Google, "a b"),
            "id_token=a+b&providerId=google.com"
        );
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let toolkit =
            IdentityToolkit::new("key").endpoint("http://localhost:9099/v1/");
        assert_eq!(
            toolkit.url("signUp"),
            "http://localhost:9099/v1/accounts:signUp"
        );
    }

    #[tokio::test]
    async fn test_popup_without_prompt() {
        let toolkit = IdentityToolkit::new("key");
        let err = toolkit
            .sign_in_with_popup(&toolkit.auth(), FederatedProvider::Google)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::PopupUnavailable));
    }
}
