//! In-memory identity provider.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CallLog, lock, random_id};
use crate::domain::{
    AuthContext, CurrentUser, FederatedProvider, ProfileUpdate, UserCredential,
};
use crate::ports::identity::{IdentityError, IdentityProvider, Result};

const UID_LENGTH: usize = 28;
const TOKEN_LENGTH: usize = 64;

/// Call received by [`MemoryIdentity`], with its arguments.
///
/// Passwords are never kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityCall {
    SignInWithPopup {
        auth: AuthContext,
        provider: FederatedProvider,
    },
    SignInWithEmailAndPassword {
        auth: AuthContext,
        email: String,
    },
    CreateUserWithEmailAndPassword {
        auth: AuthContext,
        email: String,
    },
    UpdateProfile {
        user: CurrentUser,
        update: ProfileUpdate,
    },
    SignOut {
        auth: AuthContext,
    },
}

impl IdentityCall {
    fn op(&self) -> IdentityOp {
        match self {
            IdentityCall::SignInWithPopup { .. } => IdentityOp::SignInWithPopup,
            IdentityCall::SignInWithEmailAndPassword { .. } => {
                IdentityOp::SignInWithEmailAndPassword
            },
            IdentityCall::CreateUserWithEmailAndPassword { .. } => {
                IdentityOp::CreateUserWithEmailAndPassword
            },
            IdentityCall::UpdateProfile { .. } => IdentityOp::UpdateProfile,
            IdentityCall::SignOut { .. } => IdentityOp::SignOut,
        }
    }
}

/// Kind of identity call, used to inject failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdentityOp {
    SignInWithPopup,
    SignInWithEmailAndPassword,
    CreateUserWithEmailAndPassword,
    UpdateProfile,
    SignOut,
}

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    password: String,
    display_name: Option<String>,
    disabled: bool,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    federated: HashMap<FederatedProvider, CurrentUser>,
    current: Option<CurrentUser>,
    calls: CallLog<IdentityCall>,
    failures: HashMap<IdentityOp, String>,
}

/// Identity provider keeping accounts in memory.
#[derive(Default)]
pub struct MemoryIdentity {
    tenant_id: Option<String>,
    state: Mutex<State>,
}

impl MemoryIdentity {
    /// Create a new, empty [`MemoryIdentity`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new, empty [`MemoryIdentity`] that logs its calls.
    pub fn recording() -> Self {
        Self {
            tenant_id: None,
            state: Mutex::new(State {
                calls: CallLog::recording(),
                ..Default::default()
            }),
        }
    }

    /// Update `tenant_id` handed out by [`IdentityProvider::auth`].
    pub fn tenant(mut self, tenant_id: Option<String>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    /// Register an email and password account. Returns its uid.
    pub fn add_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> String {
        let uid = random_id(UID_LENGTH);
        lock(&self.state).accounts.insert(
            email.to_owned(),
            Account {
                uid: uid.clone(),
                password: password.to_owned(),
                display_name: display_name.map(str::to_owned),
                disabled: false,
            },
        );
        uid
    }

    /// Disable the account behind `email`.
    pub fn disable_account(&self, email: &str) {
        if let Some(account) = lock(&self.state).accounts.get_mut(email) {
            account.disabled = true;
        }
    }

    /// User returned when a popup sign-in goes through `provider`.
    pub fn add_federated(
        &self,
        provider: FederatedProvider,
        user: CurrentUser,
    ) {
        lock(&self.state).federated.insert(provider, user);
    }

    /// Fail the next call of kind `op` with [`IdentityError::Rejected`].
    pub fn fail_next(&self, op: IdentityOp, code: &str) {
        lock(&self.state).failures.insert(op, code.to_owned());
    }

    /// Logged calls, oldest first. Empty unless built with `recording()`.
    pub fn calls(&self) -> Vec<IdentityCall> {
        lock(&self.state).calls.to_vec()
    }

    /// Number of logged calls of kind `op`.
    pub fn count(&self, op: IdentityOp) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }

    fn record(
        &self,
        op: IdentityOp,
        call: impl FnOnce() -> IdentityCall,
    ) -> Result<()> {
        let mut state = lock(&self.state);
        if state.calls.enabled {
            state.calls.push(call());
        }

        match state.failures.remove(&op) {
            Some(code) => Err(IdentityError::Rejected { code }),
            None => Ok(()),
        }
    }

    fn signed_in(
        &self,
        user: CurrentUser,
        provider: Option<FederatedProvider>,
    ) -> UserCredential {
        let user = user.with_id_token(random_id(TOKEN_LENGTH));
        lock(&self.state).current = Some(user.clone());
        UserCredential { user, provider }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    fn auth(&self) -> AuthContext {
        AuthContext {
            tenant_id: self.tenant_id.clone(),
            current_user: lock(&self.state).current.clone(),
        }
    }

    async fn sign_in_with_popup(
        &self,
        auth: &AuthContext,
        provider: FederatedProvider,
    ) -> Result<UserCredential> {
        self.record(IdentityOp::SignInWithPopup, || {
            IdentityCall::SignInWithPopup {
                auth: auth.clone(),
                provider,
            }
        })?;

        let user = lock(&self.state)
            .federated
            .get(&provider)
            .cloned()
            .ok_or(IdentityError::UnsupportedProvider(provider))?;

        Ok(self.signed_in(user, Some(provider)))
    }

    async fn sign_in_with_email_and_password(
        &self,
        auth: &AuthContext,
        email: &str,
        password: &str,
    ) -> Result<UserCredential> {
        self.record(IdentityOp::SignInWithEmailAndPassword, || {
            IdentityCall::SignInWithEmailAndPassword {
                auth: auth.clone(),
                email: email.to_owned(),
            }
        })?;

        let account = lock(&self.state)
            .accounts
            .get(email)
            .cloned()
            .ok_or(IdentityError::InvalidCredentials)?;
        if account.password != password {
            return Err(IdentityError::InvalidCredentials);
        }
        if account.disabled {
            return Err(IdentityError::UserDisabled);
        }

        let mut user = CurrentUser::new(account.uid).with_email(email);
        user.display_name = account.display_name;
        Ok(self.signed_in(user, None))
    }

    async fn create_user_with_email_and_password(
        &self,
        auth: &AuthContext,
        email: &str,
        password: &str,
    ) -> Result<UserCredential> {
        self.record(IdentityOp::CreateUserWithEmailAndPassword, || {
            IdentityCall::CreateUserWithEmailAndPassword {
                auth: auth.clone(),
                email: email.to_owned(),
            }
        })?;

        if lock(&self.state).accounts.contains_key(email) {
            return Err(IdentityError::EmailExists);
        }

        let uid = self.add_account(email, password, None);
        Ok(self.signed_in(CurrentUser::new(uid).with_email(email), None))
    }

    async fn update_profile(
        &self,
        user: &CurrentUser,
        update: &ProfileUpdate,
    ) -> Result<()> {
        self.record(IdentityOp::UpdateProfile, || IdentityCall::UpdateProfile {
            user: user.clone(),
            update: update.clone(),
        })?;

        let mut guard = lock(&self.state);
        let state = &mut *guard;
        let account = state
            .accounts
            .values_mut()
            .find(|account| account.uid == user.uid)
            .ok_or_else(|| IdentityError::Rejected {
                code: "USER_NOT_FOUND".into(),
            })?;

        if let Some(name) = &update.display_name {
            account.display_name = Some(name.clone());
            if let Some(current) =
                state.current.as_mut().filter(|current| current.uid == user.uid)
            {
                current.display_name = Some(name.clone());
            }
        }

        Ok(())
    }

    async fn sign_out(&self, auth: &AuthContext) -> Result<()> {
        self.record(IdentityOp::SignOut, || IdentityCall::SignOut {
            auth: auth.clone(),
        })?;
        lock(&self.state).current = None;
        Ok(())
    }
}
