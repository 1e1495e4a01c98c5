//! In-memory identity backend
//!
//! `LocalDirectory` implements the `IdentityClient` contract against an
//! in-process account table, including the conflict semantics the linking
//! flow depends on: an interactive sign-in whose provider account email is
//! already claimed under a different method fails with
//! `AccountExistsWithDifferentCredential` and carries a pending credential.
//!
//! It also answers the provider user API, so email recovery works against
//! the tokens it issues.

use crate::identity::client::{AuthError, AuthErrorCode, IdentityClient, PendingCredential};
use crate::identity::provider::{Provider, SignInMethod};
use crate::linking::email_recovery::{
    AuthHeaderStyle, EmailEntry, ProviderUserApi, UserApiError, UserProfile,
};
use crate::models::Identity;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// The "browser user's" account at a federated provider. Connected profiles
/// are what an interactive sign-in prompt resolves to.
#[derive(Debug, Clone)]
pub struct FederatedProfile {
    pub provider: Provider,
    pub email: String,
    pub display_name: Option<String>,
    /// Whether the provider discloses the email on a conflict error (GitHub
    /// hides it unless the account exposes a public address).
    pub public_email: bool,
    /// Addresses the provider's user-emails endpoint returns. Empty means
    /// just the primary address, verified.
    pub emails: Vec<EmailEntry>,
}

impl FederatedProfile {
    #[must_use]
    pub fn new(provider: Provider, email: &str) -> Self {
        Self {
            provider,
            email: email.to_string(),
            display_name: None,
            public_email: !provider.may_omit_email(),
            emails: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn with_public_email(mut self, public: bool) -> Self {
        self.public_email = public;
        self
    }

    #[must_use]
    pub fn with_emails(mut self, emails: Vec<EmailEntry>) -> Self {
        self.emails = emails;
        self
    }
}

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    display_name: Option<String>,
    email: String,
    providers: Vec<String>,
    password: Option<String>,
}

impl Account {
    fn identity(&self) -> Identity {
        Identity {
            uid: self.uid.clone(),
            display_name: self.display_name.clone(),
            email: Some(self.email.clone()),
            photo_url: None,
            providers: self.providers.clone(),
        }
    }
}

#[derive(Default)]
struct DirectoryState {
    accounts: HashMap<String, Account>,
    by_email: HashMap<String, String>,
    profiles: HashMap<Provider, FederatedProfile>,
    tokens: HashMap<String, Provider>,
    current: Option<String>,
}

/// In-memory implementation of the identity backend contract.
#[derive(Default)]
pub struct LocalDirectory {
    state: RwLock<DirectoryState>,
}

impl LocalDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a federated profile: the account the next interactive sign-in
    /// with that provider resolves to.
    pub fn connect_profile(&self, profile: FederatedProfile) {
        let mut state = self.state.write().expect("directory lock poisoned");
        state.profiles.insert(profile.provider, profile);
    }

    fn issue_token(state: &mut DirectoryState, provider: Provider) -> String {
        let token = Uuid::new_v4().to_string();
        state.tokens.insert(token.clone(), provider);
        token
    }

    fn conflict_error(profile: &FederatedProfile, token: String) -> AuthError {
        let disclosed = profile.public_email.then(|| profile.email.clone());
        AuthError {
            code: AuthErrorCode::AccountExistsWithDifferentCredential,
            message: format!(
                "an account already exists with the email associated to the {} sign-in",
                profile.provider.label()
            ),
            email: disclosed.clone(),
            credential: Some(PendingCredential {
                provider: profile.provider,
                token,
                email_hint: disclosed,
            }),
        }
    }

    fn profile_for_token(
        state: &DirectoryState,
        token: &str,
    ) -> Result<FederatedProfile, AuthError> {
        let provider = state.tokens.get(token).ok_or_else(|| {
            AuthError::new(AuthErrorCode::Other("auth/invalid-credential".to_string()),
                "unknown or expired credential token")
        })?;
        state.profiles.get(provider).cloned().ok_or_else(|| {
            AuthError::new(AuthErrorCode::Other("auth/invalid-credential".to_string()),
                "credential no longer resolves to a provider account")
        })
    }
}

#[async_trait]
impl IdentityClient for LocalDirectory {
    async fn sign_in_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let mut state = self.state.write().expect("directory lock poisoned");
        let uid = state
            .by_email
            .get(email)
            .cloned()
            .ok_or_else(|| AuthError::new(AuthErrorCode::UserNotFound, "no account for email"))?;
        let account = state.accounts.get(&uid).expect("index points at account");
        if account.password.as_deref() != Some(password) {
            return Err(AuthError::new(
                AuthErrorCode::WrongPassword,
                "wrong password",
            ));
        }
        let identity = account.identity();
        state.current = Some(uid);
        Ok(identity)
    }

    async fn register_with_email_and_password(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let mut state = self.state.write().expect("directory lock poisoned");
        if state.by_email.contains_key(email) {
            return Err(AuthError::new(
                AuthErrorCode::EmailAlreadyInUse,
                "email already registered",
            ));
        }
        let account = Account {
            uid: Uuid::new_v4().to_string(),
            display_name: display_name.map(ToString::to_string),
            email: email.to_string(),
            providers: vec!["password".to_string()],
            password: Some(password.to_string()),
        };
        let identity = account.identity();
        state.by_email.insert(email.to_string(), account.uid.clone());
        state.current = Some(account.uid.clone());
        state.accounts.insert(account.uid.clone(), account);
        Ok(identity)
    }

    async fn sign_in_interactive(&self, provider: Provider) -> Result<Identity, AuthError> {
        let mut state = self.state.write().expect("directory lock poisoned");
        let Some(profile) = state.profiles.get(&provider).cloned() else {
            return Err(AuthError::new(
                AuthErrorCode::PopupClosed,
                "no provider account available for interactive sign-in",
            ));
        };

        if let Some(uid) = state.by_email.get(&profile.email).cloned() {
            let account = state.accounts.get(&uid).expect("index points at account");
            if account.providers.iter().any(|p| p == provider.id()) {
                let identity = account.identity();
                state.current = Some(uid);
                return Ok(identity);
            }
            let token = Self::issue_token(&mut state, provider);
            return Err(Self::conflict_error(&profile, token));
        }

        // First sign-in with this provider creates the account
        let account = Account {
            uid: Uuid::new_v4().to_string(),
            display_name: profile.display_name.clone(),
            email: profile.email.clone(),
            providers: vec![provider.id().to_string()],
            password: None,
        };
        let identity = account.identity();
        state
            .by_email
            .insert(profile.email.clone(), account.uid.clone());
        state.current = Some(account.uid.clone());
        state.accounts.insert(account.uid.clone(), account);
        Ok(identity)
    }

    async fn link_with_credential(
        &self,
        identity: &Identity,
        credential: &PendingCredential,
    ) -> Result<Identity, AuthError> {
        let mut state = self.state.write().expect("directory lock poisoned");
        let profile = Self::profile_for_token(&state, &credential.token)?;

        // Already linked to some account under that provider?
        if let Some(owner_uid) = state.by_email.get(&profile.email) {
            let owner = state.accounts.get(owner_uid).expect("index points at account");
            if owner.providers.iter().any(|p| p == profile.provider.id()) {
                return Err(AuthError::new(
                    AuthErrorCode::CredentialAlreadyInUse,
                    "credential already linked to an account",
                ));
            }
        }

        let uid = identity.uid.clone();
        let account = state.accounts.get_mut(&uid).ok_or_else(|| {
            AuthError::new(AuthErrorCode::UserNotFound, "identity no longer exists")
        })?;
        if !account.providers.iter().any(|p| p == profile.provider.id()) {
            account.providers.push(profile.provider.id().to_string());
        }
        let updated = account.identity();
        state.tokens.remove(&credential.token);
        state.current = Some(uid);
        Ok(updated)
    }

    async fn link_interactive(
        &self,
        identity: &Identity,
        provider: Provider,
    ) -> Result<Identity, AuthError> {
        let mut state = self.state.write().expect("directory lock poisoned");
        let Some(profile) = state.profiles.get(&provider).cloned() else {
            return Err(AuthError::new(
                AuthErrorCode::PopupClosed,
                "no provider account available for interactive linking",
            ));
        };

        let uid = identity.uid.clone();
        {
            let account = state.accounts.get(&uid).ok_or_else(|| {
                AuthError::new(AuthErrorCode::UserNotFound, "identity no longer exists")
            })?;
            if account.providers.iter().any(|p| p == provider.id()) {
                return Err(AuthError::new(
                    AuthErrorCode::ProviderAlreadyLinked,
                    "provider already linked",
                ));
            }
            // Provider account email belongs to somebody else entirely
            if let Some(owner_uid) = state.by_email.get(&profile.email) {
                if owner_uid != &uid {
                    let token = Self::issue_token(&mut state, provider);
                    return Err(Self::conflict_error(&profile, token));
                }
            }
        }

        let account = state.accounts.get_mut(&uid).expect("checked above");
        account.providers.push(provider.id().to_string());
        Ok(account.identity())
    }

    async fn fetch_sign_in_methods_for_email(
        &self,
        email: &str,
    ) -> Result<Vec<SignInMethod>, AuthError> {
        let state = self.state.read().expect("directory lock poisoned");
        let methods = state
            .by_email
            .get(email)
            .and_then(|uid| state.accounts.get(uid))
            .map(|account| {
                account
                    .providers
                    .iter()
                    .map(|id| SignInMethod::from_method_id(id))
                    .collect()
            })
            .unwrap_or_default();
        Ok(methods)
    }

    async fn current_user(&self) -> Option<Identity> {
        let state = self.state.read().expect("directory lock poisoned");
        state
            .current
            .as_ref()
            .and_then(|uid| state.accounts.get(uid))
            .map(Account::identity)
    }

    async fn sign_out(&self) {
        let mut state = self.state.write().expect("directory lock poisoned");
        state.current = None;
    }
}

#[async_trait]
impl ProviderUserApi for LocalDirectory {
    async fn user_profile(
        &self,
        token: &str,
        _style: AuthHeaderStyle,
    ) -> Result<UserProfile, UserApiError> {
        let state = self.state.read().expect("directory lock poisoned");
        let profile = Self::profile_for_token(&state, token)
            .map_err(|_| UserApiError::Unauthorized)?;
        Ok(UserProfile {
            email: profile.public_email.then(|| profile.email.clone()),
            login: None,
            name: profile.display_name.clone(),
        })
    }

    async fn user_emails(
        &self,
        token: &str,
        _style: AuthHeaderStyle,
    ) -> Result<Vec<EmailEntry>, UserApiError> {
        let state = self.state.read().expect("directory lock poisoned");
        let profile = Self::profile_for_token(&state, token)
            .map_err(|_| UserApiError::Unauthorized)?;
        if profile.emails.is_empty() {
            return Ok(vec![EmailEntry {
                email: profile.email.clone(),
                primary: true,
                verified: true,
            }]);
        }
        Ok(profile.emails.clone())
    }
}
