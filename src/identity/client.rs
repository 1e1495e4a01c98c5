//! Identity backend contract
//!
//! The identity provider SDK is an external collaborator; this trait is the
//! surface the rest of the crate programs against. `LocalDirectory` implements
//! it for the binary and the integration tests.

use crate::identity::provider::{Provider, SignInMethod};
use crate::models::Identity;
use async_trait::async_trait;

/// Machine-readable error codes from the identity backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorCode {
    /// The email is already claimed by an account under a different provider.
    AccountExistsWithDifferentCredential,
    /// The account already carries this provider.
    ProviderAlreadyLinked,
    /// The credential is already linked to some account.
    CredentialAlreadyInUse,
    WrongPassword,
    UserNotFound,
    EmailAlreadyInUse,
    /// The user dismissed the interactive sign-in prompt.
    PopupClosed,
    Network,
    Other(String),
}

impl AuthErrorCode {
    /// Wire representation of the code, kept close to the upstream SDK's
    /// `auth/...` naming.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            AuthErrorCode::AccountExistsWithDifferentCredential => {
                "auth/account-exists-with-different-credential"
            }
            AuthErrorCode::ProviderAlreadyLinked => "auth/provider-already-linked",
            AuthErrorCode::CredentialAlreadyInUse => "auth/credential-already-in-use",
            AuthErrorCode::WrongPassword => "auth/wrong-password",
            AuthErrorCode::UserNotFound => "auth/user-not-found",
            AuthErrorCode::EmailAlreadyInUse => "auth/email-already-in-use",
            AuthErrorCode::PopupClosed => "auth/popup-closed-by-user",
            AuthErrorCode::Network => "auth/network-request-failed",
            AuthErrorCode::Other(code) => code,
        }
    }
}

/// An opaque, provider-issued proof of identity obtained during a sign-in
/// attempt that could not be completed.
///
/// Valid only within the resolution flow that produced it. Deliberately not
/// serializable: a pending credential must never be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCredential {
    pub provider: Provider,
    /// Opaque token usable against the issuing provider's own API.
    pub token: String,
    /// The email the provider associated with the attempt, if disclosed.
    pub email_hint: Option<String>,
}

/// Error carried out of identity backend operations.
#[derive(Debug, Clone)]
pub struct AuthError {
    pub code: AuthErrorCode,
    pub message: String,
    /// Email the backend associated with the failed attempt, if disclosed.
    pub email: Option<String>,
    /// Pending credential recoverable from the error, if any.
    pub credential: Option<PendingCredential>,
}

impl AuthError {
    #[must_use]
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            email: None,
            credential: None,
        }
    }

    /// Pending credential recoverable from a conflict error, if present.
    #[must_use]
    pub fn credential_from_error(&self) -> Option<&PendingCredential> {
        self.credential.as_ref()
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AuthError {}

/// Contract of the external identity backend.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Sign in with an email/password pair.
    ///
    /// # Errors
    /// Returns `WrongPassword` or `UserNotFound` on bad credentials.
    async fn sign_in_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError>;

    /// Register a new password account.
    ///
    /// # Errors
    /// Returns `EmailAlreadyInUse` if the email is already claimed.
    async fn register_with_email_and_password(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, AuthError>;

    /// Open an interactive sign-in with a federated provider.
    ///
    /// # Errors
    /// Returns `AccountExistsWithDifferentCredential` (with a pending
    /// credential) when the provider account's email is already claimed under
    /// a different method, or `PopupClosed` if the user dismissed the prompt.
    async fn sign_in_interactive(&self, provider: Provider) -> Result<Identity, AuthError>;

    /// Link a pending credential to the given signed-in identity.
    ///
    /// # Errors
    /// Returns `CredentialAlreadyInUse` if the credential already belongs to
    /// some account.
    async fn link_with_credential(
        &self,
        identity: &Identity,
        credential: &PendingCredential,
    ) -> Result<Identity, AuthError>;

    /// Open an interactive link prompt for an already-authenticated identity.
    ///
    /// # Errors
    /// Returns `ProviderAlreadyLinked` or
    /// `AccountExistsWithDifferentCredential` per the backend contract.
    async fn link_interactive(
        &self,
        identity: &Identity,
        provider: Provider,
    ) -> Result<Identity, AuthError>;

    /// Sign-in methods already registered for an email. Empty when the email
    /// is unclaimed.
    ///
    /// # Errors
    /// Returns `Network` on lookup failure.
    async fn fetch_sign_in_methods_for_email(
        &self,
        email: &str,
    ) -> Result<Vec<SignInMethod>, AuthError>;

    /// Currently authenticated identity, if any.
    async fn current_user(&self) -> Option<Identity>;

    /// Clear the authenticated identity.
    async fn sign_out(&self);
}
