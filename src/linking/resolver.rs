//! Account-link conflict resolution
//!
//! Converts an "email already belongs to an account under a different
//! provider" sign-in failure into a linked identity when that can be done
//! without asking the user for a secret, and into actionable guidance when it
//! cannot. Steps run strictly in sequence: email discovery, then method
//! discovery, then at most one interactive sign-in and one link write.

use crate::identity::client::{AuthError, AuthErrorCode, IdentityClient, PendingCredential};
use crate::identity::provider::{Provider, SignInMethod};
use crate::linking::email_recovery::{recover_email, ProviderUserApi};
use crate::models::Identity;
use log::{info, warn};
use std::sync::Arc;

/// Guidance surfaced when no automatic merge is possible.
pub const MANUAL_LINK_GUIDANCE: &str =
    "sign in with the original provider first, then link this one from the profile";

/// Guidance surfaced when the existing account uses a password.
pub const PASSWORD_FIRST_GUIDANCE: &str =
    "sign in with your email and password first, then link this provider from the profile";

/// Terminal outcomes of a linking attempt.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The identity backend rejected an operation; code and message are
    /// surfaced verbatim.
    #[error("provider error {code}: {message}")]
    Provider { code: String, message: String },

    /// No email could be determined for an automatic merge, or there is
    /// nothing to link against.
    #[error("conflict cannot be resolved automatically: {0}")]
    ConflictUnresolvable(String),

    /// A merge is possible in principle but needs a secret the system cannot
    /// supply.
    #[error("manual step required: {0}")]
    ManualStepRequired(String),

    /// The existing account uses a federated method this system does not
    /// recognize.
    #[error("unsupported sign-in method: {0}")]
    UnsupportedMethod(String),

    /// The credential is already linked to an account; no state change.
    #[error("credential already linked to an account")]
    AlreadyLinked,
}

impl LinkError {
    fn provider(err: &AuthError) -> Self {
        LinkError::Provider {
            code: err.code.as_str().to_string(),
            message: err.message.clone(),
        }
    }
}

/// Resolves provider conflicts and drives voluntary provider linking.
pub struct AccountLinkResolver {
    client: Arc<dyn IdentityClient>,
    user_api: Arc<dyn ProviderUserApi>,
}

impl AccountLinkResolver {
    #[must_use]
    pub fn new(client: Arc<dyn IdentityClient>, user_api: Arc<dyn ProviderUserApi>) -> Self {
        Self { client, user_api }
    }

    /// Resolve a `account-exists-with-different-credential` failure from an
    /// attempted sign-in with `attempted`.
    ///
    /// # Errors
    /// See [`LinkError`]; every terminal outcome is distinguishable.
    pub async fn resolve_provider_conflict(
        &self,
        error: &AuthError,
        attempted: Provider,
    ) -> Result<Identity, LinkError> {
        if error.code != AuthErrorCode::AccountExistsWithDifferentCredential {
            return Err(LinkError::provider(error));
        }

        let credential = error.credential_from_error().cloned();

        // Step 1 - email discovery
        let email = match self.discover_email(error, attempted, credential.as_ref()).await {
            Some(email) => email,
            None => {
                warn!("conflict for {attempted} carried no recoverable email");
                return Err(LinkError::ConflictUnresolvable(
                    MANUAL_LINK_GUIDANCE.to_string(),
                ));
            }
        };

        // Step 2 - method discovery
        let methods = self
            .client
            .fetch_sign_in_methods_for_email(&email)
            .await
            .map_err(|e| LinkError::provider(&e))?;

        if methods.is_empty() {
            // The backend claims the email is taken but lists no methods
            return Err(LinkError::ConflictUnresolvable(format!(
                "no existing sign-in methods registered for {email}"
            )));
        }
        if methods.contains(&SignInMethod::Password) {
            // A password cannot be obtained programmatically
            return Err(LinkError::ManualStepRequired(
                PASSWORD_FIRST_GUIDANCE.to_string(),
            ));
        }
        if let Some(unknown) = methods.iter().find_map(|m| match m {
            SignInMethod::Unknown(id) => Some(id.clone()),
            _ => None,
        }) {
            return Err(LinkError::UnsupportedMethod(unknown));
        }
        let existing = methods
            .iter()
            .find_map(|m| match m {
                SignInMethod::Federated(p) => Some(*p),
                _ => None,
            })
            .ok_or_else(|| {
                LinkError::ConflictUnresolvable(format!(
                    "no federated sign-in method registered for {email}"
                ))
            })?;

        // Without a pending credential there is nothing to link afterwards,
        // so do not open the fallback prompt at all.
        let Some(credential) = credential else {
            return Err(LinkError::ConflictUnresolvable(
                MANUAL_LINK_GUIDANCE.to_string(),
            ));
        };

        // Step 3 - fallback sign-in with the existing provider, then link
        info!(
            "resolving {attempted} conflict for {email} via existing provider {existing}"
        );
        let identity = self
            .client
            .sign_in_interactive(existing)
            .await
            .map_err(|e| LinkError::provider(&e))?;

        let linked = self.link(&identity, &credential).await?;
        info!(
            "linked {} onto account {} (providers: {:?})",
            attempted,
            linked.uid,
            linked.providers
        );
        Ok(linked)
    }

    /// Voluntarily add another provider to an already-authenticated identity.
    ///
    /// # Errors
    /// `AlreadyLinked` if the provider is already present,
    /// `ManualStepRequired` if the provider account's email belongs to a
    /// different account, `Provider` for anything else the backend reports.
    pub async fn link_provider_to_current_user(
        &self,
        identity: &Identity,
        provider: Provider,
    ) -> Result<Identity, LinkError> {
        if identity.has_provider(provider.id()) {
            return Err(LinkError::AlreadyLinked);
        }
        self.client
            .link_interactive(identity, provider)
            .await
            .map_err(|e| match e.code {
                AuthErrorCode::ProviderAlreadyLinked => LinkError::AlreadyLinked,
                AuthErrorCode::AccountExistsWithDifferentCredential => {
                    LinkError::ManualStepRequired(format!(
                        "sign in with {} first, then link from the profile",
                        provider.label()
                    ))
                }
                _ => LinkError::provider(&e),
            })
    }

    async fn discover_email(
        &self,
        error: &AuthError,
        attempted: Provider,
        credential: Option<&PendingCredential>,
    ) -> Option<String> {
        if let Some(email) = &error.email {
            return Some(email.clone());
        }
        if let Some(email) = credential.and_then(|c| c.email_hint.clone()) {
            return Some(email);
        }
        if attempted.may_omit_email() {
            if let Some(credential) = credential {
                info!("probing {attempted} user API to recover the conflicting email");
                return recover_email(self.user_api.as_ref(), &credential.token).await;
            }
        }
        None
    }

    async fn link(
        &self,
        identity: &Identity,
        credential: &PendingCredential,
    ) -> Result<Identity, LinkError> {
        self.client
            .link_with_credential(identity, credential)
            .await
            .map_err(|e| match e.code {
                AuthErrorCode::CredentialAlreadyInUse => LinkError::AlreadyLinked,
                _ => LinkError::provider(&e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock::{MockIdentityClient, MockUserApi};

    fn conflict_error(
        attempted: Provider,
        email: Option<&str>,
        token: Option<&str>,
    ) -> AuthError {
        AuthError {
            code: AuthErrorCode::AccountExistsWithDifferentCredential,
            message: "account exists with different credential".to_string(),
            email: email.map(ToString::to_string),
            credential: token.map(|t| PendingCredential {
                provider: attempted,
                token: t.to_string(),
                email_hint: email.map(ToString::to_string),
            }),
        }
    }

    fn resolver(
        client: MockIdentityClient,
        api: MockUserApi,
    ) -> (AccountLinkResolver, Arc<MockIdentityClient>, Arc<MockUserApi>) {
        let client = Arc::new(client);
        let api = Arc::new(api);
        (
            AccountLinkResolver::new(client.clone(), api.clone()),
            client,
            api,
        )
    }

    #[tokio::test]
    async fn test_password_method_requires_manual_step() {
        let client = MockIdentityClient::new()
            .with_sign_in_methods("ana@example.com", vec![SignInMethod::Password]);
        let (resolver, client, _) = resolver(client, MockUserApi::new());

        let err = resolver
            .resolve_provider_conflict(
                &conflict_error(Provider::Google, Some("ana@example.com"), Some("t1")),
                Provider::Google,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LinkError::ManualStepRequired(_)));
        // No sign-in popup may be opened for the password case
        assert!(client.interactive_sign_ins().is_empty());
    }

    #[tokio::test]
    async fn test_federated_conflict_links_credential() {
        let merged = Identity {
            uid: "u1".to_string(),
            display_name: Some("Ana".to_string()),
            email: Some("ana@example.com".to_string()),
            photo_url: None,
            providers: vec!["google.com".to_string(), "github.com".to_string()],
        };
        let client = MockIdentityClient::new()
            .with_sign_in_methods(
                "ana@example.com",
                vec![SignInMethod::Federated(Provider::Google)],
            )
            .with_interactive_identity(Provider::Google, merged.clone())
            .with_link_result(Ok(merged.clone()));
        let (resolver, client, _) = resolver(client, MockUserApi::new());

        let identity = resolver
            .resolve_provider_conflict(
                &conflict_error(Provider::GitHub, Some("ana@example.com"), Some("t1")),
                Provider::GitHub,
            )
            .await
            .unwrap();

        assert!(identity.has_provider("google.com"));
        assert!(identity.has_provider("github.com"));
        assert_eq!(client.interactive_sign_ins(), vec![Provider::Google]);
        let linked = client.linked_credentials();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].provider, Provider::GitHub);
        assert_eq!(linked[0].token, "t1");
    }

    #[tokio::test]
    async fn test_unknown_method_is_unsupported() {
        let client = MockIdentityClient::new().with_sign_in_methods(
            "ana@example.com",
            vec![SignInMethod::Unknown("twitter.com".to_string())],
        );
        let (resolver, _, _) = resolver(client, MockUserApi::new());

        let err = resolver
            .resolve_provider_conflict(
                &conflict_error(Provider::Google, Some("ana@example.com"), Some("t1")),
                Provider::Google,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::UnsupportedMethod(m) if m == "twitter.com"));
    }

    #[tokio::test]
    async fn test_empty_methods_is_unresolvable() {
        let client =
            MockIdentityClient::new().with_sign_in_methods("ana@example.com", vec![]);
        let (resolver, _, _) = resolver(client, MockUserApi::new());

        let err = resolver
            .resolve_provider_conflict(
                &conflict_error(Provider::Google, Some("ana@example.com"), Some("t1")),
                Provider::Google,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::ConflictUnresolvable(_)));
    }

    #[tokio::test]
    async fn test_email_recovered_through_user_api() {
        use crate::linking::email_recovery::EmailEntry;

        let merged = Identity {
            uid: "u1".to_string(),
            display_name: None,
            email: Some("b@x.com".to_string()),
            photo_url: None,
            providers: vec!["google.com".to_string(), "github.com".to_string()],
        };
        let client = MockIdentityClient::new()
            .with_sign_in_methods("b@x.com", vec![SignInMethod::Federated(Provider::Google)])
            .with_interactive_identity(Provider::Google, merged.clone())
            .with_link_result(Ok(merged));
        let api = MockUserApi::new().with_emails(vec![
            EmailEntry {
                email: "a@x.com".to_string(),
                primary: false,
                verified: true,
            },
            EmailEntry {
                email: "b@x.com".to_string(),
                primary: true,
                verified: true,
            },
        ]);
        let (resolver, client, api) = resolver(client, api);

        // GitHub conflict with no disclosed email anywhere
        let identity = resolver
            .resolve_provider_conflict(
                &conflict_error(Provider::GitHub, None, Some("gh_token")),
                Provider::GitHub,
            )
            .await
            .unwrap();

        assert!(identity.has_provider("github.com"));
        // Primary+verified address won over the other verified one
        assert_eq!(
            client.method_lookups(),
            vec!["b@x.com".to_string()]
        );
        // Profile endpoint was probed before the emails endpoint
        let calls = api.calls();
        assert!(calls.iter().any(|c| c.starts_with("profile")));
        assert!(calls.iter().any(|c| c.starts_with("emails")));
        assert!(
            calls.iter().position(|c| c.starts_with("profile")).unwrap()
                < calls.iter().position(|c| c.starts_with("emails")).unwrap()
        );
    }

    #[tokio::test]
    async fn test_unrecoverable_email_is_unresolvable() {
        let client = MockIdentityClient::new();
        let api = MockUserApi::new(); // no profile email, no entries
        let (resolver, client, _) = resolver(client, api);

        let err = resolver
            .resolve_provider_conflict(
                &conflict_error(Provider::GitHub, None, Some("gh_token")),
                Provider::GitHub,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::ConflictUnresolvable(_)));
        assert!(client.interactive_sign_ins().is_empty());
    }

    #[tokio::test]
    async fn test_already_linked_credential() {
        let signed_in = Identity {
            uid: "u1".to_string(),
            display_name: None,
            email: Some("ana@example.com".to_string()),
            photo_url: None,
            providers: vec!["google.com".to_string()],
        };
        let client = MockIdentityClient::new()
            .with_sign_in_methods(
                "ana@example.com",
                vec![SignInMethod::Federated(Provider::Google)],
            )
            .with_interactive_identity(Provider::Google, signed_in)
            .with_link_result(Err(AuthError::new(
                AuthErrorCode::CredentialAlreadyInUse,
                "credential already in use",
            )));
        let (resolver, _, _) = resolver(client, MockUserApi::new());

        let err = resolver
            .resolve_provider_conflict(
                &conflict_error(Provider::GitHub, Some("ana@example.com"), Some("t1")),
                Provider::GitHub,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::AlreadyLinked));
    }

    #[tokio::test]
    async fn test_voluntary_link_rejects_present_provider() {
        let identity = Identity {
            uid: "u1".to_string(),
            display_name: None,
            email: Some("ana@example.com".to_string()),
            photo_url: None,
            providers: vec!["google.com".to_string()],
        };
        let (resolver, client, _) =
            resolver(MockIdentityClient::new(), MockUserApi::new());

        let err = resolver
            .link_provider_to_current_user(&identity, Provider::Google)
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::AlreadyLinked));
        assert!(client.interactive_links().is_empty());
    }
}
