//! Mock objects and fake implementations for isolated tests

use crate::identity::client::{AuthError, AuthErrorCode, IdentityClient, PendingCredential};
use crate::identity::provider::{Provider, SignInMethod};
use crate::linking::email_recovery::{
    AuthHeaderStyle, EmailEntry, ProviderUserApi, UserApiError, UserProfile,
};
use crate::models::Identity;
use crate::store::{Document, DocumentStore, Query, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Scripted identity backend recording every call the resolver makes.
#[derive(Default)]
pub struct MockIdentityClient {
    sign_in_methods: HashMap<String, Vec<SignInMethod>>,
    interactive_identities: HashMap<Provider, Identity>,
    link_result: Mutex<Option<Result<Identity, AuthError>>>,
    current: Mutex<Option<Identity>>,
    recorded_sign_ins: Mutex<Vec<Provider>>,
    recorded_links: Mutex<Vec<PendingCredential>>,
    recorded_interactive_links: Mutex<Vec<Provider>>,
    recorded_method_lookups: Mutex<Vec<String>>,
}

impl MockIdentityClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the methods returned for an email lookup.
    #[must_use]
    pub fn with_sign_in_methods(mut self, email: &str, methods: Vec<SignInMethod>) -> Self {
        self.sign_in_methods.insert(email.to_string(), methods);
        self
    }

    /// Script the identity an interactive sign-in with `provider` yields.
    #[must_use]
    pub fn with_interactive_identity(mut self, provider: Provider, identity: Identity) -> Self {
        self.interactive_identities.insert(provider, identity);
        self
    }

    /// Script the outcome of the next `link_with_credential` call.
    #[must_use]
    pub fn with_link_result(self, result: Result<Identity, AuthError>) -> Self {
        *self.link_result.lock().expect("mock lock poisoned") = Some(result);
        self
    }

    #[must_use]
    pub fn with_current_user(self, identity: Identity) -> Self {
        *self.current.lock().expect("mock lock poisoned") = Some(identity);
        self
    }

    /// Providers interactively signed in with, in call order.
    #[must_use]
    pub fn interactive_sign_ins(&self) -> Vec<Provider> {
        self.recorded_sign_ins.lock().expect("mock lock poisoned").clone()
    }

    /// Credentials passed to `link_with_credential`, in call order.
    #[must_use]
    pub fn linked_credentials(&self) -> Vec<PendingCredential> {
        self.recorded_links.lock().expect("mock lock poisoned").clone()
    }

    /// Providers passed to `link_interactive`, in call order.
    #[must_use]
    pub fn interactive_links(&self) -> Vec<Provider> {
        self.recorded_interactive_links
            .lock()
            .expect("mock lock poisoned")
            .clone()
    }

    /// Emails looked up through `fetch_sign_in_methods_for_email`.
    #[must_use]
    pub fn method_lookups(&self) -> Vec<String> {
        self.recorded_method_lookups
            .lock()
            .expect("mock lock poisoned")
            .clone()
    }
}

#[async_trait]
impl IdentityClient for MockIdentityClient {
    async fn sign_in_with_email_and_password(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<Identity, AuthError> {
        Err(AuthError::new(
            AuthErrorCode::UserNotFound,
            "not scripted in this mock",
        ))
    }

    async fn register_with_email_and_password(
        &self,
        _email: &str,
        _password: &str,
        _display_name: Option<&str>,
    ) -> Result<Identity, AuthError> {
        Err(AuthError::new(
            AuthErrorCode::EmailAlreadyInUse,
            "not scripted in this mock",
        ))
    }

    async fn sign_in_interactive(&self, provider: Provider) -> Result<Identity, AuthError> {
        self.recorded_sign_ins
            .lock()
            .expect("mock lock poisoned")
            .push(provider);
        self.interactive_identities.get(&provider).cloned().ok_or_else(|| {
            AuthError::new(AuthErrorCode::PopupClosed, "no scripted identity for provider")
        })
    }

    async fn link_with_credential(
        &self,
        identity: &Identity,
        credential: &PendingCredential,
    ) -> Result<Identity, AuthError> {
        self.recorded_links
            .lock()
            .expect("mock lock poisoned")
            .push(credential.clone());
        self.link_result
            .lock()
            .expect("mock lock poisoned")
            .clone()
            .unwrap_or_else(|| Ok(identity.clone()))
    }

    async fn link_interactive(
        &self,
        identity: &Identity,
        provider: Provider,
    ) -> Result<Identity, AuthError> {
        self.recorded_interactive_links
            .lock()
            .expect("mock lock poisoned")
            .push(provider);
        let mut linked = identity.clone();
        linked.providers.push(provider.id().to_string());
        Ok(linked)
    }

    async fn fetch_sign_in_methods_for_email(
        &self,
        email: &str,
    ) -> Result<Vec<SignInMethod>, AuthError> {
        self.recorded_method_lookups
            .lock()
            .expect("mock lock poisoned")
            .push(email.to_string());
        Ok(self.sign_in_methods.get(email).cloned().unwrap_or_default())
    }

    async fn current_user(&self) -> Option<Identity> {
        self.current.lock().expect("mock lock poisoned").clone()
    }

    async fn sign_out(&self) {
        *self.current.lock().expect("mock lock poisoned") = None;
    }
}

/// Scripted provider user API recording the probe sequence.
#[derive(Default)]
pub struct MockUserApi {
    profile_email: Option<String>,
    emails: Vec<EmailEntry>,
    reject_token_style: bool,
    calls: Mutex<Vec<String>>,
}

impl MockUserApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_profile_email(mut self, email: &str) -> Self {
        self.profile_email = Some(email.to_string());
        self
    }

    #[must_use]
    pub fn with_emails(mut self, emails: Vec<EmailEntry>) -> Self {
        self.emails = emails;
        self
    }

    /// Make the classic `token` header convention fail with 401 so callers
    /// have to fall back to `Bearer`.
    #[must_use]
    pub fn with_unauthorized_token_style(mut self) -> Self {
        self.reject_token_style = true;
        self
    }

    /// Probe calls in order, as `"<endpoint>:<style>"` labels.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("mock lock poisoned").clone()
    }

    fn record(&self, endpoint: &str, style: AuthHeaderStyle) -> Result<(), UserApiError> {
        self.calls
            .lock()
            .expect("mock lock poisoned")
            .push(format!("{endpoint}:{style:?}"));
        if self.reject_token_style && style == AuthHeaderStyle::Token {
            return Err(UserApiError::Unauthorized);
        }
        Ok(())
    }
}

#[async_trait]
impl ProviderUserApi for MockUserApi {
    async fn user_profile(
        &self,
        _token: &str,
        style: AuthHeaderStyle,
    ) -> Result<UserProfile, UserApiError> {
        self.record("profile", style)?;
        Ok(UserProfile {
            email: self.profile_email.clone(),
            login: None,
            name: None,
        })
    }

    async fn user_emails(
        &self,
        _token: &str,
        style: AuthHeaderStyle,
    ) -> Result<Vec<EmailEntry>, UserApiError> {
        self.record("emails", style)?;
        Ok(self.emails.clone())
    }
}

/// Document store whose writes to one collection always fail. Reads and
/// writes elsewhere pass through.
pub struct FailingCollectionStore<S> {
    inner: S,
    failing_collection: String,
}

impl<S: DocumentStore> FailingCollectionStore<S> {
    #[must_use]
    pub fn new(inner: S, failing_collection: &str) -> Self {
        Self {
            inner,
            failing_collection: failing_collection.to_string(),
        }
    }

    fn check(&self, collection: &str) -> Result<(), StoreError> {
        if collection == self.failing_collection {
            return Err(StoreError::Backend(format!(
                "simulated write failure on {collection}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for FailingCollectionStore<S> {
    async fn add_doc(&self, collection: &str, fields: Value) -> Result<String, StoreError> {
        self.check(collection)?;
        self.inner.add_doc(collection, fields).await
    }

    async fn update_doc(
        &self,
        collection: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), StoreError> {
        self.check(collection)?;
        self.inner.update_doc(collection, id, fields).await
    }

    async fn get_docs(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.inner.get_docs(collection, query).await
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check(collection)?;
        self.inner.delete_doc(collection, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linking::email_recovery::recover_email;

    #[tokio::test]
    async fn test_recovery_prefers_profile_email() {
        let api = MockUserApi::new().with_profile_email("pub@x.com");
        let email = recover_email(&api, "t").await;
        assert_eq!(email, Some("pub@x.com".to_string()));
        // Emails endpoint never consulted
        assert!(api.calls().iter().all(|c| c.starts_with("profile")));
    }

    #[tokio::test]
    async fn test_recovery_falls_back_to_bearer_header() {
        let api = MockUserApi::new()
            .with_unauthorized_token_style()
            .with_emails(vec![EmailEntry {
                email: "a@x.com".to_string(),
                primary: true,
                verified: true,
            }]);
        let email = recover_email(&api, "t").await;
        assert_eq!(email, Some("a@x.com".to_string()));
        assert_eq!(
            api.calls(),
            vec![
                "profile:Token".to_string(),
                "profile:Bearer".to_string(),
                "emails:Token".to_string(),
                "emails:Bearer".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_recovery_gives_up_without_addresses() {
        let api = MockUserApi::new();
        assert!(recover_email(&api, "t").await.is_none());
    }
}
