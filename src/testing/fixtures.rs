//! Shared builders for integration tests

use crate::identity::client::{AuthError, AuthErrorCode, PendingCredential};
use crate::identity::provider::Provider;
use crate::identity::LocalDirectory;
use crate::ledger::{MemoryLocalStore, SessionLedger};
use crate::models::Identity;
use crate::store::MemoryStore;
use std::sync::Arc;

/// Identity registered with email/password only.
#[must_use]
pub fn password_identity() -> Identity {
    Identity {
        uid: "uid-ana".to_string(),
        display_name: Some("Ana".to_string()),
        email: Some("ana@example.com".to_string()),
        photo_url: None,
        providers: vec!["password".to_string()],
    }
}

/// Identity already holding a federated provider.
#[must_use]
pub fn federated_identity(provider: Provider) -> Identity {
    Identity {
        uid: "uid-ana".to_string(),
        display_name: Some("Ana".to_string()),
        email: Some("ana@example.com".to_string()),
        photo_url: None,
        providers: vec![provider.id().to_string()],
    }
}

/// The conflict error an identity backend raises when `provider` collides
/// with an existing account.
#[must_use]
pub fn conflict_error(provider: Provider, email: Option<&str>, token: &str) -> AuthError {
    AuthError {
        code: AuthErrorCode::AccountExistsWithDifferentCredential,
        message: "account exists with different credential".to_string(),
        email: email.map(str::to_string),
        credential: Some(PendingCredential {
            provider,
            token: token.to_string(),
            email_hint: email.map(str::to_string),
        }),
    }
}

/// Wired ledger over fresh in-memory parts.
#[must_use]
pub fn wired_ledger() -> (
    Arc<SessionLedger>,
    Arc<MemoryStore>,
    Arc<MemoryLocalStore>,
    Arc<LocalDirectory>,
) {
    let store = Arc::new(MemoryStore::new());
    let local = Arc::new(MemoryLocalStore::new());
    let directory = Arc::new(LocalDirectory::new());
    let ledger = Arc::new(SessionLedger::new(
        store.clone(),
        local.clone(),
        directory.clone(),
        "auditoria",
    ));
    (ledger, store, local, directory)
}
