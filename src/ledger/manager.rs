//! Session Ledger - audit bookkeeping service
//!
//! An explicit service object constructed once at startup and injected into
//! everything that records audit rows. Tracks at most one open session per
//! process, persists an open-session marker so a restart adopts the session
//! instead of double-counting it, and appends activity rows for catalog
//! mutations. Ledger write failures are logged and swallowed; they never
//! abort the operation that triggered them.

use crate::identity::client::IdentityClient;
use crate::ledger::local::{
    LocalStore, SESSION_ID_KEY, SESSION_START_KEY, SESSION_USER_KEY,
};
use crate::models::{ActivityKind, ActivityRecord, SessionRecord};
use crate::store::{server_timestamp, Direction, Document, DocumentStore, Query, StoreError};
use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Recovered open-session marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMarker {
    pub record_id: String,
    pub started_at: DateTime<Utc>,
    pub user: String,
}

#[derive(Debug, Clone)]
enum SessionState {
    NoSession,
    Open(SessionMarker),
}

pub struct SessionLedger {
    store: Arc<dyn DocumentStore>,
    local: Arc<dyn LocalStore>,
    client: Arc<dyn IdentityClient>,
    collection: String,
    state: Mutex<SessionState>,
}

impl SessionLedger {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        local: Arc<dyn LocalStore>,
        client: Arc<dyn IdentityClient>,
        collection: &str,
    ) -> Self {
        Self {
            store,
            local,
            client,
            collection: collection.to_string(),
            state: Mutex::new(SessionState::NoSession),
        }
    }

    /// Open a session record for the authenticated user, or adopt the one a
    /// previous run left behind. Returns the record id; `None` only when the
    /// ledger write failed (logged, never propagated).
    pub async fn start_session(&self) -> Option<String> {
        let mut state = self.state.lock().await;

        if let SessionState::Open(marker) = &*state {
            info!("session {} already open, not recording again", marker.record_id);
            return Some(marker.record_id.clone());
        }

        // A marker from before a restart counts as the current session as
        // long as somebody is still authenticated.
        if self.client.current_user().await.is_some() {
            if let Some(marker) = self.read_marker() {
                info!("recovered open session {}", marker.record_id);
                let id = marker.record_id.clone();
                *state = SessionState::Open(marker);
                return Some(id);
            }
        }

        let (user, email, method) = self.user_labels().await;
        let started_at = Utc::now();
        let record = SessionRecord {
            id: String::new(),
            action: "login".to_string(),
            kind: "sesion".to_string(),
            session_start: None,
            session_end: None,
            recorded_at: None,
            user: user.clone(),
            email,
            method,
        };
        let mut fields =
            serde_json::to_value(&record).expect("session record serializes to a JSON object");
        // The store substitutes the write-time instant for these
        fields["inicioSesion"] = server_timestamp();
        fields["fecha"] = server_timestamp();

        match self.store.add_doc(&self.collection, fields).await {
            Ok(record_id) => {
                self.local.set(SESSION_ID_KEY, &record_id);
                self.local.set(SESSION_START_KEY, &started_at.to_rfc3339());
                self.local.set(SESSION_USER_KEY, &user);
                info!(
                    "session {record_id} started for {user} ({}, {})",
                    record.email, record.method
                );
                *state = SessionState::Open(SessionMarker {
                    record_id: record_id.clone(),
                    started_at,
                    user,
                });
                Some(record_id)
            }
            Err(err) => {
                error!("failed to record session start: {err}");
                None
            }
        }
    }

    /// Close the open session and report its elapsed duration. A call with
    /// no open session or marker is a no-op, not an error.
    pub async fn end_session(&self) -> Option<Duration> {
        let mut state = self.state.lock().await;

        let marker = match &*state {
            SessionState::Open(marker) => marker.clone(),
            SessionState::NoSession => match self.read_marker() {
                Some(marker) => marker,
                None => {
                    warn!("no active session to close");
                    return None;
                }
            },
        };

        let elapsed = Utc::now() - marker.started_at;
        let update = json!({ "finSesion": server_timestamp() });
        if let Err(err) = self
            .store
            .update_doc(&self.collection, &marker.record_id, update)
            .await
        {
            // Leave the marker in place so a later attempt can still close it
            error!("failed to record session end: {err}");
            return None;
        }

        self.clear_marker();
        *state = SessionState::NoSession;
        info!(
            "session {} closed for {} after {}",
            marker.record_id,
            marker.user,
            super::duration::format_session_duration(elapsed)
        );
        Some(elapsed)
    }

    /// Append an activity row for a catalog mutation. Callable in any session
    /// state; failures are logged and swallowed.
    pub async fn record_activity(&self, action: ActivityKind, category: &str, description: &str) {
        let user = match self.local.get(SESSION_USER_KEY) {
            Some(user) => user,
            None => self.user_labels().await.0,
        };
        let record = ActivityRecord {
            id: String::new(),
            action,
            category: category.to_string(),
            description: description.to_string(),
            recorded_at: None,
            user,
        };
        let mut fields =
            serde_json::to_value(&record).expect("activity record serializes to a JSON object");
        fields["fecha"] = server_timestamp();
        if let Err(err) = self.store.add_doc(&self.collection, fields).await {
            warn!("failed to record {action} activity on {category}: {err}");
        }
    }

    /// Recover the persisted open-session marker, if any, into the in-memory
    /// state. Returns the marker that is now current.
    pub async fn recover_session(&self) -> Option<SessionMarker> {
        let mut state = self.state.lock().await;
        if let SessionState::Open(marker) = &*state {
            return Some(marker.clone());
        }
        let marker = self.read_marker()?;
        info!("session {} recovered from local marker", marker.record_id);
        *state = SessionState::Open(marker.clone());
        Some(marker)
    }

    /// Most recent audit rows, newest first.
    ///
    /// # Errors
    /// Propagates store read failures; reads are not bookkeeping.
    pub async fn audit_trail(&self, limit: usize) -> Result<Vec<Document>, StoreError> {
        let query = Query::new()
            .order_by("fecha", Direction::Descending)
            .limit(limit);
        self.store.get_docs(&self.collection, &query).await
    }

    async fn user_labels(&self) -> (String, String, String) {
        match self.client.current_user().await {
            Some(identity) => (
                identity.label(),
                identity.email_label(),
                identity.auth_method_label(),
            ),
            None => (
                "Usuario".to_string(),
                "Sin correo".to_string(),
                "N/A".to_string(),
            ),
        }
    }

    fn read_marker(&self) -> Option<SessionMarker> {
        let record_id = self.local.get(SESSION_ID_KEY)?;
        let started_at = self
            .local
            .get(SESSION_START_KEY)
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc))?;
        let user = self
            .local
            .get(SESSION_USER_KEY)
            .unwrap_or_else(|| "Usuario".to_string());
        Some(SessionMarker {
            record_id,
            started_at,
            user,
        })
    }

    fn clear_marker(&self) {
        self.local.remove(SESSION_ID_KEY);
        self.local.remove(SESSION_START_KEY);
        self.local.remove(SESSION_USER_KEY);
    }
}
