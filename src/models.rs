use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// One authenticated end user, stable across sign-in methods once linked.
///
/// `providers` holds the linked provider identifiers as the identity backend
/// reports them ("password", "google.com", "github.com", "facebook.com").
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    pub providers: Vec<String>,
}

impl Identity {
    /// User-facing label for audit rows: display name, else email, else a
    /// generic placeholder.
    #[must_use]
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| "Usuario".to_string())
    }

    /// Email label for audit rows.
    #[must_use]
    pub fn email_label(&self) -> String {
        self.email
            .clone()
            .unwrap_or_else(|| "Sin correo".to_string())
    }

    #[must_use]
    pub fn has_provider(&self, provider_id: &str) -> bool {
        self.providers.iter().any(|p| p == provider_id)
    }

    /// Human-readable label for the authentication method, derived from the
    /// first linked provider.
    #[must_use]
    pub fn auth_method_label(&self) -> String {
        self.providers
            .first()
            .map_or_else(|| "N/A".to_string(), |id| method_label(id))
    }
}

/// Map a provider identifier to the label recorded in audit rows.
#[must_use]
pub fn method_label(provider_id: &str) -> String {
    match provider_id {
        "google.com" => "Google".to_string(),
        "password" => "Correo/Contraseña".to_string(),
        "facebook.com" => "Facebook".to_string(),
        "twitter.com" => "Twitter".to_string(),
        "github.com" => "GitHub".to_string(),
        other => other.to_string(),
    }
}

/// Catalog mutation kind as stored in the `accion` field.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityKind {
    #[serde(rename = "crear")]
    Create,
    #[serde(rename = "editar")]
    Update,
    #[serde(rename = "eliminar")]
    Delete,
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActivityKind::Create => "crear",
            ActivityKind::Update => "editar",
            ActivityKind::Delete => "eliminar",
        };
        f.write_str(s)
    }
}

/// One row in the audit ledger describing a single continuous authenticated
/// session. The serde renames are the document wire contract; the record id
/// is store-assigned and carried separately.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SessionRecord {
    #[serde(skip, default)]
    pub id: String,
    #[serde(rename = "accion")]
    pub action: String,
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "inicioSesion")]
    pub session_start: Option<DateTime<Utc>>,
    #[serde(rename = "finSesion")]
    pub session_end: Option<DateTime<Utc>>,
    #[serde(rename = "fecha")]
    pub recorded_at: Option<DateTime<Utc>>,
    #[serde(rename = "usuario")]
    pub user: String,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(rename = "metodo")]
    pub method: String,
}

/// One append-only row describing a catalog mutation. Never updated or
/// deleted once written.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ActivityRecord {
    #[serde(skip, default)]
    pub id: String,
    #[serde(rename = "accion")]
    pub action: ActivityKind,
    #[serde(rename = "tipo")]
    pub category: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "fecha")]
    pub recorded_at: Option<DateTime<Utc>>,
    #[serde(rename = "usuario")]
    pub user: String,
}
