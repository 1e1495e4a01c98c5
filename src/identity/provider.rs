//! Capability-polymorphic federated provider abstraction
//!
//! Every provider variant answers the same questions (identifier, label,
//! email-disclosure behavior), so the linking flow is written once instead of
//! once per provider.

use serde::{Deserialize, Serialize};

/// Federated identity providers recognized by the linking flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Facebook,
    GitHub,
}

impl Provider {
    /// Provider identifier as the identity backend reports it.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Provider::Google => "google.com",
            Provider::Facebook => "facebook.com",
            Provider::GitHub => "github.com",
        }
    }

    /// Display label used in audit rows and user-facing messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Provider::Google => "Google",
            Provider::Facebook => "Facebook",
            Provider::GitHub => "GitHub",
        }
    }

    /// Whether a conflict error from this provider may arrive without the
    /// account's email. GitHub only discloses an address the user has made
    /// public, so recovery through its user API may be needed.
    #[must_use]
    pub const fn may_omit_email(self) -> bool {
        matches!(self, Provider::GitHub)
    }

    /// Parse a provider identifier ("google.com") or short name ("google").
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "google.com" | "google" => Some(Provider::Google),
            "facebook.com" | "facebook" => Some(Provider::Facebook),
            "github.com" | "github" => Some(Provider::GitHub),
            _ => None,
        }
    }

    /// All providers the system can open an interactive sign-in with.
    #[must_use]
    pub const fn all() -> [Provider; 3] {
        [Provider::Google, Provider::Facebook, Provider::GitHub]
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// A sign-in method already registered for an email, as returned by the
/// identity backend's method lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInMethod {
    Password,
    Federated(Provider),
    /// A federated method this system does not recognize.
    Unknown(String),
}

impl SignInMethod {
    #[must_use]
    pub fn from_method_id(id: &str) -> Self {
        if id == "password" {
            return SignInMethod::Password;
        }
        Provider::from_id(id).map_or_else(
            || SignInMethod::Unknown(id.to_string()),
            SignInMethod::Federated,
        )
    }
}
