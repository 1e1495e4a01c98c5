//! Best-effort email recovery through a provider's own user API
//!
//! GitHub only discloses an email on a conflict error when the user's account
//! exposes a public address. The fallback probes the provider's user-profile
//! and user-emails endpoints with the pending credential's token, trying each
//! authorization header convention in order, and selects an address by an
//! explicit priority rule: primary+verified, then any verified, then the
//! first returned.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

/// Authorization header conventions accepted by provider APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthHeaderStyle {
    /// `Authorization: token <value>` (classic GitHub convention)
    Token,
    /// `Authorization: Bearer <value>`
    Bearer,
}

impl AuthHeaderStyle {
    #[must_use]
    pub fn header_value(self, token: &str) -> String {
        match self {
            AuthHeaderStyle::Token => format!("token {token}"),
            AuthHeaderStyle::Bearer => format!("Bearer {token}"),
        }
    }

    /// Conventions in the order they are tried.
    #[must_use]
    pub const fn all() -> [AuthHeaderStyle; 2] {
        [AuthHeaderStyle::Token, AuthHeaderStyle::Bearer]
    }
}

/// Profile document returned by the user endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    /// Public email, when the account exposes one.
    pub email: Option<String>,
    pub login: Option<String>,
    pub name: Option<String>,
}

/// One entry from the user-emails endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailEntry {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum UserApiError {
    #[error("user API request failed: {0}")]
    Request(String),
    #[error("user API rejected the token")]
    Unauthorized,
}

/// The slice of a provider's user API the recovery flow needs.
#[async_trait]
pub trait ProviderUserApi: Send + Sync {
    /// Fetch the token owner's profile.
    ///
    /// # Errors
    /// Returns `Unauthorized` when the header convention is not accepted.
    async fn user_profile(
        &self,
        token: &str,
        style: AuthHeaderStyle,
    ) -> Result<UserProfile, UserApiError>;

    /// Fetch the token owner's email addresses.
    ///
    /// # Errors
    /// Returns `Unauthorized` when the header convention is not accepted.
    async fn user_emails(
        &self,
        token: &str,
        style: AuthHeaderStyle,
    ) -> Result<Vec<EmailEntry>, UserApiError>;
}

/// Select an address by the priority rule: primary+verified, then verified,
/// then the first returned.
#[must_use]
pub fn pick_address(entries: &[EmailEntry]) -> Option<String> {
    entries
        .iter()
        .find(|e| e.primary && e.verified)
        .or_else(|| entries.iter().find(|e| e.verified))
        .or_else(|| entries.first())
        .map(|e| e.email.clone())
}

/// Recover an email for the token's owner, or `None` when every strategy
/// comes up empty.
///
/// The profile endpoint is consulted first (it may carry a public address),
/// then the emails endpoint; each endpoint is tried with every header
/// convention before moving on.
pub async fn recover_email(api: &dyn ProviderUserApi, token: &str) -> Option<String> {
    for style in AuthHeaderStyle::all() {
        match api.user_profile(token, style).await {
            Ok(profile) => {
                if let Some(email) = profile.email {
                    return Some(email);
                }
                // Profile fetched but no public address; no point retrying
                // the same endpoint with another convention.
                break;
            }
            Err(err) => {
                log::debug!("profile probe with {style:?} header failed: {err}");
            }
        }
    }

    for style in AuthHeaderStyle::all() {
        match api.user_emails(token, style).await {
            Ok(entries) => return pick_address(&entries),
            Err(err) => {
                log::debug!("emails probe with {style:?} header failed: {err}");
            }
        }
    }

    None
}

/// GitHub user API client.
pub struct GithubUserApi {
    http: reqwest::Client,
    api_base: Url,
}

impl GithubUserApi {
    /// Build a client against a custom API base (tests point this at a local
    /// server).
    ///
    /// # Errors
    /// Returns an error if the base URL cannot be parsed.
    pub fn new(api_base: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            http: reqwest::Client::new(),
            api_base: Url::parse(api_base)?,
        })
    }

    /// Client against the public GitHub API.
    #[must_use]
    pub fn public() -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: Url::parse("https://api.github.com").expect("static URL is valid"),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, UserApiError> {
        self.api_base
            .join(path)
            .map_err(|e| UserApiError::Request(e.to_string()))
    }

    async fn get(
        &self,
        path: &str,
        token: &str,
        style: AuthHeaderStyle,
    ) -> Result<reqwest::Response, UserApiError> {
        let response = self
            .http
            .get(self.endpoint(path)?)
            .header("Authorization", style.header_value(token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", concat!("tendero/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| UserApiError::Request(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(UserApiError::Unauthorized);
        }
        if !response.status().is_success() {
            return Err(UserApiError::Request(format!(
                "unexpected status {}",
                response.status()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl ProviderUserApi for GithubUserApi {
    async fn user_profile(
        &self,
        token: &str,
        style: AuthHeaderStyle,
    ) -> Result<UserProfile, UserApiError> {
        self.get("/user", token, style)
            .await?
            .json()
            .await
            .map_err(|e| UserApiError::Request(e.to_string()))
    }

    async fn user_emails(
        &self,
        token: &str,
        style: AuthHeaderStyle,
    ) -> Result<Vec<EmailEntry>, UserApiError> {
        self.get("/user/emails", token, style)
            .await?
            .json()
            .await
            .map_err(|e| UserApiError::Request(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(email: &str, primary: bool, verified: bool) -> EmailEntry {
        EmailEntry {
            email: email.to_string(),
            primary,
            verified,
        }
    }

    #[test]
    fn test_pick_address_prefers_primary_verified() {
        let entries = vec![
            entry("a@x.com", false, true),
            entry("b@x.com", true, true),
        ];
        assert_eq!(pick_address(&entries), Some("b@x.com".to_string()));
    }

    #[test]
    fn test_pick_address_falls_back_to_verified() {
        let entries = vec![
            entry("a@x.com", false, false),
            entry("b@x.com", false, true),
        ];
        assert_eq!(pick_address(&entries), Some("b@x.com".to_string()));
    }

    #[test]
    fn test_pick_address_falls_back_to_first() {
        let entries = vec![
            entry("a@x.com", false, false),
            entry("b@x.com", false, false),
        ];
        assert_eq!(pick_address(&entries), Some("a@x.com".to_string()));
        assert_eq!(pick_address(&[]), None);
    }

    #[test]
    fn test_header_conventions() {
        assert_eq!(
            AuthHeaderStyle::Token.header_value("t0"),
            "token t0".to_string()
        );
        assert_eq!(
            AuthHeaderStyle::Bearer.header_value("t0"),
            "Bearer t0".to_string()
        );
    }

    #[test]
    fn test_email_entry_defaults() {
        // GitHub omits flags it considers false
        let parsed: EmailEntry = serde_json::from_str(r#"{"email":"a@x.com"}"#).unwrap();
        assert!(!parsed.primary);
        assert!(!parsed.verified);
    }
}
