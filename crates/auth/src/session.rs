//! Session material, user records and inbound credentials.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use portal_core::UserId;

/// Cookie holding the access token (the locally cached session claim).
pub const ACCESS_TOKEN_COOKIE: &str = "portal-access-token";

/// Cookie holding the refresh token, when the identity provider issued one.
pub const REFRESH_TOKEN_COOKIE: &str = "portal-refresh-token";

/// Token material issued by the identity backend.
///
/// Owned by the request context for the request's lifetime only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// Tokens never reach logs.
impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Canonical user record, as returned by the identity backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl User {
    pub fn new(id: UserId, email: Option<String>) -> Self {
        Self {
            id,
            email,
            metadata: serde_json::Value::Null,
        }
    }

    /// Name shown in the UI: `metadata.name`, else the email local part,
    /// else `"User"`.
    pub fn display_name(&self) -> String {
        if let Some(name) = self
            .metadata
            .get("name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
        {
            return name.to_string();
        }

        self.email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or("User")
            .to_string()
    }
}

/// An unverified session claim read from the request's cookies.
///
/// Nothing here has been checked: the access token may be forged, tampered
/// with or expired. Only `IdentityBackend::validate_and_fetch_user` turns it
/// into a `(Session, User)` pair.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionClaim {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl core::fmt::Debug for SessionClaim {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionClaim").finish_non_exhaustive()
    }
}

/// Inbound credential store (the request's cookie jar).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    cookies: HashMap<String, String>,
}

/// Lists cookie names only.
impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut names: Vec<&str> = self.cookies.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Credentials").field("cookies", &names).finish()
    }
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Later values for the same name win.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// The locally cached session claim, if any.
    ///
    /// An empty access-token cookie counts as absent.
    pub fn session_claim(&self) -> Option<SessionClaim> {
        let access_token = self
            .get(ACCESS_TOKEN_COOKIE)
            .map(str::trim)
            .filter(|t| !t.is_empty())?;

        let refresh_token = self
            .get(REFRESH_TOKEN_COOKIE)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Some(SessionClaim {
            access_token: access_token.to_string(),
            refresh_token,
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Credentials {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut creds = Credentials::new();
        for (k, v) in iter {
            creds.insert(k, v);
        }
        creds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_cookie_means_no_claim() {
        assert!(Credentials::new().session_claim().is_none());
        let creds = Credentials::new().with_cookie("theme", "dark");
        assert!(creds.session_claim().is_none());
    }

    #[test]
    fn blank_access_token_means_no_claim() {
        let creds = Credentials::new().with_cookie(ACCESS_TOKEN_COOKIE, "   ");
        assert!(creds.session_claim().is_none());
    }

    #[test]
    fn claim_carries_both_tokens() {
        let creds = Credentials::new()
            .with_cookie(ACCESS_TOKEN_COOKIE, "abc")
            .with_cookie(REFRESH_TOKEN_COOKIE, "def");
        let claim = creds.session_claim().unwrap();
        assert_eq!(claim.access_token, "abc");
        assert_eq!(claim.refresh_token.as_deref(), Some("def"));
    }

    #[test]
    fn debug_output_hides_tokens() {
        let session = Session {
            access_token: "secret-token".into(),
            refresh_token: Some("secret-refresh".into()),
            token_type: "bearer".into(),
            expires_at: Utc::now(),
        };
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret"));

        let claim = SessionClaim {
            access_token: "secret-token".into(),
            refresh_token: None,
        };
        assert!(!format!("{claim:?}").contains("secret"));

        let creds = Credentials::new().with_cookie(ACCESS_TOKEN_COOKIE, "secret-token");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains(ACCESS_TOKEN_COOKIE));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn display_name_falls_back_to_email_then_default() {
        let mut user = User::new(UserId::new(), Some("ada@example.com".into()));
        assert_eq!(user.display_name(), "ada");

        user.metadata = json!({ "name": "Ada Lovelace" });
        assert_eq!(user.display_name(), "Ada Lovelace");

        let anonymous = User::new(UserId::new(), None);
        assert_eq!(anonymous.display_name(), "User");
    }
}
