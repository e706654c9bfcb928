//! Cookie parsing and `Set-Cookie` construction for session material.

use axum::http::{HeaderMap, HeaderValue, header::InvalidHeaderValue};
use chrono::{DateTime, Utc};

use portal_auth::{ACCESS_TOKEN_COOKIE, Credentials, REFRESH_TOKEN_COOKIE, Session};

/// PKCE verifier kept between `/auth/oauth/{provider}` and `/auth/callback`.
pub const CODE_VERIFIER_COOKIE: &str = "portal-code-verifier";

const CODE_VERIFIER_MAX_AGE_SECS: i64 = 600;

/// Collect every `Cookie` header into a credential store.
pub fn credentials_from_headers(headers: &HeaderMap) -> Credentials {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CookieSettings {
    /// Add the `Secure` attribute (HTTPS deployments).
    pub secure: bool,
}

impl CookieSettings {
    fn cookie(&self, name: &str, value: &str, max_age_secs: i64) -> Result<HeaderValue, InvalidHeaderValue> {
        let secure = if self.secure { "; Secure" } else { "" };
        HeaderValue::from_str(&format!(
            "{name}={value}; Max-Age={max_age_secs}; Path=/; HttpOnly; SameSite=Lax{secure}"
        ))
    }

    /// Cookies carrying a freshly issued session.
    pub fn session_cookies(
        &self,
        session: &Session,
        now: DateTime<Utc>,
    ) -> Result<Vec<HeaderValue>, InvalidHeaderValue> {
        let max_age = (session.expires_at - now).num_seconds().max(0);

        let mut cookies = vec![self.cookie(ACCESS_TOKEN_COOKIE, &session.access_token, max_age)?];
        if let Some(refresh) = &session.refresh_token {
            cookies.push(self.cookie(REFRESH_TOKEN_COOKIE, refresh, max_age)?);
        }
        Ok(cookies)
    }

    pub fn clear_session_cookies(&self) -> Result<Vec<HeaderValue>, InvalidHeaderValue> {
        Ok(vec![
            self.cookie(ACCESS_TOKEN_COOKIE, "", 0)?,
            self.cookie(REFRESH_TOKEN_COOKIE, "", 0)?,
        ])
    }

    pub fn code_verifier_cookie(&self, verifier: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        self.cookie(CODE_VERIFIER_COOKIE, verifier, CODE_VERIFIER_MAX_AGE_SECS)
    }

    pub fn clear_code_verifier_cookie(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        self.cookie(CODE_VERIFIER_COOKIE, "", 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;
    use chrono::Duration;

    #[test]
    fn parses_multiple_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; portal-access-token=abc"));
        headers.append(COOKIE, HeaderValue::from_static("portal-refresh-token=def;junk; =x"));

        let creds = credentials_from_headers(&headers);

        assert_eq!(creds.get("theme"), Some("dark"));
        let claim = creds.session_claim().unwrap();
        assert_eq!(claim.access_token, "abc");
        assert_eq!(claim.refresh_token.as_deref(), Some("def"));
        assert_eq!(creds.get("junk"), None);
    }

    #[test]
    fn session_cookie_lifetime_follows_expiry() {
        let now = Utc::now();
        let session = Session {
            access_token: "tok".into(),
            refresh_token: None,
            token_type: "bearer".into(),
            expires_at: now + Duration::seconds(120),
        };

        let cookies = CookieSettings { secure: true }.session_cookies(&session, now).unwrap();

        assert_eq!(cookies.len(), 1);
        let value = cookies[0].to_str().unwrap();
        assert!(value.starts_with("portal-access-token=tok;"));
        assert!(value.contains("Max-Age=120"));
        assert!(value.contains("HttpOnly"));
        assert!(value.ends_with("; Secure"));
    }

    #[test]
    fn cleared_cookies_expire_immediately() {
        let cookies = CookieSettings::default().clear_session_cookies().unwrap();
        assert_eq!(cookies.len(), 2);
        for cookie in cookies {
            let value = cookie.to_str().unwrap();
            assert!(value.contains("Max-Age=0"));
            assert!(!value.contains("Secure"));
        }
    }
}
