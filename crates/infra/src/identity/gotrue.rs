//! HTTP client for a GoTrue-compatible auth server (e.g. Supabase Auth).
//!
//! No retries: a transport failure surfaces as `IdentityError::Unavailable`
//! and the pipeline turns it into a fail-closed decision.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use portal_auth::{IdentityBackend, IdentityError, OAuthRedirect, Session, SessionClaim, User};
use portal_core::UserId;

use super::random_token;

pub struct GoTrueIdentityBackend {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

/// Wire shape of a GoTrue user.
#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: UserId,
    email: Option<String>,
    #[serde(default)]
    user_metadata: serde_json::Value,
}

impl From<GoTrueUser> for User {
    fn from(u: GoTrueUser) -> Self {
        User {
            id: u.id,
            email: u.email.filter(|e| !e.is_empty()),
            metadata: u.user_metadata,
        }
    }
}

/// Wire shape of a GoTrue token grant.
#[derive(Debug, Deserialize)]
struct GoTrueSession {
    access_token: String,
    refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: GoTrueUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl GoTrueSession {
    fn into_parts(self) -> (Session, User) {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .or_else(|| self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)))
            .unwrap_or_else(Utc::now);

        let session = Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_at,
        };
        (session, self.user.into())
    }
}

#[derive(Debug, Deserialize)]
struct ExpiryOnly {
    exp: i64,
}

impl GoTrueIdentityBackend {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, IdentityError> {
        // Endpoints are joined relative to the base, which needs a trailing slash.
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&base_url)
            .map_err(|e| IdentityError::Unavailable(format!("invalid identity url: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        self.base_url
            .join(path)
            .map_err(|e| IdentityError::Unavailable(format!("invalid endpoint {path}: {e}")))
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, IdentityError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        self.client
            .post(url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(unavailable)
    }
}

/// `BASE64URL(SHA256(verifier))`, unpadded (RFC 7636 §4.2).
fn pkce_challenge(code_verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()))
}

fn unavailable(e: reqwest::Error) -> IdentityError {
    tracing::debug!(error = %e, "identity server request failed");
    IdentityError::Unavailable(e.to_string())
}

async fn read_session(res: reqwest::Response) -> Result<(Session, User), IdentityError> {
    let session: GoTrueSession = res.json().await.map_err(unavailable)?;
    Ok(session.into_parts())
}

/// Read `exp` from a token the server has just accepted.
fn token_expiry(token: &str) -> Result<DateTime<Utc>, IdentityError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;

    let data = jsonwebtoken::decode::<ExpiryOnly>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|_| IdentityError::InvalidToken)?;
    DateTime::<Utc>::from_timestamp(data.claims.exp, 0).ok_or(IdentityError::InvalidToken)
}

#[async_trait]
impl IdentityBackend for GoTrueIdentityBackend {
    async fn validate_and_fetch_user(
        &self,
        claim: &SessionClaim,
    ) -> Result<(Session, User), IdentityError> {
        let res = self
            .client
            .get(self.endpoint("auth/v1/user")?)
            .header("apikey", &self.api_key)
            .bearer_auth(&claim.access_token)
            .send()
            .await
            .map_err(unavailable)?;

        match res.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(IdentityError::InvalidToken);
            }
            status => {
                tracing::warn!(%status, "unexpected status from user lookup");
                return Err(IdentityError::Unavailable(format!(
                    "user lookup returned {status}"
                )));
            }
        }

        let user: GoTrueUser = res.json().await.map_err(unavailable)?;
        let session = Session {
            access_token: claim.access_token.clone(),
            refresh_token: claim.refresh_token.clone(),
            token_type: "bearer".to_string(),
            expires_at: token_expiry(&claim.access_token)?,
        };
        Ok((session, user.into()))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Session, User), IdentityError> {
        let res = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;

        match res.status() {
            s if s.is_success() => read_session(res).await,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                Err(IdentityError::InvalidCredentials)
            }
            status => Err(IdentityError::Unavailable(format!("sign-in returned {status}"))),
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<(Session, User), IdentityError> {
        let res = self
            .client
            .post(self.endpoint("auth/v1/signup")?)
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await
            .map_err(unavailable)?;

        match res.status() {
            s if s.is_success() => {
                let body: serde_json::Value = res.json().await.map_err(unavailable)?;
                // Without auto-confirm the server returns only the user.
                if body.get("access_token").is_none() {
                    return Err(IdentityError::ConfirmationPending);
                }
                let session: GoTrueSession = serde_json::from_value(body)
                    .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
                Ok(session.into_parts())
            }
            StatusCode::UNPROCESSABLE_ENTITY => Err(IdentityError::AlreadyRegistered),
            StatusCode::BAD_REQUEST => Err(IdentityError::InvalidCredentials),
            status => Err(IdentityError::Unavailable(format!("sign-up returned {status}"))),
        }
    }

    /// Builds the authorize URL; no request is made. Only the S256 challenge
    /// leaves the portal; the verifier stays in the caller's cookie.
    async fn sign_in_with_oauth(
        &self,
        provider: &str,
        redirect_to: &str,
    ) -> Result<OAuthRedirect, IdentityError> {
        let code_verifier = random_token();
        let mut url = self.endpoint("auth/v1/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", &pkce_challenge(&code_verifier))
            .append_pair("code_challenge_method", "s256");

        Ok(OAuthRedirect {
            provider: provider.to_string(),
            url: url.into(),
            code_verifier,
        })
    }

    async fn exchange_authorization_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<(Session, User), IdentityError> {
        let code_verifier = code_verifier.ok_or(IdentityError::InvalidCode)?;
        let res = self
            .token_grant(
                "pkce",
                json!({ "auth_code": code, "code_verifier": code_verifier }),
            )
            .await?;

        match res.status() {
            s if s.is_success() => read_session(res).await,
            s if s.is_client_error() => Err(IdentityError::InvalidCode),
            status => Err(IdentityError::Unavailable(format!("code exchange returned {status}"))),
        }
    }

    async fn sign_out(&self, session: &Session) -> Result<(), IdentityError> {
        let res = self
            .client
            .post(self.endpoint("auth/v1/logout")?)
            .header("apikey", &self.api_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(unavailable)?;

        match res.status() {
            s if s.is_success() => Ok(()),
            // Already invalid on the server: nothing left to revoke.
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(()),
            status => Err(IdentityError::Unavailable(format!("sign-out returned {status}"))),
        }
    }
}
