//! In-process identity provider for development and tests.
//!
//! Accounts live in memory, passwords are argon2-hashed, and sessions are
//! HS256 JWTs. Revalidation is authoritative: the signature, the expiry, the
//! revocation list and the account's continued existence are all checked.
//!
//! Short-lived bookkeeping is bounded: authorization codes expire after
//! `code_ttl` and at most `MAX_PENDING_CODES` wait at once; a revoked session
//! is forgotten once its token would have expired anyway.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use password_hash::{PasswordHash, SaltString};

use portal_auth::{
    IdentityBackend, IdentityError, JwtClaims, OAuthRedirect, Session, SessionClaim, User,
};
use portal_core::{SessionId, UserId};

use super::{Hs256Signer, random_token};

const DEFAULT_SESSION_TTL_MINUTES: i64 = 60;
/// Matches the lifetime of the code-verifier cookie.
const DEFAULT_CODE_TTL_SECONDS: i64 = 600;
const MAX_PENDING_CODES: usize = 1024;

#[derive(Debug, Clone)]
struct Account {
    user: User,
    /// `None` for accounts that only sign in through an OAuth provider.
    password_hash: Option<String>,
}

#[derive(Debug, Clone)]
struct PendingCode {
    user_id: UserId,
    code_verifier: String,
    expires_at: DateTime<Utc>,
    /// Issue order, for eviction.
    seq: u64,
}

#[derive(Debug, Default)]
struct LocalState {
    accounts: HashMap<UserId, Account>,
    by_email: HashMap<String, UserId>,
    /// Revoked session → expiry of its token.
    revoked: HashMap<SessionId, DateTime<Utc>>,
    /// provider name → account the provider signs in as.
    oauth_identities: HashMap<String, UserId>,
    pending_codes: HashMap<String, PendingCode>,
    next_code_seq: u64,
}

impl LocalState {
    fn prune_expired(&mut self, now: DateTime<Utc>) {
        self.pending_codes.retain(|_, pending| pending.expires_at > now);
        self.revoked.retain(|_, expires_at| *expires_at > now);
    }

    /// Evicts the oldest code when the table is full.
    fn insert_pending_code(&mut self, code: String, mut pending: PendingCode) {
        pending.seq = self.next_code_seq;
        self.next_code_seq += 1;
        if self.pending_codes.len() >= MAX_PENDING_CODES {
            let oldest = self
                .pending_codes
                .iter()
                .min_by_key(|(_, p)| p.seq)
                .map(|(code, _)| code.clone());
            if let Some(oldest) = oldest {
                self.pending_codes.remove(&oldest);
            }
        }
        self.pending_codes.insert(code, pending);
    }
}

pub struct LocalIdentityBackend {
    signer: Hs256Signer,
    session_ttl: Duration,
    code_ttl: Duration,
    state: RwLock<LocalState>,
}

impl LocalIdentityBackend {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            signer: Hs256Signer::new(secret),
            session_ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
            code_ttl: Duration::seconds(DEFAULT_CODE_TTL_SECONDS),
            state: RwLock::new(LocalState::default()),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// How long an OAuth authorization code stays redeemable.
    pub fn with_code_ttl(mut self, ttl: Duration) -> Self {
        self.code_ttl = ttl;
        self
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LocalState>, IdentityError> {
        self.state
            .read()
            .map_err(|_: PoisonError<_>| IdentityError::Unavailable("identity state poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LocalState>, IdentityError> {
        self.state
            .write()
            .map_err(|_: PoisonError<_>| IdentityError::Unavailable("identity state poisoned".into()))
    }

    /// Register an account with a password.
    pub fn create_user(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<User, IdentityError> {
        let password_hash = hash_password(password)?;
        self.insert_account(email, Some(password_hash), metadata)
    }

    /// Register an account reachable only through `provider`.
    pub fn link_oauth_identity(
        &self,
        provider: &str,
        email: &str,
        metadata: serde_json::Value,
    ) -> Result<User, IdentityError> {
        let user = self.insert_account(email, None, metadata)?;
        self.write()?
            .oauth_identities
            .insert(provider.to_string(), user.id);
        Ok(user)
    }

    /// Remove an account. Its outstanding sessions stop validating.
    pub fn delete_user(&self, user_id: UserId) -> Result<(), IdentityError> {
        let mut state = self.write()?;
        if let Some(account) = state.accounts.remove(&user_id) {
            tracing::info!(user_id = %user_id, "deleted local account");
            if let Some(email) = account.user.email {
                state.by_email.remove(&normalize_email(&email));
            }
        }
        state.oauth_identities.retain(|_, id| *id != user_id);
        Ok(())
    }

    fn insert_account(
        &self,
        email: &str,
        password_hash: Option<String>,
        metadata: serde_json::Value,
    ) -> Result<User, IdentityError> {
        let key = normalize_email(email);
        let mut state = self.write()?;
        if state.by_email.contains_key(&key) {
            return Err(IdentityError::AlreadyRegistered);
        }

        let user = User {
            id: UserId::new(),
            email: Some(email.trim().to_string()),
            metadata,
        };
        state.by_email.insert(key, user.id);
        state.accounts.insert(
            user.id,
            Account {
                user: user.clone(),
                password_hash,
            },
        );
        Ok(user)
    }

    fn issue_session(&self, user: &User) -> Result<Session, IdentityError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user.id,
            email: user.email.clone(),
            session_id: SessionId::new(),
            user_metadata: user.metadata.clone(),
            iat: now,
            exp: now + self.session_ttl,
        };

        Ok(Session {
            access_token: self.signer.sign(&claims)?,
            refresh_token: None,
            token_type: "bearer".to_string(),
            expires_at: claims.exp,
        })
    }
}

#[async_trait]
impl IdentityBackend for LocalIdentityBackend {
    async fn validate_and_fetch_user(
        &self,
        claim: &SessionClaim,
    ) -> Result<(Session, User), IdentityError> {
        let claims = self.signer.verify(&claim.access_token, Utc::now())?;

        let state = self.read()?;
        if state.revoked.contains_key(&claims.session_id) {
            return Err(IdentityError::InvalidToken);
        }
        let account = state
            .accounts
            .get(&claims.sub)
            .ok_or(IdentityError::InvalidToken)?;

        let session = Session {
            access_token: claim.access_token.clone(),
            refresh_token: claim.refresh_token.clone(),
            token_type: "bearer".to_string(),
            expires_at: claims.exp,
        };
        Ok((session, account.user.clone()))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Session, User), IdentityError> {
        let account = {
            let state = self.read()?;
            state
                .by_email
                .get(&normalize_email(email))
                .and_then(|id| state.accounts.get(id))
                .cloned()
                .ok_or(IdentityError::InvalidCredentials)?
        };

        let password_hash = account.password_hash.clone();
        let password = password.to_string();
        let verified = off_runtime(move || {
            password_hash
                .as_deref()
                .is_some_and(|hash| verify_password(hash, &password))
        })
        .await?;
        if !verified {
            return Err(IdentityError::InvalidCredentials);
        }

        let session = self.issue_session(&account.user)?;
        Ok((session, account.user))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<(Session, User), IdentityError> {
        let password = password.to_string();
        let password_hash = off_runtime(move || hash_password(&password)).await??;
        let user = self.insert_account(email, Some(password_hash), metadata)?;
        let session = self.issue_session(&user)?;
        Ok((session, user))
    }

    /// The local provider approves immediately: the returned URL is the
    /// caller's callback with a one-shot code already attached.
    async fn sign_in_with_oauth(
        &self,
        provider: &str,
        redirect_to: &str,
    ) -> Result<OAuthRedirect, IdentityError> {
        let now = Utc::now();
        let mut state = self.write()?;
        state.prune_expired(now);
        let user_id = *state
            .oauth_identities
            .get(provider)
            .ok_or_else(|| IdentityError::UnsupportedProvider(provider.to_string()))?;

        let code = random_token();
        let code_verifier = random_token();
        state.insert_pending_code(
            code.clone(),
            PendingCode {
                user_id,
                code_verifier: code_verifier.clone(),
                expires_at: now + self.code_ttl,
                seq: 0,
            },
        );

        let separator = if redirect_to.contains('?') { '&' } else { '?' };
        Ok(OAuthRedirect {
            provider: provider.to_string(),
            url: format!("{redirect_to}{separator}code={code}"),
            code_verifier,
        })
    }

    async fn exchange_authorization_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<(Session, User), IdentityError> {
        let user = {
            let mut state = self.write()?;
            state.prune_expired(Utc::now());
            // Codes are consumed even when the verifier is wrong.
            let pending = state
                .pending_codes
                .remove(code)
                .ok_or(IdentityError::InvalidCode)?;
            if code_verifier != Some(pending.code_verifier.as_str()) {
                return Err(IdentityError::InvalidCode);
            }
            state
                .accounts
                .get(&pending.user_id)
                .map(|a| a.user.clone())
                .ok_or(IdentityError::InvalidCode)?
        };

        let session = self.issue_session(&user)?;
        Ok((session, user))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), IdentityError> {
        // Signature must still hold; expired sessions may be signed out.
        let claims = match self.signer.verify(&session.access_token, Utc::now()) {
            Ok(claims) => claims,
            Err(IdentityError::Expired) => return Ok(()),
            Err(e) => return Err(e),
        };
        let mut state = self.write()?;
        state.prune_expired(Utc::now());
        state.revoked.insert(claims.session_id, claims.exp);
        tracing::debug!(session_id = %claims.session_id, "revoked local session");
        Ok(())
    }
}

/// Run CPU-heavy password work on the blocking pool.
async fn off_runtime<T, F>(work: F) -> Result<T, IdentityError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| IdentityError::Unavailable(format!("password worker failed: {e}")))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> Result<String, IdentityError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes)
        .map_err(|e| IdentityError::Unavailable(format!("salt generation failed: {e}")))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| IdentityError::Unavailable(e.to_string()))?
        .to_string();
    Ok(phc)
}

fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
