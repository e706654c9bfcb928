//! Counting fakes for the pipeline's collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use portal_core::UserId;

use crate::{
    ACCESS_TOKEN_COOKIE, Credentials, IdentityBackend, IdentityError, OAuthRedirect, Role,
    RoleSet, RoleStore, RoleStoreError, Session, SessionClaim, User,
};

pub fn session(token: &str) -> Session {
    Session {
        access_token: token.to_string(),
        refresh_token: None,
        token_type: "bearer".to_string(),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

pub fn user() -> User {
    User::new(UserId::new(), Some("ada@example.com".to_string()))
}

pub fn claim_cookie(token: &str) -> Credentials {
    Credentials::new().with_cookie(ACCESS_TOKEN_COOKIE, token)
}

/// Accepts exactly one access token; everything else is `InvalidToken`.
pub struct FakeIdentity {
    outcome: Result<String, IdentityError>,
    user: User,
    calls: AtomicUsize,
}

impl FakeIdentity {
    pub fn accepting(token: &str) -> Self {
        Self {
            outcome: Ok(token.to_string()),
            user: user(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: IdentityError) -> Self {
        Self {
            outcome: Err(err),
            user: user(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn user(&self) -> &User {
        &self.user
    }
}

#[async_trait]
impl IdentityBackend for FakeIdentity {
    async fn validate_and_fetch_user(
        &self,
        claim: &SessionClaim,
    ) -> Result<(Session, User), IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(token) if *token == claim.access_token => Ok((session(token), self.user.clone())),
            Ok(_) => Err(IdentityError::InvalidToken),
            Err(e) => Err(e.clone()),
        }
    }

    async fn sign_in_with_password(&self, _: &str, _: &str) -> Result<(Session, User), IdentityError> {
        Err(IdentityError::InvalidCredentials)
    }

    async fn sign_up(
        &self,
        _: &str,
        _: &str,
        _: serde_json::Value,
    ) -> Result<(Session, User), IdentityError> {
        Err(IdentityError::AlreadyRegistered)
    }

    async fn sign_in_with_oauth(&self, provider: &str, _: &str) -> Result<OAuthRedirect, IdentityError> {
        Err(IdentityError::UnsupportedProvider(provider.to_string()))
    }

    async fn exchange_authorization_code(
        &self,
        _: &str,
        _: Option<&str>,
    ) -> Result<(Session, User), IdentityError> {
        Err(IdentityError::InvalidCode)
    }

    async fn sign_out(&self, _: &Session) -> Result<(), IdentityError> {
        Ok(())
    }
}

pub struct FakeRoles {
    outcome: Result<RoleSet, RoleStoreError>,
    calls: AtomicUsize,
}

impl FakeRoles {
    pub fn with<const N: usize>(roles: [Role; N]) -> Self {
        Self {
            outcome: Ok(roles.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: RoleStoreError) -> Self {
        Self {
            outcome: Err(err),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoleStore for FakeRoles {
    async fn get_roles(&self, _user_id: UserId) -> Result<RoleSet, RoleStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
