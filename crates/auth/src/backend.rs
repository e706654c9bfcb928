//! Narrow interfaces to the two external collaborators the pipeline consults.
//!
//! The pipeline itself only calls `IdentityBackend::validate_and_fetch_user`
//! and `RoleStore::get_roles`; the remaining identity operations serve the
//! login/callback handlers that sit downstream of it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use portal_core::UserId;

use crate::{RoleSet, Session, SessionClaim, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Signature invalid, token malformed, or session revoked.
    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    Expired,

    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error("email already registered")]
    AlreadyRegistered,

    #[error("invalid or consumed authorization code")]
    InvalidCode,

    #[error("account created; email confirmation pending")]
    ConfirmationPending,

    #[error("unsupported oauth provider '{0}'")]
    UnsupportedProvider(String),

    #[error("identity backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleStoreError {
    #[error("role store unavailable: {0}")]
    Unavailable(String),

    #[error("role store returned an unreadable row: {0}")]
    Decode(String),
}

/// Where to send the browser to start an OAuth sign-in.
///
/// `code_verifier` is the PKCE secret; the caller keeps it (in a cookie) and
/// hands it back to `exchange_authorization_code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OAuthRedirect {
    pub provider: String,
    pub url: String,
    #[serde(skip)]
    pub code_verifier: String,
}

/// Validates credentials and issues/revalidates sessions.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Authoritative round-trip: verify the claim's signature and fetch the
    /// canonical user record.
    async fn validate_and_fetch_user(
        &self,
        claim: &SessionClaim,
    ) -> Result<(Session, User), IdentityError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Session, User), IdentityError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<(Session, User), IdentityError>;

    async fn sign_in_with_oauth(
        &self,
        provider: &str,
        redirect_to: &str,
    ) -> Result<OAuthRedirect, IdentityError>;

    async fn exchange_authorization_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<(Session, User), IdentityError>;

    async fn sign_out(&self, session: &Session) -> Result<(), IdentityError>;
}

/// Read-only view of the user → roles mapping.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn get_roles(&self, user_id: UserId) -> Result<RoleSet, RoleStoreError>;
}

#[async_trait]
impl<T> IdentityBackend for Arc<T>
where
    T: IdentityBackend + ?Sized,
{
    async fn validate_and_fetch_user(
        &self,
        claim: &SessionClaim,
    ) -> Result<(Session, User), IdentityError> {
        (**self).validate_and_fetch_user(claim).await
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Session, User), IdentityError> {
        (**self).sign_in_with_password(email, password).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<(Session, User), IdentityError> {
        (**self).sign_up(email, password, metadata).await
    }

    async fn sign_in_with_oauth(
        &self,
        provider: &str,
        redirect_to: &str,
    ) -> Result<OAuthRedirect, IdentityError> {
        (**self).sign_in_with_oauth(provider, redirect_to).await
    }

    async fn exchange_authorization_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<(Session, User), IdentityError> {
        (**self).exchange_authorization_code(code, code_verifier).await
    }

    async fn sign_out(&self, session: &Session) -> Result<(), IdentityError> {
        (**self).sign_out(session).await
    }
}

#[async_trait]
impl<T> RoleStore for Arc<T>
where
    T: RoleStore + ?Sized,
{
    async fn get_roles(&self, user_id: UserId) -> Result<RoleSet, RoleStoreError> {
        (**self).get_roles(user_id).await
    }
}
