//! Identity backends.
//!
//! - `local`: in-process provider (dev/test), HS256 sessions
//! - `gotrue`: HTTP client for a GoTrue-compatible auth server

pub mod gotrue;
pub mod jwt;
pub mod local;

pub use gotrue::GoTrueIdentityBackend;
pub use jwt::Hs256Signer;
pub use local::LocalIdentityBackend;

/// Random URL-safe string for authorization codes and PKCE verifiers.
pub(crate) fn random_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}
