//! Turns inbound cookies into a verified `(session, user)` pair.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Credentials, Decision, IdentityBackend, RequestContext, Session, Stage, User};

/// Result of session resolution.
///
/// Either both halves are present and verified, or both are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedSession {
    pub session: Option<Session>,
    pub user: Option<User>,
}

impl ResolvedSession {
    pub fn anonymous() -> Self {
        Self::default()
    }

    fn verified(session: Session, user: User) -> Self {
        Self {
            session: Some(session),
            user: Some(user),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.session.is_none()
    }
}

pub struct SessionResolver {
    identity: Arc<dyn IdentityBackend>,
}

impl SessionResolver {
    pub fn new(identity: Arc<dyn IdentityBackend>) -> Self {
        Self { identity }
    }

    /// Resolve the request's identity.
    ///
    /// The cookie claim is never trusted on its own: without one this returns
    /// anonymous without touching the network, and with one the identity
    /// backend must re-verify it. Any verification failure degrades to
    /// anonymous; nothing is returned as an error.
    pub async fn resolve(&self, credentials: &Credentials) -> ResolvedSession {
        let Some(claim) = credentials.session_claim() else {
            return ResolvedSession::anonymous();
        };

        match self.identity.validate_and_fetch_user(&claim).await {
            Ok((session, user)) => {
                tracing::debug!(user_id = %user.id, "session revalidated");
                ResolvedSession::verified(session, user)
            }
            Err(e) => {
                tracing::debug!(error = %e, "session claim rejected; treating request as anonymous");
                ResolvedSession::anonymous()
            }
        }
    }
}

#[async_trait]
impl Stage for SessionResolver {
    fn name(&self) -> &'static str {
        "session"
    }

    async fn run(&self, ctx: &mut RequestContext) -> Decision {
        let resolved = self.resolve(ctx.credentials()).await;
        ctx.session = resolved.session;
        ctx.user = resolved.user;
        Decision::Continue
    }
}
