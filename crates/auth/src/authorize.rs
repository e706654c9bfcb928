//! Two-tier RBAC for the administrative route subtree.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    Decision, RedirectTarget, RequestContext, Role, RoleSet, RoleStore, RouteTable, RouteTier,
    Session, Stage, User,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: route requires the admin role")]
    AdminRequired,

    #[error("forbidden: route requires an administrative role")]
    NoAdministrativeRole,
}

/// Decide whether `roles` may enter a route of the given tier.
///
/// - No IO
/// - No panics
/// - Non-administrative tiers are always allowed here
pub fn authorize(tier: RouteTier, roles: &RoleSet) -> Result<(), AuthzError> {
    match tier {
        RouteTier::AdminOnly => {
            if roles.contains(Role::Admin) {
                Ok(())
            } else {
                Err(AuthzError::AdminRequired)
            }
        }
        RouteTier::AdminShared => {
            // The emptiness test stays alongside the role test: a role added
            // later must not grant shared access by merely existing.
            let allowed = !roles.is_empty()
                && (roles.contains(Role::Admin) || roles.contains(Role::Moderator));
            if allowed {
                Ok(())
            } else {
                Err(AuthzError::NoAdministrativeRole)
            }
        }
        RouteTier::Public | RouteTier::Private => Ok(()),
    }
}

/// Enforces role requirements on `/admin` routes.
///
/// Fails closed: a role lookup failure denies access exactly like a missing
/// role, so callers cannot tell the two apart.
pub struct AuthorizationGate {
    routes: RouteTable,
    roles: Arc<dyn RoleStore>,
}

/// Gate verdict plus the roles it looked up, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationOutcome {
    pub decision: Decision,
    pub roles: Option<RoleSet>,
}

impl AuthorizationOutcome {
    fn decided(decision: Decision) -> Self {
        Self {
            decision,
            roles: None,
        }
    }
}

impl AuthorizationGate {
    pub fn new(routes: RouteTable, roles: Arc<dyn RoleStore>) -> Self {
        Self { routes, roles }
    }

    pub async fn authorize(
        &self,
        path: &str,
        session: Option<&Session>,
        user: Option<&User>,
    ) -> Decision {
        self.evaluate(path, session, user).await.decision
    }

    /// Like `authorize`, but also returns the fetched role set.
    pub async fn evaluate(
        &self,
        path: &str,
        session: Option<&Session>,
        user: Option<&User>,
    ) -> AuthorizationOutcome {
        self.evaluate_tier(self.routes.classify(path), session, user)
            .await
    }

    async fn evaluate_tier(
        &self,
        tier: RouteTier,
        session: Option<&Session>,
        user: Option<&User>,
    ) -> AuthorizationOutcome {
        if !tier.is_admin() {
            return AuthorizationOutcome::decided(Decision::Continue);
        }

        let (Some(_), Some(user)) = (session, user) else {
            return AuthorizationOutcome::decided(Decision::Redirect(RedirectTarget::Login));
        };

        let roles = match self.roles.get_roles(user.id).await {
            Ok(roles) => roles,
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "role lookup failed; denying access");
                return AuthorizationOutcome::decided(Decision::Redirect(
                    RedirectTarget::AccessDenied,
                ));
            }
        };

        let decision = match authorize(tier, &roles) {
            Ok(()) => Decision::Continue,
            Err(e) => {
                tracing::debug!(user_id = %user.id, roles = ?roles.names(), reason = %e, "admin access denied");
                Decision::Redirect(RedirectTarget::AccessDenied)
            }
        };

        AuthorizationOutcome {
            decision,
            roles: Some(roles),
        }
    }
}

#[async_trait]
impl Stage for AuthorizationGate {
    fn name(&self) -> &'static str {
        "authorization"
    }

    async fn run(&self, ctx: &mut RequestContext) -> Decision {
        let tier = ctx.classify(&self.routes);
        let outcome = self.evaluate_tier(tier, ctx.session(), ctx.user()).await;
        if outcome.roles.is_some() {
            ctx.roles = outcome.roles;
        }
        outcome.decision
    }
}
