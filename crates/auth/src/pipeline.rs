//! Fixed-order request pipeline: session → authentication → authorization.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    AuthenticationGate, AuthorizationGate, Decision, IdentityBackend, RedirectTarget,
    RequestContext, RoleStore, RouteTable, SessionResolver, StageRecord,
};

/// A single step of the pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &mut RequestContext) -> Decision;
}

/// Pipeline position. Transitions are strictly linear; each request makes
/// exactly one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Resolving,
    Authenticating,
    Authorizing,
    Forwarded,
    Redirected,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Forwarded | PipelineState::Redirected)
    }
}

/// Terminal result of a pipeline pass.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Every stage continued; hand the context to the downstream handler.
    Forwarded(RequestContext),
    /// A stage redirected; the downstream handler must not run.
    Redirected {
        target: RedirectTarget,
        stage: &'static str,
        context: RequestContext,
    },
}

impl PipelineOutcome {
    pub fn state(&self) -> PipelineState {
        match self {
            PipelineOutcome::Forwarded(_) => PipelineState::Forwarded,
            PipelineOutcome::Redirected { .. } => PipelineState::Redirected,
        }
    }

    pub fn redirect_target(&self) -> Option<RedirectTarget> {
        match self {
            PipelineOutcome::Forwarded(_) => None,
            PipelineOutcome::Redirected { target, .. } => Some(*target),
        }
    }

    pub fn context(&self) -> &RequestContext {
        match self {
            PipelineOutcome::Forwarded(ctx) => ctx,
            PipelineOutcome::Redirected { context, .. } => context,
        }
    }
}

/// Runs the three stages in order against one `RequestContext`, stopping at
/// the first redirect.
pub struct PipelineRunner {
    stages: [(PipelineState, Box<dyn Stage>); 3],
}

impl PipelineRunner {
    pub fn new(
        resolver: SessionResolver,
        authentication: AuthenticationGate,
        authorization: AuthorizationGate,
    ) -> Self {
        Self {
            stages: [
                (PipelineState::Resolving, Box::new(resolver)),
                (PipelineState::Authenticating, Box::new(authentication)),
                (PipelineState::Authorizing, Box::new(authorization)),
            ],
        }
    }

    /// Wire the standard stages from the two collaborators and a route table.
    pub fn from_backends(
        identity: Arc<dyn IdentityBackend>,
        roles: Arc<dyn RoleStore>,
        routes: RouteTable,
    ) -> Self {
        Self::new(
            SessionResolver::new(identity),
            AuthenticationGate::new(routes.clone()),
            AuthorizationGate::new(routes, roles),
        )
    }

    #[tracing::instrument(name = "pipeline", skip_all, fields(path = %ctx.path()))]
    pub async fn run(&self, mut ctx: RequestContext) -> PipelineOutcome {
        for (state, stage) in &self.stages {
            tracing::trace!(state = ?state, stage = stage.name(), "entering stage");

            let decision = stage.run(&mut ctx).await;
            ctx.trace.push(StageRecord {
                stage: stage.name(),
                decision,
            });

            if let Decision::Redirect(target) = decision {
                tracing::info!(stage = stage.name(), target = %target, "request redirected");
                return PipelineOutcome::Redirected {
                    target,
                    stage: stage.name(),
                    context: ctx,
                };
            }
        }

        tracing::debug!(user_id = ?ctx.user().map(|u| u.id), "request forwarded");
        PipelineOutcome::Forwarded(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeIdentity, FakeRoles, claim_cookie};
    use crate::{Credentials, IdentityError, Role, RoleStoreError};

    fn runner(identity: Arc<FakeIdentity>, roles: Arc<FakeRoles>) -> PipelineRunner {
        PipelineRunner::from_backends(identity, roles, RouteTable::default())
    }

    #[tokio::test]
    async fn public_anonymous_request_is_forwarded_without_backend_calls() {
        let identity = Arc::new(FakeIdentity::accepting("good"));
        let roles = Arc::new(FakeRoles::with([Role::Admin]));
        let runner = runner(identity.clone(), roles.clone());

        let outcome = runner.run(RequestContext::new("/", Credentials::new())).await;

        assert_eq!(outcome.state(), PipelineState::Forwarded);
        let stages: Vec<_> = outcome.context().trace().iter().map(|r| r.stage).collect();
        assert_eq!(stages, ["session", "authentication", "authorization"]);
        assert_eq!(identity.calls(), 0);
        assert_eq!(roles.calls(), 0);
    }

    #[tokio::test]
    async fn public_signed_in_request_skips_role_lookup() {
        let identity = Arc::new(FakeIdentity::accepting("good"));
        let roles = Arc::new(FakeRoles::with([Role::Admin]));
        let runner = runner(identity, roles.clone());

        let outcome = runner.run(RequestContext::new("/", claim_cookie("good"))).await;

        assert_eq!(outcome.state(), PipelineState::Forwarded);
        assert!(outcome.context().user().is_some());
        assert_eq!(roles.calls(), 0);
    }

    #[tokio::test]
    async fn authentication_redirect_short_circuits_authorization() {
        let roles = Arc::new(FakeRoles::with([Role::Admin]));
        let runner = runner(Arc::new(FakeIdentity::accepting("good")), roles.clone());

        let outcome = runner
            .run(RequestContext::new("/private/dashboard", Credentials::new()))
            .await;

        match &outcome {
            PipelineOutcome::Redirected { target, stage, context } => {
                assert_eq!(*target, RedirectTarget::Login);
                assert_eq!(*stage, "authentication");
                assert_eq!(context.trace().len(), 2);
            }
            other => panic!("expected redirect, got {other:?}"),
        }
        assert_eq!(roles.calls(), 0);
    }

    #[tokio::test]
    async fn signed_in_user_on_login_goes_to_dashboard() {
        let runner = runner(
            Arc::new(FakeIdentity::accepting("good")),
            Arc::new(FakeRoles::with([])),
        );

        let outcome = runner.run(RequestContext::new("/login", claim_cookie("good"))).await;

        assert_eq!(outcome.redirect_target(), Some(RedirectTarget::Dashboard));
    }

    #[tokio::test]
    async fn forged_cookie_on_login_is_not_redirected() {
        let runner = runner(
            Arc::new(FakeIdentity::accepting("good")),
            Arc::new(FakeRoles::with([])),
        );

        let outcome = runner.run(RequestContext::new("/login", claim_cookie("forged"))).await;

        assert_eq!(outcome.state(), PipelineState::Forwarded);
        assert!(outcome.context().session().is_none());
    }

    #[tokio::test]
    async fn anonymous_admin_request_goes_to_login() {
        let roles = Arc::new(FakeRoles::with([Role::Admin]));
        let runner = runner(Arc::new(FakeIdentity::accepting("good")), roles.clone());

        let outcome = runner.run(RequestContext::new("/admin", Credentials::new())).await;

        match outcome {
            PipelineOutcome::Redirected { target, stage, .. } => {
                assert_eq!(target, RedirectTarget::Login);
                assert_eq!(stage, "authorization");
            }
            other => panic!("expected redirect, got {other:?}"),
        }
        assert_eq!(roles.calls(), 0);
    }

    #[tokio::test]
    async fn moderator_forwarded_on_shared_admin_route_with_roles_attached() {
        let runner = runner(
            Arc::new(FakeIdentity::accepting("good")),
            Arc::new(FakeRoles::with([Role::Moderator])),
        );

        let outcome = runner
            .run(RequestContext::new("/admin/new-order", claim_cookie("good")))
            .await;

        let PipelineOutcome::Forwarded(ctx) = outcome else {
            panic!("expected forward");
        };
        assert!(ctx.roles().is_some_and(|r| r.is_moderator()));
        assert_eq!(ctx.tier(), Some(crate::RouteTier::AdminShared));
    }

    #[tokio::test]
    async fn backend_failures_fail_closed() {
        let runner = runner(
            Arc::new(FakeIdentity::accepting("good")),
            Arc::new(FakeRoles::failing(RoleStoreError::Unavailable("down".into()))),
        );
        let outcome = runner.run(RequestContext::new("/admin/models", claim_cookie("good"))).await;
        assert_eq!(outcome.redirect_target(), Some(RedirectTarget::AccessDenied));

        let runner = runner_with_identity_outage();
        let outcome = runner.run(RequestContext::new("/admin", claim_cookie("good"))).await;
        assert_eq!(outcome.redirect_target(), Some(RedirectTarget::Login));
    }

    fn runner_with_identity_outage() -> PipelineRunner {
        runner(
            Arc::new(FakeIdentity::failing(IdentityError::Unavailable("down".into()))),
            Arc::new(FakeRoles::with([Role::Admin])),
        )
    }

    #[test]
    fn only_forwarded_and_redirected_are_terminal() {
        assert!(PipelineState::Forwarded.is_terminal());
        assert!(PipelineState::Redirected.is_terminal());
        assert!(!PipelineState::Resolving.is_terminal());
        assert!(!PipelineState::Authenticating.is_terminal());
        assert!(!PipelineState::Authorizing.is_terminal());
    }
}
