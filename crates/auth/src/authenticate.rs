use async_trait::async_trait;

use crate::{Decision, RedirectTarget, RequestContext, RouteTable, RouteTier, Session, Stage};

/// Keeps anonymous callers out of private routes and signed-in callers away
/// from the login/registration forms.
///
/// Administrative routes are left to `AuthorizationGate`, which does its own
/// session check.
#[derive(Debug, Clone)]
pub struct AuthenticationGate {
    routes: RouteTable,
}

impl AuthenticationGate {
    pub fn new(routes: RouteTable) -> Self {
        Self { routes }
    }

    pub fn authenticate(&self, path: &str, session: Option<&Session>) -> Decision {
        self.decide(self.routes.classify(path), path, session)
    }

    fn decide(&self, tier: RouteTier, path: &str, session: Option<&Session>) -> Decision {
        match session {
            None if tier == RouteTier::Private => {
                Decision::Redirect(RedirectTarget::Login)
            }
            Some(_) if self.routes.is_auth_page(path) => Decision::Redirect(RedirectTarget::Dashboard),
            _ => Decision::Continue,
        }
    }
}

#[async_trait]
impl Stage for AuthenticationGate {
    fn name(&self) -> &'static str {
        "authentication"
    }

    async fn run(&self, ctx: &mut RequestContext) -> Decision {
        let tier = ctx.classify(&self.routes);
        let decision = self.decide(tier, ctx.path(), ctx.session());
        match decision {
            Decision::Redirect(target) => tracing::debug!(
                path = ctx.path(),
                ?tier,
                signed_in = ctx.session().is_some(),
                %target,
                "authentication redirect"
            ),
            Decision::Continue => tracing::debug!(
                path = ctx.path(),
                ?tier,
                signed_in = ctx.session().is_some(),
                "authentication passed"
            ),
        }
        decision
    }
}
