use serde::Serialize;

use crate::{Credentials, Decision, RoleSet, RouteTable, RouteTier, Session, User};

/// One stage's verdict, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: &'static str,
    pub decision: Decision,
}

/// Per-request state threaded through the pipeline.
///
/// Created at request entry, exclusively owned by that request, and dropped
/// when the request ends. Never shared across requests.
#[derive(Debug, Clone)]
pub struct RequestContext {
    path: String,
    credentials: Credentials,
    tier: Option<RouteTier>,
    pub(crate) session: Option<Session>,
    pub(crate) user: Option<User>,
    pub(crate) roles: Option<RoleSet>,
    pub(crate) trace: Vec<StageRecord>,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            path: path.into(),
            credentials,
            tier: None,
            session: None,
            user: None,
            roles: None,
            trace: Vec::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Route tier, once a gate has classified the path.
    pub fn tier(&self) -> Option<RouteTier> {
        self.tier
    }

    /// Classify the path against `routes` on first call; later calls return
    /// the stored tier.
    pub(crate) fn classify(&mut self, routes: &RouteTable) -> RouteTier {
        *self.tier.get_or_insert_with(|| routes.classify(&self.path))
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Roles fetched by the authorization gate. `None` when no lookup ran.
    pub fn roles(&self) -> Option<&RoleSet> {
        self.roles.as_ref()
    }

    pub fn trace(&self) -> &[StageRecord] {
        &self.trace
    }

    /// Hand the resolved identity to the downstream handler.
    pub fn into_identity(self) -> (Option<Session>, Option<User>, Option<RoleSet>) {
        (self.session, self.user, self.roles)
    }
}
