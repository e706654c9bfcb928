use portal_auth::{RoleSet, Session, User};

/// Identity resolved by the pipeline, attached to every forwarded request.
///
/// Both `session` and `user` are present or both absent. `roles` is only
/// populated on administrative routes, where the authorization gate looked
/// them up.
#[derive(Debug, Clone, Default)]
pub struct RequestIdentity {
    session: Option<Session>,
    user: Option<User>,
    roles: Option<RoleSet>,
}

impl RequestIdentity {
    pub fn new(session: Option<Session>, user: Option<User>, roles: Option<RoleSet>) -> Self {
        Self {
            session,
            user,
            roles,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn roles(&self) -> Option<&RoleSet> {
        self.roles.as_ref()
    }
}
