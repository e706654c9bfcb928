//! `portal-auth`: the portal's request-authorization pipeline.
//!
//! Resolves an identity from inbound cookies, gates private routes on
//! authentication, and applies two-tier RBAC to the administrative area.
//! This crate is decoupled from HTTP and storage: identity providers and role
//! storage sit behind the traits in [`backend`].

pub mod authenticate;
pub mod authorize;
pub mod backend;
pub mod claims;
pub mod context;
pub mod decision;
pub mod pipeline;
pub mod resolver;
pub mod roles;
pub mod routes;
pub mod session;

#[cfg(test)]
mod test_support;

pub use authenticate::AuthenticationGate;
pub use authorize::{AuthorizationGate, AuthorizationOutcome, AuthzError, authorize};
pub use backend::{IdentityBackend, IdentityError, OAuthRedirect, RoleStore, RoleStoreError};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use context::{RequestContext, StageRecord};
pub use decision::{Decision, RedirectTarget};
pub use pipeline::{PipelineOutcome, PipelineRunner, PipelineState, Stage};
pub use resolver::{ResolvedSession, SessionResolver};
pub use roles::{Role, RoleSet};
pub use routes::{RouteTable, RouteTableBuilder, RouteTier};
pub use session::{
    ACCESS_TOKEN_COOKIE, Credentials, REFRESH_TOKEN_COOKIE, Session, SessionClaim, User,
};
