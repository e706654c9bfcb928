//! Infrastructure layer: concrete identity providers and role storage behind
//! the `portal-auth` traits.

pub mod identity;
pub mod roles;

pub use identity::{GoTrueIdentityBackend, Hs256Signer, LocalIdentityBackend};
pub use roles::{InMemoryRoleStore, PostgresRoleStore};
