//! Role storage: the user → roles mapping read by the authorization gate.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryRoleStore;
pub use postgres::PostgresRoleStore;
