//! `portal-core`: identifiers and value errors shared by every portal crate.
//!
//! This crate has no IO and no knowledge of HTTP or identity providers.

pub mod error;
pub mod id;

pub use error::ValueError;
pub use id::{SessionId, UserId};
