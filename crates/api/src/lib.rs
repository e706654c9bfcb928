//! HTTP API: server wiring, the authorization pipeline as middleware, and the
//! thin handlers behind it.

pub mod app;
pub mod config;
pub mod context;
pub mod cookies;
pub mod middleware;
