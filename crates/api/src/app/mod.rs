//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: identity backend / role store selection from config
//! - `routes/`: the handlers downstream of the pipeline (one file per area)
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use portal_auth::PipelineRunner;

use crate::middleware;

pub mod errors;
pub mod routes;
pub mod services;

pub use services::{PortalServices, build_services};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Every route sits behind the pipeline; `/health`
/// is classified public so it always passes through.
pub fn build_app(services: PortalServices) -> Router {
    let runner = Arc::new(PipelineRunner::from_backends(
        services.identity.clone(),
        services.roles.clone(),
        services.routes.clone(),
    ));
    let pipeline_state = middleware::MiddlewareState { runner };

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(Extension(Arc::new(services)))
        .layer(
            ServiceBuilder::new().layer(axum::middleware::from_fn_with_state(
                pipeline_state,
                middleware::pipeline_middleware,
            )),
        )
}
