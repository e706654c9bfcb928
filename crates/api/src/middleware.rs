use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use portal_auth::{PipelineOutcome, PipelineRunner, RequestContext};

use crate::context::RequestIdentity;
use crate::cookies::credentials_from_headers;

#[derive(Clone)]
pub struct MiddlewareState {
    pub runner: Arc<PipelineRunner>,
}

/// Run the authorization pipeline in front of every handler.
///
/// A redirect decision answers `303 See Other` and the handler never runs.
/// Otherwise the resolved identity rides along in request extensions.
pub async fn pipeline_middleware(
    State(state): State<MiddlewareState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let ctx = RequestContext::new(req.uri().path(), credentials_from_headers(req.headers()));

    match state.runner.run(ctx).await {
        PipelineOutcome::Redirected { target, .. } => Redirect::to(target.as_path()).into_response(),
        PipelineOutcome::Forwarded(ctx) => {
            let (session, user, roles) = ctx.into_identity();
            req.extensions_mut()
                .insert(RequestIdentity::new(session, user, roles));
            next.run(req).await
        }
    }
}
