//! Administrative area.
//!
//! Only descriptors live here; the pipeline has already enforced the tier of
//! each path by the time a handler runs. `/admin` and `/admin/new-order` are
//! shared with moderators, `/admin/models` and `/admin/users` are admin-only.

use axum::{Json, Router, extract::Extension, response::IntoResponse, routing::get};

use crate::context::RequestIdentity;

pub fn router() -> Router {
    Router::new()
        .route("/", get(overview))
        .route("/new-order", get(new_order))
        .route("/models", get(models))
        .route("/users", get(users))
}

fn area(name: &'static str, identity: &RequestIdentity) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "area": name,
        "user_id": identity.user().map(|u| u.id.to_string()),
        "roles": identity.roles().map(|r| r.names()).unwrap_or_default(),
    }))
}

pub async fn overview(Extension(identity): Extension<RequestIdentity>) -> impl IntoResponse {
    area("overview", &identity)
}

pub async fn new_order(Extension(identity): Extension<RequestIdentity>) -> impl IntoResponse {
    area("new-order", &identity)
}

pub async fn models(Extension(identity): Extension<RequestIdentity>) -> impl IntoResponse {
    area("models", &identity)
}

pub async fn users(Extension(identity): Extension<RequestIdentity>) -> impl IntoResponse {
    area("users", &identity)
}
