use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::app::errors;
use crate::context::RequestIdentity;

pub fn router() -> Router {
    Router::new().route("/dashboard", get(dashboard))
}

pub async fn dashboard(Extension(identity): Extension<RequestIdentity>) -> Response {
    // Only reachable without a user if `/private` is dropped from the route table.
    let Some(user) = identity.user() else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "sign in first");
    };

    Json(serde_json::json!({
        "user_id": user.id.to_string(),
        "email": user.email,
        "display_name": user.display_name(),
    }))
    .into_response()
}
