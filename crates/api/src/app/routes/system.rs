use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::errors;
use crate::context::RequestIdentity;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Public landing page. Greets signed-in users by name.
pub async fn home(Extension(identity): Extension<RequestIdentity>) -> impl IntoResponse {
    let signed_in_as = identity.user().map(|u| u.display_name());
    Json(serde_json::json!({
        "page": "home",
        "signed_in": signed_in_as.is_some(),
        "display_name": signed_in_as,
    }))
}

pub async fn access_denied() -> axum::response::Response {
    errors::json_error(
        StatusCode::FORBIDDEN,
        "access_denied",
        "you do not have access to this area",
    )
}
