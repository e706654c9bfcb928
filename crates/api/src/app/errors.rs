use axum::http::{StatusCode, header::InvalidHeaderValue};
use axum::response::IntoResponse;
use serde_json::json;

use portal_auth::IdentityError;

pub fn identity_error_to_response(err: IdentityError) -> axum::response::Response {
    match err {
        IdentityError::InvalidCredentials => json_error(
            StatusCode::BAD_REQUEST,
            "invalid_credentials",
            "invalid email or password",
        ),
        IdentityError::AlreadyRegistered => json_error(
            StatusCode::BAD_REQUEST,
            "already_registered",
            "email already registered",
        ),
        IdentityError::InvalidCode | IdentityError::InvalidToken | IdentityError::Expired => {
            json_error(StatusCode::BAD_REQUEST, "session_not_found", "session data not found")
        }
        IdentityError::UnsupportedProvider(provider) => json_error(
            StatusCode::NOT_FOUND,
            "unsupported_provider",
            format!("unsupported oauth provider '{provider}'"),
        ),
        IdentityError::ConfirmationPending => json_error(
            StatusCode::ACCEPTED,
            "confirmation_pending",
            "check your email to confirm the account",
        ),
        IdentityError::Unavailable(msg) => {
            tracing::warn!(error = %msg, "identity backend unavailable");
            json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "identity_unavailable",
                "identity service unavailable",
            )
        }
    }
}

pub fn cookie_error_to_response(err: InvalidHeaderValue) -> axum::response::Response {
    tracing::error!(error = %err, "session material is not a valid cookie value");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "cookie_error",
        "could not store session",
    )
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
