//! Sign-in, sign-up, OAuth and sign-out handlers.
//!
//! Successful flows set the session cookies and answer `303 See Other`, the
//! same status the pipeline uses for its own redirects.

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Extension, Path, Query},
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;

use portal_auth::{IdentityError, RedirectTarget, Session};

use crate::app::{errors, services::PortalServices};
use crate::context::RequestIdentity;
use crate::cookies::{CODE_VERIFIER_COOKIE, credentials_from_headers};

const MIN_NAME_LEN: usize = 3;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

pub async fn login_page() -> impl IntoResponse {
    Json(serde_json::json!({
        "page": "login",
        "fields": ["email", "password"],
        "oauth": "/auth/oauth/{provider}",
    }))
}

pub async fn register_page() -> impl IntoResponse {
    Json(serde_json::json!({
        "page": "register",
        "fields": ["name", "email", "password", "confirm_password"],
    }))
}

pub async fn login(
    Extension(services): Extension<Arc<PortalServices>>,
    Form(form): Form<LoginForm>,
) -> Response {
    let mut problems = Vec::new();
    if form.email.trim().is_empty() {
        problems.push("email is required");
    }
    if form.password.is_empty() {
        problems.push("password is required");
    }
    if !problems.is_empty() {
        return form_failure(&form.email, &problems);
    }

    match services
        .identity
        .sign_in_with_password(form.email.trim(), &form.password)
        .await
    {
        Ok((session, user)) => {
            tracing::info!(user_id = %user.id, "signed in with password");
            signed_in(&services, &session)
        }
        Err(IdentityError::InvalidCredentials) => {
            form_failure(&form.email, &["invalid email or password"])
        }
        Err(err) => errors::identity_error_to_response(err),
    }
}

pub async fn register(
    Extension(services): Extension<Arc<PortalServices>>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let mut problems = Vec::new();
    if form.name.trim().chars().count() < MIN_NAME_LEN {
        problems.push("name must be at least 3 characters");
    }
    if form.email.trim().is_empty() {
        problems.push("email is required");
    }
    if form.password.is_empty() {
        problems.push("password is required");
    }
    if form.password != form.confirm_password {
        problems.push("passwords do not match");
    }
    if !problems.is_empty() {
        return form_failure(&form.email, &problems);
    }

    let metadata = serde_json::json!({ "name": form.name.trim() });
    match services
        .identity
        .sign_up(form.email.trim(), &form.password, metadata)
        .await
    {
        Ok((session, user)) => {
            tracing::info!(user_id = %user.id, "registered");
            signed_in(&services, &session)
        }
        Err(IdentityError::AlreadyRegistered) => {
            form_failure(&form.email, &["email already registered"])
        }
        Err(err) => errors::identity_error_to_response(err),
    }
}

pub async fn oauth_start(
    Extension(services): Extension<Arc<PortalServices>>,
    Path(provider): Path<String>,
) -> Response {
    let redirect = match services
        .identity
        .sign_in_with_oauth(&provider, &services.callback_url())
        .await
    {
        Ok(redirect) => redirect,
        Err(err) => return errors::identity_error_to_response(err),
    };

    let verifier = match services.cookies.code_verifier_cookie(&redirect.code_verifier) {
        Ok(cookie) => cookie,
        Err(err) => return errors::cookie_error_to_response(err),
    };
    tracing::debug!(provider = %redirect.provider, "starting oauth sign-in");
    see_other(&redirect.url, vec![verifier])
}

pub async fn oauth_callback(
    Extension(services): Extension<Arc<PortalServices>>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return session_not_found();
    };

    let credentials = credentials_from_headers(&headers);
    let verifier = credentials.get(CODE_VERIFIER_COOKIE).filter(|v| !v.is_empty());

    match services
        .identity
        .exchange_authorization_code(&code, verifier)
        .await
    {
        Ok((session, user)) => {
            tracing::info!(user_id = %user.id, "signed in with oauth");
            let mut response = signed_in(&services, &session);
            if let Ok(clear) = services.cookies.clear_code_verifier_cookie() {
                response.headers_mut().append(SET_COOKIE, clear);
            }
            response
        }
        Err(err @ IdentityError::Unavailable(_)) => errors::identity_error_to_response(err),
        Err(err) => {
            tracing::debug!(error = %err, "authorization code rejected");
            session_not_found()
        }
    }
}

pub async fn logout(
    Extension(services): Extension<Arc<PortalServices>>,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    if let Some(session) = identity.session() {
        if let Err(err) = services.identity.sign_out(session).await {
            tracing::warn!(error = %err, "sign-out failed; clearing cookies anyway");
        }
    }

    match services.cookies.clear_session_cookies() {
        Ok(cookies) => see_other(RedirectTarget::Login.as_path(), cookies),
        Err(err) => errors::cookie_error_to_response(err),
    }
}

fn signed_in(services: &PortalServices, session: &Session) -> Response {
    match services.cookies.session_cookies(session, Utc::now()) {
        Ok(cookies) => see_other(RedirectTarget::Dashboard.as_path(), cookies),
        Err(err) => errors::cookie_error_to_response(err),
    }
}

fn see_other(location: &str, cookies: Vec<HeaderValue>) -> Response {
    let mut response = Redirect::to(location).into_response();
    for cookie in cookies {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

/// Failed form submission. The email is echoed back, the password never is.
fn form_failure(email: &str, problems: &[&str]) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "success": false,
            "email": email,
            "errors": problems,
        })),
    )
        .into_response()
}

fn session_not_found() -> Response {
    errors::json_error(
        StatusCode::BAD_REQUEST,
        "session_not_found",
        "session data not found",
    )
}
