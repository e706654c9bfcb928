use axum::{
    Router,
    routing::{get, post},
};

pub mod admin;
pub mod auth;
pub mod private;
pub mod system;

/// Router for everything downstream of the pipeline except `/health`.
pub fn router() -> Router {
    Router::new()
        .route("/", get(system::home))
        .route("/access-denied", get(system::access_denied))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/auth/oauth/:provider", get(auth::oauth_start))
        .route("/auth/callback", get(auth::oauth_callback))
        .nest("/private", private::router())
        .nest("/admin", admin::router())
}
