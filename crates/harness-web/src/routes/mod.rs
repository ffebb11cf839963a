//! HTTP routes
//!
//! The surface mirrors the harness console: `/login`, `/token`, `/logout`,
//! and the status page are open; the broker and RDF routes sit behind the
//! admin gate. Handlers resolve the session from the cookie on every
//! request, which is also what keeps tokens silently refreshed.

mod auth;
mod broker;
mod rdf;

use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;

use harness_auth::Session;

use crate::error::ApiError;
use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "harness_session";

const SESSION_COOKIE_TTL_HOURS: i64 = 12;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(auth::index))
        .route("/login", get(auth::login))
        .route("/token", get(auth::token_query).post(auth::token_form))
        .route("/logout", get(auth::logout))
        .route("/produce", post(broker::produce))
        .route("/peek", post(broker::peek))
        .route("/consume", post(broker::consume))
        .route("/query", post(rdf::query))
        .route("/update", post(rdf::update))
        .route("/log", post(rdf::log))
        .with_state(state)
}

/// Session id carried by the request, if any.
fn session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// Resolve the request's session and check it against the admin gate.
async fn require_admin(state: &AppState, jar: &CookieJar) -> Result<Session, ApiError> {
    let id = session_id(jar);
    match state.controller.resolve_session(id.as_deref()).await {
        Some(session) if state.gate.authorize(Some(&session.principal.roles)) => Ok(session),
        _ => Err(ApiError::Unauthorized),
    }
}

/// Session cookie for a fresh login.
fn session_cookie(id: &str, local_dev: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .http_only(true)
        .secure(!local_dev)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::hours(SESSION_COOKIE_TTL_HOURS))
        .build()
}

/// Removal cookie for logout.
fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}
