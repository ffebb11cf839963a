//! Login, callback, logout, and the status page.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};
use axum_extra::extract::CookieJar;
use serde_json::{json, Value};

use harness_auth::AuthError;

use crate::config::redact;
use crate::error::ApiError;
use crate::state::AppState;

use super::{clear_session_cookie, session_cookie, session_id};

/// `GET /login`: start the authorization-code flow and send the browser
/// to the provider.
pub(super) async fn login(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let target = state
        .controller
        .initiate_login(&state.config.provider.scopes, &state.config.callback_uri())
        .await?;
    Ok(Redirect::to(&target.auth_uri))
}

/// `GET /token`: provider callback in query-parameter form.
pub(super) async fn token_query(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    complete(state, jar, params).await
}

/// `POST /token`: provider callback in `form_post` form.
pub(super) async fn token_form(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(params): Form<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    complete(state, jar, params).await
}

/// A bad callback leaves the browser signed out on the status page; only
/// claims-fetch and provider transport failures surface as HTTP errors.
async fn complete(
    state: AppState,
    jar: CookieJar,
    params: HashMap<String, String>,
) -> Result<Response, ApiError> {
    match state.controller.complete_login(&params).await {
        Ok(session) => {
            let jar = jar.add(session_cookie(&session.id, state.config.local_dev));
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(AuthError::InvalidState) | Err(AuthError::ExchangeFailed(_)) => {
            Ok(Redirect::to("/").into_response())
        }
        Err(err) => Err(err.into()),
    }
}

/// `GET /logout`: drop the session and send the browser to the provider
/// logout URL, which redirects back to the app afterwards.
pub(super) async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let id = session_id(&jar).unwrap_or_default();
    let logout_uri = state.controller.logout(&id, &state.config.base_url).await;
    (jar.remove(clear_session_cookie()), Redirect::to(&logout_uri))
}

/// `GET /`: status page with the signed-in principal and the redacted
/// configuration.
pub(super) async fn index(State(state): State<AppState>, jar: CookieJar) -> Json<Value> {
    let id = session_id(&jar);
    let session = state.controller.resolve_session(id.as_deref()).await;
    let authorized = state
        .gate
        .authorize(session.as_ref().map(|s| &s.principal.roles));

    let user = session.as_ref().map(|s| {
        json!({
            "id": s.principal.id,
            "username": s.principal.username,
            "display_name": s.principal.display_name,
            "roles": s.principal.roles.iter().collect::<Vec<_>>(),
        })
    });

    let config = &state.config;
    Json(json!({
        "authenticated": session.is_some(),
        "authorized": authorized,
        "user": user,
        "config": {
            "client_id": redact(&config.provider.client_id),
            "client_secret": config.provider.client_secret.as_deref().map(redact),
            "tenant_id": redact(&config.provider.tenant_id),
            "admin_role": config.admin_role,
            "broker_endpoint": config.broker.endpoint,
            "broker_topic": config.broker.topic,
            "broker_subscription": config.broker.subscription,
            "broker_connection": config.broker.redacted_connection(),
            "sparql_endpoint": config.sparql_endpoint,
            "sparql_update_endpoint": config.sparql_update_endpoint,
            "rdfdelta_endpoint": config.delta_endpoint,
            "rdfdelta_datasource": config.delta_datasource,
        },
    }))
}
