//! RDF console routes: query, update, and the latest patch log.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Form;
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

use super::require_admin;

#[derive(Debug, Deserialize)]
pub(super) struct QueryForm {
    sparql_query: String,
}

/// `POST /query`: run a SELECT and return the rows as CSV.
pub(super) async fn query(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<QueryForm>,
) -> Result<Response, ApiError> {
    require_admin(&state, &jar).await?;
    let csv = state.sparql.select_csv(&form.sparql_query).await?;
    Ok(([(header::CONTENT_TYPE, "text/csv")], csv).into_response())
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateForm {
    sparql_update_query: String,
}

/// `POST /update`: run a SPARQL update.
pub(super) async fn update(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<UpdateForm>,
) -> Result<String, ApiError> {
    require_admin(&state, &jar).await?;
    let body = state.sparql.update(&form.sparql_update_query).await?;
    Ok(body)
}

/// `POST /log`: fetch the newest patch from the configured datasource.
pub(super) async fn log(State(state): State<AppState>, jar: CookieJar) -> Result<String, ApiError> {
    require_admin(&state, &jar).await?;
    let log = state
        .delta
        .latest_log(&state.config.delta_datasource)
        .await?;
    Ok(log)
}
