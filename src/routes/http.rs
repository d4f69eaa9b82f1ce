//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Path, State}, http::StatusCode, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::logic::dispatch;
use crate::protocol::*;
use crate::state::{AppState, SessionScope};

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, generation: state.generator.backend_name() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_roles(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(state.catalog.roles().to_vec())
}

#[instrument(level = "info", skip(state))]
pub async fn http_create_session(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  let (session_id, handle) = state.create_session(SessionScope::Http).await?;
  let session = handle.lock().await.snapshot();
  Ok((StatusCode::CREATED, Json(SessionCreatedOut { session_id, session })))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
  let handle = state.get_session(&id).await.ok_or_else(|| ApiError::UnknownSession(id.clone()))?;
  let snapshot = handle.lock().await.snapshot();
  Ok(Json(snapshot))
}

#[instrument(level = "info", skip(state, action), fields(%id, action = action.name()))]
pub async fn http_post_action(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(action): Json<ClientAction>,
) -> Result<impl IntoResponse, ApiError> {
  let handle = state.get_session(&id).await.ok_or_else(|| ApiError::UnknownSession(id.clone()))?;
  let snapshot = dispatch(&state, &handle, action).await;
  info!(target: "session", session_id = %id, view = snapshot.view.name(), error = ?snapshot.error, "HTTP action applied");
  Ok(Json(snapshot))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
  if state.remove_session(&id).await {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::UnknownSession(id))
  }
}
