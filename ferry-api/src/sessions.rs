//! Session registry handlers

use crate::error::ApiError;
use crate::types::CreateSessionRequest;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use ferry_coordinator::Error as CoordinatorError;
use ferry_storage::Session;
use tracing::info;

pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = Session::new(&request.name, Utc::now());
    state.sessions.create(session.clone()).await?;
    info!(session = %session.name, "registered migration session");
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Session>>, ApiError> {
    Ok(Json(state.sessions.list().await?))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let session = state
        .sessions
        .find(&name)
        .await?
        .ok_or_else(|| CoordinatorError::NotFound(format!("session {}", name)))?;
    Ok(Json(session))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.sessions.delete(&name).await?;
    info!(session = %name, "deleted migration session");
    Ok(StatusCode::NO_CONTENT)
}
