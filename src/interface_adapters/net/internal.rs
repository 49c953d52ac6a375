// HTTP control surface for session lifecycle, consumed by launchers and
// matchmaking rather than by game clients.

use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::net::client::spawn_delta_serializer;
use crate::interface_adapters::protocol::{SessionDto, SessionSettingsDto};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::SessionError;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    // Player creating (and initially hosting) the session.
    host_id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    settings: SessionSettingsDto,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    // The session id that was created.
    session_id: String,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionRequest {
    player_id: String,
    #[serde(default)]
    display_name: Option<String>,
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn session_error_response(err: SessionError) -> axum::response::Response {
    let status = match err {
        SessionError::NotFound => StatusCode::NOT_FOUND,
        SessionError::AlreadyExists | SessionError::AlreadyStarted | SessionError::Full => {
            StatusCode::CONFLICT
        }
    };
    error_response(status, err.as_str())
}

pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    let host_id = payload.host_id.trim().to_string();
    if host_id.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "hostId is required");
    }
    let display_name = payload
        .display_name
        .unwrap_or_default()
        .trim()
        .to_string();
    let display_name = if display_name.is_empty() {
        host_id.clone()
    } else {
        display_name
    };

    // Ids are assigned here, not by the caller; `rand_id` is process-unique.
    let session_id = format!("session-{}", rand_id());

    match state
        .session_registry
        .create_session(session_id.clone(), host_id, display_name, payload.settings.into())
        .await
    {
        Ok(handle) => {
            // Spawn the serializer now so clients can subscribe before start.
            spawn_delta_serializer(&handle);
            (StatusCode::CREATED, Json(CreateSessionResponse { session_id })).into_response()
        }
        Err(err) => session_error_response(err),
    }
}

pub async fn join_session_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<JoinSessionRequest>,
) -> impl IntoResponse {
    let player_id = payload.player_id.trim().to_string();
    if player_id.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "playerId is required");
    }
    let display_name = payload
        .display_name
        .unwrap_or_default()
        .trim()
        .to_string();
    let display_name = if display_name.is_empty() {
        player_id.clone()
    } else {
        display_name
    };

    match state
        .session_registry
        .join_session(&session_id, player_id, display_name)
        .await
    {
        Ok(_handle) => match state.session_registry.session_record(&session_id).await {
            Some(record) => (StatusCode::OK, Json(SessionDto::from(record))).into_response(),
            None => session_error_response(SessionError::NotFound),
        },
        Err(err) => session_error_response(err),
    }
}

pub async fn start_session_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.session_registry.start_session(&session_id).await {
        Ok(_handle) => match state.session_registry.session_record(&session_id).await {
            Some(record) => (StatusCode::OK, Json(SessionDto::from(record))).into_response(),
            None => session_error_response(SessionError::NotFound),
        },
        Err(err) => session_error_response(err),
    }
}

pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let sessions = state.session_registry.list_sessions().await;
    let dtos: Vec<SessionDto> = sessions.into_iter().map(Into::into).collect();
    Json(dtos)
}

pub async fn health_handler() -> &'static str {
    "ok"
}
