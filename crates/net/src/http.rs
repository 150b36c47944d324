use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use world::character::{CharacterError, CharacterStore};
use world::WorldService;

use crate::auth::{bearer_token, AuthBackend, AuthError};
use crate::ws;

/// Shared handler state: the world plus its collaborators.
pub struct AppState {
    pub auth: Arc<dyn AuthBackend>,
    pub characters: Arc<dyn CharacterStore>,
    pub world: Arc<WorldService>,
}

/// Build the public router: health probes, auth, the read-only world
/// endpoints, the WebSocket upgrade, and the bearer-protected character
/// routes.
pub fn router(state: Arc<AppState>, cors_origin: &str) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/readyz", get(ready))
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/login", post(login))
        .route("/v1/world/state", get(world_state))
        .route("/v1/world/players", get(world_players))
        .route("/v1/world/ws", get(ws::ws_handler))
        .route("/v1/characters", get(list_characters).post(create_character))
        .route("/v1/characters/{character_id}", get(get_character))
        .layer(cors_layer(cors_origin))
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin.is_empty() || origin == "*" {
        return layer.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            tracing::warn!(origin, "invalid CORS origin, allowing any");
            layer.allow_origin(Any)
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn ready() -> impl IntoResponse {
    Json(json!({"status": "ready"}))
}

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Credentials>,
) -> Response {
    match state.auth.register(&body.email, &body.password).await {
        Ok(result) => (StatusCode::CREATED, Json(result)).into_response(),
        Err(AuthError::EmailInUse) => (
            StatusCode::CONFLICT,
            Json(json!({"error": "email already in use"})),
        )
            .into_response(),
        Err(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid request"})),
        )
            .into_response(),
    }
}

async fn login(State(state): State<Arc<AppState>>, Json(body): Json<Credentials>) -> Response {
    match state.auth.login(&body.email, &body.password).await {
        Ok(result) => Json(result).into_response(),
        Err(_) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid credentials"})),
        )
            .into_response(),
    }
}

async fn world_state(State(state): State<Arc<AppState>>) -> Response {
    Json(state.world.snapshot().await).into_response()
}

async fn world_players(State(state): State<Arc<AppState>>) -> Response {
    let players = state.world.online_players().await;
    Json(json!({"players": players})).into_response()
}

#[derive(Debug, Deserialize)]
struct CreateCharacter {
    name: String,
    #[serde(default)]
    class: String,
}

async fn list_characters(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let account_id = match authorize(&state, &headers) {
        Ok(account_id) => account_id,
        Err(response) => return response,
    };
    match state.characters.list_for_account(account_id).await {
        Ok(items) => Json(json!({"items": items})).into_response(),
        Err(err) => {
            tracing::error!(account = %account_id, error = %err, "list characters failed");
            internal_error()
        }
    }
}

async fn create_character(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateCharacter>,
) -> Response {
    let account_id = match authorize(&state, &headers) {
        Ok(account_id) => account_id,
        Err(response) => return response,
    };
    match state
        .characters
        .create(account_id, &body.name, &body.class)
        .await
    {
        Ok(character) => (StatusCode::CREATED, Json(character)).into_response(),
        Err(err @ CharacterError::InvalidName) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": err.to_string()})),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(account = %account_id, error = %err, "create character failed");
            internal_error()
        }
    }
}

async fn get_character(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(character_id): Path<String>,
) -> Response {
    let account_id = match authorize(&state, &headers) {
        Ok(account_id) => account_id,
        Err(response) => return response,
    };
    let Ok(character_id) = Uuid::parse_str(&character_id) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid character id"})),
        )
            .into_response();
    };
    match state
        .characters
        .get_for_account(account_id, character_id)
        .await
    {
        Ok(character) => Json(character).into_response(),
        Err(CharacterError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "character not found"})),
        )
            .into_response(),
        Err(CharacterError::Forbidden) => (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "forbidden"})),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(character = %character_id, error = %err, "get character failed");
            internal_error()
        }
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<Uuid, Response> {
    let Some(token) = bearer_token(headers) else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "missing bearer token"})),
        )
            .into_response());
    };
    state.auth.parse_token(token).map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid token"})),
        )
            .into_response()
    })
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "internal error"})),
    )
        .into_response()
}
