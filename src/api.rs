//! HTTP API endpoints for the puzzle library and host settings.
//!
//! These endpoints are used by the host UI outside the live game loop.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::puzzle::GenerateSpec;
use crate::settings::Settings;
use crate::state::{AppState, CommandError};
use crate::types::Puzzle;

#[derive(Debug, Clone, Serialize)]
pub struct PuzzleListResponse {
    pub puzzles: Vec<Puzzle>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateBody {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<u8>,
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    5
}

fn error_response(status: StatusCode, err: CommandError) -> Response {
    (
        status,
        Json(serde_json::json!({ "code": err.code(), "msg": err.to_string() })),
    )
        .into_response()
}

/// List the puzzle library.
///
/// GET /api/puzzles
pub async fn list_puzzles(State(state): State<Arc<AppState>>) -> Json<PuzzleListResponse> {
    let library = state.services.library.lock().await;
    Json(PuzzleListResponse {
        puzzles: library.puzzles(),
        categories: library.categories(),
    })
}

/// Add a host-written puzzle.
///
/// POST /api/puzzles
pub async fn add_puzzle(
    State(state): State<Arc<AppState>>,
    Json(puzzle): Json<Puzzle>,
) -> Response {
    let result = state.services.library.lock().await.add(puzzle);
    match result {
        Ok(stored) => (StatusCode::CREATED, Json(stored)).into_response(),
        Err(e) => {
            tracing::warn!("Puzzle rejected: {}", e);
            let err = CommandError::from(e);
            let status = if err.code() == "INVALID_PUZZLE" {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            error_response(status, err)
        }
    }
}

/// Generate puzzles with the configured LLM and add them to the library.
///
/// POST /api/puzzles/generate
pub async fn generate_puzzles(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerateBody>,
) -> Response {
    let spec = GenerateSpec {
        category: body.category,
        difficulty: body.difficulty,
        count: body.count,
    };
    match state.generate_puzzles(spec).await {
        Ok(puzzles) => Json(puzzles).into_response(),
        Err(e) => {
            tracing::error!("Puzzle generation failed: {}", e);
            let status = match e {
                CommandError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            };
            error_response(status, e)
        }
    }
}

/// Current settings with secrets redacted.
///
/// GET /api/settings
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<Settings> {
    Json(state.services.settings().await.redacted())
}

/// Save settings, reconnect providers and apply the house rules.
///
/// PUT /api/settings
pub async fn put_settings(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<Settings>,
) -> Response {
    match state.services.save_settings(settings).await {
        Ok(saved) => {
            state.load_settings().await;
            state.send(crate::protocol::ServerMessage::State {
                state: state.snapshot().await,
            });
            Json(saved.redacted()).into_response()
        }
        Err(e) => {
            tracing::error!("Settings save failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Save failed: {}", e),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::REDACTED;

    #[tokio::test]
    async fn test_list_puzzles_has_seeds() {
        let state = Arc::new(AppState::new());
        let Json(list) = list_puzzles(State(state)).await;
        assert!(!list.puzzles.is_empty());
        assert!(list.categories.iter().any(|c| c == "ANIMAL"));
    }

    #[tokio::test]
    async fn test_add_puzzle_status() {
        let state = Arc::new(AppState::new());
        let ok = add_puzzle(State(state.clone()), Json(Puzzle::new("Sport", "play tennis"))).await;
        assert_eq!(ok.status(), StatusCode::CREATED);

        let bad = add_puzzle(State(state.clone()), Json(Puzzle::new("Sport", "42"))).await;
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_settings_round_trip_redacts_key() {
        let state = Arc::new(AppState::new());
        let settings = Settings {
            openai_api_key: Some("sk-live".to_string()),
            ..Settings::default()
        };
        let response = put_settings(State(state.clone()), Json(settings)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let Json(shown) = get_settings(State(state)).await;
        assert_eq!(shown.openai_api_key.as_deref(), Some(REDACTED));
    }

    #[tokio::test]
    async fn test_generate_without_provider() {
        let state = Arc::new(AppState::new());
        let body = GenerateBody {
            category: None,
            difficulty: None,
            count: 2,
        };
        let response = generate_puzzles(State(state), Json(body)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
