pub mod handlers;
pub mod host;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, mpsc};

use crate::auth::HostAuth;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Role;

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub role: Option<String>,
    pub token: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    tracing::info!("WebSocket connection request: role={:?}", params.role);

    let Some(role) = admit(&params, &state.host_auth) else {
        tracing::warn!("Rejected host connection with a missing or wrong token");
        return (StatusCode::UNAUTHORIZED, "Host token required").into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, role, state))
        .into_response()
}

/// Role for a connection, or None when a host connection lacks the token
pub fn admit(params: &WsQuery, auth: &HostAuth) -> Option<Role> {
    let role = parse_role(params.role.as_deref());
    if role == Role::Host && !auth.validate(params.token.as_deref()) {
        return None;
    }
    Some(role)
}

/// Anything that isn't the host is a board display
pub fn parse_role(raw: Option<&str>) -> Role {
    match raw {
        Some("host") => Role::Host,
        _ => Role::Board,
    }
}

pub async fn welcome(state: &AppState, role: Role) -> ServerMessage {
    ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        role,
        state: state.snapshot().await,
        server_now: chrono::Utc::now().to_rfc3339(),
    }
}

/// Commands that wait on the LLM or speech service
fn waits_on_service(msg: &ClientMessage) -> bool {
    matches!(
        msg,
        ClientMessage::SpokenSolve { .. } | ClientMessage::GeneratePuzzles { .. }
    )
}

/// Handle one client message. Slow commands run on their own task and answer through
/// `replies`, so the socket keeps draining broadcasts meanwhile.
pub async fn dispatch(
    msg: ClientMessage,
    role: Role,
    state: &Arc<AppState>,
    replies: &mpsc::UnboundedSender<ServerMessage>,
) -> Option<ServerMessage> {
    if !waits_on_service(&msg) {
        return handlers::handle_message(msg, &role, state).await;
    }
    let state = Arc::clone(state);
    let replies = replies.clone();
    tokio::spawn(async move {
        if let Some(response) = handlers::handle_message(msg, &role, &state).await {
            // Socket may be gone by now
            let _ = replies.send(response);
        }
    });
    None
}

async fn send_json<S>(sender: &mut S, msg: &ServerMessage) -> bool
where
    S: SinkExt<Message> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize {:?}: {}", msg, e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, role: Role, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();

    tracing::info!("WebSocket connected with role: {:?}", role);

    // Subscribe before the welcome so no broadcast falls between snapshot and stream
    let mut broadcast_rx = state.broadcast.subscribe();

    if !send_json(&mut sender, &welcome(&state, role).await).await {
        tracing::error!("Failed to send welcome message");
        return;
    }

    loop {
        tokio::select! {
            broadcast_msg = broadcast_rx.recv() => {
                let msg = match broadcast_msg {
                    Ok(msg) => msg,
                    Err(RecvError::Lagged(skipped)) => {
                        // Catch up with a full snapshot instead of the missed deltas
                        tracing::warn!("Client lagged by {} messages, resyncing", skipped);
                        ServerMessage::State { state: state.snapshot().await }
                    }
                    Err(RecvError::Closed) => break,
                };
                if !send_json(&mut sender, &msg).await {
                    break;
                }
            }

            Some(reply) = reply_rx.recv() => {
                if !send_json(&mut sender, &reply).await {
                    break;
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => dispatch(client_msg, role, &state, &reply_tx).await,
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                })
                            }
                        };

                        if let Some(response) = response {
                            if !send_json(&mut sender, &response).await {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!("WebSocket connection closed for role: {:?}", role);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmResult, SolutionJudge, SpokenAudio};
    use crate::puzzle::PuzzleFilter;
    use crate::services::Services;
    use crate::types::{GamePhase, PlayerSetup, Puzzle};
    use async_trait::async_trait;
    use std::time::Duration;

    fn query(role: &str, token: Option<&str>) -> WsQuery {
        WsQuery {
            role: Some(role.to_string()),
            token: token.map(str::to_string),
        }
    }

    struct SlowJudge;

    #[async_trait]
    impl SolutionJudge for SlowJudge {
        async fn transcribe(&self, _audio: &SpokenAudio) -> LlmResult<String> {
            tokio::time::sleep(Duration::from_secs(20)).await;
            Ok("apple pie".to_string())
        }
    }

    #[test]
    fn test_host_needs_token_when_configured() {
        let auth = HostAuth::with_token("chalk-42");
        assert_eq!(admit(&query("host", Some("chalk-42")), &auth), Some(Role::Host));
        assert_eq!(admit(&query("host", Some("nope")), &auth), None);
        assert_eq!(admit(&query("host", None), &auth), None);
        assert_eq!(admit(&query("board", None), &auth), Some(Role::Board));

        let open = HostAuth::default();
        assert_eq!(admit(&query("host", None), &open), Some(Role::Host));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_command_does_not_hold_the_socket() {
        use base64::{engine::general_purpose::STANDARD, Engine as _};

        let (tx, _rx) = tokio::sync::broadcast::channel(256);
        let services = Services::in_memory().with_judge(Arc::new(SlowJudge));
        let state = Arc::new(AppState::with_parts(
            crate::session::Session::with_seed(1),
            services,
            tx,
        ));
        let (replies, _reply_rx) = mpsc::unbounded_channel();

        let players = vec![PlayerSetup {
            name: Some("Ana".to_string()),
            is_computer: false,
            difficulty: None,
        }];
        let start = ClientMessage::QuickPlay {
            players,
            puzzle: Some(Puzzle::new("Food", "apple pie")),
            filter: PuzzleFilter::default(),
        };
        assert!(dispatch(start, Role::Host, &state, &replies).await.is_none());

        let started = tokio::time::Instant::now();
        let spoken = ClientMessage::SpokenSolve {
            audio_b64: STANDARD.encode(b"fake audio"),
            mime: None,
        };
        assert!(dispatch(spoken, Role::Host, &state, &replies).await.is_none());
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(state.snapshot().await.phase, GamePhase::Spinning);

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(state.snapshot().await.phase, GamePhase::Solving);
    }

    #[tokio::test]
    async fn test_slow_command_error_comes_back_on_reply_channel() {
        let state = Arc::new(AppState::new());
        let (replies, mut reply_rx) = mpsc::unbounded_channel();
        let generate = ClientMessage::GeneratePuzzles {
            category: None,
            difficulty: None,
            count: 3,
        };
        assert!(dispatch(generate, Role::Host, &state, &replies).await.is_none());
        match reply_rx.recv().await {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "UNAVAILABLE"),
            other => panic!("Unexpected reply {:?}", other),
        }
    }

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role(Some("host")), Role::Host);
        assert_eq!(parse_role(Some("board")), Role::Board);
        assert_eq!(parse_role(Some("beamer")), Role::Board);
        assert_eq!(parse_role(None), Role::Board);
    }

    #[tokio::test]
    async fn test_welcome_carries_snapshot() {
        let state = AppState::new();
        match welcome(&state, Role::Board).await {
            ServerMessage::Welcome {
                protocol,
                role,
                state,
                ..
            } => {
                assert_eq!(protocol, PROTOCOL_VERSION);
                assert_eq!(role, Role::Board);
                assert_eq!(state.phase, crate::types::GamePhase::Idle);
            }
            other => panic!("Unexpected message {:?}", other),
        }
    }
}
