//! WebSocket message dispatch
//!
//! Authorization is checked here, then host commands go to the [`host`](super::host) handlers.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Role;
use std::sync::Arc;

use super::host;

/// Macro to check host authorization and return early if unauthorized
macro_rules! check_host {
    ($role:expr, $action:expr) => {
        if *$role != Role::Host {
            return Some(ServerMessage::Error {
                code: "UNAUTHORIZED".to_string(),
                msg: format!("Only host can {}", $action),
            });
        }
    };
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    role: &Role,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        // Anyone may resync
        ClientMessage::RequestState => Some(ServerMessage::State {
            state: state.snapshot().await,
        }),

        ClientMessage::StartSetup { players } => {
            check_host!(role, "set up a game");
            host::handle_start_setup(state, players).await
        }

        ClientMessage::ConfirmSetup => {
            check_host!(role, "confirm setup");
            host::handle_confirm_setup(state).await
        }

        ClientMessage::QuickPlay {
            players,
            puzzle,
            filter,
        } => {
            check_host!(role, "start quick play");
            host::handle_quick_play(state, players, puzzle, filter).await
        }

        ClientMessage::SetPuzzle { puzzle } => {
            check_host!(role, "set puzzles");
            host::handle_set_puzzle(state, puzzle).await
        }

        ClientMessage::DrawPuzzle { filter } => {
            check_host!(role, "draw puzzles");
            host::handle_draw_puzzle(state, filter).await
        }

        ClientMessage::SpinWheel => {
            check_host!(role, "spin the wheel");
            host::handle_spin(state).await
        }

        ClientMessage::GuessLetter { letter } => {
            check_host!(role, "guess letters");
            host::handle_guess_letter(state, letter).await
        }

        ClientMessage::SolvePuzzle { text } => {
            check_host!(role, "solve puzzles");
            host::handle_solve(state, text).await
        }

        ClientMessage::SpokenSolve { audio_b64, mime } => {
            check_host!(role, "solve puzzles");
            host::handle_spoken_solve(state, audio_b64, mime).await
        }

        ClientMessage::SetOverlay { open } => {
            check_host!(role, "open overlays");
            host::handle_set_overlay(state, open).await
        }

        ClientMessage::NextRound => {
            check_host!(role, "start the next round");
            host::handle_next_round(state).await
        }

        ClientMessage::AbandonRound => {
            check_host!(role, "abandon rounds");
            host::handle_abandon_round(state).await
        }

        ClientMessage::SetHouseRules { rules } => {
            check_host!(role, "change house rules");
            host::handle_set_house_rules(state, rules).await
        }

        ClientMessage::GeneratePuzzles {
            category,
            difficulty,
            count,
        } => {
            check_host!(role, "generate puzzles");
            host::handle_generate_puzzles(state, category, difficulty, count).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GamePhase, PlayerSetup};

    #[tokio::test]
    async fn test_unauthorized_host_command() {
        let state = Arc::new(AppState::new());
        let role = Role::Board;

        let result = handle_message(ClientMessage::SpinWheel, &role, &state).await;

        assert!(result.is_some());
        if let Some(ServerMessage::Error { code, .. }) = result {
            assert_eq!(code, "UNAUTHORIZED");
        }
    }

    #[tokio::test]
    async fn test_board_can_request_state() {
        let state = Arc::new(AppState::new());
        let result = handle_message(ClientMessage::RequestState, &Role::Board, &state).await;
        match result {
            Some(ServerMessage::State { state }) => assert_eq!(state.phase, GamePhase::Idle),
            other => panic!("Unexpected response {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_host_setup_then_confirm() {
        let state = Arc::new(AppState::new());
        let players = vec![PlayerSetup {
            name: Some("Ana".to_string()),
            is_computer: false,
            difficulty: None,
        }];

        let result =
            handle_message(ClientMessage::StartSetup { players }, &Role::Host, &state).await;
        assert!(result.is_none());
        assert_eq!(state.snapshot().await.phase, GamePhase::Setup);

        let result = handle_message(ClientMessage::ConfirmSetup, &Role::Host, &state).await;
        assert!(result.is_none());
        assert_eq!(state.snapshot().await.phase, GamePhase::Ready);
    }

    #[tokio::test]
    async fn test_illegal_command_reports_code() {
        let state = Arc::new(AppState::new());
        let result = handle_message(ClientMessage::NextRound, &Role::Host, &state).await;
        match result {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "ILLEGAL_PHASE"),
            other => panic!("Unexpected response {:?}", other),
        }
    }
}
