//! Host-only command handlers
//!
//! All handlers in this module require the Host role.
//! Authorization is checked in the main dispatch layer before calling these.
//! Successful commands answer nothing directly: the resulting state is broadcast to everyone.

use crate::protocol::ServerMessage;
use crate::puzzle::{GenerateSpec, PuzzleFilter};
use crate::session::SessionError;
use crate::state::{AppState, CommandError, CommandResult};
use crate::types::{HouseRules, PlayerSetup, Puzzle};
use std::sync::Arc;

/// Turn a command outcome into the reply for the host
fn reply(state: &AppState, action: &str, result: CommandResult<()>) -> Option<ServerMessage> {
    let err = result.err()?;
    tracing::info!("Host could not {}: {}", action, err);
    if let CommandError::Session(SessionError::InsufficientFunds { needed, .. }) = &err {
        state.send(ServerMessage::Notice {
            msg: format!("You need {} to buy a vowel.", needed),
        });
    }
    Some(ServerMessage::Error {
        code: err.code().to_string(),
        msg: err.to_string(),
    })
}

pub async fn handle_start_setup(
    state: &Arc<AppState>,
    players: Vec<PlayerSetup>,
) -> Option<ServerMessage> {
    tracing::info!("Host setting up {} players", players.len());
    reply(state, "set up", state.start_setup(players).await)
}

pub async fn handle_confirm_setup(state: &Arc<AppState>) -> Option<ServerMessage> {
    reply(state, "confirm setup", state.run(|s| s.confirm_setup()).await)
}

pub async fn handle_quick_play(
    state: &Arc<AppState>,
    players: Vec<PlayerSetup>,
    puzzle: Option<Puzzle>,
    filter: PuzzleFilter,
) -> Option<ServerMessage> {
    tracing::info!("Host starting quick play with {} players", players.len());
    reply(
        state,
        "start quick play",
        state.quick_play(players, puzzle, filter).await,
    )
}

pub async fn handle_set_puzzle(state: &Arc<AppState>, puzzle: Puzzle) -> Option<ServerMessage> {
    reply(state, "set puzzle", state.run(move |s| s.set_puzzle(puzzle)).await)
}

pub async fn handle_draw_puzzle(
    state: &Arc<AppState>,
    filter: PuzzleFilter,
) -> Option<ServerMessage> {
    let result = state.draw_puzzle(filter).await.map(|puzzle| {
        tracing::info!("Drew puzzle {:?} in {}", puzzle.id, puzzle.category);
    });
    reply(state, "draw puzzle", result)
}

pub async fn handle_spin(state: &Arc<AppState>) -> Option<ServerMessage> {
    reply(state, "spin", state.run(|s| s.trigger_spin()).await)
}

pub async fn handle_guess_letter(state: &Arc<AppState>, letter: char) -> Option<ServerMessage> {
    reply(
        state,
        "guess a letter",
        state.run(move |s| s.submit_guess(letter)).await,
    )
}

pub async fn handle_solve(state: &Arc<AppState>, text: String) -> Option<ServerMessage> {
    reply(state, "solve", state.run(move |s| s.submit_solve(&text)).await)
}

pub async fn handle_spoken_solve(
    state: &Arc<AppState>,
    audio_b64: String,
    mime: Option<String>,
) -> Option<ServerMessage> {
    let result = state
        .spoken_solve(&audio_b64, mime.as_deref())
        .await
        .map(|matched| tracing::info!("Spoken solve matched: {}", matched));
    reply(state, "judge spoken answer", result)
}

pub async fn handle_set_overlay(state: &Arc<AppState>, open: bool) -> Option<ServerMessage> {
    reply(
        state,
        "toggle overlay",
        state.run(move |s| Ok(s.set_overlay(open))).await,
    )
}

pub async fn handle_next_round(state: &Arc<AppState>) -> Option<ServerMessage> {
    reply(state, "start next round", state.run(|s| s.next_round()).await)
}

pub async fn handle_abandon_round(state: &Arc<AppState>) -> Option<ServerMessage> {
    reply(state, "abandon round", state.run(|s| s.abandon_round()).await)
}

pub async fn handle_set_house_rules(
    state: &Arc<AppState>,
    rules: HouseRules,
) -> Option<ServerMessage> {
    reply(
        state,
        "change house rules",
        state.run(move |s| s.set_house_rules(rules)).await,
    )
}

pub async fn handle_generate_puzzles(
    state: &Arc<AppState>,
    category: Option<String>,
    difficulty: Option<u8>,
    count: u32,
) -> Option<ServerMessage> {
    let spec = GenerateSpec {
        category,
        difficulty,
        count,
    };
    match state.generate_puzzles(spec).await {
        Ok(puzzles) => Some(ServerMessage::Puzzles { puzzles }),
        Err(e) => reply(state, "generate puzzles", Err(e)),
    }
}
