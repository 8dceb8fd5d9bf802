use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use wheeldash::cue::{BroadcastCues, Cue};
use wheeldash::protocol::{ClientMessage, ServerMessage};
use wheeldash::puzzle::PuzzleFilter;
use wheeldash::services::Services;
use wheeldash::session::{Session, SPIN_DURATION, TURN_ADVANCE_DELAY};
use wheeldash::state::AppState;
use wheeldash::types::{GamePhase, PlayerSetup, Puzzle, Role, SegmentKind, WheelSegment};
use wheeldash::wheel::Wheel;
use wheeldash::ws::handlers::handle_message;

fn segment(kind: SegmentKind, value: i64) -> WheelSegment {
    WheelSegment {
        id: 0,
        label: value.to_string(),
        value,
        kind,
        weight: 1.0,
    }
}

/// App state whose wheel always lands on `seg`, plus a receiver for everything broadcast
fn fixed_wheel_state(seg: WheelSegment) -> (Arc<AppState>, broadcast::Receiver<ServerMessage>) {
    let (tx, rx) = broadcast::channel(4096);
    let services = Services::in_memory().with_cues(Arc::new(BroadcastCues::new(tx.clone())));
    let session = Session::with_seed(11).with_wheel(Wheel::new(vec![seg]));
    (Arc::new(AppState::with_parts(session, services, tx)), rx)
}

fn human(name: &str) -> PlayerSetup {
    PlayerSetup {
        name: Some(name.to_string()),
        is_computer: false,
        difficulty: None,
    }
}

fn computer(difficulty: u8) -> PlayerSetup {
    PlayerSetup {
        name: None,
        is_computer: true,
        difficulty: Some(difficulty),
    }
}

fn drain(rx: &mut broadcast::Receiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

fn cues(messages: &[ServerMessage]) -> Vec<Cue> {
    messages
        .iter()
        .filter_map(|m| match m {
            ServerMessage::Cue { cue } => Some(*cue),
            _ => None,
        })
        .collect()
}

async fn host(state: &Arc<AppState>, msg: ClientMessage) -> Option<ServerMessage> {
    handle_message(msg, &Role::Host, state).await
}

async fn quick_play(state: &Arc<AppState>, players: Vec<PlayerSetup>, phrase: &str) {
    let response = host(
        state,
        ClientMessage::QuickPlay {
            players,
            puzzle: Some(Puzzle::new("Phrase", phrase)),
            filter: PuzzleFilter::default(),
        },
    )
    .await;
    assert!(response.is_none(), "quick play failed: {:?}", response);
}

async fn spin_and_land(state: &Arc<AppState>) {
    assert!(host(state, ClientMessage::SpinWheel).await.is_none());
    tokio::time::sleep(SPIN_DURATION + Duration::from_millis(10)).await;
}

/// End-to-end: spin, hit, solve, bank, next round with the following player
#[tokio::test(start_paused = true)]
async fn test_full_round_flow() {
    let (state, mut rx) = fixed_wheel_state(segment(SegmentKind::Cash, 500));
    quick_play(&state, vec![human("Ana"), human("Ben")], "hot tea").await;

    let snapshot = state.snapshot().await;
    assert_eq!(snapshot.phase, GamePhase::Spinning);
    assert_eq!(snapshot.board.as_deref(), Some("___ ___"));

    spin_and_land(&state).await;
    let snapshot = state.snapshot().await;
    assert_eq!(snapshot.phase, GamePhase::GuessingLetter);
    assert_eq!(snapshot.spin_value, Some(500));

    assert!(host(&state, ClientMessage::GuessLetter { letter: 't' })
        .await
        .is_none());
    let snapshot = state.snapshot().await;
    assert_eq!(snapshot.players[0].round_score, 1000);
    assert_eq!(snapshot.phase, GamePhase::Spinning);
    assert_eq!(snapshot.current_player_index, 0);

    // Board locked while the tiles animate
    match host(&state, ClientMessage::SolvePuzzle { text: "hot tea".into() }).await {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "INPUT_LOCKED"),
        other => panic!("Expected INPUT_LOCKED, got {:?}", other),
    }
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(state.snapshot().await.board.as_deref(), Some("__T T__"));

    assert!(host(&state, ClientMessage::SolvePuzzle { text: "Hot  tea!".into() })
        .await
        .is_none());
    let snapshot = state.snapshot().await;
    assert_eq!(snapshot.phase, GamePhase::Solving);
    assert_eq!(snapshot.players[0].total_score, 1000);
    assert_eq!(snapshot.players[0].round_score, 0);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(state.snapshot().await.board.as_deref(), Some("HOT TEA"));

    let messages = drain(&mut rx);
    let cues = cues(&messages);
    assert!(cues.contains(&Cue::Hit));
    assert!(cues.contains(&Cue::Win));
    assert!(messages.iter().any(|m| matches!(
        m,
        ServerMessage::RoundWon { amount: 1000, leaderboard, .. } if leaderboard[0].name == "Ana"
    )));
    assert!(messages
        .iter()
        .any(|m| matches!(m, ServerMessage::SolveResult { correct: true })));

    assert!(host(&state, ClientMessage::NextRound).await.is_none());
    let snapshot = state.snapshot().await;
    assert_eq!(snapshot.phase, GamePhase::Ready);
    assert_eq!(snapshot.current_player_index, 1);

    assert!(host(
        &state,
        ClientMessage::DrawPuzzle {
            filter: PuzzleFilter::default()
        }
    )
    .await
    .is_none());
    let snapshot = state.snapshot().await;
    assert_eq!(snapshot.phase, GamePhase::Spinning);
    assert_eq!(snapshot.round_no, 2);
    assert_eq!(snapshot.players[0].total_score, 1000);
}

#[tokio::test(start_paused = true)]
async fn test_miss_passes_turn_after_delay() {
    let (state, mut rx) = fixed_wheel_state(segment(SegmentKind::Cash, 300));
    quick_play(&state, vec![human("Ana"), human("Ben")], "apple").await;

    spin_and_land(&state).await;
    assert!(host(&state, ClientMessage::GuessLetter { letter: 'z' })
        .await
        .is_none());

    let snapshot = state.snapshot().await;
    assert!(snapshot.is_processing);
    assert_eq!(snapshot.current_player_index, 0);

    // Nothing can be done during the hand-over
    match host(&state, ClientMessage::SpinWheel).await {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "ILLEGAL_PHASE"),
        other => panic!("Expected rejection, got {:?}", other),
    }

    tokio::time::sleep(TURN_ADVANCE_DELAY + Duration::from_millis(10)).await;
    let snapshot = state.snapshot().await;
    assert!(!snapshot.is_processing);
    assert_eq!(snapshot.current_player_index, 1);
    assert_eq!(snapshot.phase, GamePhase::Spinning);

    let messages = drain(&mut rx);
    assert!(cues(&messages).contains(&Cue::Miss));
    assert!(messages
        .iter()
        .any(|m| matches!(m, ServerMessage::Notice { msg } if msg == "There is no Z.")));
    assert!(messages
        .iter()
        .any(|m| matches!(m, ServerMessage::TurnAnnounced { name, .. } if name == "Ben")));
}

#[tokio::test(start_paused = true)]
async fn test_lose_turn_segment() {
    let (state, mut rx) = fixed_wheel_state(segment(SegmentKind::LoseTurn, 0));
    quick_play(&state, vec![human("Ana"), human("Ben"), human("Cy")], "apple").await;

    spin_and_land(&state).await;
    tokio::time::sleep(TURN_ADVANCE_DELAY + Duration::from_millis(10)).await;

    assert_eq!(state.snapshot().await.current_player_index, 1);
    assert!(cues(&drain(&mut rx)).contains(&Cue::Lose));
}

#[tokio::test(start_paused = true)]
async fn test_countdown_expiry_costs_turn() {
    let (state, mut rx) = fixed_wheel_state(segment(SegmentKind::Cash, 300));
    quick_play(&state, vec![human("Ana"), human("Ben")], "apple").await;
    spin_and_land(&state).await;

    tokio::time::sleep(Duration::from_secs(31)).await;
    tokio::time::sleep(TURN_ADVANCE_DELAY).await;

    let snapshot = state.snapshot().await;
    assert_eq!(snapshot.current_player_index, 1);
    assert_eq!(snapshot.phase, GamePhase::Spinning);

    let messages = drain(&mut rx);
    let ticks = cues(&messages).iter().filter(|c| **c == Cue::Tick).count();
    assert_eq!(ticks, 5);
    assert!(messages
        .iter()
        .any(|m| matches!(m, ServerMessage::Notice { msg } if msg == "Time's up!")));
}

#[tokio::test(start_paused = true)]
async fn test_overlay_pauses_countdown() {
    let (state, _rx) = fixed_wheel_state(segment(SegmentKind::Cash, 300));
    quick_play(&state, vec![human("Ana"), human("Ben")], "apple").await;
    spin_and_land(&state).await;

    assert!(host(&state, ClientMessage::SetOverlay { open: true })
        .await
        .is_none());
    tokio::time::sleep(Duration::from_secs(60)).await;
    let snapshot = state.snapshot().await;
    assert_eq!(snapshot.current_player_index, 0);
    assert_eq!(snapshot.phase, GamePhase::GuessingLetter);

    assert!(host(&state, ClientMessage::SetOverlay { open: false })
        .await
        .is_none());
    assert_eq!(state.snapshot().await.countdown, 30);
}

#[tokio::test(start_paused = true)]
async fn test_computer_takes_its_turn() {
    let (state, _rx) = fixed_wheel_state(segment(SegmentKind::Cash, 200));
    quick_play(&state, vec![computer(4), human("Ana")], "tea").await;

    // Human commands are refused on the computer's turn
    match host(&state, ClientMessage::SpinWheel).await {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "NOT_YOUR_TURN"),
        other => panic!("Expected NOT_YOUR_TURN, got {:?}", other),
    }

    tokio::time::sleep(Duration::from_secs(10)).await;
    let snapshot = state.snapshot().await;
    assert!(snapshot.guessed_letters.contains(&'T'));
    assert_eq!(snapshot.players[0].round_score, 200);
    assert!(!snapshot.players[0].name.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_abandon_cancels_pending_work() {
    let (state, _rx) = fixed_wheel_state(segment(SegmentKind::Cash, 300));
    quick_play(&state, vec![computer(2), computer(2)], "apple").await;

    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert!(host(&state, ClientMessage::AbandonRound).await.is_none());

    tokio::time::sleep(Duration::from_secs(30)).await;
    let snapshot = state.snapshot().await;
    assert_eq!(snapshot.phase, GamePhase::Ready);
    assert!(!snapshot.is_spinning);
    assert!(snapshot.guessed_letters.is_empty());
    assert!(snapshot.players.iter().all(|p| p.round_score == 0));
}

#[tokio::test]
async fn test_board_cannot_drive_the_game() {
    let state = Arc::new(AppState::new());
    for msg in [
        ClientMessage::SpinWheel,
        ClientMessage::NextRound,
        ClientMessage::GuessLetter { letter: 'A' },
    ] {
        match handle_message(msg, &Role::Board, &state).await {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "UNAUTHORIZED"),
            other => panic!("Expected UNAUTHORIZED, got {:?}", other),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_and_invalid_letters() {
    let (state, _rx) = fixed_wheel_state(segment(SegmentKind::Cash, 300));
    quick_play(&state, vec![human("Ana")], "apple pie").await;
    spin_and_land(&state).await;

    match host(&state, ClientMessage::GuessLetter { letter: '7' }).await {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "INVALID_LETTER"),
        other => panic!("Expected INVALID_LETTER, got {:?}", other),
    }

    host(&state, ClientMessage::GuessLetter { letter: 'l' }).await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    spin_and_land(&state).await;

    match host(&state, ClientMessage::GuessLetter { letter: 'L' }).await {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "ALREADY_GUESSED"),
        other => panic!("Expected ALREADY_GUESSED, got {:?}", other),
    }
    assert_eq!(state.snapshot().await.players[0].round_score, 300);
}

#[tokio::test(start_paused = true)]
async fn test_quick_play_accepts_lowercase_puzzle_from_the_wire() {
    let (state, _rx) = fixed_wheel_state(segment(SegmentKind::Cash, 300));
    let puzzle: Puzzle =
        serde_json::from_str(r#"{"category":"food","phrase":"  apple   pie "}"#).unwrap();

    let response = host(
        &state,
        ClientMessage::QuickPlay {
            players: vec![human("Ana"), human("Ben")],
            puzzle: Some(puzzle),
            filter: PuzzleFilter::default(),
        },
    )
    .await;
    assert!(response.is_none(), "quick play failed: {:?}", response);

    let snapshot = state.snapshot().await;
    assert_eq!(snapshot.phase, GamePhase::Spinning);
    assert_eq!(snapshot.category.as_deref(), Some("FOOD"));
    assert_eq!(snapshot.board.as_deref(), Some("_____ ___"));
}

#[tokio::test(start_paused = true)]
async fn test_quick_play_without_letters_leaves_game_idle() {
    let (state, _rx) = fixed_wheel_state(segment(SegmentKind::Cash, 300));
    let puzzle: Puzzle = serde_json::from_str(r#"{"category":"Numbers","phrase":"42 !"}"#).unwrap();

    match host(
        &state,
        ClientMessage::QuickPlay {
            players: vec![human("Ana")],
            puzzle: Some(puzzle),
            filter: PuzzleFilter::default(),
        },
    )
    .await
    {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "INVALID_PUZZLE"),
        other => panic!("Expected INVALID_PUZZLE, got {:?}", other),
    }
    assert_eq!(state.snapshot().await.phase, GamePhase::Idle);
}
