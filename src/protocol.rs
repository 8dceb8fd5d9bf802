use crate::cue::Cue;
use crate::puzzle::PuzzleFilter;
use crate::reveal::TileState;
use crate::session::Snapshot;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Configure a roster and enter SETUP
    StartSetup {
        players: Vec<PlayerSetup>,
    },
    ConfirmSetup,
    /// Roster plus puzzle in one step, straight into SPINNING
    QuickPlay {
        players: Vec<PlayerSetup>,
        puzzle: Option<Puzzle>,
        #[serde(default)]
        filter: PuzzleFilter,
    },
    SetPuzzle {
        puzzle: Puzzle,
    },
    /// Start the round with a puzzle drawn from the library
    DrawPuzzle {
        #[serde(default)]
        filter: PuzzleFilter,
    },
    SpinWheel,
    GuessLetter {
        letter: char,
    },
    SolvePuzzle {
        text: String,
    },
    /// Recorded answer, base64-encoded audio
    SpokenSolve {
        audio_b64: String,
        #[serde(default)]
        mime: Option<String>,
    },
    SetOverlay {
        open: bool,
    },
    NextRound,
    AbandonRound,
    SetHouseRules {
        rules: HouseRules,
    },
    GeneratePuzzles {
        #[serde(default)]
        category: Option<String>,
        #[serde(default)]
        difficulty: Option<u8>,
        #[serde(default = "default_generate_count")]
        count: u32,
    },
    RequestState,
}

fn default_generate_count() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        role: Role,
        state: Snapshot,
        server_now: String,
    },
    State {
        state: Snapshot,
    },
    Cue {
        cue: Cue,
    },
    SpinStarted {
        segment_id: SegmentId,
        /// Cumulative wheel rotation in degrees
        rotation: f64,
        duration_ms: u64,
    },
    SpinLanded {
        segment: WheelSegment,
    },
    Tile {
        index: usize,
        state: TileState,
    },
    AnimationStarted {
        batch: u64,
    },
    AnimationComplete {
        batch: u64,
    },
    Countdown {
        seconds: u32,
    },
    Notice {
        msg: String,
    },
    SolveResult {
        correct: bool,
    },
    TurnAnnounced {
        player_id: PlayerId,
        name: String,
    },
    RoundWon {
        player_id: PlayerId,
        amount: i64,
        leaderboard: Vec<Player>,
    },
    Puzzles {
        puzzles: Vec<Puzzle>,
    },
    Error {
        code: String,
        msg: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_tagging() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"guess_letter","letter":"e"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::GuessLetter { letter: 'e' }));

        let msg: ClientMessage = serde_json::from_str(r#"{"t":"draw_puzzle"}"#).unwrap();
        match msg {
            ClientMessage::DrawPuzzle { filter } => {
                assert!(filter.category.is_none());
                assert!(filter.difficulty.is_none());
            }
            other => panic!("Unexpected message {:?}", other),
        }

        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"generate_puzzles","category":"Food"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::GeneratePuzzles { count: 5, .. }));
    }

    #[test]
    fn test_server_message_tagging() {
        let json = serde_json::to_value(ServerMessage::Cue { cue: Cue::Hit }).unwrap();
        assert_eq!(json["t"], "cue");
        assert_eq!(json["cue"], "hit");

        let json = serde_json::to_value(ServerMessage::SolveResult { correct: false }).unwrap();
        assert_eq!(json["t"], "solve_result");
        assert_eq!(json["correct"], false);
    }
}
