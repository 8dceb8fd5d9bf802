//! Game session state machine.
//!
//! `Session` is the single source of truth for the phase, the roster and whose turn it is.
//! It is synchronous and owns no timers: every operation returns the list of [`Effect`]s the
//! host must perform, including [`Alarm`]s to deliver back through
//! [`Session::receive_alarm`] after a delay. Each alarm carries the token or epoch it was
//! issued under and is dropped on arrival if that no longer matches, so a timer that fires
//! after its turn or phase ended is always a no-op.

mod computer;
mod phase;
mod round;
pub mod score;
mod turn;

use crate::cue::Cue;
use crate::reveal::{RevealSequencer, StepKind, TileState};
use crate::types::*;
use crate::wheel::Wheel;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

pub use phase::is_valid_phase_transition;
pub use round::solution_matches;

/// Fee for buying a vowel when vowels cost money
pub const VOWEL_COST: i64 = 250;
/// Per-turn countdown while a human picks a letter
pub const TURN_SECONDS: u32 = 30;
/// Final countdown seconds that emit a tick cue
pub const TICK_WARNING_SECONDS: u32 = 5;
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);
/// Input lock between a turn-ending event and the next player
pub const TURN_ADVANCE_DELAY: Duration = Duration::from_millis(2000);
pub const TURN_ANNOUNCE_DURATION: Duration = Duration::from_millis(2500);
/// Spin animation; the spin lock is held until it elapses
pub const SPIN_DURATION: Duration = Duration::from_millis(4000);
pub const SPIN_EXTRA_TURNS: u32 = 5;
pub const COMPUTER_THINK_DELAY: Duration = Duration::from_millis(1500);
pub const COMPUTER_SPIN_DELAY: Duration = Duration::from_millis(1000);
pub const COMPUTER_GUESS_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Action not allowed in phase {0:?}")]
    IllegalPhase(GamePhase),

    #[error("Invalid phase transition from {from:?} to {to:?}")]
    InvalidTransition { from: GamePhase, to: GamePhase },

    #[error("It is not a human player's turn")]
    NotYourTurn,

    #[error("Input is locked until the current animation finishes")]
    InputLocked,

    #[error("A spin is already in progress")]
    SpinInFlight,

    #[error("Letter {0} was already called")]
    AlreadyGuessed(char),

    #[error("'{0}' is not a letter")]
    InvalidLetter(char),

    #[error("Buying a vowel costs {needed}, round score is {have}")]
    InsufficientFunds { needed: i64, have: i64 },

    #[error("At least one player is required")]
    EmptyRoster,

    #[error("Puzzle must contain at least one letter")]
    InvalidPuzzle,

    #[error("No puzzle selected")]
    NoPuzzle,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Delayed callback requested by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alarm {
    SpinResolved { token: u64 },
    TurnAdvance { token: u64 },
    AnnouncementEnd { token: u64 },
    CountdownTick { epoch: u64 },
    ComputerThink { epoch: u64 },
    ComputerSpin { epoch: u64 },
    ComputerGuess { epoch: u64 },
    RevealStep { batch: u64, index: usize, kind: StepKind },
    RevealComplete { batch: u64 },
}

/// Side effect the host performs after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Schedule { alarm: Alarm, after: Duration },
    Cue(Cue),
    Notice(String),
    SpinStarted { segment_id: SegmentId, rotation: f64 },
    SpinLanded { segment: WheelSegment },
    Tile { index: usize, state: TileState },
    AnimationStarted { batch: u64 },
    AnimationComplete { batch: u64 },
    Countdown { seconds: u32 },
    SolveResult { correct: bool },
    TurnAnnounced { player_id: PlayerId, name: String },
    RoundWon { player_id: PlayerId, amount: i64 },
    StateChanged,
}

/// Serializable view of the session for clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub phase: GamePhase,
    pub round_no: u32,
    pub players: Vec<Player>,
    pub current_player_index: usize,
    pub category: Option<String>,
    pub board: Option<String>,
    pub tiles: Vec<TileState>,
    pub guessed_letters: Vec<char>,
    pub spin_value: Option<i64>,
    pub countdown: u32,
    pub is_spinning: bool,
    pub is_processing: bool,
    pub is_animating: bool,
    pub announcing: bool,
    pub overlay_open: bool,
    pub rules: HouseRules,
    pub wheel_rotation: f64,
}

pub struct Session {
    phase: GamePhase,
    players: Vec<Player>,
    current: usize,
    puzzle: Option<Puzzle>,
    guessed: BTreeSet<char>,
    rules: HouseRules,
    wheel: Wheel,
    round_no: u32,
    /// Counts turn starts across the game
    turn_no: u64,
    last_solver: Option<usize>,

    spin_value: Option<i64>,
    /// Re-entrancy guard for spins
    spin_lock: bool,
    pending_segment: Option<SegmentId>,
    rotation: f64,
    is_processing: bool,
    announcing: bool,
    overlay_open: bool,
    countdown: u32,
    reveal: RevealSequencer,

    /// Bumped on every phase, turn or blocking change; cancels countdown and computer alarms
    epoch: u64,
    spin_token: u64,
    advance_token: u64,
    announce_token: u64,

    rng: StdRng,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Deterministic session for tests and replays
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            phase: GamePhase::Idle,
            players: Vec::new(),
            current: 0,
            puzzle: None,
            guessed: BTreeSet::new(),
            rules: HouseRules::default(),
            wheel: Wheel::default(),
            round_no: 0,
            turn_no: 0,
            last_solver: None,
            spin_value: None,
            spin_lock: false,
            pending_segment: None,
            rotation: 0.0,
            is_processing: false,
            announcing: false,
            overlay_open: false,
            countdown: TURN_SECONDS,
            reveal: RevealSequencer::default(),
            epoch: 0,
            spin_token: 0,
            advance_token: 0,
            announce_token: 0,
            rng,
        }
    }

    pub fn with_wheel(mut self, wheel: Wheel) -> Self {
        self.wheel = wheel;
        self
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn current_player_index(&self) -> usize {
        self.current
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current)
    }

    pub fn puzzle(&self) -> Option<&Puzzle> {
        self.puzzle.as_ref()
    }

    pub fn guessed_letters(&self) -> &BTreeSet<char> {
        &self.guessed
    }

    pub fn spin_value(&self) -> Option<i64> {
        self.spin_value
    }

    pub fn rules(&self) -> HouseRules {
        self.rules
    }

    pub fn wheel(&self) -> &Wheel {
        &self.wheel
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn is_spinning(&self) -> bool {
        self.spin_lock
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    pub fn is_animating(&self) -> bool {
        self.reveal.is_running()
    }

    pub fn round_no(&self) -> u32 {
        self.round_no
    }

    /// Changes whenever a turn starts or a round ends
    pub fn turn_no(&self) -> u64 {
        self.turn_no
    }

    /// Add a letter to the guessed set. Returns false if it was already there.
    pub(crate) fn record_letter(&mut self, letter: char) -> bool {
        self.guessed.insert(letter)
    }

    /// Every distinct letter of the phrase has been called
    pub fn puzzle_complete(&self) -> bool {
        self.puzzle
            .as_ref()
            .is_some_and(|p| p.unique_letters().is_subset(&self.guessed))
    }

    /// Any state that suspends player input and timers
    fn blocked(&self) -> bool {
        self.spin_lock || self.is_processing || self.overlay_open || self.reveal.is_running()
    }

    fn current_is_computer(&self) -> bool {
        self.current_player().is_some_and(|p| p.is_computer)
    }

    fn schedule(effects: &mut Vec<Effect>, alarm: Alarm, after: Duration) {
        effects.push(Effect::Schedule { alarm, after });
    }

    /// Close out a transition: invalidate outstanding countdown and computer alarms, then
    /// arm whatever the new state calls for.
    fn settle(&mut self, effects: &mut Vec<Effect>) {
        self.epoch += 1;
        let epoch = self.epoch;

        if !self.blocked() {
            match (self.phase, self.current_is_computer()) {
                (GamePhase::GuessingLetter, false) => {
                    self.countdown = TURN_SECONDS;
                    effects.push(Effect::Countdown {
                        seconds: self.countdown,
                    });
                    Self::schedule(effects, Alarm::CountdownTick { epoch }, COUNTDOWN_TICK);
                }
                (GamePhase::Spinning, true) => {
                    Self::schedule(effects, Alarm::ComputerThink { epoch }, COMPUTER_THINK_DELAY);
                }
                (GamePhase::GuessingLetter, true) => {
                    Self::schedule(effects, Alarm::ComputerGuess { epoch }, COMPUTER_GUESS_DELAY);
                }
                _ => {}
            }
        }

        effects.push(Effect::StateChanged);
    }

    /// Deliver a previously scheduled alarm
    pub fn receive_alarm(&mut self, alarm: Alarm) -> Vec<Effect> {
        let mut effects = Vec::new();
        match alarm {
            Alarm::SpinResolved { token } => self.resolve_spin(token, &mut effects),
            Alarm::TurnAdvance { token } => self.complete_turn_advance(token, &mut effects),
            Alarm::AnnouncementEnd { token } => self.end_announcement(token, &mut effects),
            Alarm::CountdownTick { epoch } => self.countdown_tick(epoch, &mut effects),
            Alarm::ComputerThink { epoch } => self.computer_think(epoch, &mut effects),
            Alarm::ComputerSpin { epoch } => self.computer_spin(epoch, &mut effects),
            Alarm::ComputerGuess { epoch } => self.computer_guess(epoch, &mut effects),
            Alarm::RevealStep { batch, index, kind } => {
                if self.reveal.apply(batch, index, kind) {
                    effects.push(Effect::Tile {
                        index,
                        state: self.reveal.tile(index),
                    });
                }
            }
            Alarm::RevealComplete { batch } => self.finish_reveal(batch, &mut effects),
        }
        effects
    }

    pub fn snapshot(&self) -> Snapshot {
        let has_puzzle = self.puzzle.is_some();
        Snapshot {
            phase: self.phase,
            round_no: self.round_no,
            players: self.players.clone(),
            current_player_index: self.current,
            category: self.puzzle.as_ref().map(|p| p.category.clone()),
            board: has_puzzle.then(|| self.reveal.masked()),
            tiles: if has_puzzle {
                self.reveal.tiles()
            } else {
                Vec::new()
            },
            guessed_letters: self.guessed.iter().copied().collect(),
            spin_value: self.spin_value,
            countdown: self.countdown,
            is_spinning: self.spin_lock,
            is_processing: self.is_processing,
            is_animating: self.reveal.is_running(),
            announcing: self.announcing,
            overlay_open: self.overlay_open,
            rules: self.rules,
            wheel_rotation: self.rotation,
        }
    }
}

/// Test helpers: a tiny manual clock that delivers scheduled alarms in time order.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub struct Clock {
        pub now: Duration,
        pub pending: Vec<(Duration, u64, Alarm)>,
        seq: u64,
        pub log: Vec<Effect>,
    }

    impl Clock {
        pub fn new() -> Self {
            Self {
                now: Duration::ZERO,
                pending: Vec::new(),
                seq: 0,
                log: Vec::new(),
            }
        }

        pub fn absorb(&mut self, effects: Vec<Effect>) {
            for effect in effects {
                if let Effect::Schedule { alarm, after } = &effect {
                    self.seq += 1;
                    self.pending.push((self.now + *after, self.seq, *alarm));
                }
                self.log.push(effect);
            }
        }

        /// Fire every alarm due within `span`, in order
        pub fn advance(&mut self, session: &mut Session, span: Duration) {
            let until = self.now + span;
            loop {
                self.pending.sort_by_key(|(at, seq, _)| (*at, *seq));
                match self.pending.first() {
                    Some((at, _, _)) if *at <= until => {
                        let (at, _, alarm) = self.pending.remove(0);
                        self.now = at;
                        let effects = session.receive_alarm(alarm);
                        self.absorb(effects);
                    }
                    _ => break,
                }
            }
            self.now = until;
        }

        pub fn cues(&self) -> Vec<Cue> {
            self.log
                .iter()
                .filter_map(|e| match e {
                    Effect::Cue(c) => Some(*c),
                    _ => None,
                })
                .collect()
        }
    }

    pub fn humans(n: usize) -> Vec<PlayerSetup> {
        (0..n)
            .map(|i| PlayerSetup {
                name: Some(format!("P{}", i)),
                is_computer: false,
                difficulty: None,
            })
            .collect()
    }

    /// Session already in SPINNING with the given phrase
    pub fn started(players: Vec<PlayerSetup>, phrase: &str) -> (Session, Clock) {
        let mut session = Session::with_seed(42);
        let mut clock = Clock::new();
        clock.absorb(
            session
                .quick_play(&players, Puzzle::new("Phrase", phrase))
                .unwrap(),
        );
        (session, clock)
    }

    /// Force the next spin to resolve as CASH `value`
    pub fn land_cash(session: &mut Session, clock: &mut Clock, value: i64) {
        session.wheel = Wheel::new(vec![WheelSegment {
            id: 0,
            label: value.to_string(),
            value,
            kind: SegmentKind::Cash,
            weight: 1.0,
        }]);
        clock.absorb(session.trigger_spin().unwrap());
        clock.advance(session, SPIN_DURATION);
    }

    pub fn land_kind(session: &mut Session, clock: &mut Clock, kind: SegmentKind) {
        session.wheel = Wheel::new(vec![WheelSegment {
            id: 0,
            label: format!("{:?}", kind),
            value: 0,
            kind,
            weight: 1.0,
        }]);
        clock.absorb(session.trigger_spin().unwrap());
        clock.advance(session, SPIN_DURATION);
    }
}
