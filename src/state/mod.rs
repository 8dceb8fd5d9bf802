//! Async runtime around the synchronous [`Session`].
//!
//! `AppState` owns the session behind a lock and performs the [`Effect`]s it returns:
//! alarms become spawned sleeps that feed back into `receive_alarm`, everything else is
//! broadcast to connected clients.

use crate::auth::HostAuth;
use crate::cue::BroadcastCues;
use crate::llm::SpokenAudio;
use crate::protocol::ServerMessage;
use crate::puzzle::{self, GenerateSpec, LibraryError, PuzzleFilter};
use crate::services::Services;
use crate::session::{score, Alarm, Effect, Session, SessionError, Snapshot, SPIN_DURATION};
use crate::types::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

/// Why a host command did not go through
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error("No puzzle matches the requested filter")]
    NoMatchingPuzzle,

    #[error("{0} is not configured")]
    Unavailable(&'static str),

    #[error("Audio payload is not valid base64")]
    BadAudio,
}

impl CommandError {
    /// Wire error code
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::Session(e) => match e {
                SessionError::IllegalPhase(_) | SessionError::InvalidTransition { .. } => {
                    "ILLEGAL_PHASE"
                }
                SessionError::NotYourTurn => "NOT_YOUR_TURN",
                SessionError::InputLocked => "INPUT_LOCKED",
                SessionError::SpinInFlight => "SPIN_IN_FLIGHT",
                SessionError::AlreadyGuessed(_) => "ALREADY_GUESSED",
                SessionError::InvalidLetter(_) => "INVALID_LETTER",
                SessionError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
                SessionError::EmptyRoster => "EMPTY_ROSTER",
                SessionError::InvalidPuzzle => "INVALID_PUZZLE",
                SessionError::NoPuzzle => "NO_PUZZLE",
            },
            CommandError::Library(LibraryError::Invalid(_)) => "INVALID_PUZZLE",
            CommandError::Library(LibraryError::Generation(_))
            | CommandError::Library(LibraryError::NothingGenerated) => "GENERATION_FAILED",
            CommandError::Library(_) => "STORAGE_FAILED",
            CommandError::NoMatchingPuzzle => "NO_MATCHING_PUZZLE",
            CommandError::Unavailable(_) => "UNAVAILABLE",
            CommandError::BadAudio => "BAD_AUDIO",
        }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

/// Shared application state
pub struct AppState {
    pub session: RwLock<Session>,
    pub services: Arc<Services>,
    /// Broadcast channel for all connected clients
    pub broadcast: broadcast::Sender<ServerMessage>,
    pub host_auth: HostAuth,
}

impl AppState {
    /// In-memory services, cues go to connected clients
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(256);
        let services = Services::in_memory().with_cues(Arc::new(BroadcastCues::new(tx.clone())));
        Self::with_parts(Session::new(), services, tx)
    }

    pub fn with_parts(
        session: Session,
        services: Services,
        broadcast: broadcast::Sender<ServerMessage>,
    ) -> Self {
        Self {
            session: RwLock::new(session),
            services: Arc::new(services),
            broadcast,
            host_auth: HostAuth::default(),
        }
    }

    pub fn with_host_auth(mut self, host_auth: HostAuth) -> Self {
        self.host_auth = host_auth;
        self
    }

    /// Apply stored house rules to the session
    pub async fn load_settings(&self) {
        let settings = self.services.settings().await;
        if let Err(e) = self.session.write().await.set_house_rules(settings.house_rules) {
            tracing::warn!("Stored house rules not applied: {}", e);
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.session.read().await.snapshot()
    }

    pub fn send(&self, msg: ServerMessage) {
        // No receivers connected is fine
        let _ = self.broadcast.send(msg);
    }

    /// Run one session operation and carry out its effects
    pub async fn run<F>(self: &Arc<Self>, op: F) -> CommandResult<()>
    where
        F: FnOnce(&mut Session) -> Result<Vec<Effect>, SessionError>,
    {
        let mut session = self.session.write().await;
        let effects = op(&mut session)?;
        self.commit(&session, effects);
        Ok(())
    }

    /// Send the effects of one session step. Takes the locked session so broadcasts
    /// leave in the same order the steps ran.
    fn commit(self: &Arc<Self>, session: &Session, effects: Vec<Effect>) {
        let snapshot = wants_snapshot(&effects).then(|| session.snapshot());
        self.apply(effects, snapshot);
    }

    /// Perform effects. Alarms are armed here and re-enter the session when they fire.
    fn apply(self: &Arc<Self>, effects: Vec<Effect>, snapshot: Option<Snapshot>) {
        for effect in effects {
            match effect {
                Effect::Schedule { alarm, after } => self.schedule(alarm, after),
                Effect::Cue(cue) => self.services.cues.emit(cue),
                Effect::Notice(msg) => self.send(ServerMessage::Notice { msg }),
                Effect::SpinStarted {
                    segment_id,
                    rotation,
                } => self.send(ServerMessage::SpinStarted {
                    segment_id,
                    rotation,
                    duration_ms: SPIN_DURATION.as_millis() as u64,
                }),
                Effect::SpinLanded { segment } => self.send(ServerMessage::SpinLanded { segment }),
                Effect::Tile { index, state } => self.send(ServerMessage::Tile { index, state }),
                Effect::AnimationStarted { batch } => {
                    self.send(ServerMessage::AnimationStarted { batch })
                }
                Effect::AnimationComplete { batch } => {
                    self.send(ServerMessage::AnimationComplete { batch })
                }
                Effect::Countdown { seconds } => self.send(ServerMessage::Countdown { seconds }),
                Effect::SolveResult { correct } => {
                    self.send(ServerMessage::SolveResult { correct })
                }
                Effect::TurnAnnounced { player_id, name } => {
                    self.send(ServerMessage::TurnAnnounced { player_id, name })
                }
                Effect::RoundWon { player_id, amount } => {
                    let leaderboard = snapshot
                        .as_ref()
                        .map(|s| score::leaderboard(&s.players))
                        .unwrap_or_default();
                    self.send(ServerMessage::RoundWon {
                        player_id,
                        amount,
                        leaderboard,
                    });
                }
                // Coalesced into one snapshot below
                Effect::StateChanged => {}
            }
        }

        if let Some(state) = snapshot {
            self.send(ServerMessage::State { state });
        }
    }

    fn schedule(self: &Arc<Self>, alarm: Alarm, after: Duration) {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let mut session = state.session.write().await;
            let effects = session.receive_alarm(alarm);
            state.commit(&session, effects);
        });
    }

    /// Start the round with a library puzzle
    pub async fn draw_puzzle(self: &Arc<Self>, filter: PuzzleFilter) -> CommandResult<Puzzle> {
        let puzzle = self.select_puzzle(filter).await?;
        let chosen = puzzle.clone();
        self.run(move |s| s.set_puzzle(puzzle)).await?;
        Ok(chosen)
    }

    /// Roster and first puzzle in one go; draws from the library when no puzzle is given
    pub async fn quick_play(
        self: &Arc<Self>,
        players: Vec<PlayerSetup>,
        puzzle: Option<Puzzle>,
        filter: PuzzleFilter,
    ) -> CommandResult<()> {
        let players = self.fill_defaults(players).await;
        let puzzle = match puzzle {
            Some(puzzle) => puzzle,
            None => self.select_puzzle(filter).await?,
        };
        self.run(move |s| s.quick_play(&players, puzzle)).await
    }

    pub async fn start_setup(self: &Arc<Self>, players: Vec<PlayerSetup>) -> CommandResult<()> {
        let players = self.fill_defaults(players).await;
        self.run(move |s| s.start_setup(&players)).await
    }

    /// Computer players without a difficulty get the host's default
    async fn fill_defaults(&self, players: Vec<PlayerSetup>) -> Vec<PlayerSetup> {
        let default = self.services.settings().await.default_difficulty;
        players
            .into_iter()
            .map(|p| PlayerSetup {
                difficulty: p.difficulty.or(Some(default)),
                ..p
            })
            .collect()
    }

    async fn select_puzzle(&self, mut filter: PuzzleFilter) -> CommandResult<Puzzle> {
        if filter.category.is_none() {
            filter.category = self.services.settings().await.preferred_category;
        }
        let mut library = self.services.library.lock().await;
        let mut rng = rand::rng();
        if let Some(puzzle) = library.select(&filter, &mut rng) {
            return Ok(puzzle);
        }
        // The preferred category may have run dry; any category will do
        if filter.category.is_some() {
            tracing::info!("No puzzle in {:?}, drawing from any category", filter.category);
            filter.category = None;
            if let Some(puzzle) = library.select(&filter, &mut rng) {
                return Ok(puzzle);
            }
        }
        Err(CommandError::NoMatchingPuzzle)
    }

    /// Judge a recorded answer. A match solves the puzzle; anything else leaves the turn as is.
    pub async fn spoken_solve(
        self: &Arc<Self>,
        audio_b64: &str,
        mime: Option<&str>,
    ) -> CommandResult<bool> {
        let audio = SpokenAudio::from_base64(audio_b64, mime).ok_or(CommandError::BadAudio)?;
        let judge = self
            .services
            .judge()
            .await
            .ok_or(CommandError::Unavailable("Spoken solving"))?;

        let (phrase, turn_no) = {
            let session = self.session.read().await;
            (session.solvable_phrase()?, session.turn_no())
        };

        let matched = judge.check_spoken_solution(&audio, &phrase).await;

        if !matched {
            self.send(ServerMessage::SolveResult { correct: false });
            self.send(ServerMessage::Notice {
                msg: "Not quite. Try again or type your answer.".to_string(),
            });
            return Ok(false);
        }

        self.run(move |s| {
            // The game may have moved on while the judge was listening
            if s.turn_no() != turn_no {
                tracing::info!("Spoken solve arrived after the turn ended, ignoring");
                return Err(SessionError::InputLocked);
            }
            s.submit_solve(&phrase)
        })
        .await?;
        Ok(true)
    }

    /// Ask the LLM for puzzles and add the new ones to the library
    pub async fn generate_puzzles(&self, spec: GenerateSpec) -> CommandResult<Vec<Puzzle>> {
        let manager = self
            .services
            .llm()
            .await
            .ok_or(CommandError::Unavailable("Puzzle generation"))?;
        let (timeout, max_tokens) = {
            let config = self.services.llm_config.read().await;
            (config.default_timeout, config.default_max_tokens)
        };

        let generated = puzzle::generate_puzzles(&manager, &spec, timeout, max_tokens).await?;
        let added = self
            .services
            .library
            .lock()
            .await
            .add_generated(generated)?;
        tracing::info!("Library grew by {} generated puzzles", added.len());
        Ok(added)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

fn wants_snapshot(effects: &[Effect]) -> bool {
    effects.iter().any(|e| matches!(e, Effect::StateChanged))
}
