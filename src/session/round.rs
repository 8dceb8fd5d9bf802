use super::score;
use super::{Alarm, Effect, Session, SessionError, SessionResult, TURN_ANNOUNCE_DURATION, TURN_SECONDS};
use crate::cue::Cue;
use crate::reveal::RevealPlan;
use crate::types::*;

/// Case-, space- and punctuation-insensitive comparison of a solve attempt.
/// An attempt with no letters never matches.
pub fn solution_matches(phrase: &str, attempt: &str) -> bool {
    let attempt = letters_only(attempt);
    !attempt.is_empty() && attempt == letters_only(phrase)
}

impl Session {
    /// Configure a new game. Totals start from zero.
    pub fn start_setup(&mut self, players: &[PlayerSetup]) -> SessionResult<Vec<Effect>> {
        if players.is_empty() {
            return Err(SessionError::EmptyRoster);
        }
        self.transition(GamePhase::Setup)?;

        self.players = players
            .iter()
            .enumerate()
            .map(|(seat, setup)| Player::from_setup(setup, seat))
            .collect();
        self.current = 0;
        self.round_no = 0;
        self.last_solver = None;
        self.puzzle = None;
        self.overlay_open = false;
        self.announcing = false;
        self.reset_round_state();

        tracing::info!("Game set up with {} players", self.players.len());
        let mut effects = Vec::new();
        self.settle(&mut effects);
        Ok(effects)
    }

    /// SETUP -> READY once the roster is final
    pub fn confirm_setup(&mut self) -> SessionResult<Vec<Effect>> {
        if self.phase != GamePhase::Setup {
            return Err(SessionError::IllegalPhase(self.phase));
        }
        self.transition(GamePhase::Ready)?;
        let mut effects = Vec::new();
        self.settle(&mut effects);
        Ok(effects)
    }

    /// Set up and start a round in one step
    pub fn quick_play(
        &mut self,
        players: &[PlayerSetup],
        puzzle: Puzzle,
    ) -> SessionResult<Vec<Effect>> {
        // Checked before setup so a bad puzzle leaves the session untouched
        let puzzle = puzzle.normalized();
        if puzzle.unique_letters().is_empty() {
            return Err(SessionError::InvalidPuzzle);
        }
        let mut effects = self.start_setup(players)?;
        effects.extend(self.set_puzzle(puzzle)?);
        Ok(effects)
    }

    /// Start a round with `puzzle`: clears guessed letters and round scores, then
    /// announces the first player.
    pub fn set_puzzle(&mut self, puzzle: Puzzle) -> SessionResult<Vec<Effect>> {
        if !matches!(self.phase, GamePhase::Setup | GamePhase::Ready) {
            return Err(SessionError::IllegalPhase(self.phase));
        }
        if self.players.is_empty() {
            return Err(SessionError::EmptyRoster);
        }
        let puzzle = puzzle.normalized();
        if puzzle.unique_letters().is_empty() {
            return Err(SessionError::InvalidPuzzle);
        }

        self.transition(GamePhase::Spinning)?;
        self.reset_round_state();
        self.reveal.restart(&puzzle.phrase);
        self.players = score::reset_all_round_scores(&self.players);
        self.round_no += 1;
        tracing::info!(
            "Round {} started: category {}, {} letters",
            self.round_no,
            puzzle.category,
            puzzle.unique_letters().len()
        );
        self.puzzle = Some(puzzle);

        let mut effects = Vec::new();
        self.announce_turn(&mut effects);
        self.settle(&mut effects);
        Ok(effects)
    }

    /// Phrase the current player may try to solve, or why they can't right now
    pub fn solvable_phrase(&self) -> SessionResult<String> {
        if !matches!(self.phase, GamePhase::Spinning | GamePhase::GuessingLetter) {
            return Err(SessionError::IllegalPhase(self.phase));
        }
        if self.current_is_computer() {
            return Err(SessionError::NotYourTurn);
        }
        if self.spin_lock || self.is_processing || self.reveal.is_running() {
            return Err(SessionError::InputLocked);
        }
        self.puzzle
            .as_ref()
            .map(|p| p.phrase.clone())
            .ok_or(SessionError::NoPuzzle)
    }

    /// Typed solve attempt by the current (human) player. A wrong answer costs the turn.
    pub fn submit_solve(&mut self, text: &str) -> SessionResult<Vec<Effect>> {
        let phrase = self.solvable_phrase()?;

        let mut effects = Vec::new();
        self.overlay_open = false;
        if solution_matches(&phrase, text) {
            tracing::info!("Correct solve by seat {}", self.current);
            effects.push(Effect::SolveResult { correct: true });
            self.enter_solving(&mut effects)?;
        } else {
            tracing::info!("Wrong solve by seat {}", self.current);
            effects.push(Effect::SolveResult { correct: false });
            effects.push(Effect::Cue(Cue::Miss));
            effects.push(Effect::Notice("That's not the answer.".to_string()));
            self.begin_turn_advance(&mut effects);
        }
        Ok(effects)
    }

    /// Round won by the current player: bank, celebrate, reveal the rest of the board
    pub(super) fn enter_solving(&mut self, effects: &mut Vec<Effect>) -> SessionResult<()> {
        self.transition(GamePhase::Solving)?;

        let amount = self.players.get(self.current).map_or(0, |p| p.round_score);
        self.players = score::bank_round_score(&self.players, self.current);
        self.last_solver = Some(self.current);
        self.spin_value = None;
        self.countdown = TURN_SECONDS;

        if let Some(player) = self.players.get(self.current) {
            tracing::info!("{} wins the round and banks {}", player.name, amount);
            effects.push(Effect::RoundWon {
                player_id: player.id.clone(),
                amount,
            });
        }
        effects.push(Effect::Cue(Cue::Win));

        let plan = self.reveal.plan_all();
        self.schedule_reveal(plan, effects);
        self.settle(effects);
        Ok(())
    }

    /// SOLVING -> READY. The player after the solver opens the next round.
    pub fn next_round(&mut self) -> SessionResult<Vec<Effect>> {
        if self.phase != GamePhase::Solving {
            return Err(SessionError::IllegalPhase(self.phase));
        }
        if self.reveal.is_running() {
            return Err(SessionError::InputLocked);
        }
        self.transition(GamePhase::Ready)?;
        if !self.players.is_empty() {
            let solver = self.last_solver.unwrap_or(self.current);
            self.current = (solver + 1) % self.players.len();
        }
        self.puzzle = None;
        self.reset_round_state();

        let mut effects = Vec::new();
        self.settle(&mut effects);
        Ok(effects)
    }

    /// Drop the running round without banking anything
    pub fn abandon_round(&mut self) -> SessionResult<Vec<Effect>> {
        if !matches!(self.phase, GamePhase::Spinning | GamePhase::GuessingLetter) {
            return Err(SessionError::IllegalPhase(self.phase));
        }
        self.transition(GamePhase::Ready)?;
        tracing::info!("Round {} abandoned", self.round_no);
        self.players = score::reset_all_round_scores(&self.players);
        self.puzzle = None;
        self.reset_round_state();

        let mut effects = Vec::new();
        self.settle(&mut effects);
        Ok(effects)
    }

    pub fn set_house_rules(&mut self, rules: HouseRules) -> SessionResult<Vec<Effect>> {
        if !matches!(
            self.phase,
            GamePhase::Idle | GamePhase::Setup | GamePhase::Ready | GamePhase::Solving
        ) {
            return Err(SessionError::IllegalPhase(self.phase));
        }
        self.rules = HouseRules {
            vowel_cost: rules.vowel_cost.max(0),
            ..rules
        };
        tracing::info!("House rules updated: {:?}", self.rules);
        Ok(vec![Effect::StateChanged])
    }

    /// Clear per-round transient state and invalidate round-scoped alarms
    fn reset_round_state(&mut self) {
        self.turn_no += 1;
        self.guessed.clear();
        self.spin_value = None;
        self.spin_lock = false;
        self.pending_segment = None;
        self.spin_token += 1;
        self.is_processing = false;
        self.advance_token += 1;
        self.countdown = TURN_SECONDS;
        self.reveal.restart("");
    }

    pub(super) fn announce_turn(&mut self, effects: &mut Vec<Effect>) {
        self.turn_no += 1;
        self.announcing = true;
        self.announce_token += 1;
        if let Some(player) = self.players.get(self.current) {
            effects.push(Effect::TurnAnnounced {
                player_id: player.id.clone(),
                name: player.name.clone(),
            });
        }
        Self::schedule(
            effects,
            Alarm::AnnouncementEnd {
                token: self.announce_token,
            },
            TURN_ANNOUNCE_DURATION,
        );
    }

    pub(super) fn end_announcement(&mut self, token: u64, effects: &mut Vec<Effect>) {
        if token != self.announce_token || !self.announcing {
            return;
        }
        self.announcing = false;
        effects.push(Effect::StateChanged);
    }

    /// Turn a plan into scheduled steps. An empty plan completes on the spot.
    pub(super) fn schedule_reveal(&mut self, plan: RevealPlan, effects: &mut Vec<Effect>) {
        effects.push(Effect::AnimationStarted { batch: plan.batch });
        if plan.is_empty() {
            effects.push(Effect::AnimationComplete { batch: plan.batch });
            return;
        }
        for step in &plan.steps {
            Self::schedule(
                effects,
                Alarm::RevealStep {
                    batch: plan.batch,
                    index: step.index,
                    kind: step.kind,
                },
                step.at,
            );
        }
        Self::schedule(effects, Alarm::RevealComplete { batch: plan.batch }, plan.total);
    }

    pub(super) fn finish_reveal(&mut self, batch: u64, effects: &mut Vec<Effect>) {
        if !self.reveal.complete(batch) {
            tracing::debug!("Dropping stale reveal completion for batch {}", batch);
            return;
        }
        effects.push(Effect::AnimationComplete { batch });
        self.settle(effects);
    }
}
