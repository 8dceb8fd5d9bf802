use super::score;
use super::*;
use crate::policy::is_vowel;
use crate::wheel::target_rotation;

impl Session {
    /// Human spin request for the current player
    pub fn trigger_spin(&mut self) -> SessionResult<Vec<Effect>> {
        if self.current_is_computer() {
            return Err(SessionError::NotYourTurn);
        }
        let mut effects = Vec::new();
        self.start_spin(&mut effects)?;
        Ok(effects)
    }

    /// Acquire the spin lock and pick where the wheel lands. The lock is released only when
    /// the matching `SpinResolved` alarm arrives.
    pub(super) fn start_spin(&mut self, effects: &mut Vec<Effect>) -> SessionResult<()> {
        if self.phase != GamePhase::Spinning {
            return Err(SessionError::IllegalPhase(self.phase));
        }
        if self.spin_lock {
            return Err(SessionError::SpinInFlight);
        }
        if self.is_processing || self.reveal.is_running() {
            return Err(SessionError::InputLocked);
        }

        let segment_id = self
            .wheel
            .pick_segment(&mut self.rng)
            .map(|s| s.id)
            .ok_or(SessionError::InputLocked)?;
        let landing = self
            .wheel
            .landing_angle(segment_id, &mut self.rng)
            .unwrap_or(0.0);

        self.spin_lock = true;
        self.spin_token += 1;
        self.pending_segment = Some(segment_id);
        self.rotation = target_rotation(self.rotation, landing, SPIN_EXTRA_TURNS);
        tracing::debug!(
            "Spin {} started for seat {}, landing on segment {}",
            self.spin_token,
            self.current,
            segment_id
        );

        effects.push(Effect::SpinStarted {
            segment_id,
            rotation: self.rotation,
        });
        Self::schedule(
            effects,
            Alarm::SpinResolved {
                token: self.spin_token,
            },
            SPIN_DURATION,
        );
        self.settle(effects);
        Ok(())
    }

    pub(super) fn resolve_spin(&mut self, token: u64, effects: &mut Vec<Effect>) {
        if token != self.spin_token || !self.spin_lock {
            tracing::debug!("Dropping stale spin resolution {}", token);
            return;
        }
        self.spin_lock = false;
        let segment = match self
            .pending_segment
            .take()
            .and_then(|id| self.wheel.get(id).cloned())
        {
            Some(segment) => segment,
            None => {
                tracing::warn!("Spin resolved without a segment");
                self.settle(effects);
                return;
            }
        };

        tracing::info!("Wheel landed on {} ({:?})", segment.label, segment.kind);
        effects.push(Effect::SpinLanded {
            segment: segment.clone(),
        });

        match segment.kind {
            SegmentKind::Cash => {
                self.spin_value = Some(segment.value);
                if let Err(e) = self.transition(GamePhase::GuessingLetter) {
                    tracing::error!("Cash spin could not open guessing: {}", e);
                }
                self.settle(effects);
            }
            SegmentKind::LoseTurn => {
                effects.push(Effect::Cue(Cue::Lose));
                self.begin_turn_advance(effects);
            }
            SegmentKind::Bankrupt => {
                self.players = score::reset_round_score(&self.players, self.current);
                effects.push(Effect::Cue(Cue::Bankrupt));
                self.begin_turn_advance(effects);
            }
        }
    }

    /// Human letter call for the current player
    pub fn submit_guess(&mut self, letter: char) -> SessionResult<Vec<Effect>> {
        if self.current_is_computer() {
            return Err(SessionError::NotYourTurn);
        }
        let mut effects = Vec::new();
        self.guess_letter(letter, &mut effects)?;
        Ok(effects)
    }

    pub(super) fn guess_letter(
        &mut self,
        letter: char,
        effects: &mut Vec<Effect>,
    ) -> SessionResult<()> {
        if self.phase != GamePhase::GuessingLetter {
            return Err(SessionError::IllegalPhase(self.phase));
        }
        if self.blocked() {
            return Err(SessionError::InputLocked);
        }
        if !letter.is_ascii_alphabetic() {
            return Err(SessionError::InvalidLetter(letter));
        }
        let letter = letter.to_ascii_uppercase();
        if self.guessed.contains(&letter) {
            return Err(SessionError::AlreadyGuessed(letter));
        }
        let occurrences = self
            .puzzle
            .as_ref()
            .map(|p| p.count(letter))
            .ok_or(SessionError::NoPuzzle)?;

        let vowel = is_vowel(letter);
        if vowel && self.rules.vowels_cost_money {
            let have = self.players.get(self.current).map_or(0, |p| p.round_score);
            if have < self.rules.vowel_cost {
                tracing::info!("Vowel {} rejected: round score {} too low", letter, have);
                return Err(SessionError::InsufficientFunds {
                    needed: self.rules.vowel_cost,
                    have,
                });
            }
            self.players =
                score::adjust_round_score(&self.players, self.current, -self.rules.vowel_cost);
        }

        self.record_letter(letter);

        if occurrences == 0 {
            tracing::info!("Miss: {} not in puzzle", letter);
            effects.push(Effect::Cue(Cue::Miss));
            effects.push(Effect::Notice(format!("There is no {}.", letter)));
            self.begin_turn_advance(effects);
            return Ok(());
        }

        tracing::info!("Hit: {} appears {} time(s)", letter, occurrences);
        effects.push(Effect::Cue(Cue::Hit));
        if !vowel {
            if let Some(value) = self.spin_value {
                self.players = score::adjust_round_score(
                    &self.players,
                    self.current,
                    value * occurrences as i64,
                );
            }
        }
        self.spin_value = None;

        if self.puzzle_complete() {
            return self.enter_solving(effects);
        }

        self.transition(GamePhase::Spinning)?;
        let plan = self.reveal.plan_letters(&self.guessed);
        self.schedule_reveal(plan, effects);
        self.settle(effects);
        Ok(())
    }

    /// Lock input and pass the turn after [`TURN_ADVANCE_DELAY`]
    pub(super) fn begin_turn_advance(&mut self, effects: &mut Vec<Effect>) {
        if self.is_processing {
            return;
        }
        self.is_processing = true;
        self.spin_value = None;
        self.advance_token += 1;
        Self::schedule(
            effects,
            Alarm::TurnAdvance {
                token: self.advance_token,
            },
            TURN_ADVANCE_DELAY,
        );
        self.settle(effects);
    }

    pub(super) fn complete_turn_advance(&mut self, token: u64, effects: &mut Vec<Effect>) {
        if token != self.advance_token || !self.is_processing {
            tracing::debug!("Dropping stale turn advance {}", token);
            return;
        }
        if self.players.is_empty() {
            self.is_processing = false;
            return;
        }
        self.current = (self.current + 1) % self.players.len();
        self.is_processing = false;
        self.spin_value = None;
        self.countdown = TURN_SECONDS;
        if let Err(e) = self.transition(GamePhase::Spinning) {
            tracing::error!("Turn advance left phase unchanged: {}", e);
        }
        tracing::info!("Turn passes to seat {}", self.current);
        self.announce_turn(effects);
        self.settle(effects);
    }

    pub(super) fn countdown_tick(&mut self, epoch: u64, effects: &mut Vec<Effect>) {
        if epoch != self.epoch
            || self.phase != GamePhase::GuessingLetter
            || self.current_is_computer()
            || self.blocked()
        {
            return;
        }
        self.countdown = self.countdown.saturating_sub(1);
        effects.push(Effect::Countdown {
            seconds: self.countdown,
        });

        if self.countdown == 0 {
            tracing::info!("Seat {} ran out of time", self.current);
            effects.push(Effect::Cue(Cue::Miss));
            effects.push(Effect::Notice("Time's up!".to_string()));
            self.begin_turn_advance(effects);
            return;
        }
        if self.countdown <= TICK_WARNING_SECONDS {
            effects.push(Effect::Cue(Cue::Tick));
        }
        Self::schedule(effects, Alarm::CountdownTick { epoch }, COUNTDOWN_TICK);
    }

    /// Host reports a modal (solve box, settings) opening or closing
    pub fn set_overlay(&mut self, open: bool) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.overlay_open != open {
            self.overlay_open = open;
            self.settle(&mut effects);
        }
        effects
    }
}
