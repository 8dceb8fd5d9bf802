use super::*;
use crate::policy::{self, LetterChoice};

impl Session {
    /// Computer seat is up and nothing is holding input
    fn computer_may_act(&self, epoch: u64, phase: GamePhase) -> bool {
        epoch == self.epoch && self.phase == phase && self.current_is_computer() && !self.blocked()
    }

    pub(super) fn computer_think(&mut self, epoch: u64, effects: &mut Vec<Effect>) {
        if !self.computer_may_act(epoch, GamePhase::Spinning) {
            return;
        }
        Self::schedule(effects, Alarm::ComputerSpin { epoch }, COMPUTER_SPIN_DELAY);
    }

    pub(super) fn computer_spin(&mut self, epoch: u64, effects: &mut Vec<Effect>) {
        if !self.computer_may_act(epoch, GamePhase::Spinning) {
            return;
        }
        if let Err(e) = self.start_spin(effects) {
            tracing::debug!("Computer spin skipped: {}", e);
        }
    }

    pub(super) fn computer_guess(&mut self, epoch: u64, effects: &mut Vec<Effect>) {
        if !self.computer_may_act(epoch, GamePhase::GuessingLetter) {
            return;
        }
        let (round_score, difficulty) = match self.current_player() {
            Some(p) => (p.round_score, p.difficulty),
            None => return,
        };

        let choice = policy::choose_letter(
            &self.guessed,
            round_score,
            self.rules.vowel_cost,
            self.rules.vowels_cost_money,
            difficulty,
            &mut self.rng,
        );
        tracing::debug!("Computer at seat {} chose {:?}", self.current, choice);

        let letter = match choice {
            LetterChoice::Consonant(c) | LetterChoice::Vowel(c) => c,
            LetterChoice::Forfeit => {
                effects.push(Effect::Notice("No letters left to call.".to_string()));
                self.begin_turn_advance(effects);
                return;
            }
        };

        if let Err(e) = self.guess_letter(letter, effects) {
            tracing::warn!("Computer guess {} rejected: {}", letter, e);
            self.begin_turn_advance(effects);
        }
    }
}
