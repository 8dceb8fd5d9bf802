use super::{Session, SessionError, SessionResult};
use crate::types::GamePhase;

/// Check if a phase transition is valid
pub fn is_valid_phase_transition(from: GamePhase, to: GamePhase) -> bool {
    use GamePhase::*;

    match (from, to) {
        // Reserved, never entered
        (_, GameOver) | (GameOver, _) => false,

        // New game from anywhere
        (_, Setup) => true,

        (Setup, Ready) => true,
        // Quick play skips READY
        (Setup, Spinning) => true,
        (Ready, Spinning) => true,

        // Turn loop
        (Spinning, GuessingLetter) => true,
        (Spinning, Spinning) => true,
        (GuessingLetter, Spinning) => true,

        // Round end by auto-win or correct solve
        (Spinning, Solving) | (GuessingLetter, Solving) => true,

        // Next round, or an abandoned one
        (Solving, Ready) => true,
        (Spinning, Ready) | (GuessingLetter, Ready) => true,

        _ => false,
    }
}

impl Session {
    /// Move to `to`, rejecting transitions outside the graph
    pub(super) fn transition(&mut self, to: GamePhase) -> SessionResult<()> {
        let from = self.phase;
        if !is_valid_phase_transition(from, to) {
            tracing::warn!("Rejected phase transition {:?} -> {:?}", from, to);
            return Err(SessionError::InvalidTransition { from, to });
        }
        if from != to {
            tracing::info!("Phase {:?} -> {:?}", from, to);
        }
        self.phase = to;
        Ok(())
    }

    /// Phases the session may move to next
    pub fn valid_transitions(&self) -> Vec<GamePhase> {
        use GamePhase::*;
        [Setup, Ready, Spinning, GuessingLetter, Solving, Idle, GameOver]
            .into_iter()
            .filter(|to| is_valid_phase_transition(self.phase, *to))
            .collect()
    }
}
