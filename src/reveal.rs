//! Board tile reveal sequencing.
//!
//! A batch of newly guessed letters (or a full reveal when the round is won) becomes an
//! ordered list of timed steps: every target tile is highlighted one after another, then
//! after a short gap each tile is revealed in the same order. The sequencer only plans and
//! tracks tile state; the host decides when steps fire and blocks input until completion.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

pub const STEP_INTERVAL: Duration = Duration::from_millis(400);
pub const HIGHLIGHT_REVEAL_GAP: Duration = Duration::from_millis(500);
pub const COMPLETION_PADDING: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TileState {
    /// Space or punctuation; always shown
    Fixed,
    Hidden,
    Highlighted,
    Revealed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Highlight,
    Reveal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealStep {
    /// Offset from the start of the batch
    pub at: Duration,
    pub index: usize,
    pub kind: StepKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealPlan {
    pub batch: u64,
    pub steps: Vec<RevealStep>,
    /// When the completion signal fires, relative to the start of the batch
    pub total: Duration,
}

impl RevealPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn targets(&self) -> usize {
        self.steps.len() / 2
    }
}

/// Completion offset for a batch with `n` target tiles
pub fn total_delay(n: usize) -> Duration {
    if n == 0 {
        return Duration::ZERO;
    }
    let n = n as u32;
    STEP_INTERVAL * n + HIGHLIGHT_REVEAL_GAP + STEP_INTERVAL * n + COMPLETION_PADDING
}

#[derive(Debug, Clone, Default)]
pub struct RevealSequencer {
    phrase: Vec<char>,
    revealed: BTreeSet<usize>,
    highlighted: BTreeSet<usize>,
    /// Letters already covered by an earlier batch
    seen: BTreeSet<char>,
    batch: u64,
    running: bool,
}

impl RevealSequencer {
    pub fn new(phrase: &str) -> Self {
        Self {
            phrase: phrase.chars().collect(),
            ..Self::default()
        }
    }

    /// Start over on a new phrase. The batch counter keeps counting so steps scheduled
    /// for the previous phrase can never match a new batch.
    pub fn restart(&mut self, phrase: &str) {
        *self = Self {
            phrase: phrase.chars().collect(),
            batch: self.batch,
            ..Self::default()
        };
    }

    pub fn batch(&self) -> u64 {
        self.batch
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn is_letter(&self, index: usize) -> bool {
        self.phrase
            .get(index)
            .is_some_and(|c| c.is_ascii_uppercase())
    }

    /// Plan the tiles uncovered by the letters in `guessed` not seen before
    pub fn plan_letters(&mut self, guessed: &BTreeSet<char>) -> RevealPlan {
        let fresh: BTreeSet<char> = guessed.difference(&self.seen).copied().collect();
        self.seen.extend(fresh.iter().copied());
        let targets: Vec<usize> = self
            .phrase
            .iter()
            .enumerate()
            .filter(|(i, c)| fresh.contains(*c) && !self.revealed.contains(i))
            .map(|(i, _)| i)
            .collect();
        self.plan(targets)
    }

    /// Plan every letter tile that is not revealed yet
    pub fn plan_all(&mut self) -> RevealPlan {
        self.seen.extend(self.phrase.iter().filter(|c| c.is_ascii_uppercase()));
        let targets: Vec<usize> = (0..self.phrase.len())
            .filter(|i| self.is_letter(*i) && !self.revealed.contains(i))
            .collect();
        self.plan(targets)
    }

    fn plan(&mut self, targets: Vec<usize>) -> RevealPlan {
        self.batch += 1;
        self.running = !targets.is_empty();

        let n = targets.len() as u32;
        let reveal_start = STEP_INTERVAL * n + HIGHLIGHT_REVEAL_GAP;
        let mut steps = Vec::with_capacity(targets.len() * 2);
        for (i, index) in targets.iter().enumerate() {
            steps.push(RevealStep {
                at: STEP_INTERVAL * i as u32,
                index: *index,
                kind: StepKind::Highlight,
            });
        }
        for (i, index) in targets.iter().enumerate() {
            steps.push(RevealStep {
                at: reveal_start + STEP_INTERVAL * i as u32,
                index: *index,
                kind: StepKind::Reveal,
            });
        }

        RevealPlan {
            batch: self.batch,
            steps,
            total: total_delay(targets.len()),
        }
    }

    /// Apply a fired step. Steps from a superseded batch are ignored.
    pub fn apply(&mut self, batch: u64, index: usize, kind: StepKind) -> bool {
        if batch != self.batch || !self.is_letter(index) {
            return false;
        }
        match kind {
            StepKind::Highlight => {
                if self.revealed.contains(&index) {
                    return false;
                }
                self.highlighted.insert(index)
            }
            StepKind::Reveal => {
                self.highlighted.remove(&index);
                self.revealed.insert(index)
            }
        }
    }

    /// Mark the batch finished. Returns false for a stale or already finished batch.
    pub fn complete(&mut self, batch: u64) -> bool {
        if batch != self.batch || !self.running {
            return false;
        }
        self.running = false;
        true
    }

    pub fn tile(&self, index: usize) -> TileState {
        if !self.is_letter(index) {
            TileState::Fixed
        } else if self.revealed.contains(&index) {
            TileState::Revealed
        } else if self.highlighted.contains(&index) {
            TileState::Highlighted
        } else {
            TileState::Hidden
        }
    }

    pub fn tiles(&self) -> Vec<TileState> {
        (0..self.phrase.len()).map(|i| self.tile(i)).collect()
    }

    /// Phrase with unrevealed letters masked as `_`
    pub fn masked(&self) -> String {
        self.phrase
            .iter()
            .enumerate()
            .map(|(i, c)| match self.tile(i) {
                TileState::Fixed | TileState::Revealed => *c,
                TileState::Hidden | TileState::Highlighted => '_',
            })
            .collect()
    }
}
