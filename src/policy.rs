//! Computer player letter choice.
//!
//! Pure decision code: the caller supplies the guessed set, round score and an RNG,
//! and gets back what the computer wants to do. Scheduling lives in the session.

use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::BTreeSet;

pub const VOWELS: [char; 5] = ['A', 'E', 'I', 'O', 'U'];

/// Relative English letter frequency (percent), most frequent first
pub const LETTER_FREQUENCY: [(char, f64); 26] = [
    ('E', 12.70),
    ('T', 9.06),
    ('A', 8.17),
    ('O', 7.51),
    ('I', 6.97),
    ('N', 6.75),
    ('S', 6.33),
    ('H', 6.09),
    ('R', 5.99),
    ('D', 4.25),
    ('L', 4.03),
    ('C', 2.78),
    ('U', 2.76),
    ('M', 2.41),
    ('W', 2.36),
    ('F', 2.23),
    ('G', 2.02),
    ('Y', 1.97),
    ('P', 1.93),
    ('B', 1.29),
    ('V', 0.98),
    ('K', 0.77),
    ('J', 0.15),
    ('X', 0.15),
    ('Q', 0.10),
    ('Z', 0.07),
];

/// Per-difficulty-level chance of buying a vowel
const VOWEL_BUY_CHANCE_PER_LEVEL: f64 = 0.15;

pub fn is_vowel(letter: char) -> bool {
    VOWELS.contains(&letter)
}

pub fn frequency(letter: char) -> f64 {
    LETTER_FREQUENCY
        .iter()
        .find(|(l, _)| *l == letter)
        .map(|(_, f)| *f)
        .unwrap_or(0.0)
}

/// What the computer decided to do on its letter turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LetterChoice {
    Consonant(char),
    Vowel(char),
    /// Nothing left to call
    Forfeit,
}

/// Unguessed alphabet split into `(vowels, consonants)`, both in A-Z order
pub fn letter_pools(guessed: &BTreeSet<char>) -> (Vec<char>, Vec<char>) {
    ('A'..='Z')
        .filter(|c| !guessed.contains(c))
        .partition(|c| is_vowel(*c))
}

/// Pool ranked by frequency, most frequent first. Ties keep alphabetical order.
pub fn rank_by_frequency(pool: &[char]) -> Vec<char> {
    let mut ranked = pool.to_vec();
    ranked.sort_by(|a, b| frequency(*b).total_cmp(&frequency(*a)));
    ranked
}

/// Difficulty-gated pick within one pool
pub fn pick_from_pool<R: Rng + ?Sized>(pool: &[char], difficulty: u8, rng: &mut R) -> Option<char> {
    if pool.is_empty() {
        return None;
    }
    let ranked = rank_by_frequency(pool);
    let candidates = match difficulty {
        0 | 1 => return pool.choose(rng).copied(),
        2 => top_share(&ranked, 0.6),
        3 => top_share(&ranked, 0.3),
        _ => return ranked.first().copied(),
    };
    candidates.choose(rng).copied()
}

/// Leading `share` of a ranked pool, never empty for a non-empty pool
fn top_share(ranked: &[char], share: f64) -> &[char] {
    let keep = ((ranked.len() as f64) * share).ceil() as usize;
    &ranked[..keep.clamp(1, ranked.len())]
}

/// Whether the computer buys a vowel this time
pub fn wants_vowel<R: Rng + ?Sized>(
    round_score: i64,
    vowel_cost: i64,
    vowels_cost_money: bool,
    difficulty: u8,
    rng: &mut R,
) -> bool {
    if !vowels_cost_money || round_score < vowel_cost {
        return false;
    }
    let chance = (f64::from(difficulty) * VOWEL_BUY_CHANCE_PER_LEVEL).clamp(0.0, 1.0);
    rng.random_bool(chance)
}

/// Full letter decision for one computer turn
pub fn choose_letter<R: Rng + ?Sized>(
    guessed: &BTreeSet<char>,
    round_score: i64,
    vowel_cost: i64,
    vowels_cost_money: bool,
    difficulty: u8,
    rng: &mut R,
) -> LetterChoice {
    let (vowels, consonants) = letter_pools(guessed);

    if !vowels.is_empty() && wants_vowel(round_score, vowel_cost, vowels_cost_money, difficulty, rng) {
        if let Some(v) = pick_from_pool(&vowels, difficulty, rng) {
            return LetterChoice::Vowel(v);
        }
    }

    if let Some(c) = pick_from_pool(&consonants, difficulty, rng) {
        return LetterChoice::Consonant(c);
    }

    // Consonants exhausted. A vowel still has to be affordable when vowels cost money.
    if vowels_cost_money && round_score < vowel_cost {
        return LetterChoice::Forfeit;
    }
    match pick_from_pool(&vowels, difficulty, rng) {
        Some(v) => LetterChoice::Vowel(v),
        None => LetterChoice::Forfeit,
    }
}
