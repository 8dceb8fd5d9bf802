use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type PlayerId = String;
pub type PuzzleId = String;
pub type SegmentId = u32;

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 4;
pub const DEFAULT_DIFFICULTY: u8 = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Setup,
    Ready,
    Spinning,
    GuessingLetter,
    Solving,
    Idle,
    /// Reserved. Nothing transitions into it.
    GameOver,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub total_score: i64,
    pub round_score: i64,
    pub is_computer: bool,
    /// 1 (easy) to 4 (hardest); only consulted for computer players
    pub difficulty: u8,
}

/// Roster entry supplied by the host when configuring a game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerSetup {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_computer: bool,
    /// Filled from the host's default when absent
    #[serde(default)]
    pub difficulty: Option<u8>,
}

impl Player {
    pub fn from_setup(setup: &PlayerSetup, seat: usize) -> Self {
        let name = setup
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                if setup.is_computer {
                    petname::petname(2, " ")
                        .map(|n| format!("Bot {}", title_case(&n)))
                        .unwrap_or_else(|| format!("Bot {}", seat + 1))
                } else {
                    format!("Player {}", seat + 1)
                }
            });

        Self {
            id: ulid::Ulid::new().to_string(),
            name,
            total_score: 0,
            round_score: 0,
            is_computer: setup.is_computer,
            difficulty: setup
                .difficulty
                .unwrap_or(DEFAULT_DIFFICULTY)
                .clamp(MIN_DIFFICULTY, MAX_DIFFICULTY),
        }
    }
}

fn title_case(words: &str) -> String {
    words
        .split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Puzzle {
    #[serde(default)]
    pub id: Option<PuzzleId>,
    pub category: String,
    pub phrase: String,
    #[serde(default)]
    pub difficulty: Option<u8>,
}

impl Puzzle {
    pub fn new(category: &str, phrase: &str) -> Self {
        Self {
            id: None,
            category: category.trim().to_uppercase(),
            phrase: normalize_phrase(phrase),
            difficulty: None,
        }
    }

    /// Same puzzle with phrase and category in board form
    pub fn normalized(self) -> Self {
        Self {
            phrase: normalize_phrase(&self.phrase),
            category: self.category.trim().to_uppercase(),
            ..self
        }
    }

    /// Distinct letters A-Z that appear in the phrase
    pub fn unique_letters(&self) -> std::collections::BTreeSet<char> {
        self.phrase.chars().filter(|c| c.is_ascii_uppercase()).collect()
    }

    /// Number of times `letter` appears in the phrase
    pub fn count(&self, letter: char) -> usize {
        self.phrase.chars().filter(|c| *c == letter).count()
    }
}

/// Uppercase, trim and collapse runs of whitespace
pub fn normalize_phrase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Letters only, uppercased. Used to compare solve attempts against the phrase.
pub fn letters_only(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentKind {
    Cash,
    LoseTurn,
    Bankrupt,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WheelSegment {
    pub id: SegmentId,
    pub label: String,
    pub value: i64,
    pub kind: SegmentKind,
    pub weight: f64,
}

/// Table rules the host can toggle between rounds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HouseRules {
    pub vowels_cost_money: bool,
    pub vowel_cost: i64,
}

impl Default for HouseRules {
    fn default() -> Self {
        Self {
            vowels_cost_money: true,
            vowel_cost: crate::session::VOWEL_COST,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Board,
}
