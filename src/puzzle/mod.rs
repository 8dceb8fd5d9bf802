//! Puzzle library.
//!
//! Bundled seed puzzles plus whatever the host adds or generates, persisted as one JSON file.
//! Loading never fails: a missing or corrupt file falls back to the seeds, and individual
//! malformed entries are dropped.

mod generate;
mod seeds;

use crate::types::*;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

pub use generate::{generate_puzzles, parse_generated, GenerateSpec};
pub use seeds::SEED_VERSION;

/// How many recent draws are skipped by `select`
const RECENT_LIMIT: usize = 30;

pub type LibraryResult<T> = Result<T, LibraryError>;

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Puzzle library I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Puzzle library JSON invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid puzzle: {0}")]
    Invalid(String),

    #[error("Puzzle generation failed: {0}")]
    Generation(#[from] crate::llm::LlmError),

    #[error("No usable puzzles were generated")]
    NothingGenerated,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleSource {
    Seed,
    Custom,
    Generated,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct LibraryEntry {
    #[serde(flatten)]
    puzzle: Puzzle,
    source: PuzzleSource,
}

#[derive(Debug, Serialize, Deserialize)]
struct LibraryFile {
    seed_version: u32,
    /// Kept raw so one bad entry cannot sink the whole file
    puzzles: Vec<serde_json::Value>,
}

/// Draw constraints; every field optional
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PuzzleFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<u8>,
}

impl PuzzleFilter {
    fn accepts(&self, puzzle: &Puzzle) -> bool {
        let category_ok = self
            .category
            .as_deref()
            .map(|c| c.trim().eq_ignore_ascii_case(&puzzle.category))
            .unwrap_or(true);
        let difficulty_ok = match self.difficulty {
            Some(d) => puzzle.difficulty == Some(d),
            None => true,
        };
        category_ok && difficulty_ok
    }
}

/// Stable id: first 16 hex chars of SHA-256 over `CATEGORY|PHRASE`
pub fn puzzle_id(category: &str, phrase: &str) -> PuzzleId {
    let mut hasher = Sha256::new();
    hasher.update(category.as_bytes());
    hasher.update(b"|");
    hasher.update(phrase.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}

/// Normalize and check a puzzle, assigning its id
pub fn validate(puzzle: Puzzle) -> LibraryResult<Puzzle> {
    let category = normalize_phrase(&puzzle.category);
    let phrase = normalize_phrase(&puzzle.phrase);

    if category.is_empty() {
        return Err(LibraryError::Invalid("category is empty".to_string()));
    }
    if !phrase.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(LibraryError::Invalid(format!(
            "phrase {:?} has no letters",
            puzzle.phrase
        )));
    }
    if let Some(d) = puzzle.difficulty {
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&d) {
            return Err(LibraryError::Invalid(format!("difficulty {} out of range", d)));
        }
    }

    Ok(Puzzle {
        id: Some(puzzle_id(&category, &phrase)),
        category,
        phrase,
        difficulty: puzzle.difficulty,
    })
}

pub struct PuzzleLibrary {
    path: Option<PathBuf>,
    entries: Vec<LibraryEntry>,
    recent: VecDeque<PuzzleId>,
}

impl PuzzleLibrary {
    /// Seeds only, never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: seed_entries(),
            recent: VecDeque::new(),
        }
    }

    /// Load from `path`, falling back to the seeds
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match read_file(&path) {
            Ok(Some(file)) => merge_with_seeds(file),
            Ok(None) => {
                tracing::info!("No puzzle library at {}, using seeds", path.display());
                seed_entries()
            }
            Err(e) => {
                tracing::warn!(
                    "Puzzle library at {} unreadable ({}), using seeds",
                    path.display(),
                    e
                );
                seed_entries()
            }
        };
        tracing::info!("Puzzle library ready with {} puzzles", entries.len());

        Self {
            path: Some(path),
            entries,
            recent: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn puzzles(&self) -> Vec<Puzzle> {
        self.entries.iter().map(|e| e.puzzle.clone()).collect()
    }

    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> =
            self.entries.iter().map(|e| e.puzzle.category.clone()).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Random puzzle matching `filter`, avoiding recent draws while possible
    pub fn select<R: Rng + ?Sized>(&mut self, filter: &PuzzleFilter, rng: &mut R) -> Option<Puzzle> {
        let matching: Vec<&LibraryEntry> = self
            .entries
            .iter()
            .filter(|e| filter.accepts(&e.puzzle))
            .collect();

        let fresh: Vec<&LibraryEntry> = matching
            .iter()
            .copied()
            .filter(|e| {
                e.puzzle
                    .id
                    .as_ref()
                    .map_or(true, |id| !self.recent.contains(id))
            })
            .collect();

        let pool = if fresh.is_empty() {
            tracing::debug!("All {} matching puzzles used recently", matching.len());
            &matching
        } else {
            &fresh
        };
        let puzzle = pool.choose(rng)?.puzzle.clone();

        if let Some(id) = &puzzle.id {
            self.recent.retain(|r| r != id);
            self.recent.push_back(id.clone());
            while self.recent.len() > RECENT_LIMIT {
                self.recent.pop_front();
            }
        }
        Some(puzzle)
    }

    /// Add a host-written puzzle. Returns the stored puzzle; duplicates are not added twice.
    pub fn add(&mut self, puzzle: Puzzle) -> LibraryResult<Puzzle> {
        self.insert(puzzle, PuzzleSource::Custom)
    }

    /// Add every valid generated puzzle, returning the ones that were new
    pub fn add_generated(&mut self, puzzles: Vec<Puzzle>) -> LibraryResult<Vec<Puzzle>> {
        let mut added = Vec::new();
        for puzzle in puzzles {
            let before = self.entries.len();
            match self.insert_unsaved(puzzle, PuzzleSource::Generated) {
                Ok(stored) if self.entries.len() > before => added.push(stored),
                Ok(_) => {}
                Err(e) => tracing::debug!("Dropping generated puzzle: {}", e),
            }
        }
        self.save()?;
        Ok(added)
    }

    fn insert(&mut self, puzzle: Puzzle, source: PuzzleSource) -> LibraryResult<Puzzle> {
        let stored = self.insert_unsaved(puzzle, source)?;
        self.save()?;
        Ok(stored)
    }

    fn insert_unsaved(&mut self, puzzle: Puzzle, source: PuzzleSource) -> LibraryResult<Puzzle> {
        let puzzle = validate(puzzle)?;
        if let Some(existing) = self.entries.iter().find(|e| e.puzzle.id == puzzle.id) {
            tracing::debug!("Puzzle {:?} already in library", puzzle.id);
            return Ok(existing.puzzle.clone());
        }
        tracing::info!("Added {:?} puzzle in {}", source, puzzle.category);
        self.entries.push(LibraryEntry {
            puzzle: puzzle.clone(),
            source,
        });
        Ok(puzzle)
    }

    /// Write the library; a no-op for in-memory libraries
    pub fn save(&self) -> LibraryResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = LibraryFile {
            seed_version: SEED_VERSION,
            puzzles: self
                .entries
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<_, _>>()?,
        };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
        tracing::debug!("Saved {} puzzles to {}", self.entries.len(), path.display());
        Ok(())
    }
}

fn seed_entries() -> Vec<LibraryEntry> {
    seeds::SEEDS
        .iter()
        .filter_map(|(category, phrase, difficulty)| {
            validate(Puzzle {
                id: None,
                category: category.to_string(),
                phrase: phrase.to_string(),
                difficulty: Some(*difficulty),
            })
            .ok()
        })
        .map(|puzzle| LibraryEntry {
            puzzle,
            source: PuzzleSource::Seed,
        })
        .collect()
}

fn read_file(path: &Path) -> LibraryResult<Option<LibraryFile>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Keep valid entries. A stale seed version swaps stored seeds for the bundled ones.
fn merge_with_seeds(file: LibraryFile) -> Vec<LibraryEntry> {
    let stale = file.seed_version < SEED_VERSION;
    let mut entries: Vec<LibraryEntry> = Vec::new();

    for raw in file.puzzles {
        let entry: LibraryEntry = match serde_json::from_value(raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Dropping malformed puzzle entry: {}", e);
                continue;
            }
        };
        if stale && entry.source == PuzzleSource::Seed {
            continue;
        }
        match validate(entry.puzzle) {
            Ok(puzzle) if !entries.iter().any(|e| e.puzzle.id == puzzle.id) => {
                entries.push(LibraryEntry {
                    puzzle,
                    source: entry.source,
                });
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("Dropping invalid puzzle entry: {}", e),
        }
    }

    if stale || !entries.iter().any(|e| e.source == PuzzleSource::Seed) {
        tracing::info!(
            "Refreshing seed puzzles (stored version {}, bundled {})",
            file.seed_version,
            SEED_VERSION
        );
        let mut seeds = seed_entries();
        seeds.retain(|s| !entries.iter().any(|e| e.puzzle.id == s.puzzle.id));
        seeds.extend(entries);
        return seeds;
    }
    entries
}
