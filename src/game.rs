//! Hangman rules over a [`GameState`].
//!
//! Everything here is pure: status is always recomputed from the guess
//! history, never stored alongside it.

use crate::types::*;
use std::collections::BTreeSet;

/// What a single guess did to the game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    Correct,
    Wrong,
    /// Game already over, letter repeated, or not a letter at all
    Ignored,
}

/// Normalize raw client input into a guessable letter.
/// Returns `None` for anything that is not exactly one ASCII letter after trimming.
pub fn normalize_letter(input: &str) -> Option<char> {
    let mut chars = input.trim().chars();
    let letter = chars.next()?.to_ascii_lowercase();
    if chars.next().is_some() || !letter.is_ascii_lowercase() {
        return None;
    }
    Some(letter)
}

impl GameState {
    /// Fresh game with no guesses
    pub fn new(pokemon: Pokemon) -> Self {
        Self {
            version: GAME_STATE_VERSION,
            pokemon,
            max_attempts: MAX_ATTEMPTS,
            wrong_guesses: 0,
            guessed_letters: BTreeSet::new(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Distinct letters that must be guessed to win
    pub fn name_letters(&self) -> BTreeSet<char> {
        self.pokemon
            .name
            .chars()
            .map(|c| c.to_ascii_lowercase())
            .filter(char::is_ascii_lowercase)
            .collect()
    }

    pub fn name_contains(&self, letter: char) -> bool {
        self.pokemon
            .name
            .chars()
            .any(|c| c.to_ascii_lowercase() == letter)
    }

    /// Lost is checked first, so a losing guess never reads as a win.
    pub fn status(&self) -> GameStatus {
        if self.wrong_guesses >= self.max_attempts {
            return GameStatus::Lost;
        }
        if self
            .name_letters()
            .iter()
            .all(|l| self.guessed_letters.contains(l))
        {
            GameStatus::Won
        } else {
            GameStatus::InProgress
        }
    }

    pub fn is_over(&self) -> bool {
        self.status() != GameStatus::InProgress
    }

    /// Name with unguessed letters replaced by [`MASK_CHAR`]. Hyphens and spaces
    /// are always shown; the output has the same length as the name.
    pub fn masked_word(&self, reveal_all: bool) -> String {
        self.pokemon
            .name
            .chars()
            .map(|c| {
                if c == '-' || c == ' ' || reveal_all {
                    c
                } else if self.guessed_letters.contains(&c.to_ascii_lowercase()) {
                    c
                } else {
                    MASK_CHAR
                }
            })
            .collect()
    }

    /// Record a guess. Letters are never removed and counts never decrease.
    pub fn apply_guess(&mut self, letter: char) -> GuessOutcome {
        if self.is_over()
            || !letter.is_ascii_lowercase()
            || self.guessed_letters.contains(&letter)
        {
            return GuessOutcome::Ignored;
        }

        self.guessed_letters.insert(letter);
        if self.name_contains(letter) {
            GuessOutcome::Correct
        } else {
            self.wrong_guesses += 1;
            GuessOutcome::Wrong
        }
    }

    /// Guessed letters split into (correct, wrong), each sorted
    pub fn partition_guesses(&self) -> (Vec<char>, Vec<char>) {
        self.guessed_letters
            .iter()
            .copied()
            .partition(|l| self.name_contains(*l))
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.max_attempts.saturating_sub(self.wrong_guesses)
    }
}
