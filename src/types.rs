use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Opaque ID types for type safety
pub type PokemonId = u32;
pub type UserId = String;

/// Schema tag embedded in every game token. Tokens carrying any other value are rejected.
pub const GAME_STATE_VERSION: u32 = 1;

/// Wrong guesses allowed before the game is lost
pub const MAX_ATTEMPTS: u32 = 6;

/// Placeholder shown for letters that have not been guessed yet
pub const MASK_CHAR: char = '_';

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    InProgress,
    Won,
    Lost,
}

/// The secret answer. Only ever leaves the server inside an encrypted token,
/// or in a reveal block once the game is over.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pokemon {
    pub id: PokemonId,
    /// Lowercase name, e.g. "ho-oh" or "mr-mime"
    pub name: String,
    pub types: Vec<String>,
    /// Official artwork, shown in the reveal block
    pub image_url: String,
    /// Blacked-out sprite (data URL) or the raw sprite URL when recoloring failed
    pub sprite_url: String,
    pub cry_url: String,
}

/// Full truth of one game. Lives only inside the encrypted token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    #[serde(rename = "v")]
    pub version: u32,
    pub pokemon: Pokemon,
    pub max_attempts: u32,
    pub wrong_guesses: u32,
    pub guessed_letters: BTreeSet<char>,
    /// Unix millis, informational only
    pub created_at: i64,
}

/// Reveal block, present only once the game is over
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RevealView {
    pub name: String,
    pub image_url: String,
}

/// Client-safe projection of a [`GameState`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub game_token: String,
    pub status: GameStatus,
    pub max_attempts: u32,
    pub remaining_attempts: u32,
    pub name_length: usize,
    pub masked_word: String,
    pub correct_letters: Vec<char>,
    pub wrong_letters: Vec<char>,
    pub types: Vec<String>,
    pub sprite_url: String,
    pub cry_url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reveal: Option<RevealView>,
}

// ========== Generations ==========

/// A named inclusive range of Pokédex ids
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Generation {
    pub label: &'static str,
    pub min: PokemonId,
    pub max: PokemonId,
}

/// Selectable id ranges. The first entry spans every generation and is the fallback.
pub static GENERATIONS: [Generation; 10] = [
    Generation {
        label: "All generations",
        min: 1,
        max: 1025,
    },
    Generation {
        label: "Generation 1 (Kanto)",
        min: 1,
        max: 151,
    },
    Generation {
        label: "Generation 2 (Johto)",
        min: 152,
        max: 251,
    },
    Generation {
        label: "Generation 3 (Hoenn)",
        min: 252,
        max: 386,
    },
    Generation {
        label: "Generation 4 (Sinnoh)",
        min: 387,
        max: 493,
    },
    Generation {
        label: "Generation 5 (Unova)",
        min: 494,
        max: 649,
    },
    Generation {
        label: "Generation 6 (Kalos)",
        min: 650,
        max: 721,
    },
    Generation {
        label: "Generation 7 (Alola)",
        min: 722,
        max: 809,
    },
    Generation {
        label: "Generation 8 (Galar)",
        min: 810,
        max: 905,
    },
    Generation {
        label: "Generation 9 (Paldea)",
        min: 906,
        max: 1025,
    },
];

/// Resolve a client-supplied generation index.
///
/// Fractional values are truncated toward zero. Missing, non-finite, negative
/// or out-of-range values fall back to index 0.
pub fn select_generation(index: Option<f64>) -> (usize, &'static Generation) {
    let idx = index
        .filter(|i| i.is_finite())
        .map(f64::trunc)
        .filter(|i| *i >= 0.0 && *i < GENERATIONS.len() as f64)
        .map(|i| i as usize)
        .unwrap_or(0);
    (idx, &GENERATIONS[idx])
}

// ========== Ranking ==========

/// Stored win record for one user
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankingEntry {
    pub user_id: UserId,
    pub total_wins: u32,
    pub best_streak: u32,
}

/// Profile columns kept by the external user table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: Option<String>,
}

/// Caller identity resolved from a bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
    /// Forwarded to the store so row-level security applies to the caller
    pub access_token: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}
