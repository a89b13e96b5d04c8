//! Redaction of [`GameState`] into the client-visible [`GameView`].
//!
//! The name is only ever written out here, and only once the game is over.

use crate::types::*;

pub fn project(state: &GameState, game_token: String) -> GameView {
    let status = state.status();
    let reveal_all = status != GameStatus::InProgress;
    let (correct_letters, wrong_letters) = state.partition_guesses();

    GameView {
        game_token,
        status,
        max_attempts: state.max_attempts,
        remaining_attempts: state.remaining_attempts(),
        name_length: state.pokemon.name.chars().count(),
        masked_word: state.masked_word(reveal_all),
        correct_letters,
        wrong_letters,
        types: state.pokemon.types.clone(),
        sprite_url: state.pokemon.sprite_url.clone(),
        cry_url: state.pokemon.cry_url.clone(),
        reveal: reveal_all.then(|| RevealView {
            name: state.pokemon.name.clone(),
            image_url: state.pokemon.image_url.clone(),
        }),
    }
}
