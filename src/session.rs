//! Start/guess protocol.
//!
//! No game is held in memory between requests: every response carries a
//! freshly encrypted token and the next request brings it back.

use rand::Rng;
use std::sync::Arc;

use crate::game::{normalize_letter, GuessOutcome};
use crate::pokeapi::{PokemonProvider, ProviderError};
use crate::token::{TokenCodec, TokenError};
use crate::types::*;
use crate::view;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Covers malformed, truncated and tampered tokens alike
    #[error("Invalid game token")]
    InvalidToken,

    #[error("Unsupported game token version {0}")]
    UnsupportedVersion(u32),

    #[error("Failed to fetch pokemon: {0}")]
    Upstream(#[from] ProviderError),

    #[error("Failed to encode game token: {0}")]
    Encoding(String),
}

impl From<TokenError> for SessionError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken | TokenError::Authentication | TokenError::Malformed(_) => {
                tracing::debug!("Rejected game token: {}", err);
                SessionError::InvalidToken
            }
            TokenError::UnsupportedVersion(version) => {
                tracing::warn!("Rejected game token with version {}", version);
                SessionError::UnsupportedVersion(version)
            }
            TokenError::KeyDerivation(msg) => SessionError::Encoding(msg),
        }
    }
}

/// Runs games on behalf of HTTP handlers
pub struct GameService {
    codec: TokenCodec,
    provider: Arc<dyn PokemonProvider>,
}

impl GameService {
    pub fn new(codec: TokenCodec, provider: Arc<dyn PokemonProvider>) -> Self {
        Self { codec, provider }
    }

    /// Start a game with a random Pokémon from the selected generation
    pub async fn start_game(&self, generation_index: Option<f64>) -> SessionResult<GameView> {
        let (idx, generation) = select_generation(generation_index);
        let id = rand::rng().random_range(generation.min..=generation.max);

        let pokemon = self.provider.fetch_pokemon(id).await.map_err(|e| {
            tracing::error!("Pokemon provider failed for id={}: {}", id, e);
            e
        })?;

        tracing::info!("Started game: generation={} pokemon_id={}", idx, pokemon.id);

        let state = GameState::new(pokemon);
        self.respond(&state)
    }

    /// Apply one letter guess to the game carried by `game_token`.
    ///
    /// Invalid letters, repeated letters and guesses after the game is over are
    /// not errors: the unchanged game comes back under a new token.
    pub async fn guess_letter(&self, game_token: &str, letter: &str) -> SessionResult<GameView> {
        let mut state = self.open(game_token)?;

        match normalize_letter(letter) {
            Some(letter) => {
                let outcome = state.apply_guess(letter);
                if outcome != GuessOutcome::Ignored {
                    tracing::debug!(
                        "Guess {:?} for pokemon_id={}: wrong={}/{} status={:?}",
                        outcome,
                        state.pokemon.id,
                        state.wrong_guesses,
                        state.max_attempts,
                        state.status()
                    );
                }
            }
            None => tracing::debug!("Ignoring invalid letter input"),
        }

        self.respond(&state)
    }

    fn open(&self, game_token: &str) -> SessionResult<GameState> {
        let state = self.codec.decode(game_token)?;
        if state.version != GAME_STATE_VERSION {
            return Err(SessionError::UnsupportedVersion(state.version));
        }
        Ok(state)
    }

    fn respond(&self, state: &GameState) -> SessionResult<GameView> {
        let token = self
            .codec
            .encode(state)
            .map_err(|e| SessionError::Encoding(e.to_string()))?;
        Ok(view::project(state, token))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::game::tests::pokemon;
    use crate::pokeapi::ProviderResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Provider that always answers with the same name and records requested ids
    pub(crate) struct FixedProvider {
        pub name: String,
        pub requested: Mutex<Vec<PokemonId>>,
    }

    impl FixedProvider {
        pub(crate) fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PokemonProvider for FixedProvider {
        async fn fetch_pokemon(&self, id: PokemonId) -> ProviderResult<Pokemon> {
            self.requested.lock().unwrap().push(id);
            let mut p = pokemon(&self.name);
            p.id = id;
            Ok(p)
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl PokemonProvider for FailingProvider {
        async fn fetch_pokemon(&self, id: PokemonId) -> ProviderResult<Pokemon> {
            Err(ProviderError::Status { id, status: 503 })
        }
    }

    fn service(name: &str) -> (GameService, Arc<FixedProvider>) {
        let provider = Arc::new(FixedProvider::new(name));
        let service = GameService::new(crate::token::tests::codec(), provider.clone());
        (service, provider)
    }

    async fn play(service: &GameService, mut view: GameView, letters: &str) -> GameView {
        for l in letters.chars() {
            view = service
                .guess_letter(&view.game_token, &l.to_string())
                .await
                .unwrap();
        }
        view
    }

    #[tokio::test]
    async fn test_start_game() {
        let (service, provider) = service("pikachu");
        let view = service.start_game(Some(1.0)).await.unwrap();

        assert_eq!(view.status, GameStatus::InProgress);
        assert_eq!(view.masked_word, "_______");
        assert_eq!(view.remaining_attempts, MAX_ATTEMPTS);
        assert!(view.reveal.is_none());

        let id = provider.requested.lock().unwrap()[0];
        assert!((1..=151).contains(&id));
    }

    #[tokio::test]
    async fn test_start_game_out_of_range_index_uses_all_generations() {
        let (service, provider) = service("pikachu");
        for bad in [Some(-1.0), Some(999.0), None] {
            service.start_game(bad).await.unwrap();
        }
        for id in provider.requested.lock().unwrap().iter() {
            assert!((1..=1025).contains(id));
        }
    }

    #[tokio::test]
    async fn test_upstream_failure_fails_start() {
        let service = GameService::new(crate::token::tests::codec(), Arc::new(FailingProvider));
        let result = service.start_game(None).await;
        assert!(matches!(result, Err(SessionError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_win_flow() {
        let (service, _) = service("eevee");
        let view = service.start_game(None).await.unwrap();
        let view = play(&service, view, "ev").await;

        assert_eq!(view.status, GameStatus::Won);
        assert!(view.wrong_letters.is_empty());
        assert_eq!(view.reveal.unwrap().name, "eevee");
    }

    #[tokio::test]
    async fn test_loss_flow() {
        let (service, _) = service("pikachu");
        let view = service.start_game(None).await.unwrap();
        let view = play(&service, view, "zxqwrt").await;

        assert_eq!(view.status, GameStatus::Lost);
        assert_eq!(view.remaining_attempts, 0);
        assert_eq!(view.reveal.unwrap().name, "pikachu");
    }

    #[tokio::test]
    async fn test_duplicate_guess_is_idempotent() {
        let (service, _) = service("pikachu");
        let start = service.start_game(None).await.unwrap();
        let after_p = play(&service, start, "p").await;

        let a = service.guess_letter(&after_p.game_token, "p").await.unwrap();
        let b = service.guess_letter(&after_p.game_token, "P ").await.unwrap();

        assert_ne!(a.game_token, b.game_token);
        assert_ne!(a.game_token, after_p.game_token);
        assert_eq!(a.status, b.status);
        assert_eq!(a.masked_word, b.masked_word);
        assert_eq!(a.correct_letters, b.correct_letters);
        assert_eq!(a.wrong_letters, b.wrong_letters);
        assert_eq!(a.masked_word, after_p.masked_word);
    }

    #[tokio::test]
    async fn test_invalid_letter_is_noop_with_fresh_token() {
        let (service, _) = service("pikachu");
        let start = service.start_game(None).await.unwrap();

        for input in ["", "ab", "7", "?"] {
            let view = service.guess_letter(&start.game_token, input).await.unwrap();
            assert_ne!(view.game_token, start.game_token);
            assert_eq!(view.masked_word, start.masked_word);
            assert_eq!(view.remaining_attempts, start.remaining_attempts);
        }
    }

    #[tokio::test]
    async fn test_finished_game_does_not_change() {
        let (service, _) = service("eevee");
        let view = service.start_game(None).await.unwrap();
        let won = play(&service, view, "ev").await;

        let after = play(&service, won.clone(), "xyz").await;
        assert_eq!(after.status, GameStatus::Won);
        assert_eq!(after.wrong_letters, won.wrong_letters);
        assert_eq!(after.correct_letters, won.correct_letters);
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let (service, _) = service("pikachu");
        let result = service.guess_letter("garbage", "a").await;
        assert!(matches!(result, Err(SessionError::InvalidToken)));

        // invalid letter still requires a valid token
        let result = service.guess_letter("garbage", "").await;
        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_unsupported_version_rejected() {
        let (service, _) = service("pikachu");
        let mut state = GameState::new(pokemon("pikachu"));
        state.version = 2;
        let token = crate::token::tests::codec().encode(&state).unwrap();

        let result = service.guess_letter(&token, "a").await;
        assert!(matches!(result, Err(SessionError::UnsupportedVersion(2))));
    }

    #[tokio::test]
    async fn test_future_schema_token_is_unsupported_not_invalid() {
        let (service, _) = service("pikachu");
        let token = crate::token::tests::codec()
            .seal(br#"{"v":2,"answer":{"name":"pikachu"},"guesses":[]}"#.to_vec())
            .unwrap();

        let result = service.guess_letter(&token, "a").await;
        assert!(matches!(result, Err(SessionError::UnsupportedVersion(2))));
    }

    #[tokio::test]
    async fn test_old_token_replay_decodes_independently() {
        let (service, _) = service("pikachu");
        let start = service.start_game(None).await.unwrap();

        let a = service.guess_letter(&start.game_token, "z").await.unwrap();
        let b = service.guess_letter(&start.game_token, "p").await.unwrap();

        assert_eq!(a.wrong_letters, vec!['z']);
        assert!(a.correct_letters.is_empty());
        assert_eq!(b.correct_letters, vec!['p']);
        assert!(b.wrong_letters.is_empty());
    }
}
