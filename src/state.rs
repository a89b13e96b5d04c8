use std::sync::Arc;

use crate::auth::{DisabledIdentity, IdentityProvider};
use crate::config::{AppConfig, ConfigError};
use crate::pokeapi::{PokeApiProvider, PokemonProvider, ProviderError};
use crate::ranking::{MemoryStore, RankingStore, StoreError};
use crate::session::GameService;
use crate::supabase::SupabaseClient;
use crate::token::{TokenCodec, TokenError};

/// Anything that can stop the server from starting
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Token codec: {0}")]
    Token(#[from] TokenError),

    #[error("Pokemon provider: {0}")]
    Provider(#[from] ProviderError),

    #[error("Supabase client: {0}")]
    Store(#[from] StoreError),
}

/// Shared application state. Holds no per-game data: games travel in tokens.
#[derive(Clone)]
pub struct AppState {
    pub games: Arc<GameService>,
    pub ranking: Arc<dyn RankingStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        games: GameService,
        ranking: Arc<dyn RankingStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            games: Arc::new(games),
            ranking,
            identity,
        }
    }

    /// Wire up real collaborators from configuration. Derives the token key,
    /// which is slow, so call this once.
    pub fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let codec = TokenCodec::new(config.game_secret.expose())?;
        let provider: Arc<dyn PokemonProvider> =
            Arc::new(PokeApiProvider::new(config.pokeapi_base_url.clone())?);
        let games = GameService::new(codec, provider);

        let state = match &config.supabase {
            Some(supabase) => {
                let client = Arc::new(SupabaseClient::new(supabase)?);
                Self::new(games, client.clone(), client)
            }
            None => Self::new(games, Arc::new(MemoryStore::new()), Arc::new(DisabledIdentity)),
        };
        Ok(state)
    }
}
