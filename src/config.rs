//! Startup configuration read from the environment.

use rand::Rng;
use std::net::SocketAddr;

use crate::pokeapi::DEFAULT_BASE_URL;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("POKEMON_GAME_SECRET must be set in production")]
    MissingSecret,

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

/// Where the token secret came from
#[derive(Clone, PartialEq, Eq)]
pub enum GameSecret {
    Configured(String),
    /// Generated at startup; tokens do not survive a restart
    Ephemeral(String),
}

impl GameSecret {
    pub fn expose(&self) -> &str {
        match self {
            GameSecret::Configured(s) | GameSecret::Ephemeral(s) => s,
        }
    }
}

impl std::fmt::Debug for GameSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameSecret::Configured(_) => f.write_str("GameSecret::Configured(..)"),
            GameSecret::Ephemeral(_) => f.write_str("GameSecret::Ephemeral(..)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub bind_addr: SocketAddr,
    pub game_secret: GameSecret,
    pub pokeapi_base_url: String,
    /// None = authentication disabled, in-memory ranking
    pub supabase: Option<SupabaseConfig>,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let environment = match var("APP_ENV") {
            Some(env) if env.eq_ignore_ascii_case("production") => Environment::Production,
            _ => Environment::Development,
        };

        let game_secret = match (var("POKEMON_GAME_SECRET"), environment) {
            (Some(secret), _) => GameSecret::Configured(secret),
            (None, Environment::Production) => return Err(ConfigError::MissingSecret),
            (None, Environment::Development) => {
                tracing::warn!(
                    "POKEMON_GAME_SECRET not set, using an ephemeral secret. \
                     Game tokens will not survive a restart."
                );
                GameSecret::Ephemeral(generate_secret())
            }
        };

        let bind_addr: SocketAddr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let pokeapi_base_url =
            var("POKEAPI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        // Both must be set to enable auth
        let supabase = match (var("SUPABASE_URL"), var("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => {
                tracing::info!("Supabase authentication enabled");
                Some(SupabaseConfig { url, anon_key })
            }
            (url, key) => {
                if url.is_some() || key.is_some() {
                    tracing::warn!(
                        "SUPABASE_URL and SUPABASE_ANON_KEY must both be set \
                         to enable authentication"
                    );
                }
                tracing::warn!(
                    "Authentication DISABLED - wins will not be recorded, ranking is in-memory"
                );
                None
            }
        };

        Ok(Self {
            environment,
            bind_addr,
            game_secret,
            pokeapi_base_url,
            supabase,
        })
    }
}

fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}
