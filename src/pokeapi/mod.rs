mod silhouette;

use async_trait::async_trait;
use serde::Deserialize;

use crate::types::{Pokemon, PokemonId};

pub use silhouette::blackout_png;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while fetching a Pokémon
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Upstream returned status {status} for pokemon id={id}")]
    Status { id: PokemonId, status: u16 },

    #[error("Response parsing failed: {0}")]
    Payload(String),
}

/// Source of secret answers
#[async_trait]
pub trait PokemonProvider: Send + Sync {
    async fn fetch_pokemon(&self, id: PokemonId) -> ProviderResult<Pokemon>;
}

#[derive(Debug, Deserialize)]
struct ApiPokemon {
    id: PokemonId,
    name: String,
    #[serde(default)]
    types: Vec<ApiTypeEntry>,
    #[serde(default)]
    cries: Option<ApiCries>,
    sprites: ApiSprites,
}

#[derive(Debug, Deserialize)]
struct ApiTypeEntry {
    #[serde(rename = "type")]
    kind: ApiNamed,
}

#[derive(Debug, Deserialize)]
struct ApiNamed {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiCries {
    latest: Option<String>,
    legacy: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiSprites {
    front_default: Option<String>,
    #[serde(default)]
    other: Option<ApiOtherSprites>,
}

#[derive(Debug, Deserialize)]
struct ApiOtherSprites {
    #[serde(rename = "official-artwork")]
    official_artwork: Option<ApiArtwork>,
}

#[derive(Debug, Deserialize)]
struct ApiArtwork {
    front_default: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl ApiPokemon {
    /// Map the upstream payload, taking `sprite_url` from the silhouette step.
    fn into_pokemon(self, sprite_url: String) -> Pokemon {
        let cries = self.cries.unwrap_or(ApiCries {
            latest: None,
            legacy: None,
        });
        let artwork = self
            .sprites
            .other
            .and_then(|o| o.official_artwork)
            .and_then(|a| non_empty(a.front_default));

        Pokemon {
            id: self.id,
            name: self.name.to_lowercase(),
            types: self.types.into_iter().map(|t| t.kind.name).collect(),
            image_url: artwork
                .or_else(|| non_empty(self.sprites.front_default))
                .unwrap_or_default(),
            sprite_url,
            cry_url: non_empty(cries.latest)
                .or_else(|| non_empty(cries.legacy))
                .unwrap_or_default(),
        }
    }
}

/// PokeAPI-backed provider
pub struct PokeApiProvider {
    base_url: String,
    client: reqwest::Client,
}

impl PokeApiProvider {
    pub fn new(base_url: impl Into<String>) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pokehangman/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Download the sprite and black it out. Falls back to the raw URL on any failure.
    async fn silhouette(&self, id: PokemonId, sprite_url: &str) -> String {
        match self.fetch_silhouette(sprite_url).await {
            Ok(data_url) => data_url,
            Err(e) => {
                tracing::warn!(
                    "Silhouette generation failed for pokemon id={}: {}, using raw sprite",
                    id,
                    e
                );
                sprite_url.to_string()
            }
        }
    }

    async fn fetch_silhouette(&self, sprite_url: &str) -> ProviderResult<String> {
        let response = self
            .client
            .get(sprite_url)
            .send()
            .await
            .map_err(|e| ProviderError::Request(format!("Failed to fetch sprite: {}", e)))?;

        if !response.status().is_success() {
            return Err(ProviderError::Request(format!(
                "Failed to fetch sprite, status: {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Request(format!("Failed to read sprite bytes: {}", e)))?;

        let png = tokio::task::spawn_blocking(move || blackout_png(&bytes))
            .await
            .map_err(|e| ProviderError::Payload(e.to_string()))??;

        use base64::{engine::general_purpose::STANDARD, Engine as _};
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }
}

#[async_trait]
impl PokemonProvider for PokeApiProvider {
    async fn fetch_pokemon(&self, id: PokemonId) -> ProviderResult<Pokemon> {
        let url = format!("{}/pokemon/{}", self.base_url, id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Status {
                id,
                status: response.status().as_u16(),
            });
        }

        let data: ApiPokemon = response
            .json()
            .await
            .map_err(|e| ProviderError::Payload(e.to_string()))?;

        let sprite_url = match non_empty(data.sprites.front_default.clone()) {
            Some(raw) => self.silhouette(id, &raw).await,
            None => String::new(),
        };

        tracing::debug!("Fetched pokemon id={}", id);
        Ok(data.into_pokemon(sprite_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use image::{ImageFormat, Rgba, RgbaImage};
    use serde_json::json;
    use std::io::Cursor;

    const PAYLOAD: &str = r#"{
        "id": 250,
        "name": "Ho-Oh",
        "types": [
            {"slot": 1, "type": {"name": "fire", "url": "x"}},
            {"slot": 2, "type": {"name": "flying", "url": "y"}}
        ],
        "cries": {"latest": "https://cries/latest.ogg", "legacy": "https://cries/legacy.ogg"},
        "sprites": {
            "front_default": "https://sprites/250.png",
            "other": {"official-artwork": {"front_default": "https://art/250.png"}}
        }
    }"#;

    #[test]
    fn test_maps_full_payload() {
        let api: ApiPokemon = serde_json::from_str(PAYLOAD).unwrap();
        let pokemon = api.into_pokemon("data:image/png;base64,xyz".to_string());

        assert_eq!(pokemon.id, 250);
        assert_eq!(pokemon.name, "ho-oh");
        assert_eq!(pokemon.types, vec!["fire", "flying"]);
        assert_eq!(pokemon.image_url, "https://art/250.png");
        assert_eq!(pokemon.cry_url, "https://cries/latest.ogg");
        assert_eq!(pokemon.sprite_url, "data:image/png;base64,xyz");
    }

    #[test]
    fn test_falls_back_when_fields_missing() {
        let payload = r#"{
            "id": 1,
            "name": "bulbasaur",
            "types": [],
            "cries": {"latest": null, "legacy": "https://cries/legacy.ogg"},
            "sprites": {"front_default": "https://sprites/1.png", "other": {}}
        }"#;
        let api: ApiPokemon = serde_json::from_str(payload).unwrap();
        let pokemon = api.into_pokemon("https://sprites/1.png".to_string());

        assert_eq!(pokemon.image_url, "https://sprites/1.png");
        assert_eq!(pokemon.cry_url, "https://cries/legacy.ogg");
        assert!(pokemon.types.is_empty());
    }

    #[test]
    fn test_no_media_yields_empty_urls() {
        let payload = r#"{"id": 2, "name": "ivysaur", "sprites": {"front_default": null}}"#;
        let api: ApiPokemon = serde_json::from_str(payload).unwrap();
        let pokemon = api.into_pokemon(String::new());

        assert_eq!(pokemon.image_url, "");
        assert_eq!(pokemon.cry_url, "");
        assert_eq!(pokemon.sprite_url, "");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider = PokeApiProvider::new("http://localhost:1/api/v2/").unwrap();
        assert_eq!(provider.base_url, "http://localhost:1/api/v2");
    }

    #[tokio::test]
    async fn test_unreachable_sprite_falls_back_to_raw_url() {
        let provider = PokeApiProvider::new("http://127.0.0.1:9").unwrap();
        let url = provider.silhouette(1, "http://127.0.0.1:9/sprite.png").await;
        assert_eq!(url, "http://127.0.0.1:9/sprite.png");
    }

    fn sprite_png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(2, 2, Rgba([200, 50, 10, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn pokemon_json(id: PokemonId, sprite_url: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": "pikachu",
            "types": [{"slot": 1, "type": {"name": "electric", "url": "x"}}],
            "sprites": {"front_default": sprite_url}
        })
    }

    /// Serves a small fake PokeAPI on a random local port and returns its base URL.
    ///
    /// - 404: not found
    /// - 2: body that is not JSON
    /// - 3: sprite answers 500
    /// - 4: sprite is not an image
    /// - 5: sprite is a real PNG
    async fn spawn_upstream() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let with_sprite = |id: PokemonId, path: &str| {
            let body = pokemon_json(id, &format!("{}{}", base, path));
            move || {
                let body = body.clone();
                async move { Json(body) }
            }
        };

        let app = Router::new()
            .route("/pokemon/404", get(|| async { StatusCode::NOT_FOUND }))
            .route("/pokemon/2", get(|| async { "{\"id\": 2, \"name\":" }))
            .route("/pokemon/3", get(with_sprite(3, "/sprites/error.png")))
            .route("/pokemon/4", get(with_sprite(4, "/sprites/text.png")))
            .route("/pokemon/5", get(with_sprite(5, "/sprites/ok.png")))
            .route(
                "/sprites/error.png",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .route("/sprites/text.png", get(|| async { "definitely not a png" }))
            .route("/sprites/ok.png", get(|| async { sprite_png() }));

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        base
    }

    #[tokio::test]
    async fn test_upstream_status_is_reported() {
        let provider = PokeApiProvider::new(spawn_upstream().await).unwrap();
        let result = provider.fetch_pokemon(404).await;
        assert!(matches!(
            result,
            Err(ProviderError::Status {
                id: 404,
                status: 404
            })
        ));
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_reported() {
        let provider = PokeApiProvider::new(spawn_upstream().await).unwrap();
        let result = provider.fetch_pokemon(2).await;
        assert!(matches!(result, Err(ProviderError::Payload(_))));
    }

    #[tokio::test]
    async fn test_sprite_error_status_falls_back_to_raw_url() {
        let base = spawn_upstream().await;
        let provider = PokeApiProvider::new(base.clone()).unwrap();
        let pokemon = provider.fetch_pokemon(3).await.unwrap();
        assert_eq!(pokemon.sprite_url, format!("{}/sprites/error.png", base));
        assert_eq!(pokemon.types, vec!["electric"]);
    }

    #[tokio::test]
    async fn test_non_image_sprite_falls_back_to_raw_url() {
        let base = spawn_upstream().await;
        let provider = PokeApiProvider::new(base.clone()).unwrap();
        let pokemon = provider.fetch_pokemon(4).await.unwrap();
        assert_eq!(pokemon.sprite_url, format!("{}/sprites/text.png", base));
    }

    #[tokio::test]
    async fn test_sprite_becomes_silhouette_data_url() {
        let provider = PokeApiProvider::new(spawn_upstream().await).unwrap();
        let pokemon = provider.fetch_pokemon(5).await.unwrap();
        assert!(pokemon.sprite_url.starts_with("data:image/png;base64,"));
        // No artwork in the payload, so the reveal image is the raw sprite
        assert!(pokemon.image_url.ends_with("/sprites/ok.png"));
    }
}
