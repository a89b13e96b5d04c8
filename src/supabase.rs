//! Supabase client: user lookup via the auth API and ranking/profile rows
//! via PostgREST. Writes use the caller's access token so row-level security
//! is enforced by the database.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::auth::IdentityProvider;
use crate::config::SupabaseConfig;
use crate::ranking::{LeaderboardEntry, RankingStore, StoreError, StoreResult};
use crate::types::*;

const RANKING_COLUMNS: &str = "user_id,total_wins,best_streak";
const PROFILE_COLUMNS: &str = "id,username,full_name,avatar_url,created_at";

pub struct SupabaseClient {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct AuthUserResponse {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    full_name: Option<String>,
    avatar_url: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LeaderboardRowResponse {
    user_id: String,
    total_wins: u32,
    best_streak: u32,
    app_user: Option<EmbeddedProfile>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedProfile {
    username: Option<String>,
    full_name: Option<String>,
    avatar_url: Option<String>,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> StoreResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| StoreError::Request(e.to_string()))?;
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            client,
        })
    }

    fn rest(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Attach the project key plus the bearer token the request runs as
    fn authorize(&self, request: RequestBuilder, bearer: &str) -> RequestBuilder {
        request.header("apikey", &self.anon_key).bearer_auth(bearer)
    }

    async fn send(request: RequestBuilder) -> StoreResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(StoreError::Status(response.status().as_u16()));
        }
        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(request: RequestBuilder) -> StoreResult<T> {
        Self::send(request)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    async fn resolve(&self, access_token: &str) -> StoreResult<Option<AuthUser>> {
        let request = self.authorize(
            self.client.get(format!("{}/auth/v1/user", self.base_url)),
            access_token,
        );
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Ok(None),
            status if !status.is_success() => return Err(StoreError::Status(status.as_u16())),
            _ => {}
        }

        let user: AuthUserResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))?;

        Ok(Some(AuthUser {
            id: user.id,
            email: user.email,
            access_token: access_token.to_string(),
            full_name: user.user_metadata.full_name,
            avatar_url: user.user_metadata.avatar_url.or(user.user_metadata.picture),
        }))
    }
}

#[async_trait]
impl RankingStore for SupabaseClient {
    async fn find_entry(&self, user: &AuthUser) -> StoreResult<Option<RankingEntry>> {
        let request = self.authorize(
            self.client.get(self.rest("ranking")).query(&[
                ("select", RANKING_COLUMNS.to_string()),
                ("user_id", format!("eq.{}", user.id)),
            ]),
            &user.access_token,
        );
        let rows: Vec<RankingEntry> = Self::fetch_json(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_entry(&self, user: &AuthUser, entry: &RankingEntry) -> StoreResult<()> {
        let request = self.authorize(
            self.client
                .post(self.rest("ranking"))
                .query(&[("on_conflict", "user_id")])
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(entry),
            &user.access_token,
        );
        Self::send(request).await?;
        Ok(())
    }

    async fn leaderboard(&self, limit: usize) -> StoreResult<Vec<LeaderboardEntry>> {
        let request = self.authorize(
            self.client.get(self.rest("ranking")).query(&[
                (
                    "select",
                    format!(
                        "{},app_user:app_user(username,full_name,avatar_url)",
                        RANKING_COLUMNS
                    ),
                ),
                ("order", "total_wins.desc,best_streak.desc".to_string()),
                ("limit", limit.to_string()),
            ]),
            &self.anon_key,
        );
        let rows: Vec<LeaderboardRowResponse> = Self::fetch_json(request).await?;

        Ok(rows
            .into_iter()
            .map(|row| LeaderboardEntry {
                profile: row.app_user.map(|p| UserProfile {
                    id: row.user_id.clone(),
                    username: p.username,
                    full_name: p.full_name,
                    avatar_url: p.avatar_url,
                    created_at: None,
                }),
                ranking: RankingEntry {
                    user_id: row.user_id,
                    total_wins: row.total_wins,
                    best_streak: row.best_streak,
                },
            })
            .collect())
    }

    async fn find_profile(&self, user: &AuthUser) -> StoreResult<Option<UserProfile>> {
        let request = self.authorize(
            self.client.get(self.rest("app_user")).query(&[
                ("select", PROFILE_COLUMNS.to_string()),
                ("id", format!("eq.{}", user.id)),
            ]),
            &user.access_token,
        );
        let rows: Vec<UserProfile> = Self::fetch_json(request).await?;
        Ok(rows.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_auth_user() {
        let json = r#"{
            "id": "8d1f",
            "email": "ash@example.com",
            "user_metadata": {"full_name": "Ash Ketchum", "picture": "https://pic"}
        }"#;
        let user: AuthUserResponse = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, "8d1f");
        assert_eq!(user.user_metadata.full_name.as_deref(), Some("Ash Ketchum"));
        assert!(user.user_metadata.avatar_url.is_none());
        assert_eq!(user.user_metadata.picture.as_deref(), Some("https://pic"));
    }

    #[test]
    fn test_parse_leaderboard_rows() {
        let json = r#"[
            {"user_id": "a", "total_wins": 4, "best_streak": 2,
             "app_user": {"username": "ash", "full_name": null, "avatar_url": null}},
            {"user_id": "b", "total_wins": 1, "best_streak": 1, "app_user": null}
        ]"#;
        let rows: Vec<LeaderboardRowResponse> = serde_json::from_str(json).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].app_user.as_ref().unwrap().username.as_deref(), Some("ash"));
        assert!(rows[1].app_user.is_none());
    }

    #[test]
    fn test_urls() {
        let client = SupabaseClient::new(&SupabaseConfig {
            url: "https://project.supabase.co/".to_string(),
            anon_key: "anon".to_string(),
        })
        .unwrap();
        assert_eq!(
            client.rest("ranking"),
            "https://project.supabase.co/rest/v1/ranking"
        );
    }
}
