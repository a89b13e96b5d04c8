//! Win records, leaderboard and profile.
//!
//! Storage lives behind [`RankingStore`]; the remote implementation is in
//! [`crate::supabase`], the in-memory one below is used when no remote store
//! is configured and in tests.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::types::*;

pub const LEADERBOARD_LIMIT: usize = 50;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Request(String),

    #[error("Store returned status {0}")]
    Status(u16),

    #[error("Store response parsing failed: {0}")]
    Parse(String),
}

/// A leaderboard entry joined with the user's profile columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub ranking: RankingEntry,
    pub profile: Option<UserProfile>,
}

#[async_trait]
pub trait RankingStore: Send + Sync {
    async fn find_entry(&self, user: &AuthUser) -> StoreResult<Option<RankingEntry>>;

    async fn upsert_entry(&self, user: &AuthUser, entry: &RankingEntry) -> StoreResult<()>;

    /// Count one win and fold `streak` into the best streak, returning the new row.
    ///
    /// The default reads then writes, so two concurrent wins for the same user
    /// can lose one increment. Stores that can update in place override it.
    async fn add_win(&self, user: &AuthUser, streak: u32) -> StoreResult<RankingEntry> {
        let existing = self.find_entry(user).await?.unwrap_or_default();
        let entry = existing.with_win(&user.id, streak);
        self.upsert_entry(user, &entry).await?;
        Ok(entry)
    }

    /// Ordered by total wins, then best streak, both descending
    async fn leaderboard(&self, limit: usize) -> StoreResult<Vec<LeaderboardEntry>>;

    async fn find_profile(&self, user: &AuthUser) -> StoreResult<Option<UserProfile>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordWinOutcome {
    Recorded { total_wins: u32, best_streak: u32 },
    NotAuthenticated,
}

/// Count a win for the caller. Totals never decrease.
pub async fn record_win(
    store: &dyn RankingStore,
    user: Option<&AuthUser>,
    streak: i64,
) -> StoreResult<RecordWinOutcome> {
    let Some(user) = user else {
        return Ok(RecordWinOutcome::NotAuthenticated);
    };
    let streak = u32::try_from(streak.max(0)).unwrap_or(u32::MAX);
    let entry = store.add_win(user, streak).await?;

    tracing::info!(
        "Recorded win for user={} total_wins={} best_streak={}",
        user.id,
        entry.total_wins,
        entry.best_streak
    );

    Ok(RecordWinOutcome::Recorded {
        total_wins: entry.total_wins,
        best_streak: entry.best_streak,
    })
}

impl RankingEntry {
    fn with_win(&self, user_id: &str, streak: u32) -> RankingEntry {
        RankingEntry {
            user_id: user_id.to_string(),
            total_wins: self.total_wins.saturating_add(1),
            best_streak: self.best_streak.max(streak),
        }
    }
}

/// "Ash Ketchum" -> "AK", "pikachu" -> "P", "" -> "?"
pub fn initials(name: &str) -> String {
    let parts: Vec<&str> = name.split_whitespace().collect();
    let first = parts.first().and_then(|p| p.chars().next());
    let last = if parts.len() > 1 {
        parts.last().and_then(|p| p.chars().next())
    } else {
        None
    };
    let result: String = first
        .into_iter()
        .chain(last)
        .flat_map(char::to_uppercase)
        .collect();
    if result.is_empty() {
        "?".to_string()
    } else {
        result
    }
}

fn first_present(candidates: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub rank: usize,
    pub user_id: UserId,
    pub display_name: String,
    pub initials: String,
    pub avatar_url: Option<String>,
    pub total_wins: u32,
    pub best_streak: u32,
}

pub fn leaderboard_rows(entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardRow> {
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let profile = entry.profile.unwrap_or_default();
            let display_name = first_present([profile.username, profile.full_name])
                .unwrap_or_else(|| entry.ranking.user_id.chars().take(8).collect());
            LeaderboardRow {
                rank: i + 1,
                initials: initials(&display_name),
                display_name,
                avatar_url: profile.avatar_url,
                user_id: entry.ranking.user_id,
                total_wins: entry.ranking.total_wins,
                best_streak: entry.ranking.best_streak,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub user_id: UserId,
    pub display_name: String,
    pub initials: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub member_since: Option<String>,
    pub total_wins: u32,
    pub best_streak: u32,
}

pub fn profile_view(
    user: &AuthUser,
    profile: Option<UserProfile>,
    entry: Option<RankingEntry>,
) -> ProfileView {
    let profile = profile.unwrap_or_default();
    let entry = entry.unwrap_or_default();
    let display_name = first_present([
        profile.username,
        profile.full_name,
        user.full_name.clone(),
        user.email.clone(),
    ])
    .unwrap_or_else(|| "Player".to_string());

    ProfileView {
        user_id: user.id.clone(),
        initials: initials(&display_name),
        display_name,
        email: user.email.clone(),
        avatar_url: first_present([profile.avatar_url, user.avatar_url.clone()]),
        member_since: profile.created_at,
        total_wins: entry.total_wins,
        best_streak: entry.best_streak,
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<UserId, RankingEntry>>,
    profiles: RwLock<HashMap<UserId, UserProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_profile(&self, profile: UserProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl RankingStore for MemoryStore {
    async fn find_entry(&self, user: &AuthUser) -> StoreResult<Option<RankingEntry>> {
        Ok(self.entries.read().await.get(&user.id).cloned())
    }

    async fn upsert_entry(&self, user: &AuthUser, entry: &RankingEntry) -> StoreResult<()> {
        // Rows can only be written by their owner
        if entry.user_id != user.id {
            return Err(StoreError::Status(403));
        }
        self.entries
            .write()
            .await
            .insert(entry.user_id.clone(), entry.clone());
        Ok(())
    }

    async fn add_win(&self, user: &AuthUser, streak: u32) -> StoreResult<RankingEntry> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get(&user.id)
            .cloned()
            .unwrap_or_default()
            .with_win(&user.id, streak);
        entries.insert(user.id.clone(), entry.clone());
        Ok(entry)
    }

    async fn leaderboard(&self, limit: usize) -> StoreResult<Vec<LeaderboardEntry>> {
        let mut ranked: Vec<RankingEntry> = self.entries.read().await.values().cloned().collect();
        ranked.sort_by(|a, b| {
            b.total_wins
                .cmp(&a.total_wins)
                .then(b.best_streak.cmp(&a.best_streak))
                .then(a.user_id.cmp(&b.user_id))
        });
        ranked.truncate(limit);

        let profiles = self.profiles.read().await;
        Ok(ranked
            .into_iter()
            .map(|ranking| LeaderboardEntry {
                profile: profiles.get(&ranking.user_id).cloned(),
                ranking,
            })
            .collect())
    }

    async fn find_profile(&self, user: &AuthUser) -> StoreResult<Option<UserProfile>> {
        Ok(self.profiles.read().await.get(&user.id).cloned())
    }
}
