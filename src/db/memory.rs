use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{MatchHistoryStore, ProfileStore, RecordUpdate, ScoreStore};
use crate::error::StoreError;
use crate::models::{MatchScoreDetail, RankContext, StoredProfile};

/// In-process store for tests and ephemeral servers.
#[derive(Default)]
pub struct MemoryStore {
    profiles: RwLock<HashMap<String, StoredProfile>>,
    // Oldest first; reversed on read. Always locked after `profiles`.
    history: RwLock<HashMap<String, Vec<MatchScoreDetail>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<StoredProfile>, StoreError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn set_ranking(&self, user_id: &str, ranking: &RankContext) -> Result<StoredProfile, StoreError> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .entry(user_id.to_string())
            .or_insert_with(|| StoredProfile::new(user_id));
        profile.ranking = *ranking;
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }
}

#[async_trait]
impl MatchHistoryStore for MemoryStore {
    async fn list_matches(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<MatchScoreDetail>, StoreError> {
        let history = self.history.read().await;
        let Some(matches) = history.get(user_id) else {
            return Ok(Vec::new());
        };

        let take = match limit {
            Some(limit) if limit >= 0 => limit as usize,
            _ => usize::MAX,
        };
        Ok(matches.iter().rev().take(take).cloned().collect())
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn record_with(
        &self,
        user_id: &str,
        update: &RecordUpdate<'_>,
    ) -> Result<(MatchScoreDetail, StoredProfile), StoreError> {
        let mut profiles = self.profiles.write().await;
        let mut history = self.history.write().await;

        let profile = profiles
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| StoredProfile::new(user_id));
        let (detail, updated) = update(profile);

        history
            .entry(user_id.to_string())
            .or_default()
            .push(detail.clone());
        profiles.insert(user_id.to_string(), updated.clone());

        Ok((detail, updated))
    }
}
