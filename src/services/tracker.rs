use chrono::Utc;

use crate::db::{MatchHistoryStore, ProfileStore, ScoreStore};
use crate::error::StoreError;
use crate::models::{MatchScoreDetail, MatchScoreInput, RankContext, StoredProfile, UserScoringProfile};
use crate::services::profile::{build_user_profile, next_streak, ProfileInput};
use crate::services::ScoringEngine;

/// Score a finished match for a user, append it to their history and roll the
/// totals and streaks forward. The store runs all of it as one unit.
pub async fn record_match<S: ScoreStore + ?Sized>(
    store: &S,
    engine: &ScoringEngine,
    user_id: &str,
    input: &MatchScoreInput,
) -> Result<MatchScoreDetail, StoreError> {
    let (detail, updated) = store
        .record_with(user_id, &|profile: StoredProfile| {
            let detail = engine.calculate_for_profile(&profile, input);
            let (current_streak, best_streak) =
                next_streak(profile.current_streak, profile.best_streak, &detail);
            let updated = StoredProfile {
                total_points: profile.total_points + detail.total_score,
                current_streak,
                best_streak,
                updated_at: Utc::now(),
                ..profile
            };
            (detail, updated)
        })
        .await?;

    tracing::info!(
        "Recorded match {} for {}: {:.1} pts (total {:.1}, streak {})",
        detail.match_id,
        user_id,
        detail.total_score,
        updated.total_points,
        updated.current_streak
    );

    Ok(detail)
}

/// Store externally computed leaderboard position on the user's profile.
pub async fn update_ranking<S: ScoreStore + ?Sized>(
    store: &S,
    user_id: &str,
    ranking: RankContext,
) -> Result<StoredProfile, StoreError> {
    store.set_ranking(user_id, &ranking).await
}

/// Fold the stored history into a profile. `None` for unknown users.
pub async fn load_user_profile<S: ScoreStore + ?Sized>(
    store: &S,
    engine: &ScoringEngine,
    user_id: &str,
) -> Result<Option<UserScoringProfile>, StoreError> {
    let Some(profile) = store.get_profile(user_id).await? else {
        return Ok(None);
    };
    let history = store.list_matches(user_id, None).await?;

    Ok(Some(build_user_profile(
        ProfileInput {
            user_id,
            total_points: profile.total_points,
            history: &history,
            current_streak: profile.current_streak,
            best_streak: profile.best_streak,
            ranking: profile.ranking,
        },
        engine.tables(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{AnalysisFocus, ScoreLine};
    use crate::services::scoring_engine::tests::score_only_input;

    #[tokio::test]
    async fn test_streak_builds_into_bonus() {
        let store = MemoryStore::new();
        let engine = ScoringEngine::default();

        let mut totals = Vec::new();
        for i in 0..4 {
            let input = score_only_input(&format!("m{}", i), ScoreLine::new(2, 0), ScoreLine::new(2, 0), AnalysisFocus::Attack);
            let detail = record_match(&store, &engine, "fan", &input).await.unwrap();
            totals.push(detail.total_score);
        }
        // Fourth match is played on a streak of three.
        assert_eq!(totals, vec![10.0, 10.0, 10.0, 15.0]);

        let stored = store.get_profile("fan").await.unwrap().unwrap();
        assert_eq!(stored.total_points, 45.0);
        assert_eq!(stored.current_streak, 4);
        assert_eq!(stored.best_streak, 4);

        let miss = score_only_input("m9", ScoreLine::new(0, 3), ScoreLine::new(2, 0), AnalysisFocus::Attack);
        record_match(&store, &engine, "fan", &miss).await.unwrap();
        let stored = store.get_profile("fan").await.unwrap().unwrap();
        assert_eq!(stored.current_streak, 0);
        assert_eq!(stored.best_streak, 4);
    }

    #[tokio::test]
    async fn test_load_profile() {
        let store = MemoryStore::new();
        let engine = ScoringEngine::default();
        assert!(load_user_profile(&store, &engine, "ghost").await.unwrap().is_none());

        let input = score_only_input("m1", ScoreLine::new(1, 0), ScoreLine::new(1, 0), AnalysisFocus::Score);
        record_match(&store, &engine, "fan", &input).await.unwrap();
        update_ranking(
            &store,
            "fan",
            RankContext {
                region_rank: Some(2),
                world_rank: None,
                total_players: 40,
            },
        )
        .await
        .unwrap();

        let profile = load_user_profile(&store, &engine, "fan").await.unwrap().unwrap();
        assert_eq!(profile.total_points, 20.0);
        assert_eq!(profile.matches_played, 1);
        assert_eq!(profile.success_rates.score, 100.0);
        assert_eq!(profile.top_percentile, 5.0);
        assert_eq!(profile.current_streak, 1);
    }
}
