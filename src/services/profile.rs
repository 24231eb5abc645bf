use crate::config::ScoringTables;
use crate::models::{
    MatchScoreDetail, RankContext, ScoreCategory, SuccessRates, UserScoringProfile,
};
use crate::services::levels::calculate_level;
use crate::utils::{percentage, round1};

/// Inputs for folding a user's history into a profile.
#[derive(Debug, Clone, Copy)]
pub struct ProfileInput<'a> {
    pub user_id: &'a str,
    pub total_points: f64,
    /// Newest first.
    pub history: &'a [MatchScoreDetail],
    pub current_streak: u32,
    pub best_streak: u32,
    pub ranking: RankContext,
}

fn hit_rate(history: &[MatchScoreDetail], category: ScoreCategory) -> f64 {
    let hits = history
        .iter()
        .filter(|detail| detail.category(category).points > 0.0)
        .count();
    round1(percentage(hits as f64, history.len() as f64))
}

/// Per-category success percentages over the given history.
///
/// The squad rate back-derives a correct-player count from stored base points
/// and divides by an assumed squad size, so it is an approximation when real
/// squads differ from that size.
pub fn calculate_success_rates(history: &[MatchScoreDetail], tables: &ScoringTables) -> SuccessRates {
    if history.is_empty() {
        return SuccessRates::default();
    }

    let per_player = tables.squad.per_player;
    let estimated_correct_players: f64 = if per_player > 0.0 {
        history
            .iter()
            .map(|detail| (detail.squad_players.base_points / per_player).round())
            .sum()
    } else {
        0.0
    };
    let squad_slots = tables.profile.assumed_squad_size as f64 * history.len() as f64;

    let formation_hits = history
        .iter()
        .filter(|d| d.attack_formation.points > 0.0 || d.defense_formation.points > 0.0)
        .count();

    let attempted: usize = history.iter().map(|d| d.player_predictions.len()).sum();
    let correct: usize = history.iter().map(|d| d.correct_player_predictions()).sum();

    SuccessRates {
        score: hit_rate(history, ScoreCategory::ExactScore),
        total_goals: hit_rate(history, ScoreCategory::TotalGoals),
        squad: round1(percentage(estimated_correct_players, squad_slots)),
        formation: round1(percentage(formation_hits as f64, history.len() as f64)),
        player_predictions: round1(percentage(correct as f64, attempted as f64)),
    }
}

/// Share of the population ranked at or above `rank`, e.g. rank 5 of 100 is
/// the top 5%.
pub fn top_percentile(rank: Option<u32>, total_players: u32) -> f64 {
    match rank {
        Some(rank) if rank > 0 && total_players > 0 => {
            round1(percentage(rank as f64, total_players as f64))
        }
        _ => 0.0,
    }
}

/// Updated `(current, best)` streak after a scored match. Any non-wrong score
/// tier extends the streak.
pub fn next_streak(current_streak: u32, best_streak: u32, detail: &MatchScoreDetail) -> (u32, u32) {
    let current = if detail.score_correct.tier.is_hit() {
        current_streak + 1
    } else {
        0
    };
    (current, best_streak.max(current))
}

pub fn build_user_profile(input: ProfileInput<'_>, tables: &ScoringTables) -> UserScoringProfile {
    let level = calculate_level(input.total_points, &tables.levels);
    let success_rates = calculate_success_rates(input.history, tables);
    let recent_matches = input
        .history
        .iter()
        .take(tables.profile.recent_matches)
        .cloned()
        .collect();

    // Prefer the regional rank for the percentile, it is the one users see first.
    let percentile_rank = input.ranking.region_rank.or(input.ranking.world_rank);

    UserScoringProfile {
        user_id: input.user_id.to_string(),
        total_points: round1(input.total_points),
        level,
        region_rank: input.ranking.region_rank,
        world_rank: input.ranking.world_rank,
        total_players: input.ranking.total_players,
        top_percentile: top_percentile(percentile_rank, input.ranking.total_players),
        success_rates,
        current_streak: input.current_streak,
        best_streak: input.best_streak.max(input.current_streak),
        matches_played: input.history.len(),
        recent_matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisFocus, PlayerEvent, PlayerPrediction, PredictionType, ScoreLine};
    use crate::services::scoring_engine::tests::score_only_input;
    use crate::services::ScoringEngine;

    fn history(engine: &ScoringEngine, hits: usize, misses: usize) -> Vec<MatchScoreDetail> {
        let mut details = Vec::new();
        for i in 0..hits {
            let input = score_only_input(&format!("hit{}", i), ScoreLine::new(1, 0), ScoreLine::new(1, 0), AnalysisFocus::Balanced);
            details.push(engine.calculate_match_score(&input));
        }
        for i in 0..misses {
            let input = score_only_input(&format!("miss{}", i), ScoreLine::new(0, 2), ScoreLine::new(1, 0), AnalysisFocus::Balanced);
            details.push(engine.calculate_match_score(&input));
        }
        details
    }

    #[test]
    fn test_empty_history_has_zero_rates() {
        let rates = calculate_success_rates(&[], &ScoringTables::default());
        assert_eq!(rates, SuccessRates::default());
    }

    #[test]
    fn test_score_rate() {
        let engine = ScoringEngine::default();
        let details = history(&engine, 3, 1);
        let rates = calculate_success_rates(&details, engine.tables());
        assert_eq!(rates.score, 75.0);
        assert_eq!(rates.total_goals, 0.0);
        assert_eq!(rates.player_predictions, 0.0);
    }

    #[test]
    fn test_squad_rate_assumes_eleven_players() {
        let engine = ScoringEngine::default();
        let squad: Vec<String> = (1..=11).map(|i| format!("p{}", i)).collect();
        let mut input = score_only_input("m", ScoreLine::new(1, 0), ScoreLine::new(1, 0), AnalysisFocus::Squad);
        input.actual.squad = squad.clone();
        input.prediction.squad = squad[..6].to_vec();

        let detail = engine.calculate_match_score(&input);
        let rates = calculate_success_rates(&[detail], engine.tables());
        assert_eq!(rates.squad, round1(6.0 / 11.0 * 100.0));
    }

    #[test]
    fn test_player_rate() {
        let engine = ScoringEngine::default();
        let mut input = score_only_input("m", ScoreLine::new(1, 0), ScoreLine::new(1, 0), AnalysisFocus::Attack);
        input.prediction.player_predictions = vec![
            PlayerPrediction { player_id: "a".into(), prediction_type: PredictionType::Goal },
            PlayerPrediction { player_id: "b".into(), prediction_type: PredictionType::Goal },
            PlayerPrediction { player_id: "c".into(), prediction_type: PredictionType::Assist },
            PlayerPrediction { player_id: "d".into(), prediction_type: PredictionType::RedCard },
        ];
        input.actual.events = vec![PlayerEvent { player_id: "a".into(), event_type: PredictionType::Goal }];

        let detail = engine.calculate_match_score(&input);
        let rates = calculate_success_rates(&[detail], engine.tables());
        assert_eq!(rates.player_predictions, 25.0);
    }

    #[test]
    fn test_next_streak() {
        let engine = ScoringEngine::default();
        let details = history(&engine, 1, 1);
        assert_eq!(next_streak(4, 6, &details[0]), (5, 6));
        assert_eq!(next_streak(6, 6, &details[0]), (7, 7));
        assert_eq!(next_streak(6, 9, &details[1]), (0, 9));
    }

    #[test]
    fn test_top_percentile() {
        assert_eq!(top_percentile(Some(5), 100), 5.0);
        assert_eq!(top_percentile(Some(1), 3), 33.3);
        assert_eq!(top_percentile(Some(5), 0), 0.0);
        assert_eq!(top_percentile(None, 100), 0.0);
    }

    #[test]
    fn test_profile_keeps_ten_recent_matches() {
        let engine = ScoringEngine::default();
        let details = history(&engine, 8, 7);
        let profile = build_user_profile(
            ProfileInput {
                user_id: "u1",
                total_points: 420.0,
                history: &details,
                current_streak: 2,
                best_streak: 6,
                ranking: RankContext {
                    region_rank: Some(12),
                    world_rank: Some(3400),
                    total_players: 240,
                },
            },
            engine.tables(),
        );

        assert_eq!(profile.matches_played, 15);
        assert_eq!(profile.recent_matches.len(), 10);
        assert_eq!(profile.recent_matches[0].match_id, "hit0");
        assert_eq!(profile.level.level, 3);
        assert_eq!(profile.level.title, "Semi-Pro");
        assert_eq!(profile.level.progress, 40.0);
        assert_eq!(profile.top_percentile, 5.0);
        assert_eq!(profile.best_streak, 6);
        assert_eq!(profile.success_rates.score, round1(8.0 / 15.0 * 100.0));
    }

    #[test]
    fn test_profile_with_no_history() {
        let profile = build_user_profile(
            ProfileInput {
                user_id: "new",
                total_points: 0.0,
                history: &[],
                current_streak: 0,
                best_streak: 0,
                ranking: RankContext::default(),
            },
            &ScoringTables::default(),
        );
        assert_eq!(profile.level.level, 1);
        assert!(profile.recent_matches.is_empty());
        assert_eq!(profile.success_rates, SuccessRates::default());
        assert_eq!(profile.top_percentile, 0.0);
    }
}
