use crate::config::ScoringTables;
use crate::models::{
    CategoryScore, MatchScoreDetail, MatchScoreInput, ScoreCategory, StoredProfile,
};
use crate::services::comparators::{
    compare_formation, compare_score, compare_squad, compare_total_goals, Comparison, FormationSide,
};
use crate::services::modifiers::{apply_focus_multiplier, streak_bonus, time_bonus_multiplier};
use crate::services::player_events::score_player_predictions;
use crate::utils::round1;

/// `round((base + players) × time + streak, 1dp)`. Shared by scoring and
/// recomputation so both produce the same bits.
pub fn compose_total(
    subtotal_base: f64,
    subtotal_player_predictions: f64,
    time_bonus_multiplier: f64,
    streak_bonus: f64,
) -> f64 {
    round1((subtotal_base + subtotal_player_predictions) * time_bonus_multiplier + streak_bonus)
}

/// Recompute a stored detail's total from its own subtotals.
pub fn recompute_total(detail: &MatchScoreDetail) -> f64 {
    compose_total(
        detail.subtotal_base,
        detail.subtotal_player_predictions,
        detail.time_bonus_multiplier,
        detail.streak_bonus,
    )
}

pub struct ScoringEngine {
    tables: ScoringTables,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ScoringTables::default())
    }
}

impl ScoringEngine {
    pub fn new(tables: ScoringTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &ScoringTables {
        &self.tables
    }

    fn category(&self, comparison: Comparison, category: ScoreCategory, input: &MatchScoreInput) -> CategoryScore {
        CategoryScore {
            tier: comparison.tier,
            base_points: comparison.points,
            points: apply_focus_multiplier(comparison.points, category, input.focus, &self.tables.focus),
        }
    }

    /// Score one match: comparators, focus, player predictions, then time and
    /// streak modifiers.
    pub fn calculate_match_score(&self, input: &MatchScoreInput) -> MatchScoreDetail {
        let tables = &self.tables;
        let prediction = &input.prediction;
        let actual = &input.actual;

        let score_correct = self.category(
            compare_score(prediction.score, actual.score, &tables.score),
            ScoreCategory::ExactScore,
            input,
        );
        let total_goals = self.category(
            compare_total_goals(prediction.total_goals, actual.total_goals(), &tables.total_goals),
            ScoreCategory::TotalGoals,
            input,
        );

        let squad = compare_squad(&prediction.squad, &actual.squad, &tables.squad);
        let squad_players = self.category(
            Comparison {
                tier: squad.tier,
                points: squad.points,
            },
            ScoreCategory::SquadPlayers,
            input,
        );

        let attack_formation = self.category(
            compare_formation(
                &prediction.attack_formation,
                &actual.attack_formation,
                FormationSide::Attack,
                tables,
            ),
            ScoreCategory::AttackFormation,
            input,
        );
        let defense_formation = self.category(
            compare_formation(
                &prediction.defense_formation,
                &actual.defense_formation,
                FormationSide::Defense,
                tables,
            ),
            ScoreCategory::DefenseFormation,
            input,
        );

        let player_predictions = score_player_predictions(
            &prediction.player_predictions,
            &actual.events,
            input.focus,
            tables,
        );

        let subtotal_base = score_correct.points
            + total_goals.points
            + squad_players.points
            + attack_formation.points
            + defense_formation.points;
        let subtotal_player_predictions: f64 = player_predictions.iter().map(|p| p.points).sum();

        let time_bonus_multiplier = time_bonus_multiplier(&input.timing, &tables.time_bonus);
        let streak_bonus = streak_bonus(input.current_streak, &tables.streak_tiers);

        let base_total = subtotal_base + subtotal_player_predictions;
        let total_score = compose_total(
            subtotal_base,
            subtotal_player_predictions,
            time_bonus_multiplier,
            streak_bonus,
        );
        let subtotal_bonuses = base_total * (time_bonus_multiplier - 1.0) + streak_bonus;

        tracing::debug!(
            "Scored match {}: base {:.1}, players {:.1}, time x{:.2}, streak +{:.1} => {:.1}",
            input.match_id,
            subtotal_base,
            subtotal_player_predictions,
            time_bonus_multiplier,
            streak_bonus,
            total_score
        );

        MatchScoreDetail {
            match_id: input.match_id.clone(),
            focus: input.focus,
            score_correct,
            total_goals,
            squad_players,
            attack_formation,
            defense_formation,
            squad_correct_count: squad.correct,
            squad_predicted_count: squad.predicted,
            player_predictions,
            focus_multiplier: tables.focus.rule(input.focus).multiplier,
            time_bonus_multiplier,
            streak_bonus,
            subtotal_base,
            subtotal_player_predictions,
            subtotal_bonuses,
            total_score,
        }
    }

    /// Score a match for a stored user, using their current streak instead of
    /// whatever the caller supplied.
    pub fn calculate_for_profile(&self, profile: &StoredProfile, input: &MatchScoreInput) -> MatchScoreDetail {
        let input = MatchScoreInput {
            current_streak: profile.current_streak,
            ..input.clone()
        };
        self.calculate_match_score(&input)
    }
}
