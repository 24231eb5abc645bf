use crate::config::{FocusTable, StreakTier, TimeBonusTable};
use crate::models::{AnalysisFocus, MatchTiming, ScoreKey};
use crate::utils::hours_between;

/// Multiply `base_points` by the focus multiplier when the focus covers `key`.
pub fn apply_focus_multiplier(
    base_points: f64,
    key: impl Into<ScoreKey>,
    focus: AnalysisFocus,
    table: &FocusTable,
) -> f64 {
    let rule = table.rule(focus);
    if rule.scope.contains(key.into()) {
        base_points * rule.multiplier
    } else {
        base_points
    }
}

/// Penalty inside the last hours before kickoff, bonus for predicting before
/// the lineup is announced, neutral otherwise. Penalty wins when both apply.
pub fn time_bonus_multiplier(timing: &MatchTiming, table: &TimeBonusTable) -> f64 {
    let hours_before_kickoff = hours_between(timing.predicted_at, timing.match_started_at);

    if hours_before_kickoff <= table.penalty_window_hours {
        return table.penalty_multiplier;
    }

    match timing.lineup_announced_at {
        Some(lineup_at) if timing.predicted_at < lineup_at => table.pre_lineup_multiplier,
        _ => table.neutral_multiplier,
    }
}

/// Additive bonus for the highest streak tier reached. Tiers do not stack.
pub fn streak_bonus(current_streak: u32, tiers: &[StreakTier]) -> f64 {
    tiers
        .iter()
        .filter(|tier| current_streak >= tier.min_streak)
        .max_by_key(|tier| tier.min_streak)
        .map_or(0.0, |tier| tier.bonus)
}
