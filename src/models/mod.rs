use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-match emphasis the user picks when submitting a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnalysisFocus {
    Attack,
    Defense,
    Balanced,
    Score,
    Squad,
}

impl AnalysisFocus {
    pub const ALL: [AnalysisFocus; 5] = [
        AnalysisFocus::Attack,
        AnalysisFocus::Defense,
        AnalysisFocus::Balanced,
        AnalysisFocus::Score,
        AnalysisFocus::Squad,
    ];
}

/// Match-level point categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoreCategory {
    ExactScore,
    TotalGoals,
    SquadPlayers,
    AttackFormation,
    DefenseFormation,
}

/// Player-level prediction types. Also used as the event type of actual match events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PredictionType {
    Goal,
    Assist,
    YellowCard,
    RedCard,
    SubstitutedOut,
    ManOfTheMatch,
    PenaltyTaker,
    PenaltyScored,
    PenaltyMissed,
}

/// Anything an analysis focus can amplify.
///
/// Serialized as the bare camelCase key, e.g. `"attackFormation"` or `"goal"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreKey {
    Category(ScoreCategory),
    Prediction(PredictionType),
}

impl From<ScoreCategory> for ScoreKey {
    fn from(category: ScoreCategory) -> Self {
        ScoreKey::Category(category)
    }
}

impl From<PredictionType> for ScoreKey {
    fn from(prediction_type: PredictionType) -> Self {
        ScoreKey::Prediction(prediction_type)
    }
}

/// Classification attached to every scored category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoreTier {
    Exact,
    GoalDifference,
    Winner,
    Close,
    Similar,
    Partial,
    Wrong,
}

impl ScoreTier {
    pub fn is_hit(&self) -> bool {
        !matches!(self, ScoreTier::Wrong)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreLine {
    pub home: u32,
    pub away: u32,
}

impl ScoreLine {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    /// Saturates instead of overflowing on absurd input.
    pub fn total(&self) -> u32 {
        self.home.saturating_add(self.away)
    }

    pub fn goal_difference(&self) -> i64 {
        self.home as i64 - self.away as i64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPrediction {
    pub player_id: String,
    pub prediction_type: PredictionType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEvent {
    pub player_id: String,
    pub event_type: PredictionType,
}

/// What the user submitted before kickoff.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchPrediction {
    pub score: ScoreLine,
    pub total_goals: u32,
    pub squad: Vec<String>,
    pub attack_formation: String,
    pub defense_formation: String,
    pub player_predictions: Vec<PlayerPrediction>,
}

/// Ground truth once the match is over.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActualOutcome {
    pub score: ScoreLine,
    pub squad: Vec<String>,
    pub attack_formation: String,
    pub defense_formation: String,
    pub events: Vec<PlayerEvent>,
}

impl ActualOutcome {
    pub fn total_goals(&self) -> u32 {
        self.score.total()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchTiming {
    pub predicted_at: DateTime<Utc>,
    #[serde(default)]
    pub lineup_announced_at: Option<DateTime<Utc>>,
    pub match_started_at: DateTime<Utc>,
}

/// Everything needed to score a single match for a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchScoreInput {
    pub match_id: String,
    pub prediction: MatchPrediction,
    pub actual: ActualOutcome,
    pub focus: AnalysisFocus,
    pub timing: MatchTiming,
    #[serde(default)]
    pub current_streak: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub tier: ScoreTier,
    /// Points before the focus multiplier.
    pub base_points: f64,
    /// Points after the focus multiplier.
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPredictionResult {
    pub player_id: String,
    pub prediction_type: PredictionType,
    pub correct: bool,
    pub base_points: f64,
    pub points: f64,
}

/// Full per-match breakdown. Persisted by callers as history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchScoreDetail {
    pub match_id: String,
    pub focus: AnalysisFocus,

    pub score_correct: CategoryScore,
    pub total_goals: CategoryScore,
    pub squad_players: CategoryScore,
    pub attack_formation: CategoryScore,
    pub defense_formation: CategoryScore,

    pub squad_correct_count: u32,
    pub squad_predicted_count: u32,

    pub player_predictions: Vec<PlayerPredictionResult>,

    pub focus_multiplier: f64,
    pub time_bonus_multiplier: f64,
    pub streak_bonus: f64,

    pub subtotal_base: f64,
    pub subtotal_player_predictions: f64,
    /// Net points contributed by the time multiplier plus the streak bonus.
    pub subtotal_bonuses: f64,

    pub total_score: f64,
}

impl MatchScoreDetail {
    pub fn category(&self, category: ScoreCategory) -> &CategoryScore {
        match category {
            ScoreCategory::ExactScore => &self.score_correct,
            ScoreCategory::TotalGoals => &self.total_goals,
            ScoreCategory::SquadPlayers => &self.squad_players,
            ScoreCategory::AttackFormation => &self.attack_formation,
            ScoreCategory::DefenseFormation => &self.defense_formation,
        }
    }

    pub fn correct_player_predictions(&self) -> usize {
        self.player_predictions.iter().filter(|p| p.correct).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
    pub level: u32,
    pub title: String,
    pub color: String,
    /// 0-100 progress through the current tier.
    pub progress: f64,
    /// 0 on the terminal tier.
    pub points_to_next_level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessRates {
    pub score: f64,
    pub total_goals: f64,
    /// Derived from an assumed fixed squad size, so only an approximation.
    pub squad: f64,
    pub formation: f64,
    pub player_predictions: f64,
}

/// Leaderboard position supplied by the ranking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RankContext {
    pub region_rank: Option<u32>,
    pub world_rank: Option<u32>,
    pub total_players: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserScoringProfile {
    pub user_id: String,
    pub total_points: f64,
    pub level: LevelInfo,
    pub region_rank: Option<u32>,
    pub world_rank: Option<u32>,
    pub total_players: u32,
    pub top_percentile: f64,
    pub success_rates: SuccessRates,
    pub current_streak: u32,
    pub best_streak: u32,
    pub matches_played: usize,
    pub recent_matches: Vec<MatchScoreDetail>,
}

/// Persisted per-user running totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProfile {
    pub user_id: String,
    pub total_points: f64,
    pub current_streak: u32,
    pub best_streak: u32,
    #[serde(flatten)]
    pub ranking: RankContext,
    pub updated_at: DateTime<Utc>,
}

impl StoredProfile {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            total_points: 0.0,
            current_streak: 0,
            best_streak: 0,
            ranking: RankContext::default(),
            updated_at: Utc::now(),
        }
    }
}

// API Response types
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_key_uses_bare_camel_case_names() {
        let key: ScoreKey = serde_json::from_str("\"attackFormation\"").unwrap();
        assert_eq!(key, ScoreKey::Category(ScoreCategory::AttackFormation));

        let key: ScoreKey = serde_json::from_str("\"manOfTheMatch\"").unwrap();
        assert_eq!(key, ScoreKey::Prediction(PredictionType::ManOfTheMatch));

        assert_eq!(
            serde_json::to_string(&ScoreKey::from(PredictionType::YellowCard)).unwrap(),
            "\"yellowCard\""
        );
    }

    #[test]
    fn test_score_key_serializes_like_its_category() {
        for category in [
            ScoreCategory::ExactScore,
            ScoreCategory::TotalGoals,
            ScoreCategory::SquadPlayers,
            ScoreCategory::AttackFormation,
            ScoreCategory::DefenseFormation,
        ] {
            assert_eq!(
                serde_json::to_string(&ScoreKey::from(category)).unwrap(),
                serde_json::to_string(&category).unwrap()
            );
        }
    }

    #[test]
    fn test_score_line_total_saturates() {
        assert_eq!(ScoreLine::new(2, 1).total(), 3);
        assert_eq!(ScoreLine::new(u32::MAX, 1).total(), u32::MAX);
        assert_eq!(ScoreLine::new(u32::MAX, 0).goal_difference(), u32::MAX as i64);
    }

    #[test]
    fn test_prediction_defaults_fill_missing_fields() {
        let prediction: MatchPrediction =
            serde_json::from_str(r#"{"score":{"home":2,"away":1}}"#).unwrap();
        assert_eq!(prediction.score, ScoreLine::new(2, 1));
        assert!(prediction.squad.is_empty());
        assert!(prediction.attack_formation.is_empty());
    }
}
