use serde::{Deserialize, Deserializer, Serialize};
use std::env;
use std::path::Path;

use crate::error::ConfigError;
use crate::models::{AnalysisFocus, PredictionType, ScoreCategory, ScoreKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreTable {
    pub exact: f64,
    pub goal_difference: f64,
    pub winner: f64,
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self {
            exact: 10.0,
            goal_difference: 6.0,
            winner: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TotalGoalsTable {
    pub exact: f64,
    /// Awarded when the guess is off by exactly one goal.
    pub close: f64,
}

impl Default for TotalGoalsTable {
    fn default() -> Self {
        Self {
            exact: 5.0,
            close: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SquadTable {
    pub per_player: f64,
}

impl Default for SquadTable {
    fn default() -> Self {
        Self { per_player: 0.5 }
    }
}

/// Attack and defense default differently, so partial overrides are merged
/// per side in `ScoringTables`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormationTable {
    pub exact: f64,
    /// Same base shape (first token), different full formation.
    pub similar: f64,
}

impl FormationTable {
    pub fn attack() -> Self {
        Self {
            exact: 5.0,
            similar: 2.5,
        }
    }

    pub fn defense() -> Self {
        Self {
            exact: 4.0,
            similar: 2.0,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormationTablePatch {
    exact: Option<f64>,
    similar: Option<f64>,
}

impl FormationTablePatch {
    fn apply(self, base: FormationTable) -> FormationTable {
        FormationTable {
            exact: self.exact.unwrap_or(base.exact),
            similar: self.similar.unwrap_or(base.similar),
        }
    }
}

fn attack_formation<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FormationTable, D::Error> {
    Ok(FormationTablePatch::deserialize(deserializer)?.apply(FormationTable::attack()))
}

fn defense_formation<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FormationTable, D::Error> {
    Ok(FormationTablePatch::deserialize(deserializer)?.apply(FormationTable::defense()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerPointTable {
    pub goal: f64,
    pub assist: f64,
    pub yellow_card: f64,
    pub red_card: f64,
    pub substituted_out: f64,
    pub man_of_the_match: f64,
    pub penalty_taker: f64,
    pub penalty_scored: f64,
    pub penalty_missed: f64,
}

impl Default for PlayerPointTable {
    fn default() -> Self {
        Self {
            goal: 5.0,
            assist: 4.0,
            yellow_card: 2.0,
            red_card: 5.0,
            substituted_out: 2.0,
            man_of_the_match: 8.0,
            penalty_taker: 3.0,
            penalty_scored: 4.0,
            penalty_missed: 5.0,
        }
    }
}

impl PlayerPointTable {
    pub fn points(&self, prediction_type: PredictionType) -> f64 {
        match prediction_type {
            PredictionType::Goal => self.goal,
            PredictionType::Assist => self.assist,
            PredictionType::YellowCard => self.yellow_card,
            PredictionType::RedCard => self.red_card,
            PredictionType::SubstitutedOut => self.substituted_out,
            PredictionType::ManOfTheMatch => self.man_of_the_match,
            PredictionType::PenaltyTaker => self.penalty_taker,
            PredictionType::PenaltyScored => self.penalty_scored,
            PredictionType::PenaltyMissed => self.penalty_missed,
        }
    }

    fn values(&self) -> [f64; 9] {
        [
            self.goal,
            self.assist,
            self.yellow_card,
            self.red_card,
            self.substituted_out,
            self.man_of_the_match,
            self.penalty_taker,
            self.penalty_scored,
            self.penalty_missed,
        ]
    }
}

/// Which keys a focus amplifies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FocusScope {
    All,
    Only(Vec<ScoreKey>),
}

impl FocusScope {
    pub fn contains(&self, key: ScoreKey) -> bool {
        match self {
            FocusScope::All => true,
            FocusScope::Only(keys) => keys.contains(&key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusRule {
    pub multiplier: f64,
    pub scope: FocusScope,
}

/// Missing rules, and missing fields within a rule, keep that focus's default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "FocusTablePatch")]
pub struct FocusTable {
    pub attack: FocusRule,
    pub defense: FocusRule,
    pub balanced: FocusRule,
    pub score: FocusRule,
    pub squad: FocusRule,
}

impl Default for FocusTable {
    fn default() -> Self {
        use PredictionType as P;
        use ScoreCategory as C;

        let only = |keys: Vec<ScoreKey>| FocusScope::Only(keys);

        Self {
            attack: FocusRule {
                multiplier: 1.5,
                scope: only(vec![
                    C::AttackFormation.into(),
                    P::Goal.into(),
                    P::Assist.into(),
                    P::PenaltyScored.into(),
                ]),
            },
            defense: FocusRule {
                multiplier: 1.5,
                scope: only(vec![
                    C::DefenseFormation.into(),
                    P::YellowCard.into(),
                    P::RedCard.into(),
                    P::PenaltyMissed.into(),
                ]),
            },
            balanced: FocusRule {
                multiplier: 1.2,
                scope: FocusScope::All,
            },
            score: FocusRule {
                multiplier: 2.0,
                scope: only(vec![C::ExactScore.into(), C::TotalGoals.into()]),
            },
            squad: FocusRule {
                multiplier: 1.8,
                scope: only(vec![
                    C::SquadPlayers.into(),
                    P::SubstitutedOut.into(),
                    P::ManOfTheMatch.into(),
                    P::PenaltyTaker.into(),
                ]),
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FocusRulePatch {
    multiplier: Option<f64>,
    scope: Option<FocusScope>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FocusTablePatch {
    attack: Option<FocusRulePatch>,
    defense: Option<FocusRulePatch>,
    balanced: Option<FocusRulePatch>,
    score: Option<FocusRulePatch>,
    squad: Option<FocusRulePatch>,
}

impl From<FocusTablePatch> for FocusTable {
    fn from(patch: FocusTablePatch) -> Self {
        let defaults = FocusTable::default();
        let merge = |rule: Option<FocusRulePatch>, base: FocusRule| match rule {
            Some(rule) => FocusRule {
                multiplier: rule.multiplier.unwrap_or(base.multiplier),
                scope: rule.scope.unwrap_or(base.scope),
            },
            None => base,
        };

        Self {
            attack: merge(patch.attack, defaults.attack),
            defense: merge(patch.defense, defaults.defense),
            balanced: merge(patch.balanced, defaults.balanced),
            score: merge(patch.score, defaults.score),
            squad: merge(patch.squad, defaults.squad),
        }
    }
}

impl FocusTable {
    pub fn rule(&self, focus: AnalysisFocus) -> &FocusRule {
        match focus {
            AnalysisFocus::Attack => &self.attack,
            AnalysisFocus::Defense => &self.defense,
            AnalysisFocus::Balanced => &self.balanced,
            AnalysisFocus::Score => &self.score,
            AnalysisFocus::Squad => &self.squad,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeBonusTable {
    /// Predictions made this close to kickoff (or later) are penalised.
    pub penalty_window_hours: f64,
    pub penalty_multiplier: f64,
    pub pre_lineup_multiplier: f64,
    pub neutral_multiplier: f64,
}

impl Default for TimeBonusTable {
    fn default() -> Self {
        Self {
            penalty_window_hours: 2.0,
            penalty_multiplier: 0.8,
            pre_lineup_multiplier: 1.2,
            neutral_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakTier {
    pub min_streak: u32,
    pub bonus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelThreshold {
    pub level: u32,
    pub min_points: f64,
    /// `None` marks the open-ended terminal tier.
    pub max_points: Option<f64>,
    pub title: String,
    pub color: String,
}

impl LevelThreshold {
    fn new(level: u32, min_points: f64, max_points: Option<f64>, title: &str, color: &str) -> Self {
        Self {
            level,
            min_points,
            max_points,
            title: title.to_string(),
            color: color.to_string(),
        }
    }
}

pub fn default_levels() -> Vec<LevelThreshold> {
    vec![
        LevelThreshold::new(1, 0.0, Some(100.0), "Rookie", "#9CA3AF"),
        LevelThreshold::new(2, 100.0, Some(300.0), "Amateur", "#22C55E"),
        LevelThreshold::new(3, 300.0, Some(600.0), "Semi-Pro", "#3B82F6"),
        LevelThreshold::new(4, 600.0, Some(1000.0), "Professional", "#8B5CF6"),
        LevelThreshold::new(5, 1000.0, Some(1500.0), "Expert", "#F59E0B"),
        LevelThreshold::new(6, 1500.0, Some(2500.0), "Master", "#EF4444"),
        LevelThreshold::new(7, 2500.0, None, "Legend", "#FFD700"),
    ]
}

pub fn default_streak_tiers() -> Vec<StreakTier> {
    vec![
        StreakTier { min_streak: 3, bonus: 5.0 },
        StreakTier { min_streak: 5, bonus: 10.0 },
        StreakTier { min_streak: 7, bonus: 15.0 },
        StreakTier { min_streak: 10, bonus: 25.0 },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileSettings {
    pub recent_matches: usize,
    /// Used to back-derive a correct-player count from stored squad points.
    pub assumed_squad_size: u32,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            recent_matches: 10,
            assumed_squad_size: 11,
        }
    }
}

/// Every point, multiplier and threshold the scoring engine uses.
///
/// Partial JSON overrides are accepted; missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringTables {
    pub score: ScoreTable,
    pub total_goals: TotalGoalsTable,
    pub squad: SquadTable,
    #[serde(deserialize_with = "attack_formation")]
    pub attack_formation: FormationTable,
    #[serde(deserialize_with = "defense_formation")]
    pub defense_formation: FormationTable,
    pub player_points: PlayerPointTable,
    pub focus: FocusTable,
    pub time_bonus: TimeBonusTable,
    pub streak_tiers: Vec<StreakTier>,
    pub levels: Vec<LevelThreshold>,
    pub profile: ProfileSettings,
}

impl Default for ScoringTables {
    fn default() -> Self {
        Self {
            score: ScoreTable::default(),
            total_goals: TotalGoalsTable::default(),
            squad: SquadTable::default(),
            attack_formation: FormationTable::attack(),
            defense_formation: FormationTable::defense(),
            player_points: PlayerPointTable::default(),
            focus: FocusTable::default(),
            time_bonus: TimeBonusTable::default(),
            streak_tiers: default_streak_tiers(),
            levels: default_levels(),
            profile: ProfileSettings::default(),
        }
    }
}

impl ScoringTables {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let tables: ScoringTables = serde_json::from_str(json)?;
        tables.validate()?;
        Ok(tables)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let tables = Self::from_json(&json)?;
        tracing::info!("Loaded scoring tables from {}", path.display());
        Ok(tables)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let points = [
            self.score.exact,
            self.score.goal_difference,
            self.score.winner,
            self.total_goals.exact,
            self.total_goals.close,
            self.squad.per_player,
            self.attack_formation.exact,
            self.attack_formation.similar,
            self.defense_formation.exact,
            self.defense_formation.similar,
        ];
        if points
            .iter()
            .chain(self.player_points.values().iter())
            .any(|p| !p.is_finite() || *p < 0.0)
        {
            return Err(ConfigError::Invalid(
                "point values must be finite and non-negative".to_string(),
            ));
        }

        let multipliers = AnalysisFocus::ALL
            .iter()
            .map(|f| self.focus.rule(*f).multiplier)
            .chain([
                self.time_bonus.penalty_multiplier,
                self.time_bonus.pre_lineup_multiplier,
                self.time_bonus.neutral_multiplier,
            ]);
        for multiplier in multipliers {
            if !multiplier.is_finite() || multiplier < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "multiplier {} must be finite and non-negative",
                    multiplier
                )));
            }
        }

        if self.streak_tiers.iter().any(|t| t.bonus < 0.0) {
            return Err(ConfigError::Invalid("streak bonuses must be non-negative".to_string()));
        }

        if self.levels.is_empty() {
            return Err(ConfigError::Invalid("level table is empty".to_string()));
        }
        for pair in self.levels.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            if upper.min_points <= lower.min_points || upper.level <= lower.level {
                return Err(ConfigError::Invalid(format!(
                    "level {} must start above level {}",
                    upper.level, lower.level
                )));
            }
            if lower.max_points != Some(upper.min_points) {
                return Err(ConfigError::Invalid(format!(
                    "level {} must end where level {} starts ({} points)",
                    lower.level, upper.level, upper.min_points
                )));
            }
        }
        for tier in &self.levels {
            if !tier.min_points.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "level {} has a non-finite minimum",
                    tier.level
                )));
            }
            if let Some(max_points) = tier.max_points {
                if max_points.is_nan() || max_points <= tier.min_points {
                    return Err(ConfigError::Invalid(format!(
                        "level {} must span a positive range",
                        tier.level
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Process-level settings read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub tables: ScoringTables,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:data/tacticiq.db".to_string());

        let port = match env::var("PORT") {
            Ok(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::Env { name: "PORT", value })?,
            Err(_) => 3000,
        };

        let tables = match env::var("SCORING_TABLES_PATH") {
            Ok(path) if !path.trim().is_empty() => ScoringTables::from_path(path.trim())?,
            _ => ScoringTables::default(),
        };

        Ok(Self {
            database_url,
            port,
            tables,
        })
    }
}
