use std::collections::HashSet;

use crate::config::{FormationTable, ScoreTable, ScoringTables, SquadTable, TotalGoalsTable};
use crate::models::{ScoreLine, ScoreTier};

/// Result of comparing one predicted attribute with its actual value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub tier: ScoreTier,
    pub points: f64,
}

impl Comparison {
    fn hit(tier: ScoreTier, points: f64) -> Self {
        Self { tier, points }
    }

    fn wrong() -> Self {
        Self {
            tier: ScoreTier::Wrong,
            points: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Winner {
    Home,
    Away,
    Draw,
}

fn winner(score: ScoreLine) -> Winner {
    match score.home.cmp(&score.away) {
        std::cmp::Ordering::Greater => Winner::Home,
        std::cmp::Ordering::Less => Winner::Away,
        std::cmp::Ordering::Equal => Winner::Draw,
    }
}

/// Exact score, then goal difference, then winner. Only the first match counts.
pub fn compare_score(predicted: ScoreLine, actual: ScoreLine, table: &ScoreTable) -> Comparison {
    if predicted == actual {
        Comparison::hit(ScoreTier::Exact, table.exact)
    } else if predicted.goal_difference() == actual.goal_difference() {
        Comparison::hit(ScoreTier::GoalDifference, table.goal_difference)
    } else if winner(predicted) == winner(actual) {
        Comparison::hit(ScoreTier::Winner, table.winner)
    } else {
        Comparison::wrong()
    }
}

pub fn compare_total_goals(predicted: u32, actual: u32, table: &TotalGoalsTable) -> Comparison {
    match predicted.abs_diff(actual) {
        0 => Comparison::hit(ScoreTier::Exact, table.exact),
        1 => Comparison::hit(ScoreTier::Close, table.close),
        _ => Comparison::wrong(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquadComparison {
    pub tier: ScoreTier,
    pub points: f64,
    pub correct: u32,
    /// Distinct players in the prediction.
    pub predicted: u32,
}

/// Set overlap between predicted and actual starters. Order and duplicates are ignored.
pub fn compare_squad(predicted: &[String], actual: &[String], table: &SquadTable) -> SquadComparison {
    let actual: HashSet<&str> = actual.iter().map(String::as_str).collect();
    let predicted: HashSet<&str> = predicted.iter().map(String::as_str).collect();

    let correct = predicted.intersection(&actual).count() as u32;
    let predicted_count = predicted.len() as u32;

    let tier = if correct == 0 {
        ScoreTier::Wrong
    } else if correct as usize == actual.len() && predicted.len() == actual.len() {
        ScoreTier::Exact
    } else {
        ScoreTier::Partial
    };

    SquadComparison {
        tier,
        points: correct as f64 * table.per_player,
        correct,
        predicted: predicted_count,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormationSide {
    Attack,
    Defense,
}

impl ScoringTables {
    pub fn formation(&self, side: FormationSide) -> &FormationTable {
        match side {
            FormationSide::Attack => &self.attack_formation,
            FormationSide::Defense => &self.defense_formation,
        }
    }
}

/// Split "4-3-3" into its numeric lines. `None` unless there are at least two
/// dash-delimited numbers.
pub fn parse_formation(formation: &str) -> Option<Vec<u8>> {
    let lines: Vec<u8> = formation
        .trim()
        .split('-')
        .map(|token| token.trim().parse::<u8>().ok())
        .collect::<Option<_>>()?;
    (lines.len() >= 2).then_some(lines)
}

pub fn compare_formation(
    predicted: &str,
    actual: &str,
    side: FormationSide,
    tables: &ScoringTables,
) -> Comparison {
    let table = tables.formation(side);

    let (Some(predicted_lines), Some(actual_lines)) =
        (parse_formation(predicted), parse_formation(actual))
    else {
        tracing::warn!(
            "Unparseable {:?} formation (predicted {:?}, actual {:?}), scoring as wrong",
            side,
            predicted,
            actual
        );
        return Comparison::wrong();
    };

    if predicted_lines == actual_lines {
        Comparison::hit(ScoreTier::Exact, table.exact)
    } else if predicted_lines.first() == actual_lines.first() {
        Comparison::hit(ScoreTier::Similar, table.similar)
    } else {
        Comparison::wrong()
    }
}
