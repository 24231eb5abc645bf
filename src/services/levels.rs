use crate::config::LevelThreshold;
use crate::models::LevelInfo;
use crate::utils::round1;

impl LevelInfo {
    /// Level 1 defaults for when the table cannot place a total.
    pub fn fallback() -> Self {
        Self {
            level: 1,
            title: "Rookie".to_string(),
            color: "#9CA3AF".to_string(),
            progress: 0.0,
            points_to_next_level: 0.0,
        }
    }
}

fn describe(tier: &LevelThreshold, total_points: f64) -> LevelInfo {
    let (progress, points_to_next_level) = match tier.max_points {
        Some(max_points) if max_points > tier.min_points => {
            let span = max_points - tier.min_points;
            let progress = round1(((total_points - tier.min_points) / span * 100.0).clamp(0.0, 100.0));
            (progress, (max_points - total_points).max(0.0))
        }
        // Terminal (or degenerate) tier: nothing left to climb.
        _ => (100.0, 0.0),
    };

    LevelInfo {
        level: tier.level,
        title: tier.title.clone(),
        color: tier.color.clone(),
        progress,
        points_to_next_level,
    }
}

/// Map cumulative points onto the ascending level table.
pub fn calculate_level(total_points: f64, levels: &[LevelThreshold]) -> LevelInfo {
    let Some(lowest) = levels.first() else {
        tracing::warn!("Level table is empty, using level 1 defaults");
        return LevelInfo::fallback();
    };

    if !total_points.is_finite() || total_points < 0.0 {
        return describe(lowest, lowest.min_points);
    }

    match levels.iter().rev().find(|tier| tier.min_points <= total_points) {
        Some(tier) => describe(tier, total_points),
        None => {
            tracing::warn!(
                "No level covers {} points, falling back to level {}",
                total_points,
                lowest.level
            );
            describe(lowest, lowest.min_points)
        }
    }
}
