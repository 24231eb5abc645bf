use anyhow::{Context, Result};
use std::path::Path;

use crate::config::{AppConfig, ScoringTables};
use crate::db::{MatchHistoryStore, SqliteStore};
use crate::models::{CategoryScore, MatchScoreDetail, MatchScoreInput, UserScoringProfile};
use crate::services::{load_user_profile, record_match, ScoringEngine};

fn read_input(path: &Path) -> Result<MatchScoreInput> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("invalid match bundle in {}", path.display()))
}

fn category_line(label: &str, score: &CategoryScore) -> String {
    format!(
        "   {:<18} {:<15} {:>5.1} -> {:>5.1}",
        label,
        format!("{:?}", score.tier),
        score.base_points,
        score.points
    )
}

fn print_detail(detail: &MatchScoreDetail) {
    println!("📊 Match {} ({:?} focus, x{:.1}):", detail.match_id, detail.focus, detail.focus_multiplier);
    println!("{}", category_line("Score", &detail.score_correct));
    println!("{}", category_line("Total goals", &detail.total_goals));
    println!(
        "{} ({}/{} starters)",
        category_line("Squad", &detail.squad_players),
        detail.squad_correct_count,
        detail.squad_predicted_count
    );
    println!("{}", category_line("Attack formation", &detail.attack_formation));
    println!("{}", category_line("Defense formation", &detail.defense_formation));

    if !detail.player_predictions.is_empty() {
        println!("\n🎯 Player predictions:");
        for p in &detail.player_predictions {
            println!(
                "   {} {} {:?}: {:.1}",
                if p.correct { "✅" } else { "❌" },
                p.player_id,
                p.prediction_type,
                p.points
            );
        }
    }

    println!("\n   Base subtotal:    {:.1}", detail.subtotal_base);
    println!("   Player subtotal:  {:.1}", detail.subtotal_player_predictions);
    println!("   Time multiplier:  x{:.2}", detail.time_bonus_multiplier);
    println!("   Streak bonus:     +{:.1}", detail.streak_bonus);
    println!("   Total:            {:.1}", detail.total_score);
}

fn print_profile(profile: &UserScoringProfile) {
    println!("👤 {}", profile.user_id);
    println!(
        "   Level {} {} ({}) - {:.1}% to next, {:.1} pts needed",
        profile.level.level,
        profile.level.title,
        profile.level.color,
        profile.level.progress,
        profile.level.points_to_next_level
    );
    println!("   Total points: {:.1}", profile.total_points);
    println!(
        "   Streak: {} (best {})",
        profile.current_streak, profile.best_streak
    );
    match (profile.region_rank, profile.world_rank) {
        (None, None) => println!("   Rank: unranked"),
        (region, world) => println!(
            "   Rank: region {} / world {} (top {:.1}% of {})",
            region.map_or("-".to_string(), |r| r.to_string()),
            world.map_or("-".to_string(), |r| r.to_string()),
            profile.top_percentile,
            profile.total_players
        ),
    }

    let rates = &profile.success_rates;
    println!("\n📈 Success rates ({} matches):", profile.matches_played);
    println!("   Score:          {:.1}%", rates.score);
    println!("   Total goals:    {:.1}%", rates.total_goals);
    println!("   Squad (approx): {:.1}%", rates.squad);
    println!("   Formation:      {:.1}%", rates.formation);
    println!("   Players:        {:.1}%", rates.player_predictions);

    if !profile.recent_matches.is_empty() {
        println!("\n📅 Recent matches:");
        for detail in &profile.recent_matches {
            println!("   {} {:>6.1} pts", detail.match_id, detail.total_score);
        }
    }
}

pub fn score_file(path: &Path, streak: Option<u32>, tables: ScoringTables) -> Result<()> {
    let mut input = read_input(path)?;
    if let Some(streak) = streak {
        input.current_streak = streak;
    }

    let engine = ScoringEngine::new(tables);
    let detail = engine.calculate_match_score(&input);
    print_detail(&detail);
    Ok(())
}

pub async fn record(config: AppConfig, user_id: &str, path: &Path) -> Result<()> {
    let input = read_input(path)?;
    let store = SqliteStore::connect(&config.database_url).await?;
    let engine = ScoringEngine::new(config.tables);

    let detail = record_match(&store, &engine, user_id, &input).await?;
    print_detail(&detail);
    println!("\n✅ Recorded for {}", user_id);
    Ok(())
}

pub async fn show_profile(config: AppConfig, user_id: &str) -> Result<()> {
    let store = SqliteStore::connect(&config.database_url).await?;
    let engine = ScoringEngine::new(config.tables);

    match load_user_profile(&store, &engine, user_id).await? {
        Some(profile) => print_profile(&profile),
        None => println!("❌ No scoring profile for '{}'. Record a match first.", user_id),
    }
    Ok(())
}

pub fn write_history_csv<W: std::io::Write>(writer: W, history: &[MatchScoreDetail]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record([
        "match_id",
        "focus",
        "score_tier",
        "score_points",
        "total_goals_points",
        "squad_points",
        "squad_correct",
        "attack_formation_points",
        "defense_formation_points",
        "player_points",
        "time_multiplier",
        "streak_bonus",
        "total_score",
    ])?;

    for d in history {
        writer.write_record([
            d.match_id.clone(),
            format!("{:?}", d.focus),
            format!("{:?}", d.score_correct.tier),
            d.score_correct.points.to_string(),
            d.total_goals.points.to_string(),
            d.squad_players.points.to_string(),
            d.squad_correct_count.to_string(),
            d.attack_formation.points.to_string(),
            d.defense_formation.points.to_string(),
            d.subtotal_player_predictions.to_string(),
            d.time_bonus_multiplier.to_string(),
            d.streak_bonus.to_string(),
            d.total_score.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub async fn export_history(config: AppConfig, user_id: &str, output: &Path) -> Result<()> {
    let store = SqliteStore::connect(&config.database_url).await?;
    let history = store.list_matches(user_id, None).await?;

    if history.is_empty() {
        println!("📭 No recorded matches for '{}'", user_id);
        return Ok(());
    }

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    write_history_csv(file, &history)?;

    println!("✅ Exported {} matches to {}", history.len(), output.display());
    Ok(())
}

pub fn show_tables(tables: &ScoringTables) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(tables)?);
    Ok(())
}

pub async fn init_db(config: AppConfig) -> Result<()> {
    SqliteStore::connect(&config.database_url).await?;
    println!("✅ Database ready at {}", config.database_url);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisFocus, ScoreLine};
    use crate::services::scoring_engine::tests::score_only_input;
    use std::io::Write;

    #[test]
    fn test_history_csv() {
        let engine = ScoringEngine::default();
        let input = score_only_input("m1", ScoreLine::new(2, 1), ScoreLine::new(2, 1), AnalysisFocus::Score);
        let detail = engine.calculate_match_score(&input);

        let mut buffer = Vec::new();
        write_history_csv(&mut buffer, &[detail]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("match_id,focus,score_tier"));
        assert_eq!(lines.next().unwrap(), "m1,Score,Exact,20,0,0,0,0,0,0,1,0,20");
    }

    #[test]
    fn test_score_file_accepts_bundle() {
        let input = score_only_input("m1", ScoreLine::new(0, 0), ScoreLine::new(0, 0), AnalysisFocus::Defense);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&serde_json::to_vec(&input).unwrap()).unwrap();

        assert!(score_file(file.path(), Some(7), ScoringTables::default()).is_ok());
    }

    #[test]
    fn test_score_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();
        assert!(score_file(file.path(), None, ScoringTables::default()).is_err());
    }
}
