pub mod memory;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteRow};
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

use crate::error::StoreError;
use crate::models::{MatchScoreDetail, RankContext, StoredProfile};

/// Running per-user totals.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<StoredProfile>, StoreError>;

    /// Overwrite only the leaderboard fields, creating the profile if needed.
    async fn set_ranking(&self, user_id: &str, ranking: &RankContext) -> Result<StoredProfile, StoreError>;
}

/// Append-only per-user history of scored matches.
#[async_trait]
pub trait MatchHistoryStore: Send + Sync {
    /// Newest first. `limit` of `None` returns everything.
    async fn list_matches(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<MatchScoreDetail>, StoreError>;
}

/// Scores a match against the current profile and returns the detail to
/// append together with the profile to save.
pub type RecordUpdate<'a> = dyn Fn(StoredProfile) -> (MatchScoreDetail, StoredProfile) + Send + Sync + 'a;

/// Both repositories behind one handle.
#[async_trait]
pub trait ScoreStore: ProfileStore + MatchHistoryStore {
    /// Load the user's profile (fresh if unknown), run `update` on it, then
    /// append the detail and save the profile as one unit. Concurrent calls
    /// for the same user are serialised.
    async fn record_with(
        &self,
        user_id: &str,
        update: &RecordUpdate<'_>,
    ) -> Result<(MatchScoreDetail, StoredProfile), StoreError>;
}

pub async fn create_pool(database_url: &str) -> Result<SqlitePool, StoreError> {
    // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
    let file_path = database_url
        .strip_prefix("sqlite:///")
        .or_else(|| database_url.strip_prefix("sqlite://"))
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    if !file_path.starts_with(":memory:") {
        if let Some(parent) = std::path::Path::new(file_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
    }

    // Writers queue on the busy timeout instead of failing with SQLITE_BUSY.
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

pub async fn init_database_with_pool(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_profiles (
            user_id TEXT PRIMARY KEY,
            total_points REAL NOT NULL DEFAULT 0,
            current_streak INTEGER NOT NULL DEFAULT 0,
            best_streak INTEGER NOT NULL DEFAULT 0,
            region_rank INTEGER,
            world_rank INTEGER,
            total_players INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS match_history (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            user_id TEXT NOT NULL,
            match_id TEXT NOT NULL,
            total_score REAL NOT NULL,
            detail_json TEXT NOT NULL,
            recorded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_match_history_user ON match_history(user_id, seq)")
        .execute(pool)
        .await?;

    tracing::info!("Database initialized successfully");
    Ok(())
}

fn profile_from_row(row: &SqliteRow) -> Result<StoredProfile, StoreError> {
    Ok(StoredProfile {
        user_id: row.get("user_id"),
        total_points: row.get("total_points"),
        current_streak: row.get::<i64, _>("current_streak") as u32,
        best_streak: row.get::<i64, _>("best_streak") as u32,
        ranking: RankContext {
            region_rank: row.get::<Option<i64>, _>("region_rank").map(|r| r as u32),
            world_rank: row.get::<Option<i64>, _>("world_rank").map(|r| r as u32),
            total_players: row.get::<i64, _>("total_players") as u32,
        },
        updated_at: chrono::DateTime::parse_from_rfc3339(&row.get::<String, _>("updated_at"))?
            .with_timezone(&Utc),
    })
}

async fn fetch_profile<'e, E>(executor: E, user_id: &str) -> Result<Option<StoredProfile>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT * FROM user_profiles WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(profile_from_row).transpose()
}

async fn write_profile<'e, E>(executor: E, profile: &StoredProfile) -> Result<(), StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"INSERT INTO user_profiles
           (user_id, total_points, current_streak, best_streak, region_rank, world_rank, total_players, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT(user_id) DO UPDATE SET
               total_points   = excluded.total_points,
               current_streak = excluded.current_streak,
               best_streak    = excluded.best_streak,
               region_rank    = excluded.region_rank,
               world_rank     = excluded.world_rank,
               total_players  = excluded.total_players,
               updated_at     = excluded.updated_at"#,
    )
    .bind(&profile.user_id)
    .bind(profile.total_points)
    .bind(profile.current_streak as i64)
    .bind(profile.best_streak as i64)
    .bind(profile.ranking.region_rank.map(i64::from))
    .bind(profile.ranking.world_rank.map(i64::from))
    .bind(profile.ranking.total_players as i64)
    .bind(profile.updated_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

async fn insert_match<'e, E>(executor: E, user_id: &str, detail: &MatchScoreDetail) -> Result<(), StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let detail_json = serde_json::to_string(detail)?;
    sqlx::query(
        r#"INSERT INTO match_history (id, user_id, match_id, total_score, detail_json, recorded_at)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(&detail.match_id)
    .bind(detail.total_score)
    .bind(detail_json)
    .bind(Utc::now().to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

/// SQLite-backed implementation of both stores.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database and make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = create_pool(database_url).await?;
        init_database_with_pool(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ProfileStore for SqliteStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<StoredProfile>, StoreError> {
        fetch_profile(&self.pool, user_id).await
    }

    async fn set_ranking(&self, user_id: &str, ranking: &RankContext) -> Result<StoredProfile, StoreError> {
        let row = sqlx::query(
            r#"INSERT INTO user_profiles (user_id, region_rank, world_rank, total_players, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(user_id) DO UPDATE SET
                   region_rank   = excluded.region_rank,
                   world_rank    = excluded.world_rank,
                   total_players = excluded.total_players,
                   updated_at    = excluded.updated_at
               RETURNING *"#,
        )
        .bind(user_id)
        .bind(ranking.region_rank.map(i64::from))
        .bind(ranking.world_rank.map(i64::from))
        .bind(ranking.total_players as i64)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        profile_from_row(&row)
    }
}

#[async_trait]
impl MatchHistoryStore for SqliteStore {
    async fn list_matches(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<MatchScoreDetail>, StoreError> {
        // SQLite treats a negative LIMIT as "no limit".
        let rows = sqlx::query(
            "SELECT detail_json FROM match_history WHERE user_id = ? ORDER BY seq DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;

        let mut history = Vec::with_capacity(rows.len());
        for row in rows {
            history.push(serde_json::from_str(&row.get::<String, _>("detail_json"))?);
        }
        Ok(history)
    }
}

#[async_trait]
impl ScoreStore for SqliteStore {
    async fn record_with(
        &self,
        user_id: &str,
        update: &RecordUpdate<'_>,
    ) -> Result<(MatchScoreDetail, StoredProfile), StoreError> {
        // Dropping `tx` on any early return rolls everything back.
        let mut tx = self.pool.begin().await?;

        // Write first so the transaction holds the write lock before it reads.
        sqlx::query("INSERT OR IGNORE INTO user_profiles (user_id, updated_at) VALUES (?, ?)")
            .bind(user_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

        let profile = fetch_profile(&mut *tx, user_id)
            .await?
            .unwrap_or_else(|| StoredProfile::new(user_id));
        let (detail, updated) = update(profile);

        insert_match(&mut *tx, user_id, &detail).await?;
        write_profile(&mut *tx, &updated).await?;
        tx.commit().await?;

        Ok((detail, updated))
    }
}
