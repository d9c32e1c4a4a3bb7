use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use super::schema::apply_schema;
use super::{ProgressStore, StoreError};
use crate::progress::types::{
    AttemptRecord, DifficultyTier, Mistake, RecommendedAction, TopicProgress, UserAccount,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Unavailable(format!("create {}: {e}", parent.display())))?;
            }
        }

        let db_url = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        apply_schema(&pool).await?;
        tracing::info!("sqlite progress store ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ProgressStore for SqliteStore {
    async fn get_account(&self, user_id: &str) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query(
            r#"SELECT "id", "displayName", "xp", "level", "streak", "lastActivityDate", "createdAt"
               FROM "user_accounts" WHERE "id" = ?"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(parse_account).transpose()
    }

    async fn insert_account(&self, account: &UserAccount) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO "user_accounts"
               ("id", "displayName", "xp", "level", "streak", "lastActivityDate", "createdAt")
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&account.id)
        .bind(&account.display_name)
        .bind(to_i64("xp", account.xp)?)
        .bind(i64::from(account.level))
        .bind(i64::from(account.streak))
        .bind(account.last_activity_date.map(format_date))
        .bind(format_ts(account.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_account(&self, account: &UserAccount) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"UPDATE "user_accounts"
               SET "displayName" = ?, "xp" = ?, "level" = ?, "streak" = ?, "lastActivityDate" = ?
               WHERE "id" = ?"#,
        )
        .bind(&account.display_name)
        .bind(to_i64("xp", account.xp)?)
        .bind(i64::from(account.level))
        .bind(i64::from(account.streak))
        .bind(account.last_activity_date.map(format_date))
        .bind(&account.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("account {}", account.id)));
        }
        Ok(())
    }

    async fn get_topic_progress(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> Result<Option<TopicProgress>, StoreError> {
        let row = sqlx::query(
            r#"SELECT "userId", "topicId", "currentDifficulty", "questionsAttempted",
               "questionsCorrect", "totalXpEarned", "masteryLevel", "lastActivity"
               FROM "topic_progress" WHERE "userId" = ? AND "topicId" = ?"#,
        )
        .bind(user_id)
        .bind(topic_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(parse_topic_progress).transpose()
    }

    async fn upsert_topic_progress(&self, progress: &TopicProgress) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO "topic_progress" (
                   "userId", "topicId", "currentDifficulty", "questionsAttempted",
                   "questionsCorrect", "totalXpEarned", "masteryLevel", "lastActivity"
               ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT ("userId", "topicId") DO UPDATE SET
                   "currentDifficulty" = excluded."currentDifficulty",
                   "questionsAttempted" = excluded."questionsAttempted",
                   "questionsCorrect" = excluded."questionsCorrect",
                   "totalXpEarned" = excluded."totalXpEarned",
                   "masteryLevel" = excluded."masteryLevel",
                   "lastActivity" = excluded."lastActivity""#,
        )
        .bind(&progress.user_id)
        .bind(&progress.topic_id)
        .bind(progress.current_difficulty.as_str())
        .bind(i64::from(progress.questions_attempted))
        .bind(i64::from(progress.questions_correct))
        .bind(to_i64("totalXpEarned", progress.total_xp_earned)?)
        .bind(i64::from(progress.mastery_level))
        .bind(format_ts(progress.last_activity))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<(), StoreError> {
        let mistakes = serde_json::to_string(&attempt.mistakes)
            .map_err(|e| StoreError::Corrupt(format!("mistakes: {e}")))?;

        sqlx::query(
            r#"INSERT INTO "question_attempts" (
                   "id", "submissionId", "userId", "questionId", "topicId", "isCorrect",
                   "xpEarned", "timeTaken", "mistakes", "recommendedAction", "attemptedAt"
               ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&attempt.id)
        .bind(attempt.submission_id.as_deref())
        .bind(&attempt.user_id)
        .bind(&attempt.question_id)
        .bind(&attempt.topic_id)
        .bind(attempt.is_correct)
        .bind(to_i64("xpEarned", attempt.xp_earned)?)
        .bind(i64::from(attempt.time_taken))
        .bind(mistakes)
        .bind(attempt.recommended_action.map(|a| a.as_str()))
        .bind(format_ts(attempt.attempted_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn has_submission(&self, user_id: &str, submission_id: &str) -> Result<bool, StoreError> {
        let row = sqlx::query(
            r#"SELECT 1 FROM "question_attempts" WHERE "userId" = ? AND "submissionId" = ? LIMIT 1"#,
        )
        .bind(user_id)
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn list_topic_progress(&self, user_id: &str) -> Result<Vec<TopicProgress>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT "userId", "topicId", "currentDifficulty", "questionsAttempted",
               "questionsCorrect", "totalXpEarned", "masteryLevel", "lastActivity"
               FROM "topic_progress" WHERE "userId" = ? ORDER BY "topicId""#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_topic_progress).collect()
    }

    async fn recent_attempts(
        &self,
        user_id: &str,
        topic_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<AttemptRecord>, StoreError> {
        // LIMIT -1 is unbounded in SQLite
        let limit = limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX)).unwrap_or(-1);

        let rows = sqlx::query(
            r#"SELECT "id", "submissionId", "userId", "questionId", "topicId", "isCorrect",
               "xpEarned", "timeTaken", "mistakes", "recommendedAction", "attemptedAt"
               FROM "question_attempts"
               WHERE "userId" = ? AND (? IS NULL OR "topicId" = ?)
               ORDER BY "attemptedAt" DESC, "rowid" DESC
               LIMIT ?"#,
        )
        .bind(user_id)
        .bind(topic_id)
        .bind(topic_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_attempt).collect()
    }

    async fn top_accounts(&self, limit: usize) -> Result<Vec<UserAccount>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT "id", "displayName", "xp", "level", "streak", "lastActivityDate", "createdAt"
               FROM "user_accounts" ORDER BY "xp" DESC, "id" ASC LIMIT ?"#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_account).collect()
    }
}

fn parse_account(row: &SqliteRow) -> Result<UserAccount, StoreError> {
    let last_activity_date = row
        .try_get::<Option<String>, _>("lastActivityDate")?
        .map(|raw| parse_date(&raw))
        .transpose()?;

    Ok(UserAccount {
        id: row.try_get("id")?,
        display_name: row.try_get("displayName")?,
        xp: to_u64(row.try_get("xp")?),
        level: to_u32(row.try_get("level")?).max(1),
        streak: to_u32(row.try_get("streak")?),
        last_activity_date,
        created_at: parse_ts(&row.try_get::<String, _>("createdAt")?)?,
    })
}

// accuracy is derived from the counters, never read back
fn parse_topic_progress(row: &SqliteRow) -> Result<TopicProgress, StoreError> {
    let mut progress = TopicProgress {
        user_id: row.try_get("userId")?,
        topic_id: row.try_get("topicId")?,
        current_difficulty: DifficultyTier::parse(&row.try_get::<String, _>("currentDifficulty")?),
        questions_attempted: to_u32(row.try_get("questionsAttempted")?),
        questions_correct: to_u32(row.try_get("questionsCorrect")?),
        accuracy: 0.0,
        total_xp_earned: to_u64(row.try_get("totalXpEarned")?),
        mastery_level: to_u32(row.try_get("masteryLevel")?).min(100),
        last_activity: parse_ts(&row.try_get::<String, _>("lastActivity")?)?,
    };
    progress.accuracy = progress.computed_accuracy();
    Ok(progress)
}

fn parse_attempt(row: &SqliteRow) -> Result<AttemptRecord, StoreError> {
    let mistakes_raw: String = row.try_get("mistakes")?;
    let mistakes: Vec<Mistake> = serde_json::from_str(&mistakes_raw)
        .map_err(|e| StoreError::Corrupt(format!("mistakes: {e}")))?;

    let recommended_action = row
        .try_get::<Option<String>, _>("recommendedAction")?
        .and_then(|raw| RecommendedAction::parse(&raw));

    Ok(AttemptRecord {
        id: row.try_get("id")?,
        submission_id: row.try_get("submissionId")?,
        user_id: row.try_get("userId")?,
        question_id: row.try_get("questionId")?,
        topic_id: row.try_get("topicId")?,
        is_correct: row.try_get("isCorrect")?,
        xp_earned: to_u64(row.try_get("xpEarned")?),
        time_taken: to_u32(row.try_get("timeTaken")?),
        mistakes,
        recommended_action,
        attempted_at: parse_ts(&row.try_get::<String, _>("attemptedAt")?)?,
    })
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp {raw:?}: {e}")))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(raw: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| StoreError::Corrupt(format!("date {raw:?}: {e}")))
}

fn to_i64(column: &str, value: u64) -> Result<i64, StoreError> {
    i64::try_from(value)
        .map_err(|_| StoreError::Corrupt(format!("{column} {value} does not fit an integer column")))
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
