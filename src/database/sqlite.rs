use crate::errors::{AppError, Result};
use crate::models::habit::{Habit, HabitType};
use crate::models::metric::{DailyMetric, HabitLog, HabitLogEntry};
use crate::models::user::User;
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::OnceCell;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

pub static GLOBAL_DB: OnceCell<Arc<SqliteDatabase>> = OnceCell::new();

#[derive(Debug)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn new(database_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(database_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::DatabaseError(format!("Failed to create database directory: {}", e))
            })?;
        }

        if !Path::new(database_path).exists() {
            std::fs::File::create(database_path).map_err(|e| {
                AppError::DatabaseError(format!("Failed to create database file: {}", e))
            })?;
        }
        let database_url = format!("sqlite:{}", database_path);

        let pool = SqlitePool::connect(&database_url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to database: {}", e)))?;

        let db = Self { pool };
        db.create_tables().await?;

        tracing::info!(action = "database_connected", path = %database_path);
        Ok(db)
    }

    async fn create_tables(&self) -> Result<()> {
        let query = r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                name TEXT,
                image TEXT,
                email_verified_at TEXT,
                is_deleted BOOLEAN DEFAULT FALSE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS login_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL,
                token_hash TEXT UNIQUE NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                consumed_at TEXT
            );

            CREATE TABLE IF NOT EXISTS session_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                token_id TEXT UNIQUE NOT NULL,
                token_hash TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                is_active BOOLEAN DEFAULT TRUE,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS habits (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                habit_type TEXT NOT NULL,
                target REAL,
                color TEXT NOT NULL,
                display_order INTEGER NOT NULL,
                is_active BOOLEAN DEFAULT TRUE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS daily_metrics (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                mood INTEGER NOT NULL,
                energy INTEGER NOT NULL,
                productivity INTEGER NOT NULL,
                momentum REAL NOT NULL,
                note TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (user_id, date),
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS habit_logs (
                id TEXT PRIMARY KEY,
                habit_id TEXT NOT NULL,
                metric_id TEXT NOT NULL,
                completed BOOLEAN NOT NULL,
                value REAL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (habit_id, metric_id),
                FOREIGN KEY (habit_id) REFERENCES habits (id) ON DELETE CASCADE,
                FOREIGN KEY (metric_id) REFERENCES daily_metrics (id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
            CREATE INDEX IF NOT EXISTS idx_login_tokens_email ON login_tokens(email);
            CREATE INDEX IF NOT EXISTS idx_session_tokens_user_id ON session_tokens(user_id);
            CREATE INDEX IF NOT EXISTS idx_session_tokens_token_id ON session_tokens(token_id);
            CREATE INDEX IF NOT EXISTS idx_habits_user_id ON habits(user_id);
            CREATE INDEX IF NOT EXISTS idx_metrics_user_date ON daily_metrics(user_id, date);
            CREATE INDEX IF NOT EXISTS idx_logs_metric_id ON habit_logs(metric_id);
            CREATE INDEX IF NOT EXISTS idx_logs_habit_id ON habit_logs(habit_id);
        "#;

        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create tables: {}", e)))?;

        Ok(())
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ----- users -----

    pub async fn create_user(&self, user: &User) -> Result<()> {
        let query = r#"
            INSERT INTO users (id, email, name, image, email_verified_at, is_deleted, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#;

        sqlx::query(query)
            .bind(user.id.to_string())
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.image)
            .bind(user.email_verified_at.map(|dt| dt.to_rfc3339()))
            .bind(user.is_deleted)
            .bind(user.created_at.to_rfc3339())
            .bind(user.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if e.to_string().contains("UNIQUE constraint failed") {
                    AppError::ValidationError("Email already exists".to_string())
                } else {
                    AppError::DatabaseError(format!("Failed to create user: {}", e))
                }
            })?;

        Ok(())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = "SELECT * FROM users WHERE email = ?1 AND is_deleted = FALSE";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch user by email: {}", e)))?;

        row.map(|r| map_user(&r)).transpose()
    }

    pub async fn get_user_by_id(&self, user_id: &Uuid) -> Result<User> {
        let query = "SELECT * FROM users WHERE id = ?1";
        let row = sqlx::query(query)
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch user: {}", e)))?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        map_user(&row)
    }

    pub async fn update_user_profile(&self, user: &User) -> Result<()> {
        let query = r#"
            UPDATE users SET name = ?2, image = ?3, email_verified_at = ?4, updated_at = ?5
            WHERE id = ?1
        "#;

        sqlx::query(query)
            .bind(user.id.to_string())
            .bind(&user.name)
            .bind(&user.image)
            .bind(user.email_verified_at.map(|dt| dt.to_rfc3339()))
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to update user: {}", e)))?;

        Ok(())
    }

    pub async fn soft_delete_user(&self, user_id: &Uuid) -> Result<()> {
        let query = "UPDATE users SET is_deleted = TRUE, updated_at = ?2 WHERE id = ?1";

        sqlx::query(query)
            .bind(user_id.to_string())
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete user: {}", e)))?;

        Ok(())
    }

    // ----- magic-link login tokens -----

    pub async fn store_login_token(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let query = r#"
            INSERT INTO login_tokens (email, token_hash, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4)
        "#;

        sqlx::query(query)
            .bind(email)
            .bind(token_hash)
            .bind(Utc::now().to_rfc3339())
            .bind(expires_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to store login token: {}", e)))?;

        Ok(())
    }

    /// Marks the token consumed and reports whether it was still valid.
    /// Single UPDATE so a token can never be redeemed twice.
    pub async fn consume_login_token(&self, email: &str, token_hash: &str) -> Result<bool> {
        let query = r#"
            UPDATE login_tokens SET consumed_at = ?3
            WHERE email = ?1 AND token_hash = ?2 AND consumed_at IS NULL AND expires_at > ?3
        "#;

        let result = sqlx::query(query)
            .bind(email)
            .bind(token_hash)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to consume login token: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn cleanup_expired_login_tokens(&self) -> Result<()> {
        let query = "DELETE FROM login_tokens WHERE expires_at < ?1";

        sqlx::query(query)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to cleanup login tokens: {}", e)))?;

        Ok(())
    }

    // ----- session tokens -----

    pub async fn store_session_token(
        &self,
        user_id: &Uuid,
        token_id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let query = r#"
            INSERT INTO session_tokens (user_id, token_id, token_hash, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
        "#;

        sqlx::query(query)
            .bind(user_id.to_string())
            .bind(token_id)
            .bind(token_hash)
            .bind(Utc::now().to_rfc3339())
            .bind(expires_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to store session token: {}", e)))?;

        Ok(())
    }

    pub async fn is_session_active(&self, token_id: &str) -> Result<bool> {
        let query = r#"
            SELECT COUNT(*) as count FROM session_tokens
            WHERE token_id = ?1 AND is_active = TRUE AND expires_at > ?2
        "#;

        let row = sqlx::query(query)
            .bind(token_id)
            .bind(Utc::now().to_rfc3339())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to validate session: {}", e)))?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    pub async fn revoke_session(&self, token_id: &str) -> Result<()> {
        let query = "UPDATE session_tokens SET is_active = FALSE WHERE token_id = ?1";

        let result = sqlx::query(query)
            .bind(token_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to revoke session: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::AuthenticationError("Session not found".to_string()));
        }

        Ok(())
    }

    pub async fn revoke_all_user_sessions(&self, user_id: &Uuid) -> Result<()> {
        let query =
            "UPDATE session_tokens SET is_active = FALSE WHERE user_id = ?1 AND is_active = TRUE";

        sqlx::query(query)
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to revoke sessions: {}", e)))?;

        Ok(())
    }

    pub async fn active_session_count(&self, user_id: &Uuid) -> Result<i64> {
        let query = r#"
            SELECT COUNT(*) as count FROM session_tokens
            WHERE user_id = ?1 AND is_active = TRUE AND expires_at > ?2
        "#;

        let row = sqlx::query(query)
            .bind(user_id.to_string())
            .bind(Utc::now().to_rfc3339())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count sessions: {}", e)))?;

        Ok(row.get("count"))
    }

    pub async fn cleanup_expired_sessions(&self) -> Result<()> {
        let query = "DELETE FROM session_tokens WHERE expires_at < ?1";

        sqlx::query(query)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to cleanup sessions: {}", e)))?;

        Ok(())
    }

    // ----- habits -----

    pub async fn create_habit(&self, habit: &Habit) -> Result<()> {
        let query = r#"
            INSERT INTO habits (
                id, user_id, name, habit_type, target, color,
                display_order, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#;

        sqlx::query(query)
            .bind(habit.id.to_string())
            .bind(habit.user_id.to_string())
            .bind(&habit.name)
            .bind(habit.habit_type.as_str())
            .bind(habit.target)
            .bind(&habit.color)
            .bind(habit.display_order)
            .bind(habit.is_active)
            .bind(habit.created_at.to_rfc3339())
            .bind(habit.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create habit: {}", e)))?;

        Ok(())
    }

    /// Active habits only, in display order. Soft-deleted habits stay out of
    /// this listing but remain joinable from historical logs.
    pub async fn get_user_habits(&self, user_id: &Uuid) -> Result<Vec<Habit>> {
        let query = r#"
            SELECT * FROM habits
            WHERE user_id = ?1 AND is_active = TRUE
            ORDER BY display_order ASC
        "#;

        let rows = sqlx::query(query)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch habits: {}", e)))?;

        rows.iter().map(map_habit).collect()
    }

    pub async fn get_habit_by_id(&self, habit_id: &Uuid) -> Result<Option<Habit>> {
        let query = "SELECT * FROM habits WHERE id = ?1";
        let row = sqlx::query(query)
            .bind(habit_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch habit: {}", e)))?;

        row.map(|r| map_habit(&r)).transpose()
    }

    /// Highest display_order across all of the user's habits, inactive ones
    /// included, or -1 when there are none.
    pub async fn max_display_order(&self, user_id: &Uuid) -> Result<i64> {
        let query =
            "SELECT COALESCE(MAX(display_order), -1) as max_order FROM habits WHERE user_id = ?1";

        let row = sqlx::query(query)
            .bind(user_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch habit order: {}", e)))?;

        Ok(row.get("max_order"))
    }

    pub async fn update_habit(&self, habit: &Habit) -> Result<()> {
        let query = r#"
            UPDATE habits SET name = ?3, habit_type = ?4, target = ?5, color = ?6, updated_at = ?7
            WHERE id = ?1 AND user_id = ?2
        "#;

        let result = sqlx::query(query)
            .bind(habit.id.to_string())
            .bind(habit.user_id.to_string())
            .bind(&habit.name)
            .bind(habit.habit_type.as_str())
            .bind(habit.target)
            .bind(&habit.color)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to update habit: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Habit not found".to_string()));
        }

        Ok(())
    }

    pub async fn soft_delete_habit(&self, habit_id: &Uuid, user_id: &Uuid) -> Result<()> {
        let query = r#"
            UPDATE habits SET is_active = FALSE, updated_at = ?3
            WHERE id = ?1 AND user_id = ?2
        "#;

        let result = sqlx::query(query)
            .bind(habit_id.to_string())
            .bind(user_id.to_string())
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete habit: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Habit not found".to_string()));
        }

        Ok(())
    }

    /// Applies the given ordering in a single transaction; each habit's
    /// display_order becomes its index. Any unknown or foreign id aborts the
    /// whole batch.
    pub async fn reorder_habits(&self, user_id: &Uuid, habit_ids: &[Uuid]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        let now = Utc::now().to_rfc3339();
        for (index, habit_id) in habit_ids.iter().enumerate() {
            let result = sqlx::query(
                "UPDATE habits SET display_order = ?3, updated_at = ?4 WHERE id = ?1 AND user_id = ?2",
            )
            .bind(habit_id.to_string())
            .bind(user_id.to_string())
            .bind(index as i64)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to reorder habit: {}", e)))?;

            if result.rows_affected() == 0 {
                return Err(AppError::NotFound(format!("Habit not found: {}", habit_id)));
            }
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit reorder: {}", e)))?;

        Ok(())
    }

    // ----- daily metrics -----

    /// Creates or overwrites the row for (user, date). Momentum and note are
    /// taken from the given record; last write wins.
    pub async fn upsert_daily_metric(&self, metric: &DailyMetric) -> Result<DailyMetric> {
        let query = r#"
            INSERT INTO daily_metrics (
                id, user_id, date, mood, energy, productivity, momentum, note, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT (user_id, date)
            DO UPDATE SET
                mood = excluded.mood,
                energy = excluded.energy,
                productivity = excluded.productivity,
                momentum = excluded.momentum,
                note = excluded.note,
                updated_at = excluded.updated_at
        "#;

        sqlx::query(query)
            .bind(metric.id.to_string())
            .bind(metric.user_id.to_string())
            .bind(date_key(metric.date))
            .bind(metric.mood)
            .bind(metric.energy)
            .bind(metric.productivity)
            .bind(metric.momentum)
            .bind(&metric.note)
            .bind(metric.created_at.to_rfc3339())
            .bind(metric.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to upsert metric: {}", e)))?;

        self.get_metric_for_day(&metric.user_id, metric.date)
            .await?
            .ok_or_else(|| AppError::DatabaseError("Upserted metric disappeared".to_string()))
    }

    /// Fetch-or-create with neutral default scores; an existing row is left
    /// untouched.
    pub async fn ensure_daily_metric(&self, user_id: &Uuid, date: NaiveDate) -> Result<DailyMetric> {
        let metric = DailyMetric::with_defaults(*user_id, date);

        let query = r#"
            INSERT INTO daily_metrics (
                id, user_id, date, mood, energy, productivity, momentum, note, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT (user_id, date) DO NOTHING
        "#;

        sqlx::query(query)
            .bind(metric.id.to_string())
            .bind(metric.user_id.to_string())
            .bind(date_key(date))
            .bind(metric.mood)
            .bind(metric.energy)
            .bind(metric.productivity)
            .bind(metric.momentum)
            .bind(&metric.note)
            .bind(metric.created_at.to_rfc3339())
            .bind(metric.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to ensure metric: {}", e)))?;

        self.get_metric_for_day(user_id, date)
            .await?
            .ok_or_else(|| AppError::DatabaseError("Ensured metric disappeared".to_string()))
    }

    pub async fn get_metric_for_day(
        &self,
        user_id: &Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyMetric>> {
        let query = "SELECT * FROM daily_metrics WHERE user_id = ?1 AND date = ?2";
        let row = sqlx::query(query)
            .bind(user_id.to_string())
            .bind(date_key(date))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch metric: {}", e)))?;

        row.map(|r| map_metric(&r)).transpose()
    }

    pub async fn get_metrics_range(
        &self,
        user_id: &Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyMetric>> {
        let query = r#"
            SELECT * FROM daily_metrics
            WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
            ORDER BY date ASC
        "#;

        let rows = sqlx::query(query)
            .bind(user_id.to_string())
            .bind(date_key(start))
            .bind(date_key(end))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch metrics: {}", e)))?;

        rows.iter().map(map_metric).collect()
    }

    // ----- habit logs -----

    /// One log per (habit, metric); a second write for the same pair
    /// overwrites completed and value.
    pub async fn upsert_habit_log(&self, log: &HabitLog) -> Result<HabitLog> {
        let query = r#"
            INSERT INTO habit_logs (id, habit_id, metric_id, completed, value, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (habit_id, metric_id)
            DO UPDATE SET
                completed = excluded.completed,
                value = excluded.value,
                updated_at = excluded.updated_at
        "#;

        sqlx::query(query)
            .bind(log.id.to_string())
            .bind(log.habit_id.to_string())
            .bind(log.metric_id.to_string())
            .bind(log.completed)
            .bind(log.value)
            .bind(log.created_at.to_rfc3339())
            .bind(log.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to upsert habit log: {}", e)))?;

        let row = sqlx::query("SELECT * FROM habit_logs WHERE habit_id = ?1 AND metric_id = ?2")
            .bind(log.habit_id.to_string())
            .bind(log.metric_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch habit log: {}", e)))?;

        map_log(&row)
    }

    pub async fn get_logs_for_metric(&self, metric_id: &Uuid) -> Result<Vec<HabitLog>> {
        let query = "SELECT * FROM habit_logs WHERE metric_id = ?1";
        let rows = sqlx::query(query)
            .bind(metric_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch habit logs: {}", e)))?;

        rows.iter().map(map_log).collect()
    }

    /// Logs for a user over an inclusive date range, flattened with the
    /// calendar day and habit name. Joins through soft-deleted habits too.
    pub async fn get_log_entries(
        &self,
        user_id: &Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HabitLogEntry>> {
        let query = r#"
            SELECT dm.date as date, hl.habit_id as habit_id, h.name as habit_name,
                   hl.completed as completed, hl.value as value
            FROM habit_logs hl
            JOIN daily_metrics dm ON hl.metric_id = dm.id
            JOIN habits h ON hl.habit_id = h.id
            WHERE dm.user_id = ?1 AND dm.date >= ?2 AND dm.date <= ?3
            ORDER BY dm.date ASC
        "#;

        let rows = sqlx::query(query)
            .bind(user_id.to_string())
            .bind(date_key(start))
            .bind(date_key(end))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch log entries: {}", e)))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(HabitLogEntry {
                date: parse_date(&row.get::<String, _>("date"))?,
                habit_id: parse_uuid(&row.get::<String, _>("habit_id"))?,
                habit_name: row.get("habit_name"),
                completed: row.get("completed"),
                value: row.get("value"),
            });
        }

        Ok(entries)
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| AppError::DatabaseError(format!("Invalid date: {}", e)))
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| AppError::DatabaseError(format!("Invalid id: {}", e)))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::DatabaseError(format!("Invalid timestamp: {}", e)))
}

fn map_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    Ok(User {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        email: row.get("email"),
        name: row.get("name"),
        image: row.get("image"),
        email_verified_at: row
            .get::<Option<String>, _>("email_verified_at")
            .map(|s| parse_timestamp(&s))
            .transpose()?,
        is_deleted: row.get("is_deleted"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}

fn map_habit(row: &sqlx::sqlite::SqliteRow) -> Result<Habit> {
    Ok(Habit {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
        name: row.get("name"),
        habit_type: HabitType::parse(&row.get::<String, _>("habit_type"))?,
        target: row.get("target"),
        color: row.get("color"),
        display_order: row.get("display_order"),
        is_active: row.get("is_active"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}

fn map_metric(row: &sqlx::sqlite::SqliteRow) -> Result<DailyMetric> {
    Ok(DailyMetric {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
        date: parse_date(&row.get::<String, _>("date"))?,
        mood: row.get("mood"),
        energy: row.get("energy"),
        productivity: row.get("productivity"),
        momentum: row.get("momentum"),
        note: row.get("note"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}

fn map_log(row: &sqlx::sqlite::SqliteRow) -> Result<HabitLog> {
    Ok(HabitLog {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        habit_id: parse_uuid(&row.get::<String, _>("habit_id"))?,
        metric_id: parse_uuid(&row.get::<String, _>("metric_id"))?,
        completed: row.get("completed"),
        value: row.get("value"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::habit::{Habit, HabitType};

    async fn test_db() -> (tempfile::TempDir, SqliteDatabase) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("daystack_test.db");
        let db = SqliteDatabase::new(path.to_str().unwrap())
            .await
            .expect("database");
        (dir, db)
    }

    async fn seed_user(db: &SqliteDatabase) -> User {
        let user = User::new("tester@example.com".to_string());
        db.create_user(&user).await.expect("create user");
        user
    }

    fn sample_habit(user_id: Uuid, name: &str, order: i64) -> Habit {
        let now = Utc::now();
        Habit {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            habit_type: HabitType::Boolean,
            target: None,
            color: "#10B981".to_string(),
            display_order: order,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn metric_upsert_keeps_one_row_per_day() {
        let (_dir, db) = test_db().await;
        let user = seed_user(&db).await;
        let date = day(2026, 3, 10);

        let first = DailyMetric::new(user.id, date, 8, 6, 7, Some("good day".to_string()));
        let stored = db.upsert_daily_metric(&first).await.unwrap();
        assert_eq!(stored.momentum, 7.0);

        let second = DailyMetric::new(user.id, date, 3, 4, 5, None);
        let stored = db.upsert_daily_metric(&second).await.unwrap();

        // Same row, latest values, original id preserved.
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.mood, 3);
        assert_eq!(stored.note, None);
        assert!((stored.momentum - 4.0).abs() < 1e-9);

        let all = db.get_metrics_range(&user.id, date, date).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn ensure_metric_defaults_and_leaves_existing_untouched() {
        let (_dir, db) = test_db().await;
        let user = seed_user(&db).await;
        let date = day(2026, 3, 11);

        let created = db.ensure_daily_metric(&user.id, date).await.unwrap();
        assert_eq!(created.mood, 5);
        assert_eq!(created.momentum, 5.0);

        let explicit = DailyMetric::new(user.id, date, 9, 9, 9, None);
        db.upsert_daily_metric(&explicit).await.unwrap();

        let ensured = db.ensure_daily_metric(&user.id, date).await.unwrap();
        assert_eq!(ensured.mood, 9);
        assert_eq!(ensured.id, created.id);
    }

    #[tokio::test]
    async fn habit_log_upsert_is_single_row_latest_wins() {
        let (_dir, db) = test_db().await;
        let user = seed_user(&db).await;
        let habit = sample_habit(user.id, "Meditate", 0);
        db.create_habit(&habit).await.unwrap();
        let metric = db.ensure_daily_metric(&user.id, day(2026, 3, 12)).await.unwrap();

        let on = HabitLog::new(habit.id, metric.id, true, None);
        db.upsert_habit_log(&on).await.unwrap();
        let off = HabitLog::new(habit.id, metric.id, false, None);
        let stored = db.upsert_habit_log(&off).await.unwrap();

        assert!(!stored.completed);
        assert_eq!(stored.id, on.id);
        let logs = db.get_logs_for_metric(&metric.id).await.unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn soft_deleted_habits_hidden_but_logs_stay_joinable() {
        let (_dir, db) = test_db().await;
        let user = seed_user(&db).await;
        let habit = sample_habit(user.id, "Run", 0);
        db.create_habit(&habit).await.unwrap();
        let date = day(2026, 3, 13);
        let metric = db.ensure_daily_metric(&user.id, date).await.unwrap();
        db.upsert_habit_log(&HabitLog::new(habit.id, metric.id, true, None))
            .await
            .unwrap();

        db.soft_delete_habit(&habit.id, &user.id).await.unwrap();

        assert!(db.get_user_habits(&user.id).await.unwrap().is_empty());

        let entries = db.get_log_entries(&user.id, date, date).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].habit_name, "Run");
        assert!(entries[0].completed);
    }

    #[tokio::test]
    async fn reorder_is_atomic() {
        let (_dir, db) = test_db().await;
        let user = seed_user(&db).await;
        let a = sample_habit(user.id, "A", 0);
        let b = sample_habit(user.id, "B", 1);
        db.create_habit(&a).await.unwrap();
        db.create_habit(&b).await.unwrap();

        db.reorder_habits(&user.id, &[b.id, a.id]).await.unwrap();
        let habits = db.get_user_habits(&user.id).await.unwrap();
        assert_eq!(habits[0].id, b.id);
        assert_eq!(habits[1].id, a.id);

        // A batch containing an unknown id must leave the order unchanged.
        let err = db
            .reorder_habits(&user.id, &[a.id, Uuid::new_v4()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let habits = db.get_user_habits(&user.id).await.unwrap();
        assert_eq!(habits[0].id, b.id);
        assert_eq!(habits[1].id, a.id);
    }

    #[tokio::test]
    async fn login_token_is_single_use() {
        let (_dir, db) = test_db().await;
        let expires = Utc::now() + chrono::Duration::hours(24);
        db.store_login_token("tester@example.com", "hash123", expires)
            .await
            .unwrap();

        assert!(db
            .consume_login_token("tester@example.com", "hash123")
            .await
            .unwrap());
        assert!(!db
            .consume_login_token("tester@example.com", "hash123")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn session_tokens_revocation() {
        let (_dir, db) = test_db().await;
        let user = seed_user(&db).await;
        let expires = Utc::now() + chrono::Duration::days(30);
        db.store_session_token(&user.id, "jti-1", "hash-1", expires)
            .await
            .unwrap();
        db.store_session_token(&user.id, "jti-2", "hash-2", expires)
            .await
            .unwrap();

        assert_eq!(db.active_session_count(&user.id).await.unwrap(), 2);
        db.revoke_session("jti-1").await.unwrap();
        assert!(!db.is_session_active("jti-1").await.unwrap());
        assert!(db.is_session_active("jti-2").await.unwrap());

        db.revoke_all_user_sessions(&user.id).await.unwrap();
        assert_eq!(db.active_session_count(&user.id).await.unwrap(), 0);
    }
}
