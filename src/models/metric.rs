use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One row per user per calendar day. `momentum` is always the arithmetic
/// mean of the three scores at the time of the last write.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DailyMetric {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub mood: i64,
    pub energy: i64,
    pub productivity: i64,
    pub momentum: f64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn momentum_of(mood: i64, energy: i64, productivity: i64) -> f64 {
    (mood + energy + productivity) as f64 / 3.0
}

/// Neutral midpoint used when a habit is logged against a day that has no
/// metric entry yet.
pub const DEFAULT_SCORE: i64 = 5;

impl DailyMetric {
    pub fn new(
        user_id: Uuid,
        date: NaiveDate,
        mood: i64,
        energy: i64,
        productivity: i64,
        note: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            date,
            mood,
            energy,
            productivity,
            momentum: momentum_of(mood, energy, productivity),
            note,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_defaults(user_id: Uuid, date: NaiveDate) -> Self {
        Self::new(user_id, date, DEFAULT_SCORE, DEFAULT_SCORE, DEFAULT_SCORE, None)
    }
}

/// Per-day completion record for one habit, unique per (habit, metric).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HabitLog {
    pub id: Uuid,
    pub habit_id: Uuid,
    pub metric_id: Uuid,
    pub completed: bool,
    pub value: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HabitLog {
    pub fn new(habit_id: Uuid, metric_id: Uuid, completed: bool, value: Option<f64>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            habit_id,
            metric_id,
            completed,
            value,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A habit log flattened with its calendar day and owning habit's name, the
/// shape the statistics and export code consume.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HabitLogEntry {
    pub date: NaiveDate,
    pub habit_id: Uuid,
    pub habit_name: String,
    pub completed: bool,
    pub value: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn momentum_is_mean_of_scores() {
        assert_eq!(momentum_of(8, 6, 7), 7.0);
        assert_eq!(momentum_of(5, 5, 5), 5.0);
        assert!((momentum_of(1, 2, 2) - 5.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn default_metric_uses_neutral_scores() {
        let metric = DailyMetric::with_defaults(
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        );
        assert_eq!(metric.mood, 5);
        assert_eq!(metric.energy, 5);
        assert_eq!(metric.productivity, 5);
        assert_eq!(metric.momentum, 5.0);
        assert!(metric.note.is_none());
    }
}
