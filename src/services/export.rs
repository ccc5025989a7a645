use crate::models::habit::Habit;
use crate::models::metric::{DailyMetric, HabitLogEntry};
use crate::models::user::UserResponse;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::json;

/// Lookback selector shared by both export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportRange {
    Days7,
    Days30,
    Days90,
    Year,
    All,
}

impl ExportRange {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "7d" => Some(ExportRange::Days7),
            "30d" => Some(ExportRange::Days30),
            "90d" => Some(ExportRange::Days90),
            "1y" => Some(ExportRange::Year),
            "all" => Some(ExportRange::All),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportRange::Days7 => "Last 7 days",
            ExportRange::Days30 => "Last 30 days",
            ExportRange::Days90 => "Last 90 days",
            ExportRange::Year => "Last year",
            ExportRange::All => "All time",
        }
    }

    /// Earliest date included, or None for an unbounded export.
    pub fn cutoff(&self, today: NaiveDate) -> Option<NaiveDate> {
        let days = match self {
            ExportRange::Days7 => 7,
            ExportRange::Days30 => 30,
            ExportRange::Days90 => 90,
            ExportRange::Year => 365,
            ExportRange::All => return None,
        };
        Some(today - Duration::days(days))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportCategory {
    Metrics,
    Habits,
    HabitLogs,
}

impl ExportCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "metrics" => Some(ExportCategory::Metrics),
            "habits" => Some(ExportCategory::Habits),
            "habit_logs" => Some(ExportCategory::HabitLogs),
            _ => None,
        }
    }

    pub fn filename(&self) -> &'static str {
        match self {
            ExportCategory::Metrics => "metrics.csv",
            ExportCategory::Habits => "habits.csv",
            ExportCategory::HabitLogs => "habit_logs.csv",
        }
    }
}

pub fn metrics_csv(metrics: &[DailyMetric]) -> String {
    let mut out = String::from("date,mood,energy,productivity,momentum,note\n");
    for metric in metrics {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            metric.date,
            metric.mood,
            metric.energy,
            metric.productivity,
            metric.momentum,
            csv_field(metric.note.as_deref().unwrap_or("")),
        ));
    }
    out
}

pub fn habits_csv(habits: &[Habit]) -> String {
    let mut out = String::from("id,name,type,target,color,display_order,created_at\n");
    for habit in habits {
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            habit.id,
            csv_field(&habit.name),
            habit.habit_type.as_str(),
            habit.target.map(|t| t.to_string()).unwrap_or_default(),
            habit.color,
            habit.display_order,
            habit.created_at.to_rfc3339(),
        ));
    }
    out
}

pub fn habit_logs_csv(entries: &[HabitLogEntry]) -> String {
    let mut out = String::from("date,habit_id,habit,completed,value\n");
    for entry in entries {
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            entry.date,
            entry.habit_id,
            csv_field(&entry.habit_name),
            entry.completed,
            entry.value.map(|v| v.to_string()).unwrap_or_default(),
        ));
    }
    out
}

/// Single bundled document: everything the CSVs carry plus an export header
/// and, optionally, the profile.
pub fn json_bundle(
    exported_at: DateTime<Utc>,
    range: ExportRange,
    habits: &[Habit],
    metrics: &[DailyMetric],
    entries: &[HabitLogEntry],
    profile: Option<&UserResponse>,
) -> serde_json::Value {
    let mut bundle = json!({
        "export_info": {
            "export_date": exported_at.to_rfc3339(),
            "range": range.label(),
            "format": "json",
        },
        "habits": habits,
        "metrics": metrics,
        "habit_logs": entries,
    });

    if let Some(profile) = profile {
        bundle["profile"] = json!(profile);
    }

    bundle
}

/// Fields containing commas, quotes, or newlines are quoted, with inner
/// quotes doubled.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
