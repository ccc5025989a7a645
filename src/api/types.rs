use crate::models::habit::{Habit, HabitType};
use crate::models::metric::{DailyMetric, HabitLog};
use crate::models::user::UserResponse;
use crate::services::stats::{HabitStatistic, MetricTrend, OverallStats, PeriodSummary};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// ----- auth -----

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailLoginRequest {
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmailLoginResponse {
    pub message: String,
    /// Present only when no SMTP transport is configured (local development).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_link: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmailCallbackQuery {
    pub email: String,
    pub token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GoogleCallbackRequest {
    pub code: String,
    pub redirect_uri: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateResponse {
    pub valid: bool,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionsResponse {
    pub active_sessions: i64,
}

// ----- habits -----

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateHabitRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub habit_type: HabitType,
    pub target: Option<f64>,
    pub color: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateHabitRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub habit_type: Option<HabitType>,
    pub target: Option<f64>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderRequest {
    pub habit_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLogRequest {
    pub habit_id: Uuid,
    /// Calendar day, YYYY-MM-DD.
    pub date: String,
    pub completed: bool,
    pub value: Option<f64>,
}

// ----- metrics -----

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertMetricRequest {
    /// Calendar day, YYYY-MM-DD.
    pub date: String,
    pub mood: i64,
    pub energy: i64,
    pub productivity: i64,
    pub note: Option<String>,
}

/// A habit log together with the habit it belongs to; soft-deleted habits
/// still appear here on historical days.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoggedHabit {
    pub log: HabitLog,
    pub habit: Habit,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DayResponse {
    pub metric: DailyMetric,
    pub habit_logs: Vec<LoggedHabit>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DayQuery {
    /// Calendar day, YYYY-MM-DD.
    pub date: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RangeQuery {
    pub start: String,
    pub end: String,
}

// ----- insights -----

#[derive(Debug, Deserialize, IntoParams)]
pub struct WindowQuery {
    /// Lookback window in days; defaults to 30.
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SummaryQuery {
    /// week | month | quarter; defaults to week.
    pub period: Option<String>,
    /// Lookback window in days; defaults to 90.
    pub days: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HabitInsightsResponse {
    pub window_days: u32,
    pub stats: Vec<HabitStatistic>,
    pub overall: OverallStats,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SummaryResponse {
    pub period: String,
    pub summaries: Vec<PeriodSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrendsResponse {
    pub window_days: u32,
    pub trends: Vec<MetricTrend>,
}

// ----- export -----

#[derive(Debug, Deserialize, IntoParams)]
pub struct ExportJsonQuery {
    /// 7d | 30d | 90d | 1y | all; defaults to 30d.
    pub range: Option<String>,
    pub include_profile: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ExportCsvQuery {
    /// metrics | habits | habit_logs.
    pub category: String,
    /// 7d | 30d | 90d | 1y | all; defaults to 30d.
    pub range: Option<String>,
}

// ----- profile -----

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub image: Option<String>,
}
