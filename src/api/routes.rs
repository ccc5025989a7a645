use crate::api::types::*;
use crate::database::sqlite::{SqliteDatabase, GLOBAL_DB};
use crate::errors::{AppError, Result};
use crate::models::habit::{Habit, HabitType};
use crate::models::metric::{DailyMetric, HabitLog};
use crate::models::user::UserResponse;
use crate::services::auth::{AuthService, LinkDelivery};
use crate::services::export::{self, ExportCategory, ExportRange};
use crate::services::jwt::{AuthenticatedUser, SESSION_LIFETIME_DAYS};
use crate::services::oauth::GoogleOAuth;
use crate::services::stats::{self, DaySnapshot, SummaryPeriod, DEFAULT_LOOKBACK_DAYS};
use crate::utils::middleware::require_session;
use crate::utils::validation::Validator;
use axum::extract::{Path, Query};
use axum::http::{header::AUTHORIZATION, request::Parts, StatusCode};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{extract::FromRequestParts, middleware, Extension, Json, Router};
use chrono::{Duration, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Bearer token extractor for the auth endpoints that operate on the raw
/// session token.
pub struct AuthBearer(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthBearer
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        if let Some(auth) = parts.headers.get(AUTHORIZATION) {
            if let Ok(auth_str) = auth.to_str() {
                if let Some(token) = auth_str.strip_prefix("Bearer ") {
                    return Ok(AuthBearer(token.to_string()));
                }
            }
        }
        Err((
            StatusCode::UNAUTHORIZED,
            "Missing or invalid Authorization header".to_string(),
        ))
    }
}

/// Public auth endpoints.
pub fn auth_router() -> Router {
    Router::new()
        .route("/email/request", post(email_login_request))
        .route("/email/callback", get(email_login_callback))
        .route("/google/callback", post(google_login_callback))
        .route("/validate", post(validate))
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
        .route("/sessions", get(sessions))
}

pub fn habits_router() -> Router {
    Router::new()
        .route("/", get(list_habits).post(create_habit))
        .route("/:id", put(update_habit).delete(delete_habit))
        .route("/reorder", post(reorder_habits))
        .route("/log", post(update_habit_log))
        .route_layer(middleware::from_fn(require_session))
}

pub fn metrics_router() -> Router {
    Router::new()
        .route("/", put(upsert_metric))
        .route("/day", get(get_day))
        .route("/range", get(get_range))
        .route_layer(middleware::from_fn(require_session))
}

pub fn insights_router() -> Router {
    Router::new()
        .route("/habits", get(habit_insights))
        .route("/summary", get(period_summary))
        .route("/trends", get(metric_trends))
        .route_layer(middleware::from_fn(require_session))
}

pub fn export_router() -> Router {
    Router::new()
        .route("/json", get(export_json))
        .route("/csv", get(export_csv))
        .route_layer(middleware::from_fn(require_session))
}

pub fn profile_router() -> Router {
    Router::new()
        .route(
            "/",
            get(get_profile).put(update_profile).delete(delete_profile),
        )
        .route_layer(middleware::from_fn(require_session))
}

fn db() -> Result<Arc<SqliteDatabase>> {
    GLOBAL_DB
        .get()
        .cloned()
        .ok_or_else(|| AppError::InternalError("Database not initialised".to_string()))
}

fn auth_service() -> Result<AuthService> {
    AuthService::new(db()?)
}

fn session_response(user: crate::models::user::User, token: String) -> SessionResponse {
    SessionResponse {
        token,
        expires_in: (SESSION_LIFETIME_DAYS * 86400) as u64,
        user: user.into(),
    }
}

// ----- auth -----

#[utoipa::path(post, path = "/api/auth/email/request", request_body = EmailLoginRequest,
    responses((status = 200, body = EmailLoginResponse), (status = 400, description = "Invalid email")),
    tag = "Auth")]
pub async fn email_login_request(
    Json(req): Json<EmailLoginRequest>,
) -> Result<Json<EmailLoginResponse>> {
    let email = req.email.trim().to_lowercase();
    Validator::validate_email(&email)?;

    let delivery = auth_service()?.begin_email_login(&email).await?;
    let (message, dev_link) = match delivery {
        LinkDelivery::Sent => ("Check your email for a sign-in link".to_string(), None),
        LinkDelivery::Logged { link } => (
            "Email transport not configured; use the returned link".to_string(),
            Some(link),
        ),
    };

    Ok(Json(EmailLoginResponse { message, dev_link }))
}

#[utoipa::path(get, path = "/api/auth/email/callback", params(EmailCallbackQuery),
    responses((status = 200, body = SessionResponse), (status = 401, description = "Invalid or expired link")),
    tag = "Auth")]
pub async fn email_login_callback(
    Query(query): Query<EmailCallbackQuery>,
) -> Result<Json<SessionResponse>> {
    let email = query.email.trim().to_lowercase();
    let (user, token) = match auth_service()?.complete_email_login(&email, &query.token).await {
        Ok(session) => session,
        Err(e) => {
            error!(action = "email_signin_failed", email = %email, error = %e);
            return Err(e);
        }
    };

    info!(action = "email_signin_success", user_id = %user.id);
    Ok(Json(session_response(user, token)))
}

#[utoipa::path(post, path = "/api/auth/google/callback", request_body = GoogleCallbackRequest,
    responses((status = 200, body = SessionResponse), (status = 401, description = "Code exchange failed")),
    tag = "Auth")]
pub async fn google_login_callback(
    Json(req): Json<GoogleCallbackRequest>,
) -> Result<Json<SessionResponse>> {
    let oauth = GoogleOAuth::from_env()?;
    let profile = oauth.exchange_code(&req.code, &req.redirect_uri).await?;

    let (user, token) = match auth_service()?.complete_google_login(&profile).await {
        Ok(session) => session,
        Err(e) => {
            error!(action = "google_signin_failed", email = %profile.email, error = %e);
            return Err(e);
        }
    };

    info!(action = "google_signin_success", user_id = %user.id);
    Ok(Json(session_response(user, token)))
}

#[utoipa::path(post, path = "/api/auth/validate", request_body = TokenRequest,
    responses((status = 200, body = ValidateResponse)), tag = "Auth")]
pub async fn validate(Json(req): Json<TokenRequest>) -> Result<Json<ValidateResponse>> {
    match auth_service()?.validate_token(&req.token).await {
        Ok(user) => Ok(Json(ValidateResponse {
            valid: true,
            user_id: Some(user.user_id),
            email: Some(user.email),
            name: user.name,
        })),
        Err(_) => Ok(Json(ValidateResponse {
            valid: false,
            user_id: None,
            email: None,
            name: None,
        })),
    }
}

#[utoipa::path(post, path = "/api/auth/logout", request_body = TokenRequest,
    responses((status = 200, body = LogoutResponse), (status = 401, description = "Unknown session")),
    tag = "Auth")]
pub async fn logout(Json(req): Json<TokenRequest>) -> Result<Json<LogoutResponse>> {
    auth_service()?.logout(&req.token).await?;
    Ok(Json(LogoutResponse {
        message: "Logged out successfully".to_string(),
    }))
}

#[utoipa::path(post, path = "/api/auth/logout-all", request_body = TokenRequest,
    responses((status = 200, body = LogoutResponse), (status = 401, description = "Unknown session")),
    tag = "Auth")]
pub async fn logout_all(Json(req): Json<TokenRequest>) -> Result<Json<LogoutResponse>> {
    auth_service()?.logout_all_devices(&req.token).await?;
    Ok(Json(LogoutResponse {
        message: "Logged out all sessions successfully".to_string(),
    }))
}

#[utoipa::path(get, path = "/api/auth/sessions",
    responses((status = 200, body = SessionsResponse), (status = 401, description = "Unauthorized")),
    tag = "Auth")]
pub async fn sessions(AuthBearer(token): AuthBearer) -> Result<Json<SessionsResponse>> {
    let service = auth_service()?;
    let user = service.validate_token(&token).await?;
    let active_sessions = service.active_session_count(&user.user_id).await?;
    Ok(Json(SessionsResponse { active_sessions }))
}

// ----- habits -----

#[utoipa::path(get, path = "/api/habits",
    responses((status = 200, body = [Habit]), (status = 401, description = "Unauthorized")),
    tag = "Habits")]
pub async fn list_habits(
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Habit>>> {
    let habits = db()?.get_user_habits(&user.user_id).await?;
    Ok(Json(habits))
}

#[utoipa::path(post, path = "/api/habits", request_body = CreateHabitRequest,
    responses((status = 200, body = Habit), (status = 400, description = "Validation error")),
    tag = "Habits")]
pub async fn create_habit(
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<CreateHabitRequest>,
) -> Result<Json<Habit>> {
    Validator::validate_habit_name(&req.name)?;
    Validator::validate_color(&req.color)?;
    let target = match (req.habit_type, req.target) {
        (HabitType::Quantity, Some(target)) => {
            Validator::validate_target(target)?;
            Some(target)
        }
        _ => None,
    };

    let database = db()?;
    let next_order = database.max_display_order(&user.user_id).await? + 1;

    let now = Utc::now();
    let habit = Habit {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        name: req.name.trim().to_string(),
        habit_type: req.habit_type,
        target,
        color: req.color,
        display_order: next_order,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    database.create_habit(&habit).await?;

    info!(action = "habit_created", user_id = %user.user_id, habit_id = %habit.id);
    Ok(Json(habit))
}

#[utoipa::path(put, path = "/api/habits/{id}", request_body = UpdateHabitRequest,
    responses((status = 200, body = Habit), (status = 404, description = "Habit not found")),
    tag = "Habits", params(("id" = Uuid, Path, description = "Habit to update")))]
pub async fn update_habit(
    Extension(user): Extension<AuthenticatedUser>,
    Path(habit_id): Path<Uuid>,
    Json(req): Json<UpdateHabitRequest>,
) -> Result<Json<Habit>> {
    let database = db()?;
    let mut habit = match database.get_habit_by_id(&habit_id).await? {
        Some(habit) if habit.user_id == user.user_id => habit,
        _ => return Err(AppError::NotFound("Habit not found".to_string())),
    };

    if let Some(name) = req.name {
        Validator::validate_habit_name(&name)?;
        habit.name = name.trim().to_string();
    }
    if let Some(habit_type) = req.habit_type {
        habit.habit_type = habit_type;
    }
    if let Some(color) = req.color {
        Validator::validate_color(&color)?;
        habit.color = color;
    }
    if let Some(target) = req.target {
        Validator::validate_target(target)?;
        habit.target = Some(target);
    }
    // Boolean habits carry no target.
    if habit.habit_type == HabitType::Boolean {
        habit.target = None;
    }

    database.update_habit(&habit).await?;
    info!(action = "habit_updated", user_id = %user.user_id, habit_id = %habit.id);
    Ok(Json(habit))
}

#[utoipa::path(delete, path = "/api/habits/{id}",
    responses((status = 200, description = "Habit soft-deleted"), (status = 404, description = "Habit not found")),
    tag = "Habits", params(("id" = Uuid, Path, description = "Habit to delete")))]
pub async fn delete_habit(
    Extension(user): Extension<AuthenticatedUser>,
    Path(habit_id): Path<Uuid>,
) -> Result<StatusCode> {
    db()?.soft_delete_habit(&habit_id, &user.user_id).await?;
    info!(action = "habit_deleted", user_id = %user.user_id, habit_id = %habit_id);
    Ok(StatusCode::OK)
}

#[utoipa::path(post, path = "/api/habits/reorder", request_body = ReorderRequest,
    responses((status = 200, body = [Habit]), (status = 404, description = "Unknown habit in batch")),
    tag = "Habits")]
pub async fn reorder_habits(
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<Vec<Habit>>> {
    let database = db()?;
    database.reorder_habits(&user.user_id, &req.habit_ids).await?;
    info!(action = "habits_reordered", user_id = %user.user_id, count = req.habit_ids.len());
    Ok(Json(database.get_user_habits(&user.user_id).await?))
}

#[utoipa::path(post, path = "/api/habits/log", request_body = UpdateLogRequest,
    responses((status = 200, body = HabitLog), (status = 404, description = "Habit not found")),
    tag = "Habits")]
pub async fn update_habit_log(
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<UpdateLogRequest>,
) -> Result<Json<HabitLog>> {
    let date = Validator::parse_date(&req.date)?;
    if let Some(value) = req.value {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::ValidationError(
                "Value must be a non-negative number".to_string(),
            ));
        }
    }

    let database = db()?;
    match database.get_habit_by_id(&req.habit_id).await? {
        Some(habit) if habit.user_id == user.user_id => {}
        _ => return Err(AppError::NotFound("Habit not found".to_string())),
    }

    // A day with no metric entry gets one with neutral scores first.
    let metric = database.ensure_daily_metric(&user.user_id, date).await?;
    let log = database
        .upsert_habit_log(&HabitLog::new(req.habit_id, metric.id, req.completed, req.value))
        .await?;

    info!(action = "habit_log_updated", user_id = %user.user_id, habit_id = %req.habit_id, date = %date);
    Ok(Json(log))
}

// ----- metrics -----

#[utoipa::path(put, path = "/api/metrics", request_body = UpsertMetricRequest,
    responses((status = 200, body = DailyMetric), (status = 400, description = "Validation error")),
    tag = "Metrics")]
pub async fn upsert_metric(
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<UpsertMetricRequest>,
) -> Result<Json<DailyMetric>> {
    let date = Validator::parse_date(&req.date)?;
    Validator::validate_score("mood", req.mood)?;
    Validator::validate_score("energy", req.energy)?;
    Validator::validate_score("productivity", req.productivity)?;
    if let Some(note) = &req.note {
        Validator::validate_note(note)?;
    }

    let metric = DailyMetric::new(
        user.user_id,
        date,
        req.mood,
        req.energy,
        req.productivity,
        req.note,
    );
    let stored = db()?.upsert_daily_metric(&metric).await?;

    info!(action = "metric_saved", user_id = %user.user_id, date = %date);
    Ok(Json(stored))
}

#[utoipa::path(get, path = "/api/metrics/day", params(DayQuery),
    responses((status = 200, description = "The day's metric with its habit logs, or null")),
    tag = "Metrics")]
pub async fn get_day(
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Option<DayResponse>>> {
    let date = Validator::parse_date(&query.date)?;
    let database = db()?;

    let metric = match database.get_metric_for_day(&user.user_id, date).await? {
        Some(metric) => metric,
        None => return Ok(Json(None)),
    };

    let day = attach_logs(&database, metric).await?;
    Ok(Json(Some(day)))
}

#[utoipa::path(get, path = "/api/metrics/range", params(RangeQuery),
    responses((status = 200, body = [DayResponse]), (status = 400, description = "Invalid range")),
    tag = "Metrics")]
pub async fn get_range(
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<DayResponse>>> {
    let start = Validator::parse_date(&query.start)?;
    let end = Validator::parse_date(&query.end)?;
    Validator::validate_date_range(start, end)?;

    let database = db()?;
    let metrics = database.get_metrics_range(&user.user_id, start, end).await?;

    let mut days = Vec::with_capacity(metrics.len());
    for metric in metrics {
        days.push(attach_logs(&database, metric).await?);
    }

    Ok(Json(days))
}

async fn attach_logs(database: &SqliteDatabase, metric: DailyMetric) -> Result<DayResponse> {
    let logs = database.get_logs_for_metric(&metric.id).await?;
    let mut habit_logs = Vec::with_capacity(logs.len());
    for log in logs {
        let habit = database
            .get_habit_by_id(&log.habit_id)
            .await?
            .ok_or_else(|| AppError::DatabaseError("Log references missing habit".to_string()))?;
        habit_logs.push(LoggedHabit { log, habit });
    }

    Ok(DayResponse { metric, habit_logs })
}

// ----- insights -----

#[utoipa::path(get, path = "/api/insights/habits", params(WindowQuery),
    responses((status = 200, body = HabitInsightsResponse)), tag = "Insights")]
pub async fn habit_insights(
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<HabitInsightsResponse>> {
    let window_days = query.days.unwrap_or(DEFAULT_LOOKBACK_DAYS).clamp(1, 365);
    let today = Utc::now().date_naive();
    let start = today - Duration::days(window_days as i64 - 1);

    let database = db()?;
    let habits = database.get_user_habits(&user.user_id).await?;
    let entries = database.get_log_entries(&user.user_id, start, today).await?;

    let stats: Vec<_> = habits
        .iter()
        .map(|habit| stats::habit_statistics(habit, &entries, today, window_days))
        .collect();
    let overall = stats::overall_statistics(&stats);

    Ok(Json(HabitInsightsResponse {
        window_days,
        stats,
        overall,
    }))
}

#[utoipa::path(get, path = "/api/insights/summary", params(SummaryQuery),
    responses((status = 200, body = SummaryResponse), (status = 400, description = "Unknown period")),
    tag = "Insights")]
pub async fn period_summary(
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>> {
    let period_name = query.period.unwrap_or_else(|| "week".to_string());
    let period = SummaryPeriod::parse(&period_name).ok_or_else(|| {
        AppError::ValidationError("Period must be week, month, or quarter".to_string())
    })?;
    let window_days = query.days.unwrap_or(90).clamp(1, 730);

    let today = Utc::now().date_naive();
    let start = today - Duration::days(window_days as i64 - 1);
    let database = db()?;
    let snapshots = day_snapshots(&database, &user.user_id, start, today).await?;

    Ok(Json(SummaryResponse {
        period: period_name,
        summaries: stats::summarize_periods(&snapshots, period),
    }))
}

#[utoipa::path(get, path = "/api/insights/trends", params(WindowQuery),
    responses((status = 200, body = TrendsResponse)), tag = "Insights")]
pub async fn metric_trends(
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<TrendsResponse>> {
    let window_days = query.days.unwrap_or(DEFAULT_LOOKBACK_DAYS).clamp(1, 365);
    let today = Utc::now().date_naive();
    let start = today - Duration::days(window_days as i64 - 1);

    let database = db()?;
    let snapshots = day_snapshots(&database, &user.user_id, start, today).await?;

    Ok(Json(TrendsResponse {
        window_days,
        trends: stats::metric_trends(&snapshots),
    }))
}

/// Builds the day-ordered dashboard series: recorded days only, each with its
/// scores and habit completion counts.
async fn day_snapshots(
    database: &SqliteDatabase,
    user_id: &Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DaySnapshot>> {
    let metrics = database.get_metrics_range(user_id, start, end).await?;
    let entries = database.get_log_entries(user_id, start, end).await?;
    let total_habits = database.get_user_habits(user_id).await?.len() as u32;

    let mut completed_by_day: HashMap<NaiveDate, u32> = HashMap::new();
    for entry in &entries {
        if entry.completed {
            *completed_by_day.entry(entry.date).or_insert(0) += 1;
        }
    }

    Ok(metrics
        .into_iter()
        .map(|metric| DaySnapshot {
            date: metric.date,
            mood: metric.mood,
            energy: metric.energy,
            productivity: metric.productivity,
            momentum: metric.momentum,
            habits_completed: completed_by_day.get(&metric.date).copied().unwrap_or(0),
            total_habits,
        })
        .collect())
}

// ----- export -----

#[utoipa::path(get, path = "/api/export/json", params(ExportJsonQuery),
    responses((status = 200, description = "Bundled JSON export")), tag = "Export")]
pub async fn export_json(
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<ExportJsonQuery>,
) -> Result<Json<serde_json::Value>> {
    let range = parse_range(query.range.as_deref())?;
    let today = Utc::now().date_naive();
    let start = export_start(range, today);

    let database = db()?;
    let habits = database.get_user_habits(&user.user_id).await?;
    let metrics = database.get_metrics_range(&user.user_id, start, today).await?;
    let entries = database.get_log_entries(&user.user_id, start, today).await?;

    let profile = if query.include_profile.unwrap_or(false) {
        Some(UserResponse::from(
            database.get_user_by_id(&user.user_id).await?,
        ))
    } else {
        None
    };

    info!(action = "export_json", user_id = %user.user_id, range = range.label());
    Ok(Json(export::json_bundle(
        Utc::now(),
        range,
        &habits,
        &metrics,
        &entries,
        profile.as_ref(),
    )))
}

#[utoipa::path(get, path = "/api/export/csv", params(ExportCsvQuery),
    responses((status = 200, description = "CSV export for one data category")), tag = "Export")]
pub async fn export_csv(
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<ExportCsvQuery>,
) -> Result<Response> {
    let category = ExportCategory::parse(&query.category).ok_or_else(|| {
        AppError::ValidationError("Category must be metrics, habits, or habit_logs".to_string())
    })?;
    let range = parse_range(query.range.as_deref())?;
    let today = Utc::now().date_naive();
    let start = export_start(range, today);

    let database = db()?;
    let body = match category {
        ExportCategory::Metrics => {
            export::metrics_csv(&database.get_metrics_range(&user.user_id, start, today).await?)
        }
        ExportCategory::Habits => export::habits_csv(&database.get_user_habits(&user.user_id).await?),
        ExportCategory::HabitLogs => {
            export::habit_logs_csv(&database.get_log_entries(&user.user_id, start, today).await?)
        }
    };

    info!(action = "export_csv", user_id = %user.user_id, category = category.filename());
    Response::builder()
        .header("Content-Type", "text/csv")
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", category.filename()),
        )
        .body(axum::body::Body::from(body))
        .map_err(|e| AppError::InternalError(format!("Failed to build response: {}", e)))
}

fn parse_range(value: Option<&str>) -> Result<ExportRange> {
    match value {
        None => Ok(ExportRange::Days30),
        Some(value) => ExportRange::parse(value).ok_or_else(|| {
            AppError::ValidationError("Range must be 7d, 30d, 90d, 1y, or all".to_string())
        }),
    }
}

fn export_start(range: ExportRange, today: NaiveDate) -> NaiveDate {
    range
        .cutoff(today)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(today))
}

// ----- profile -----

#[utoipa::path(get, path = "/api/profile",
    responses((status = 200, body = UserResponse), (status = 401, description = "Unauthorized")),
    tag = "Profile")]
pub async fn get_profile(
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<UserResponse>> {
    let record = db()?.get_user_by_id(&user.user_id).await?;
    Ok(Json(record.into()))
}

#[utoipa::path(put, path = "/api/profile", request_body = UpdateProfileRequest,
    responses((status = 200, body = UserResponse), (status = 400, description = "Validation error")),
    tag = "Profile")]
pub async fn update_profile(
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>> {
    let database = db()?;
    let mut record = database.get_user_by_id(&user.user_id).await?;

    if let Some(name) = req.name {
        let name = name.trim().to_string();
        if name.is_empty() || name.len() > 100 {
            return Err(AppError::ValidationError(
                "Name must be between 1 and 100 characters".to_string(),
            ));
        }
        record.name = Some(name);
    }
    if let Some(image) = req.image {
        record.image = Some(image);
    }

    database.update_user_profile(&record).await?;
    info!(action = "profile_updated", user_id = %user.user_id);
    Ok(Json(record.into()))
}

#[utoipa::path(delete, path = "/api/profile",
    responses((status = 200, body = LogoutResponse), (status = 401, description = "Unauthorized")),
    tag = "Profile")]
pub async fn delete_profile(
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<LogoutResponse>> {
    let database = db()?;
    database.soft_delete_user(&user.user_id).await?;
    database.revoke_all_user_sessions(&user.user_id).await?;

    info!(action = "account_deleted", user_id = %user.user_id);
    Ok(Json(LogoutResponse {
        message: "Account deleted".to_string(),
    }))
}
