use crate::database::sqlite::{SqliteDatabase, GLOBAL_DB};
use crate::errors::{AppError, Result};
use axum::http::Method;
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::Instrument;
use utoipa::{Modify, OpenApi};
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

pub mod routes;
pub mod types;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::email_login_request,
        routes::email_login_callback,
        routes::google_login_callback,
        routes::validate,
        routes::logout,
        routes::logout_all,
        routes::sessions,
        // Habit endpoints:
        routes::list_habits,
        routes::create_habit,
        routes::update_habit,
        routes::delete_habit,
        routes::reorder_habits,
        routes::update_habit_log,
        // Metric endpoints:
        routes::upsert_metric,
        routes::get_day,
        routes::get_range,
        // Insight endpoints:
        routes::habit_insights,
        routes::period_summary,
        routes::metric_trends,
        // Export endpoints:
        routes::export_json,
        routes::export_csv,
        // Profile endpoints:
        routes::get_profile,
        routes::update_profile,
        routes::delete_profile,
    ),
    components(
        schemas(
            types::EmailLoginRequest,
            types::EmailLoginResponse,
            types::GoogleCallbackRequest,
            types::SessionResponse,
            types::TokenRequest,
            types::ValidateResponse,
            types::LogoutResponse,
            types::SessionsResponse,
            types::CreateHabitRequest,
            types::UpdateHabitRequest,
            types::ReorderRequest,
            types::UpdateLogRequest,
            types::UpsertMetricRequest,
            types::LoggedHabit,
            types::DayResponse,
            types::HabitInsightsResponse,
            types::SummaryResponse,
            types::TrendsResponse,
            types::UpdateProfileRequest,

            crate::models::user::UserResponse,
            crate::models::habit::Habit,
            crate::models::habit::HabitType,
            crate::models::metric::DailyMetric,
            crate::models::metric::HabitLog,
            crate::models::metric::HabitLogEntry,
            crate::services::stats::HabitStatistic,
            crate::services::stats::OverallStats,
            crate::services::stats::DaySnapshot,
            crate::services::stats::PeriodSummary,
            crate::services::stats::TrendDirection,
            crate::services::stats::MetricTrend,
        )
    ),
    tags(
        (name = "Auth", description = "Sign-in via email magic link or Google, session management"),
        (name = "Habits", description = "Habit definitions and daily habit logs. Requires a Bearer session token."),
        (name = "Metrics", description = "Daily mood/energy/productivity records. Requires a Bearer session token."),
        (name = "Insights", description = "Streaks, completion rates, and period summaries. Requires a Bearer session token."),
        (name = "Export", description = "CSV and JSON data export. Requires a Bearer session token."),
        (name = "Profile", description = "Account profile management. Requires a Bearer session token.")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
        openapi.security = Some(vec![utoipa::openapi::security::SecurityRequirement::new(
            "bearerAuth",
            Vec::<String>::new(),
        )]);
    }
}

pub async fn request_id_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(request_id.clone());
    let span = tracing::info_span!("request", request_id = %request_id, method = %req.method(), uri = %req.uri());
    next.run(req).instrument(span).await
}

/// Main entry point for the DayStack API server. Sets up the database,
/// routes, middleware, and documentation endpoints.
pub async fn start_http_server() -> Result<()> {
    let openapi = ApiDoc::openapi();

    let db_path =
        std::env::var("DAYSTACK_DB_PATH").unwrap_or_else(|_| "data/daystack.db".to_string());
    let db = Arc::new(SqliteDatabase::new(&db_path).await?);
    GLOBAL_DB
        .set(db)
        .map_err(|_| AppError::InternalError("Database already initialised".to_string()))?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api/auth", routes::auth_router())
        .nest("/api/habits", routes::habits_router())
        .nest("/api/metrics", routes::metrics_router())
        .nest("/api/insights", routes::insights_router())
        .nest("/api/export", routes::export_router())
        .nest("/api/profile", routes::profile_router())
        .route("/health", axum::routing::get(health_check))
        // OpenAPI documentation routes
        .route("/docs/openapi.json", axum::routing::get(openapi_json))
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", openapi.clone()))
        .merge(Redoc::with_url("/api/redoc", openapi))
        .layer(cors)
        .layer(axum::middleware::from_fn(request_id_middleware));

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr: SocketAddr = format!("0.0.0.0:{}", port)
        .parse()
        .map_err(|e| AppError::ConfigError(format!("Invalid PORT: {}", e)))?;

    tracing::info!(action = "server_started", addr = %addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::InternalError(format!("Server error: {}", e)))?;

    Ok(())
}

async fn health_check() -> impl IntoResponse {
    "OK"
}

/// Export the OpenAPI specification as JSON.
async fn openapi_json() -> Json<Value> {
    let openapi = ApiDoc::openapi();
    Json(serde_json::to_value(openapi).unwrap_or_default())
}
