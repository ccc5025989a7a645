use crate::database::sqlite::GLOBAL_DB;
use crate::errors::AppError;
use crate::services::auth::AuthService;
use axum::{
    extract::Request,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Route-matching session gate. Layered onto the protected sub-routers so
/// every request under them carries a validated session; the authenticated
/// user is injected as a request extension for the handlers.
pub async fn require_session(mut request: Request, next: Next) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => {
            return AppError::AuthenticationError(
                "Missing or invalid Authorization header".to_string(),
            )
            .into_response();
        }
    };

    let db = match GLOBAL_DB.get() {
        Some(db) => db.clone(),
        None => {
            return AppError::InternalError("Database not initialised".to_string()).into_response();
        }
    };

    let auth_service = match AuthService::new(db) {
        Ok(service) => service,
        Err(e) => return e.into_response(),
    };

    match auth_service.validate_token(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}
