use crate::database::sqlite::SqliteDatabase;
use crate::errors::{AppError, Result};
use crate::models::user::User;
use crate::services::email::EmailService;
use crate::services::jwt::{AuthenticatedUser, JwtManager, SESSION_LIFETIME_DAYS};
use crate::services::oauth::GoogleUserInfo;
use chrono::{Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

/// Magic-link tokens are valid for 24 hours, like the sign-in emails of the
/// original app.
const LOGIN_TOKEN_LIFETIME_HOURS: i64 = 24;

/// Outcome of a magic-link request: either the mail went out, or no SMTP
/// transport is configured and the link is handed back for local use.
pub enum LinkDelivery {
    Sent,
    Logged { link: String },
}

pub struct AuthService {
    jwt_manager: JwtManager,
    database: Arc<SqliteDatabase>,
}

impl AuthService {
    pub fn new(database: Arc<SqliteDatabase>) -> Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| AppError::ConfigError("JWT_SECRET must be set".to_string()))?;

        Ok(Self {
            jwt_manager: JwtManager::new(jwt_secret),
            database,
        })
    }

    /// Issues a single-use login token for the address and mails the sign-in
    /// link. The token is stored hashed; the plaintext only ever leaves the
    /// server inside the email (or the returned dev link).
    pub async fn begin_email_login(&self, email: &str) -> Result<LinkDelivery> {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(48)
            .map(char::from)
            .collect();

        let expires_at = Utc::now() + Duration::hours(LOGIN_TOKEN_LIFETIME_HOURS);
        self.database
            .store_login_token(email, &hash_token(&token), expires_at)
            .await?;
        let _ = self.database.cleanup_expired_login_tokens().await;

        let app_url =
            std::env::var("APP_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        let link = format!(
            "{}/api/auth/email/callback?email={}&token={}",
            app_url, email, token
        );

        let mailer = EmailService::from_env();
        match mailer {
            Some(mailer) => {
                mailer.send_magic_link(email, &link)?;
                tracing::info!(action = "magic_link_sent", email = %email);
                Ok(LinkDelivery::Sent)
            }
            None => {
                // No SMTP transport configured; surface the link for local
                // development instead of dropping the request.
                tracing::info!(action = "magic_link_logged", email = %email, link = %link);
                Ok(LinkDelivery::Logged { link })
            }
        }
    }

    /// Redeems a magic-link token and signs the user in, creating the account
    /// on first use.
    pub async fn complete_email_login(&self, email: &str, token: &str) -> Result<(User, String)> {
        let valid = self
            .database
            .consume_login_token(email, &hash_token(token))
            .await?;
        if !valid {
            return Err(AppError::AuthenticationError(
                "Sign-in link is invalid, expired, or already used".to_string(),
            ));
        }

        let user = match self.database.get_user_by_email(email).await? {
            Some(user) => user,
            None => {
                let mut user = User::new(email.to_string());
                user.email_verified_at = Some(Utc::now());
                self.database.create_user(&user).await?;
                tracing::info!(action = "user_created", email = %email, provider = "email");
                user
            }
        };

        let session = self.issue_session(&user).await?;
        Ok((user, session))
    }

    /// Signs in a user whose identity was asserted by Google, creating or
    /// refreshing the local account from the profile.
    pub async fn complete_google_login(&self, info: &GoogleUserInfo) -> Result<(User, String)> {
        if !info.email_verified {
            return Err(AppError::OAuthError(
                "Google account email is not verified".to_string(),
            ));
        }

        let user = match self.database.get_user_by_email(&info.email).await? {
            Some(mut user) => {
                user.name = info.name.clone().or(user.name);
                user.image = info.picture.clone().or(user.image);
                if user.email_verified_at.is_none() {
                    user.email_verified_at = Some(Utc::now());
                }
                self.database.update_user_profile(&user).await?;
                user
            }
            None => {
                let mut user = User::new(info.email.clone());
                user.name = info.name.clone();
                user.image = info.picture.clone();
                user.email_verified_at = Some(Utc::now());
                self.database.create_user(&user).await?;
                tracing::info!(action = "user_created", email = %info.email, provider = "google");
                user
            }
        };

        let session = self.issue_session(&user).await?;
        Ok((user, session))
    }

    async fn issue_session(&self, user: &User) -> Result<String> {
        let token = self
            .jwt_manager
            .generate_token(&user.id, &user.email, user.name.as_deref())?;

        let token_data = self.jwt_manager.validate_token(&token)?;
        let token_id = &token_data.claims.jti;
        let token_hash = hash_token(&token);
        let expires_at = Utc::now() + Duration::days(SESSION_LIFETIME_DAYS);

        self.database
            .store_session_token(&user.id, token_id, &token_hash, expires_at)
            .await?;
        let _ = self.database.cleanup_expired_sessions().await;

        Ok(token)
    }

    /// Full session check: signature, expiry, and the server-side active
    /// flag (so logout actually ends the session).
    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser> {
        let token_data = self.jwt_manager.validate_token(token)?;
        let token_id = &token_data.claims.jti;

        if !self.database.is_session_active(token_id).await? {
            return Err(AppError::AuthenticationError(
                "Session is no longer active".to_string(),
            ));
        }

        AuthenticatedUser::try_from(token_data.claims)
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        let token_data = self.jwt_manager.validate_token(token)?;
        self.database.revoke_session(&token_data.claims.jti).await
    }

    pub async fn logout_all_devices(&self, token: &str) -> Result<()> {
        let user = self.validate_token(token).await?;
        self.database.revoke_all_user_sessions(&user.user_id).await
    }

    pub async fn active_session_count(&self, user_id: &Uuid) -> Result<i64> {
        self.database.active_session_count(user_id).await
    }
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
