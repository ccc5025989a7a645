use crate::errors::{AppError, Result};
use serde::Deserialize;

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUserInfo {
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Thin client for Google's authorization-code flow. The heavy lifting
/// (consent screen, code issuance) happens on Google's side; this only
/// exchanges the code and reads the profile.
pub struct GoogleOAuth {
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

impl GoogleOAuth {
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID")
            .map_err(|_| AppError::ConfigError("GOOGLE_CLIENT_ID must be set".to_string()))?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET")
            .map_err(|_| AppError::ConfigError("GOOGLE_CLIENT_SECRET must be set".to_string()))?;

        Ok(Self {
            client_id,
            client_secret,
            http: reqwest::Client::new(),
        })
    }

    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<GoogleUserInfo> {
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::OAuthError(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::OAuthError(format!(
                "Token exchange rejected ({}): {}",
                status, body
            )));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::OAuthError(format!("Invalid token response: {}", e)))?;

        self.fetch_userinfo(&tokens.access_token).await
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<GoogleUserInfo> {
        let response = self
            .http
            .get(USERINFO_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::OAuthError(format!("Userinfo fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::OAuthError(format!(
                "Userinfo fetch rejected: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::OAuthError(format!("Invalid userinfo response: {}", e)))
    }
}
