use crate::errors::{AppError, Result};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// SMTP mailer for sign-in links. Configured entirely from the environment;
/// absent configuration means "no transport" and the caller decides what to
/// do with the link instead.
pub struct EmailService {
    smtp_host: String,
    smtp_port: u16,
    smtp_username: String,
    smtp_password: String,
    from_email: String,
}

impl EmailService {
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        let smtp_username = std::env::var("SMTP_USERNAME").ok()?;
        let smtp_password = std::env::var("SMTP_PASSWORD").ok()?;
        let smtp_port = std::env::var("SMTP_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(587);
        let from_email =
            std::env::var("EMAIL_FROM").unwrap_or_else(|_| "noreply@daystack.app".to_string());

        Some(Self {
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            from_email,
        })
    }

    pub fn send_magic_link(&self, to_email: &str, link: &str) -> Result<()> {
        let body = format!(
            "Sign in to DayStack\n\n\
             Click the link below to sign in to your account:\n\n{}\n\n\
             If you didn't request this email, you can safely ignore it.\n\
             This link will expire in 24 hours.\n",
            link
        );

        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e| AppError::EmailError(format!("From parse error: {}", e)))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| AppError::EmailError(format!("To parse error: {}", e)))?)
            .subject("Sign in to DayStack")
            .body(body)
            .map_err(|e| AppError::EmailError(format!("Message build error: {}", e)))?;

        let creds = Credentials::new(self.smtp_username.clone(), self.smtp_password.clone());

        let mailer = SmtpTransport::starttls_relay(&self.smtp_host)
            .map_err(|e| AppError::EmailError(format!("SMTP relay error: {}", e)))?
            .port(self.smtp_port)
            .credentials(creds)
            .build();

        mailer
            .send(&email)
            .map_err(|e| AppError::EmailError(format!("Send error: {}", e)))?;

        Ok(())
    }
}
