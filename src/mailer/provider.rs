//! Email provider trait for abstracting the hosted identity service.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Errors returned by an email provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider answered with a non-success status
    #[error("provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request never got a usable answer
    #[error("provider unreachable: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Transport(e.to_string())
    }
}

/// Sends auth emails on behalf of the service.
///
/// Implementations never throttle; that happens in
/// [`AuthMailer`](super::AuthMailer) before a provider is reached.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send a password reset email, optionally pointing the link at `redirect_to`.
    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), ProviderError>;

    /// Re-send the signup confirmation email.
    async fn resend_signup_confirmation(&self, email: &str) -> Result<(), ProviderError>;
}

#[async_trait]
impl<P: EmailProvider + ?Sized> EmailProvider for Arc<P> {
    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), ProviderError> {
        (**self).send_password_reset(email, redirect_to).await
    }

    async fn resend_signup_confirmation(&self, email: &str) -> Result<(), ProviderError> {
        (**self).resend_signup_confirmation(email).await
    }
}

/// A provider that only logs. Used when no hosted provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProvider;

#[async_trait]
impl EmailProvider for LogProvider {
    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), ProviderError> {
        info!(email = %email, redirect_to = ?redirect_to, "[dry-run] password reset email");
        Ok(())
    }

    async fn resend_signup_confirmation(&self, email: &str) -> Result<(), ProviderError> {
        info!(email = %email, "[dry-run] signup confirmation email");
        Ok(())
    }
}
