//! Throttled auth email operations.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::provider::{EmailProvider, ProviderError};
use super::throttle::EmailThrottle;
use crate::ratelimit::{saturating_millis, Clock, Operation, SystemClock, ThrottleKey};

/// Why an email operation did not go out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailerError {
    /// The recipient used up this operation's budget for the current window
    #[error(
        "Too many {} attempts. Please wait {retry_after_secs} seconds before trying again.",
        .operation.describe()
    )]
    RateLimited {
        operation: Operation,
        retry_after_secs: u64,
    },

    /// The provider refused or could not be reached
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Remaining budget for one recipient and operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThrottleStatus {
    pub remaining: u32,
    pub reset_in_ms: u64,
}

/// Sends auth emails through a provider, throttled per recipient.
pub struct AuthMailer<P, C: Clock = SystemClock> {
    provider: P,
    throttle: EmailThrottle<C>,
    /// Landing page for password reset links
    redirect_to: Option<String>,
}

impl<P: EmailProvider, C: Clock> AuthMailer<P, C> {
    pub fn new(provider: P, throttle: EmailThrottle<C>) -> Self {
        Self {
            provider,
            throttle,
            redirect_to: None,
        }
    }

    pub fn with_redirect(mut self, redirect_to: Option<String>) -> Self {
        self.redirect_to = redirect_to;
        self
    }

    pub fn throttle(&self) -> &EmailThrottle<C> {
        &self.throttle
    }

    /// Send a password reset email to `email`.
    ///
    /// Counts against the password reset budget even when the provider fails.
    #[instrument(skip(self, email))]
    pub async fn request_password_reset(&self, email: &str) -> Result<(), MailerError> {
        self.admit(Operation::PasswordReset, email)?;

        self.provider
            .send_password_reset(email, self.redirect_to.as_deref())
            .await?;

        info!("Password reset email dispatched");
        Ok(())
    }

    /// Re-send the signup confirmation email to `email`.
    #[instrument(skip(self, email))]
    pub async fn resend_confirmation(&self, email: &str) -> Result<(), MailerError> {
        self.admit(Operation::SignupConfirmation, email)?;

        self.provider.resend_signup_confirmation(email).await?;

        info!("Confirmation email dispatched");
        Ok(())
    }

    /// Report the budget for `email` without consuming any.
    pub fn status(&self, operation: Operation, email: &str) -> ThrottleStatus {
        let key = ThrottleKey::new(operation, email).to_string();
        let limiter = self.throttle.limiter_for(operation);

        ThrottleStatus {
            remaining: limiter.remaining_requests(&key),
            reset_in_ms: saturating_millis(limiter.time_until_reset(&key)),
        }
    }

    fn admit(&self, operation: Operation, email: &str) -> Result<(), MailerError> {
        let key = ThrottleKey::new(operation, email).to_string();
        let limiter = self.throttle.limiter_for(operation);

        if limiter.is_allowed(&key) {
            return Ok(());
        }

        let retry_after_secs = whole_seconds(limiter.time_until_reset(&key));
        warn!(operation = %operation, retry_after_secs, "Throttled auth email");

        Err(MailerError::RateLimited {
            operation,
            retry_after_secs,
        })
    }
}

/// Round a wait up to whole seconds.
fn whole_seconds(wait: Duration) -> u64 {
    u64::try_from(wait.as_millis().div_ceil(1000)).unwrap_or(u64::MAX)
}
