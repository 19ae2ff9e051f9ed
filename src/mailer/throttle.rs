//! The pair of limiters guarding auth email dispatch.

use std::sync::Arc;

use crate::config::RateLimitingConfig;
use crate::ratelimit::{Clock, LimitConfig, Operation, RateLimiter, Sweep, SystemClock};

/// One limiter per throttled operation, each with its own key space.
pub struct EmailThrottle<C: Clock = SystemClock> {
    confirmation: Arc<RateLimiter<C>>,
    password_reset: Arc<RateLimiter<C>>,
}

impl EmailThrottle<SystemClock> {
    pub fn new(config: &RateLimitingConfig) -> Self {
        Self::with_clock(config.confirmation, config.password_reset, SystemClock)
    }
}

impl<C: Clock + Clone> EmailThrottle<C> {
    /// Build both limiters around one shared clock.
    pub fn with_clock(confirmation: LimitConfig, password_reset: LimitConfig, clock: C) -> Self {
        Self {
            confirmation: Arc::new(
                RateLimiter::with_clock(confirmation, clock.clone())
                    .with_name(Operation::SignupConfirmation.tag()),
            ),
            password_reset: Arc::new(
                RateLimiter::with_clock(password_reset, clock)
                    .with_name(Operation::PasswordReset.tag()),
            ),
        }
    }
}

impl<C: Clock> EmailThrottle<C> {
    /// The limiter that guards `operation`.
    pub fn limiter_for(&self, operation: Operation) -> &RateLimiter<C> {
        match operation {
            Operation::SignupConfirmation => self.confirmation.as_ref(),
            Operation::PasswordReset => self.password_reset.as_ref(),
        }
    }
}

impl<C: Clock + 'static> EmailThrottle<C> {
    /// Both limiters, for handing to the periodic sweeper.
    pub fn sweep_targets(&self) -> Vec<Arc<dyn Sweep>> {
        vec![
            self.confirmation.clone() as Arc<dyn Sweep>,
            self.password_reset.clone() as Arc<dyn Sweep>,
        ]
    }
}
