//! Throttled dispatch of transactional auth emails.

mod hosted;
mod provider;
mod service;
mod throttle;

pub use hosted::HostedAuthProvider;
pub use provider::{EmailProvider, LogProvider, ProviderError};
pub use service::{AuthMailer, MailerError, ThrottleStatus};
pub use throttle::EmailThrottle;
