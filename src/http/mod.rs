//! HTTP surface for the throttled auth email operations.

mod handlers;
mod server;

use std::sync::Arc;

use crate::mailer::{AuthMailer, EmailProvider};
use crate::ratelimit::Clock;

pub use handlers::{router, ApiError, EmailRequest};
pub use server::HttpServer;

/// The mailer as wired into the HTTP layer.
pub type Mailer = AuthMailer<Arc<dyn EmailProvider>, Arc<dyn Clock>>;
