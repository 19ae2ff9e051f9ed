//! Fixed-window rate limiting and its supporting pieces.

mod clock;
mod entry;
mod key;
mod limiter;
mod sweeper;

pub(crate) use clock::saturating_millis;
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::WindowEntry;
pub use key::{Operation, ThrottleKey};
pub use limiter::{LimitConfig, RateLimiter};
pub use sweeper::{spawn_sweeper, Sweep, DEFAULT_SWEEP_INTERVAL};
