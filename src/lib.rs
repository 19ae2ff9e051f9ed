//! Mailgate - Throttled Auth Email Dispatch
//!
//! This crate sends password reset and signup confirmation emails through a
//! hosted identity provider, throttling each recipient with in-process
//! fixed-window rate limiters. Limits are per process and reset on restart.

pub mod config;
pub mod error;
pub mod http;
pub mod mailer;
pub mod ratelimit;
