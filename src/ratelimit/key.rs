//! Throttle key generation.

use std::fmt;
use std::str::FromStr;

/// An email-triggering operation that is throttled on its own budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Re-sending the signup confirmation email
    SignupConfirmation,
    /// Sending a password reset email
    PasswordReset,
}

impl Operation {
    /// The tag that prefixes keys for this operation.
    pub fn tag(&self) -> &'static str {
        match self {
            Operation::SignupConfirmation => "confirmation",
            Operation::PasswordReset => "password_reset",
        }
    }

    /// Human wording used in user-facing messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Operation::SignupConfirmation => "confirmation email",
            Operation::PasswordReset => "password reset",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmation" => Ok(Operation::SignupConfirmation),
            "password_reset" => Ok(Operation::PasswordReset),
            other => Err(format!("unknown operation: {}", other)),
        }
    }
}

/// A key identifying one recipient's budget for one operation.
///
/// Rendered as `{tag}_{recipient}`. The recipient is used verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThrottleKey {
    pub operation: Operation,
    pub recipient: String,
}

impl ThrottleKey {
    pub fn new(operation: Operation, recipient: impl Into<String>) -> Self {
        Self {
            operation,
            recipient: recipient.into(),
        }
    }
}

impl fmt::Display for ThrottleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.operation.tag(), self.recipient)
    }
}
