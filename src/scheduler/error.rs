//! Error types for the scheduler module

use std::fmt;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug)]
pub enum SchedulerError {
    /// A rotation or idle duration is unusable
    InvalidTiming { field: String, reason: String },

    /// Static mode was configured without any slot
    NoSlotsConfigured,

    /// The kiosk session actor is no longer running
    SessionClosed,

    /// An internal invariant was found broken (and repaired)
    InvariantViolation { reason: String },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTiming { field, reason } => {
                write!(f, "Invalid timing '{}': {}", field, reason)
            }
            Self::NoSlotsConfigured => {
                write!(f, "Static ad mode requires at least one slot")
            }
            Self::SessionClosed => {
                write!(f, "Kiosk session is closed")
            }
            Self::InvariantViolation { reason } => {
                write!(f, "Scheduler invariant violated: {}", reason)
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for SchedulerError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::SessionClosed
    }
}

impl SchedulerError {
    /// Create an invalid timing error
    pub fn invalid_timing(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTiming {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invariant violation error
    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            reason: reason.into(),
        }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_timing_error() {
        let err = SchedulerError::invalid_timing("ad_duration", "must be greater than zero");
        assert!(err.to_string().contains("ad_duration"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_invariant_is_recoverable() {
        let err = SchedulerError::invariant("two rotation timers armed");
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("two rotation timers"));
    }

    #[test]
    fn test_from_send_error() {
        let err: SchedulerError = tokio::sync::mpsc::error::SendError(1u8).into();
        assert!(matches!(err, SchedulerError::SessionClosed));
    }
}
