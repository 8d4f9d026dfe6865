//! Error types for the replay engine.
//!
//! All errors are strongly typed using thiserror so callers can pattern match
//! on specific conditions (a rejected load, a replay that is already running)
//! instead of parsing messages.

use thiserror::Error;

use crate::ids::{ComboId, ReplayId};

/// Validation errors raised before any state is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid simulation result: {reason}")]
    InvalidResult {
        reason: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Execution errors raised while mutating the store or driving a replay.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Frame for day {day} references unknown combinations: {}", join_ids(.combo_ids))]
    UnknownCombo {
        day: u32,
        combo_ids: Vec<ComboId>,
    },

    #[error("Replay {replay_id} is already running")]
    AlreadyRunning {
        replay_id: ReplayId,
    },

    #[error("No replay is running")]
    NotRunning,

    #[error("Replay {replay_id} was cancelled")]
    ReplayCancelled {
        replay_id: ReplayId,
    },

    #[error("No simulation result is loaded")]
    NotLoaded,

    #[error("Channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Failed to spawn replay worker: {message}")]
    Spawn {
        message: String,
    },
}

/// Errors reported by the external collaborators that fetch and reset results.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        message: String,
    },

    #[error("Failed to deserialize response: {message}")]
    DeserializationFailed {
        message: String,
    },

    #[error("Server error (code {code}): {message}")]
    ServerError {
        code: u32,
        message: String,
    },
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum UpliftError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl UpliftError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Shorthand for an `InvalidResult` validation error.
    #[must_use]
    pub fn invalid_result(reason: impl Into<String>) -> Self {
        Self::Validation(ValidationError::InvalidResult {
            reason: reason.into(),
        })
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is a transport error.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if a frame referenced combinations the store does not hold.
    #[must_use]
    pub const fn is_unknown_combo(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::UnknownCombo { .. }))
    }

    /// Returns true if this error is retryable.
    ///
    /// `AlreadyRunning` is not retryable as-is: the caller has to cancel first.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Execution(e) => matches!(e, ExecutionError::Timeout { .. }),
            Self::Transport(e) => match e {
                TransportError::ConnectionFailed { .. } => true,
                TransportError::ServerError { code, .. } => *code >= 500,
                TransportError::DeserializationFailed { .. } => false,
            },
            Self::Internal { .. } => false,
        }
    }
}

fn join_ids(ids: &[ComboId]) -> String {
    ids.iter().map(ComboId::as_str).collect::<Vec<_>>().join(", ")
}

/// Result type alias for engine operations.
pub type UpliftResult<T> = Result<T, UpliftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_invalid_result() {
        let err = ValidationError::InvalidResult {
            reason: "frame day 3 is missing combination B".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("Invalid simulation result"));
        assert!(msg.contains("day 3"));
    }

    #[test]
    fn test_execution_error_unknown_combo_lists_ids() {
        let err = ExecutionError::UnknownCombo {
            day: 4,
            combo_ids: vec![ComboId::new("x"), ComboId::new("y")],
        };
        let msg = format!("{err}");
        assert!(msg.contains("day 4"));
        assert!(msg.contains("x, y"));
    }

    #[test]
    fn test_execution_error_already_running() {
        let id = ReplayId::new();
        let err = ExecutionError::AlreadyRunning { replay_id: id };
        assert!(format!("{err}").contains(&id.to_string()));
    }

    #[test]
    fn test_uplift_error_from_validation() {
        let err: UpliftError = ValidationError::InvalidConfig {
            reason: "bar_chart_limit must be positive".to_string(),
        }
        .into();
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_uplift_error_from_execution() {
        let err: UpliftError = ExecutionError::Timeout { duration_ms: 1000 }.into();
        assert!(err.is_execution());
        assert!(err.is_retryable());

        let err: UpliftError = ExecutionError::AlreadyRunning {
            replay_id: ReplayId::new(),
        }
        .into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_uplift_error_unknown_combo_predicate() {
        let err: UpliftError = ExecutionError::UnknownCombo {
            day: 1,
            combo_ids: vec![ComboId::new("z")],
        }
        .into();
        assert!(err.is_unknown_combo());
        assert!(!UpliftError::internal("x").is_unknown_combo());
    }

    #[test]
    fn test_uplift_error_transport_retryable() {
        let err: UpliftError = TransportError::ConnectionFailed {
            message: "refused".to_string(),
        }
        .into();
        assert!(err.is_transport());
        assert!(err.is_retryable());

        let err: UpliftError = TransportError::ServerError {
            code: 404,
            message: "missing".to_string(),
        }
        .into();
        assert!(!err.is_retryable());

        let err: UpliftError = TransportError::ServerError {
            code: 503,
            message: "busy".to_string(),
        }
        .into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_uplift_error_internal() {
        let err = UpliftError::internal("poisoned lock");
        assert!(err.is_internal());
        assert!(format!("{err}").contains("poisoned lock"));
    }
}
