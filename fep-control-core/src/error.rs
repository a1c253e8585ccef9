//! Error types for the FEP Control core.
//!
//! Uses `thiserror` for public API error types. `FleetError` is what every
//! collaborator call returns; command handlers turn it into an output record
//! instead of propagating it.

/// Top-level error type for the FEP Control core library.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Fleet error: {0}")]
    Fleet(#[from] FleetError),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors reported by the fleet (discovery, lifecycle, properties, RPC).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FleetError {
    #[error("system '{name}' is unreachable")]
    Unreachable { name: String },

    #[error("participant '{name}' is unknown")]
    UnknownParticipant { name: String },

    #[error("transition '{transition}' not allowed in state '{state}'")]
    Transition { transition: String, state: String },

    #[error("property '{path}' does not exist")]
    PropertyNotFound { path: String },

    #[error("RPC call failed: {message}")]
    Rpc { message: String },

    #[error("timing configuration failed: {message}")]
    Timing { message: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("{0}")]
    Other(String),
}

/// Convenience alias used across the library.
pub type Result<T> = std::result::Result<T, ControlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_fleet() {
        let err = ControlError::Fleet(FleetError::Unreachable {
            name: "demo".into(),
        });
        assert_eq!(err.to_string(), "Fleet error: system 'demo' is unreachable");
    }

    #[test]
    fn test_error_display_transition() {
        let err = FleetError::Transition {
            transition: "start".into(),
            state: "unloaded".into(),
        };
        assert_eq!(
            err.to_string(),
            "transition 'start' not allowed in state 'unloaded'"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ControlError = io.into();
        assert!(err.to_string().starts_with("IO error:"));
    }

    #[test]
    fn test_other_is_verbatim() {
        let err = FleetError::Other("connection reset".into());
        assert_eq!(err.to_string(), "connection reset");
    }
}
