use thiserror::Error;

/// All errors produced by soundsight-core.
#[derive(Debug, Error)]
pub enum SoundSightError {
    #[error("invalid detection {id}: {reason}")]
    InvalidDetection { id: u64, reason: String },

    #[error("unknown direction {label:?} on detection {id}")]
    UnknownDirection { id: u64, label: String },

    #[error("route has no steps")]
    EmptyRoute,

    #[error("no active route")]
    NoActiveRoute,

    #[error("unknown destination: {0}")]
    UnknownDestination(String),

    #[error("voice dispatcher is already listening")]
    AlreadyListening,

    #[error("voice dispatcher is not listening")]
    NotListening,

    #[error("detection loop is already running")]
    AlreadyRunning,

    #[error("detection loop is not running")]
    NotRunning,

    #[error("detection source error: {0}")]
    Source(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SoundSightError {
    /// Whether the caller can keep going with a degraded result.
    ///
    /// `UnknownDirection` still yields a centred cue; everything else means the
    /// requested output was not produced.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SoundSightError::UnknownDirection { .. })
    }
}

pub type Result<T> = std::result::Result<T, SoundSightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unknown_direction_is_recoverable() {
        let unknown = SoundSightError::UnknownDirection {
            id: 4,
            label: "up".into(),
        };
        assert!(unknown.is_recoverable());
        assert!(!SoundSightError::EmptyRoute.is_recoverable());
        assert!(!SoundSightError::InvalidDetection {
            id: 1,
            reason: "negative distance".into()
        }
        .is_recoverable());
    }

    #[test]
    fn display_includes_detection_context() {
        let err = SoundSightError::UnknownDirection {
            id: 9,
            label: "sideways".into(),
        };
        assert_eq!(
            err.to_string(),
            "unknown direction \"sideways\" on detection 9"
        );
    }
}
