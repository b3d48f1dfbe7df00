//! Error taxonomy for the notification feed.

use thiserror::Error;

/// Every failure the feed can observe. None of these cross the facade as an
/// error; they end up in `FeedState::last_error` or are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// No bearer token or user id; the network call must not be attempted.
    #[error("session unavailable: {0}")]
    Auth(String),

    /// History request failed or returned a body of the wrong shape.
    #[error("history request failed: {0}")]
    Transport(String),

    /// Live channel transport failure.
    #[error("live channel error: {0}")]
    Connection(String),

    /// Frame that is not a JSON object. Expected and frequent, never surfaced.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}

impl FeedError {
    /// Returns `true` for errors that are dropped instead of recorded.
    #[must_use]
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::MalformedFrame(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let err = FeedError::Transport("unexpected status 502".into());
        assert_eq!(err.to_string(), "history request failed: unexpected status 502");
    }

    #[test]
    fn only_malformed_frames_are_silent() {
        assert!(FeedError::MalformedFrame("x".into()).is_silent());
        assert!(!FeedError::Auth("x".into()).is_silent());
        assert!(!FeedError::Transport("x".into()).is_silent());
        assert!(!FeedError::Connection("x".into()).is_silent());
    }
}
