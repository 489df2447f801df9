//! Error taxonomy for the proxying layer.

use thiserror::Error;

/// Broad category of a [`ProxyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad instance address; fatal at construction.
    Configuration,
    /// Rejected before reaching the network (open circuit, expired deadline).
    Admission,
    /// A single attempt failed on the wire or in the codec.
    Transport,
    /// The retry budget ran out.
    Exhaustion,
    /// Nothing to dispatch to.
    NoInstances,
}

/// Errors that can occur while proxying a call.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Instance address could not be normalized into a URL.
    #[error("invalid instance address '{address}': {reason}")]
    InvalidInstance { address: String, reason: String },

    /// Circuit breaker is open (or a half-open trial is already in flight).
    #[error("circuit open for {instance}")]
    CircuitOpen { instance: String },

    /// Caller-supplied deadline expired before the call completed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Connection or protocol failure talking to an instance.
    #[error("transport error calling {instance}: {message}")]
    Transport { instance: String, message: String },

    /// Outbound call did not complete within the per-call timeout.
    #[error("call to {instance} timed out after {after_ms}ms")]
    Timeout { instance: String, after_ms: u64 },

    /// Instance answered with a non-success status.
    #[error("{instance} returned status {status}")]
    UpstreamStatus { instance: String, status: u16 },

    /// Request encoding or response decoding failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// Retry budget consumed; carries the last attempt's error.
    #[error("retry budget exhausted after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<ProxyError>,
    },

    /// Load balancer was handed an empty snapshot.
    #[error("no instances available")]
    NoInstances,
}

impl ProxyError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProxyError::InvalidInstance { .. } => ErrorKind::Configuration,
            ProxyError::CircuitOpen { .. } | ProxyError::DeadlineExceeded => ErrorKind::Admission,
            ProxyError::Transport { .. }
            | ProxyError::Timeout { .. }
            | ProxyError::UpstreamStatus { .. }
            | ProxyError::Codec(_) => ErrorKind::Transport,
            ProxyError::Exhausted { .. } => ErrorKind::Exhaustion,
            ProxyError::NoInstances => ErrorKind::NoInstances,
        }
    }

    /// Whether another attempt (possibly on another instance) may succeed.
    ///
    /// An open circuit is retryable because the next pick usually lands on
    /// a different instance.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProxyError::CircuitOpen { .. }
                | ProxyError::Transport { .. }
                | ProxyError::Timeout { .. }
                | ProxyError::UpstreamStatus { .. }
                | ProxyError::Codec(_)
        )
    }

    /// The error of the final attempt, looking through [`ProxyError::Exhausted`].
    pub fn last_attempt(&self) -> &ProxyError {
        match self {
            ProxyError::Exhausted { last, .. } => last.last_attempt(),
            other => other,
        }
    }
}

/// Result type for proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProxyError::Timeout {
            instance: "a.test:9000".into(),
            after_ms: 250,
        };
        assert_eq!(err.to_string(), "call to a.test:9000 timed out after 250ms");

        let err = ProxyError::Exhausted {
            attempts: 3,
            last: Box::new(ProxyError::UpstreamStatus {
                instance: "b.test:9000".into(),
                status: 503,
            }),
        };
        assert!(err.to_string().contains("3 attempt(s)"));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_retry_classification() {
        assert!(ProxyError::CircuitOpen { instance: "a".into() }.is_retryable());
        assert!(ProxyError::Codec("bad json".into()).is_retryable());
        assert!(!ProxyError::NoInstances.is_retryable());
        assert!(!ProxyError::DeadlineExceeded.is_retryable());
        assert!(!ProxyError::InvalidInstance {
            address: "".into(),
            reason: "empty".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_last_attempt_unwraps_exhaustion() {
        let err = ProxyError::Exhausted {
            attempts: 2,
            last: Box::new(ProxyError::Transport {
                instance: "a".into(),
                message: "connection refused".into(),
            }),
        };
        assert_eq!(err.kind(), ErrorKind::Exhaustion);
        assert_eq!(err.last_attempt().kind(), ErrorKind::Transport);

        let plain = ProxyError::NoInstances;
        assert!(matches!(plain.last_attempt(), ProxyError::NoInstances));
    }
}
