//! Gateway error classification.

use thiserror::Error;

/// Closed classification of every failure the delivery pipeline can raise.
///
/// Collaborators map their underlying library errors into one of these
/// variants at the boundary; the dispatch loop switches on the variant to
/// decide between retrying and terminating. Nothing is ever swallowed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// 401/403 on a request/response exchange. Unrecoverable.
    #[error("invalid client credentials")]
    InvalidCredentials,

    /// Any other 4xx on a request/response exchange. Unrecoverable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// 5xx on a request/response exchange. Recoverable after a while.
    #[error("server error: HTTP {0}")]
    ServerError(u16),

    /// A network call exceeded its configured timeout. Recoverable.
    #[error("request timed out")]
    Timeout,

    /// Network-level failure other than a timeout. Recoverable.
    #[error("connection error: {0}")]
    Connection(String),

    /// Authorization rejected while opening the streaming connection.
    /// Recoverable immediately via token refresh.
    #[error("authorization rejected at connect: {0}")]
    InvalidToken(String),

    /// Anything unclassified: unexpected status codes, mismatched
    /// acknowledgment ids, TLS-level failures. Unrecoverable.
    #[error("unrecoverable failure: {0}")]
    Generic(String),
}

/// Result type alias using GatewayError.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// How the dispatch loop reacts to a classified failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Terminate the process with the class's exit code.
    Abort,
    /// Sleep the configured backoff, then re-login and reconnect.
    RetryAfterBackoff,
    /// Re-login and reconnect immediately.
    RetryNow,
}

impl GatewayError {
    /// The recovery action the dispatch loop takes for this class.
    pub fn recovery(&self) -> Recovery {
        match self {
            GatewayError::InvalidCredentials
            | GatewayError::InvalidRequest(_)
            | GatewayError::Generic(_) => Recovery::Abort,
            GatewayError::ServerError(_)
            | GatewayError::Timeout
            | GatewayError::Connection(_) => Recovery::RetryAfterBackoff,
            GatewayError::InvalidToken(_) => Recovery::RetryNow,
        }
    }

    /// Process exit status for this class.
    pub fn exit_code(&self) -> i32 {
        match self {
            GatewayError::InvalidCredentials => 1,
            GatewayError::InvalidRequest(_) => 2,
            GatewayError::ServerError(_) => 3,
            GatewayError::Timeout => 4,
            GatewayError::InvalidToken(_) => 6,
            GatewayError::Connection(_) => 7,
            GatewayError::Generic(_) => 99,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecoverable_classes_abort() {
        assert_eq!(GatewayError::InvalidCredentials.recovery(), Recovery::Abort);
        assert_eq!(
            GatewayError::InvalidRequest("bad payload".into()).recovery(),
            Recovery::Abort
        );
        assert_eq!(
            GatewayError::Generic("unexpected status".into()).recovery(),
            Recovery::Abort
        );
    }

    #[test]
    fn transient_classes_retry_after_backoff() {
        assert_eq!(
            GatewayError::ServerError(503).recovery(),
            Recovery::RetryAfterBackoff
        );
        assert_eq!(GatewayError::Timeout.recovery(), Recovery::RetryAfterBackoff);
        assert_eq!(
            GatewayError::Connection("reset by peer".into()).recovery(),
            Recovery::RetryAfterBackoff
        );
    }

    #[test]
    fn invalid_token_retries_without_backoff() {
        assert_eq!(
            GatewayError::InvalidToken("401 at upgrade".into()).recovery(),
            Recovery::RetryNow
        );
    }

    #[test]
    fn exit_codes_are_distinct_per_class() {
        let codes = [
            GatewayError::InvalidCredentials.exit_code(),
            GatewayError::InvalidRequest(String::new()).exit_code(),
            GatewayError::ServerError(500).exit_code(),
            GatewayError::Timeout.exit_code(),
            GatewayError::InvalidToken(String::new()).exit_code(),
            GatewayError::Connection(String::new()).exit_code(),
            GatewayError::Generic(String::new()).exit_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            assert_ne!(*a, 0);
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn display_includes_context() {
        let err = GatewayError::ServerError(502);
        assert_eq!(format!("{}", err), "server error: HTTP 502");
    }
}
