//! Failure taxonomy for a single dispatch.

use thiserror::Error;

/// Why a dispatch did not produce a decoded agent response.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A required flag was absent or empty. No request was sent.
    #[error("less parameter: {flag}")]
    MissingParameter { flag: String },

    /// The request body could not be serialized.
    #[error("build request body for {url} failed: {source}")]
    PayloadBuildFailed {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The agent was unreachable, timed out, or answered with a non-200 status.
    #[error("http request to {url} failed: {cause}")]
    TransportFailed { url: String, cause: TransportFailure },

    /// The agent answered 200 but the body is not a valid result.
    #[error("unmarshal result `{body}` failed: {source}")]
    ResultDecodeFailed {
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DispatchError {
    /// Stable name of the error kind, used in logs and socket responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingParameter { .. } => "missing_parameter",
            Self::PayloadBuildFailed { .. } => "payload_build_failed",
            Self::TransportFailed { .. } => "transport_failed",
            Self::ResultDecodeFailed { .. } => "result_decode_failed",
        }
    }

    /// Whether retrying the same experiment could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransportFailed { .. })
    }
}

/// Transport-level cause of a [`DispatchError::TransportFailed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFailure {
    /// The call exceeded its deadline.
    #[error("timed out: {0}")]
    Timeout(String),
    /// Connection refused, DNS failure, broken pipe, oversized body.
    #[error("{0}")]
    Connection(String),
    /// The agent answered with something other than 200.
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        let err = DispatchError::MissingParameter { flag: "func".into() };
        assert_eq!(err.kind(), "missing_parameter");
        assert!(!err.is_transient());

        let err = DispatchError::TransportFailed {
            url: "http://localhost:9526/inject".into(),
            cause: TransportFailure::Timeout("deadline".into()),
        };
        assert_eq!(err.kind(), "transport_failed");
        assert!(err.is_transient());
    }

    #[test]
    fn test_display_carries_context() {
        let err = DispatchError::TransportFailed {
            url: "http://10.0.0.1:9526/recover".into(),
            cause: TransportFailure::Status {
                status: 503,
                body: "agent busy".into(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("http://10.0.0.1:9526/recover"));
        assert!(msg.contains("503"));
        assert!(msg.contains("agent busy"));
    }

    #[test]
    fn test_decode_error_keeps_raw_body() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = DispatchError::ResultDecodeFailed {
            body: "{oops".into(),
            source,
        };
        assert!(err.to_string().contains("{oops"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
