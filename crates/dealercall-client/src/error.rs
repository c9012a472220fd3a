//! Error types for voice call operations

use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, CallError>;

/// Failures talking to the voice API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Non-2xx response carrying a provider message, surfaced verbatim
    #[error("{message}")]
    Provider { status: u16, message: String },

    /// Non-2xx response whose body had no usable message
    #[error("Voice API request failed with HTTP {status}")]
    Http { status: u16 },

    /// The request never reached the provider (refused, DNS, TLS)
    #[error("Network error: could not connect to the voice API ({0})")]
    Connect(String),

    /// The connection failed after the request may have been sent
    #[error("Network error: {0}")]
    Network(String),

    /// No response within the configured deadline
    #[error("Voice API request timed out after {0} ms")]
    Timeout(u64),

    /// 2xx response with a body we could not understand
    #[error("Failed to parse voice API response: {0}")]
    Parse(String),

    /// Request could not be built (bad URL, bad header value)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Map a reqwest failure, naming the deadline on timeouts
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(timeout_ms)
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else if err.is_decode() {
            TransportError::Parse(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }

    /// HTTP status of the provider's response, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Provider { status, .. } | TransportError::Http { status } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Message supplied by the provider, as opposed to a generic fallback
    pub fn provider_message(&self) -> Option<&str> {
        match self {
            TransportError::Provider { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Whether repeating the request is safe
    ///
    /// Connection failures never reached the provider and are always safe.
    /// Timeouts and dropped connections are only safe for idempotent reads.
    pub fn is_retryable(&self, idempotent: bool) -> bool {
        match self {
            TransportError::Connect(_) => true,
            TransportError::Timeout(_) | TransportError::Network(_) => idempotent,
            _ => false,
        }
    }
}

/// Errors surfaced by [`CallController`](crate::CallController)
///
/// Every variant is terminal for the attempt that raised it and leaves the
/// controller's tracked record as it was.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallError {
    /// Preflight for `initiate`: the configuration is unusable
    #[error("Voice calling is not properly configured: {}", .0.join(" "))]
    Configuration(Vec<String>),

    /// Status, cancel or history requested with an unusable configuration
    #[error("Voice calling is not configured: {}", .0.join(" "))]
    NotConfigured(Vec<String>),

    /// Preflight: the user has no phone number on file
    #[error("User phone number is required for making calls.")]
    MissingPhone,

    /// Preflight: the phone number on file cannot be dialled
    #[error("Phone number '{0}' is not a valid phone number.")]
    InvalidPhone(String),

    /// Another `initiate` on this controller has not resolved yet
    #[error("A call is already being placed.")]
    AlreadyCalling,

    /// Remote or network failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The cancellation request itself failed; the call may still be live
    #[error("Failed to cancel call: {0}")]
    Cancellation(TransportError),

    /// A cancel landed while `initiate` was still retrying; no call was placed
    #[error("The call was cancelled before it was placed.")]
    CancelledWhilePlacing,

    /// The call did not reach a terminal state before the deadline
    #[error("Timed out waiting for call {call_id} to finish")]
    WaitTimeout { call_id: String },
}

impl CallError {
    /// Whether the caller may usefully try again without changing anything
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CallError::Transport(_)
                | CallError::Cancellation(_)
                | CallError::AlreadyCalling
                | CallError::WaitTimeout { .. }
        )
    }

    /// Underlying transport error, if any
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            CallError::Transport(e) | CallError::Cancellation(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_message_is_verbatim() {
        let err = CallError::from(TransportError::Provider {
            status: 500,
            message: "rate_limited".into(),
        });
        assert_eq!(err.to_string(), "rate_limited");
        assert_eq!(err.transport().and_then(|t| t.status()), Some(500));
        assert_eq!(
            err.transport().and_then(|t| t.provider_message()),
            Some("rate_limited")
        );
    }

    #[test]
    fn test_generic_messages() {
        assert_eq!(
            TransportError::Http { status: 502 }.to_string(),
            "Voice API request failed with HTTP 502"
        );
        assert!(TransportError::Network("reset".into())
            .to_string()
            .starts_with("Network error"));
        assert_eq!(TransportError::Http { status: 502 }.provider_message(), None);
    }

    #[test]
    fn test_retry_classification() {
        let connect = TransportError::Connect("refused".into());
        let timeout = TransportError::Timeout(100);
        let provider = TransportError::Provider {
            status: 503,
            message: "busy".into(),
        };

        assert!(connect.is_retryable(false));
        assert!(connect.is_retryable(true));
        assert!(!timeout.is_retryable(false));
        assert!(timeout.is_retryable(true));
        assert!(!provider.is_retryable(true));
    }

    #[test]
    fn test_configuration_message_lists_errors() {
        let err = CallError::Configuration(vec!["A is required.".into(), "B is required.".into()]);
        assert_eq!(
            err.to_string(),
            "Voice calling is not properly configured: A is required. B is required."
        );
        assert!(!err.is_retryable());
    }
}
