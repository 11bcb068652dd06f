//! Error taxonomy for directory API operations.

use thiserror::Error;

use crate::transport::RpcFailure;

/// Result alias used across the client crates.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced by directory API operations.
///
/// The taxonomy separates problems that originate locally (bad input,
/// unresolvable references) from problems reported by the remote endpoint
/// (faults, connectivity). Remote faults are further split into recoverable
/// and fatal: a fatal fault means the session or server is in a state where
/// retrying the same request cannot succeed.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The caller supplied input that fails local validation.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// A referenced object could not be found.
    #[error("{0} was not found")]
    NotFound(String),

    /// A lookup that must identify exactly one object matched several.
    #[error("could not identify a unique {what}: {count} matches")]
    Ambiguous { what: String, count: usize },

    /// The endpoint reported a fault that does not invalidate the session.
    #[error("the directory service reported a fault [{code}]: {message}")]
    RemoteFault { code: String, message: String },

    /// The endpoint reported a fault that cannot be retried.
    #[error("the directory service reported a fatal fault [{code}]: {message}")]
    FatalFault { code: String, message: String },

    /// The endpoint could not be reached at all.
    #[error("cannot reach the directory service: {message}")]
    Connectivity {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The connected server is older than an operation requires.
    #[error("this operation requires server version {required}, but the connected server is {actual}")]
    UnsupportedVersion { required: String, actual: String },

    /// The session service accepted the request but returned no session.
    #[error("login failed: the session service returned no session")]
    InvalidCredentials,

    /// The endpoint answered with a payload the client cannot interpret.
    #[error("unexpected response from the directory service: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn ambiguous(what: impl Into<String>, count: usize) -> Self {
        Self::Ambiguous {
            what: what.into(),
            count,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// True when retrying the same request cannot succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalFault { .. } | Self::InvalidCredentials)
    }
}

impl From<RpcFailure> for ApiError {
    fn from(failure: RpcFailure) -> Self {
        match failure {
            RpcFailure::Fault(fault) if fault.is_fatal() => Self::FatalFault {
                code: fault.code,
                message: fault.message,
            },
            RpcFailure::Fault(fault) => Self::RemoteFault {
                code: fault.code,
                message: fault.message,
            },
            RpcFailure::Connection { message, source } => Self::Connectivity { message, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RpcFault;

    #[test]
    fn internal_server_faults_are_fatal() {
        let failure = RpcFailure::Fault(RpcFault {
            code: "axis2ns1:Server".to_string(),
            message: "Internal Error".to_string(),
            detail: None,
        });
        let error = ApiError::from(failure);
        assert!(matches!(error, ApiError::FatalFault { .. }));
        assert!(error.is_fatal());
    }

    #[test]
    fn named_faults_are_recoverable() {
        let failure = RpcFailure::fault("CTGIMS002E", "object not found");
        let error = ApiError::from(failure);
        assert!(matches!(error, ApiError::RemoteFault { .. }));
        assert!(!error.is_fatal());
    }

    #[test]
    fn fatal_code_with_ordinary_message_is_recoverable() {
        let failure = RpcFailure::fault("axis2ns1:Server", "quota exceeded");
        assert!(!ApiError::from(failure).is_fatal());
    }

    #[test]
    fn connection_failures_map_to_connectivity() {
        let failure = RpcFailure::connection("connection refused");
        assert!(matches!(
            ApiError::from(failure),
            ApiError::Connectivity { .. }
        ));
    }
}
