//! Transport contract for the remote object API.
//!
//! The directory application exposes a family of named sub-services, each
//! carrying named operations that take positional arguments. The transport
//! knows nothing about sessions, versions or result envelopes; it moves a
//! single request to a single sub-service and classifies what came back as
//! either a payload, a fault reported by the endpoint, or a connection
//! failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Sub-service names exposed by the directory application.
pub mod services {
    pub const SESSION: &str = "WSSessionService";
    pub const CONTAINER: &str = "WSOrganizationalContainerService";
    pub const PERSON: &str = "WSPersonService";
    pub const ROLE: &str = "WSRoleService";
    pub const SERVICE: &str = "WSServiceService";
    pub const PROVISIONING_POLICY: &str = "WSProvisioningPolicyService";
    pub const PASSWORD: &str = "WSPasswordService";
    pub const REQUEST: &str = "WSRequestService";
    pub const SYSTEM_USER: &str = "WSSystemUserService";
    pub const GROUP: &str = "WSGroupService";
    pub const SEARCH_DATA: &str = "WSSearchDataService";
}

/// Fault code the endpoint uses for unrecoverable internal errors.
pub const FATAL_FAULT_CODE: &str = "axis2ns1:Server";
/// Fault message accompanying [`FATAL_FAULT_CODE`] on unrecoverable errors.
pub const FATAL_FAULT_MESSAGE: &str = "Internal Error";

/// A fault reported by the remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcFault {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl RpcFault {
    /// True when the code and message match the endpoint's unrecoverable
    /// internal error signature. Faults carrying the fatal code with any
    /// other message are ordinary recoverable faults.
    pub fn is_fatal(&self) -> bool {
        self.code == FATAL_FAULT_CODE && self.message == FATAL_FAULT_MESSAGE
    }
}

/// Why a transport call did not produce a payload.
#[derive(Debug, Error)]
pub enum RpcFailure {
    /// The endpoint was reached and reported a fault.
    #[error("remote fault [{}]: {}", .0.code, .0.message)]
    Fault(RpcFault),

    /// The endpoint could not be reached or the exchange broke down.
    #[error("connection failure: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl RpcFailure {
    pub fn fault(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fault(RpcFault {
            code: code.into(),
            message: message.into(),
            detail: None,
        })
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn connection_from(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Moves one operation call to one sub-service of the directory application.
///
/// Implementations are expected to be cheap to share behind an `Arc`; the
/// client issues calls sequentially but holds the transport for the lifetime
/// of a session.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Executes `operation` against `service` with positional `args` and
    /// returns the raw result payload.
    async fn call(
        &self,
        service: &str,
        operation: &str,
        args: &[Value],
    ) -> Result<Value, RpcFailure>;
}
