//! The authenticated session and the single entry point for remote calls.
//!
//! [`DirectoryClient::invoke`] is the funnel every operation goes through.
//! It gates on the server version, prepends the session to the positional
//! arguments, classifies faults and connection failures, and records whether
//! the operation is one that changes server state. In tolerant mode,
//! recoverable failures come back as non-zero return codes on the
//! [`Outcome`] instead of errors; fatal faults abort regardless.

use std::sync::Arc;

use arbor_wire::envelope::{RC_CONNECTIVITY, RC_REMOTE_FAULT, RC_UNSUPPORTED_VERSION};
use arbor_wire::transport::services;
use arbor_wire::{version, ApiError, ApiResult, Outcome, RpcFailure, RpcTransport};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::DirectoryConfig;

/// Operations whose names start with one of these prefixes read state
/// without changing it. Everything else is assumed to cause a change.
const NON_MUTATING_PREFIXES: [&str; 8] = [
    "get", "is", "login", "logout", "search", "lookup", "test", "find",
];

/// True when the named operation is expected to change server state.
pub fn operation_mutates(operation: &str) -> bool {
    let lowered = operation.to_lowercase();
    !NON_MUTATING_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionInfo {
    version: String,
    fix_pack_level: String,
}

/// An authenticated session with the directory service.
pub struct DirectoryClient {
    transport: Arc<dyn RpcTransport>,
    session: Value,
    version: String,
    root_dn: String,
    tolerant: bool,
}

impl DirectoryClient {
    /// Logs in and retrieves the server version.
    ///
    /// A login that returns no session means the credentials were rejected;
    /// the session service reports this as a null response rather than a
    /// fault.
    pub async fn connect(
        config: &DirectoryConfig,
        transport: Arc<dyn RpcTransport>,
    ) -> ApiResult<Self> {
        debug!(hostname = %config.hostname, port = config.port, "connecting");

        let session = transport
            .call(
                services::SESSION,
                "login",
                &[
                    Value::String(config.username.clone()),
                    Value::String(config.password.clone()),
                ],
            )
            .await
            .map_err(ApiError::from)?;
        if session.is_null() {
            error!("login returned no session");
            return Err(ApiError::InvalidCredentials);
        }

        let info = transport
            .call(services::SESSION, "getItimVersionInfo", &[])
            .await
            .map_err(ApiError::from)?;
        let info: VersionInfo = serde_json::from_value(info)
            .map_err(|err| ApiError::invalid_response(format!("version info: {err}")))?;
        let version = format!("{}.{}", info.version, info.fix_pack_level);
        debug!(%version, "connected");

        Ok(Self {
            transport,
            session,
            version,
            root_dn: config.root_dn.clone(),
            tolerant: config.tolerant,
        })
    }

    /// The server's version, as `<version>.<fix pack level>`.
    pub fn server_version(&self) -> &str {
        &self.version
    }

    /// DN of the directory root. The container path `//` resolves here.
    pub fn root_dn(&self) -> &str {
        &self.root_dn
    }

    pub fn is_tolerant(&self) -> bool {
        self.tolerant
    }

    /// Invokes one operation on one sub-service.
    ///
    /// The session is prepended to `args` automatically. When
    /// `requires_version` is given and the server is older, the transport is
    /// never contacted: the call fails with
    /// [`ApiError::UnsupportedVersion`], or with return code
    /// [`RC_UNSUPPORTED_VERSION`] in tolerant mode.
    pub async fn invoke(
        &self,
        description: &str,
        service: &str,
        operation: &str,
        args: Vec<Value>,
        requires_version: Option<&str>,
    ) -> ApiResult<Outcome<Value>> {
        debug!(service, operation, description, "request");
        if !description.is_empty() {
            info!("{description}");
        }

        if let Some(required) = requires_version {
            if !version::at_least(&self.version, required) {
                let message = format!(
                    "this operation requires server version {required}, \
                     but the connected server is {}",
                    self.version
                );
                if self.tolerant {
                    debug!("{message}");
                    return Ok(Outcome::failure(RC_UNSUPPORTED_VERSION).with_warning(message));
                }
                error!("{message}");
                return Err(ApiError::UnsupportedVersion {
                    required: required.to_string(),
                    actual: self.version.clone(),
                });
            }
        }

        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(self.session.clone());
        call_args.extend(args);

        let changed = operation_mutates(operation);

        match self.transport.call(service, operation, &call_args).await {
            Ok(payload) => {
                debug!(service, operation, "request succeeded");
                Ok(Outcome::success(payload, changed))
            }
            Err(RpcFailure::Fault(fault)) if fault.is_fatal() => {
                error!(code = %fault.code, message = %fault.message, "fatal fault");
                Err(RpcFailure::Fault(fault).into())
            }
            Err(RpcFailure::Fault(fault)) => {
                if self.tolerant {
                    let message =
                        format!("remote fault [{}]: {}", fault.code, fault.message);
                    warn!("{message}");
                    Ok(Outcome::failure(RC_REMOTE_FAULT).with_warning(message))
                } else {
                    error!(code = %fault.code, message = %fault.message, "remote fault");
                    Err(RpcFailure::Fault(fault).into())
                }
            }
            Err(RpcFailure::Connection { message, source }) => {
                if self.tolerant {
                    warn!("failed to connect to the server: {message}");
                    Ok(Outcome::failure(RC_CONNECTIVITY)
                        .with_warning(format!("failed to connect to the server: {message}")))
                } else {
                    error!("failed to connect to the server: {message}");
                    Err(RpcFailure::Connection { message, source }.into())
                }
            }
        }
    }
}

impl std::fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("version", &self.version)
            .field("root_dn", &self.root_dn)
            .field("tolerant", &self.tolerant)
            .finish_non_exhaustive()
    }
}
