//! Result envelope shared by every directory API operation.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// Return code of a successful operation.
pub const RC_SUCCESS: i32 = 0;
/// Tolerated version-gate refusal: the server is older than the operation
/// requires and the session runs in tolerant mode.
pub const RC_UNSUPPORTED_VERSION: i32 = 1;
/// Tolerated remote fault.
pub const RC_REMOTE_FAULT: i32 = 500;
/// Tolerated connection failure.
pub const RC_CONNECTIVITY: i32 = 502;

/// The uniform result of a directory API operation.
///
/// Every operation reports a numeric return code, an optional payload, a
/// changed flag and accumulated warnings. A non-zero return code only ever
/// reaches the caller when the session tolerates failures; in that case the
/// payload is absent and `changed` is always false, so downstream automation
/// can aggregate results without special-casing errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub return_code: i32,
    pub payload: Option<T>,
    pub changed: bool,
    pub warnings: Vec<String>,
}

impl<T> Outcome<T> {
    /// A successful outcome carrying a payload.
    pub fn success(payload: T, changed: bool) -> Self {
        Self {
            return_code: RC_SUCCESS,
            payload: Some(payload),
            changed,
            warnings: Vec::new(),
        }
    }

    /// A successful outcome with no payload and nothing changed.
    pub fn unchanged() -> Self {
        Self {
            return_code: RC_SUCCESS,
            payload: None,
            changed: false,
            warnings: Vec::new(),
        }
    }

    /// A successful outcome with no payload that did (or would) change state.
    pub fn changed() -> Self {
        Self {
            return_code: RC_SUCCESS,
            payload: None,
            changed: true,
            warnings: Vec::new(),
        }
    }

    /// A tolerated failure. The changed flag is always false on failure.
    pub fn failure(return_code: i32) -> Self {
        Self {
            return_code,
            payload: None,
            changed: false,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn succeeded(&self) -> bool {
        self.return_code == RC_SUCCESS
    }

    pub fn failed(&self) -> bool {
        self.return_code != RC_SUCCESS
    }

    /// Re-types the envelope while dropping the payload. Used to propagate
    /// tolerated failures through layers that return a different payload
    /// type.
    pub fn carry<U>(self) -> Outcome<U> {
        Outcome {
            return_code: self.return_code,
            payload: None,
            changed: self.changed,
            warnings: self.warnings,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            return_code: self.return_code,
            payload: self.payload.map(f),
            changed: self.changed,
            warnings: self.warnings,
        }
    }
}

impl Outcome<Value> {
    /// Decodes the raw payload of a successful outcome into a typed one.
    ///
    /// Failed outcomes and null payloads carry through unchanged with no
    /// payload; a payload that is present but malformed is an error.
    pub fn decode<T: DeserializeOwned>(self) -> ApiResult<Outcome<T>> {
        match self.payload {
            Some(value) if self.return_code == RC_SUCCESS && !value.is_null() => {
                let payload: T = serde_json::from_value(value)
                    .map_err(|err| ApiError::invalid_response(err.to_string()))?;
                Ok(Outcome {
                    return_code: self.return_code,
                    payload: Some(payload),
                    changed: self.changed,
                    warnings: self.warnings,
                })
            }
            _ => Ok(Outcome {
                return_code: self.return_code,
                payload: None,
                changed: self.changed,
                warnings: self.warnings,
            }),
        }
    }
}
