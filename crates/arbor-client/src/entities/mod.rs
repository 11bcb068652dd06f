//! Entity accessors: one module per directory entity kind.
//!
//! Each module wraps the remote operations of one sub-service with typed
//! get/search functions and, where the entity participates in desired-state
//! automation, a configuration struct plus an `apply` entry point driving
//! the [`crate::apply`] engine.

pub mod container;
pub mod organization;
pub mod person;
pub mod policy;
pub mod role;
pub mod service;
pub mod workflow;

use arbor_wire::{ApiError, ApiResult, Outcome};
use serde::Deserialize;

/// Unwraps a successful outcome's payload; a missing payload (including a
/// tolerated failure carried this far) is a hard error for callers that
/// cannot proceed without the data.
pub(crate) fn require_payload<T>(outcome: Outcome<T>, what: &str) -> ApiResult<T> {
    outcome
        .payload
        .ok_or_else(|| ApiError::invalid_response(format!("cannot retrieve {what} from the server")))
}

/// A reference to a named object under a container path, as it appears in
/// desired-state configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ObjectRef {
    pub path: String,
    pub name: String,
}

/// One badge on an access definition.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Badge {
    pub text: String,
    pub colour: String,
}

impl Badge {
    /// The wire encoding: text and colour joined by a tilde.
    pub fn render(&self) -> String {
        format!("{}~{}", self.text, self.colour)
    }
}

/// Maps a configured access type to the category token the server stores.
pub(crate) fn access_category(access_type: &str) -> ApiResult<&'static str> {
    match access_type.to_lowercase().as_str() {
        "application" => Ok("Application"),
        "sharedfolder" => Ok("SharedFolder"),
        "emailgroup" => Ok("MailGroup"),
        "role" => Ok("AccessRole"),
        other => Err(ApiError::validation(format!(
            "'{other}' is not a valid access type. Must be 'application', 'sharedfolder', \
             'emailgroup', or 'role'."
        ))),
    }
}
