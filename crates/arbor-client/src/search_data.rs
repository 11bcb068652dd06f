//! Generic attribute search over the search-data sub-service.
//!
//! `findSearchFilterObjects` is the one lookup surface that works across
//! entity categories: given a category, a filter and the name of an
//! attribute, it returns the values of that attribute on every match. The
//! resolver leans on it for workflows, which have no direct lookup of
//! their own, and for identifier encoding and decoding.

use arbor_wire::transport::services;
use arbor_wire::{ApiResult, Outcome};
use serde::Serialize;
use serde_json::Value;

use crate::session::DirectoryClient;

/// Search base: the whole directory.
pub const BASE_GLOBAL: &str = "global";
/// Search base: within the organization.
pub const BASE_ORG: &str = "org";

/// Arguments to `findSearchFilterObjects`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchArguments {
    pub category: String,
    pub returned_attribute_name: String,
    pub filter: String,
    pub base: String,
}

impl SearchArguments {
    pub fn new(
        category: impl Into<String>,
        returned_attribute_name: impl Into<String>,
        filter: impl Into<String>,
        base: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            returned_attribute_name: returned_attribute_name.into(),
            filter: filter.into(),
            base: base.into(),
        }
    }
}

/// Runs one attribute search and returns the matched attribute values.
pub async fn find(
    client: &DirectoryClient,
    description: &str,
    arguments: &SearchArguments,
) -> ApiResult<Outcome<Vec<String>>> {
    let payload = serde_json::to_value(arguments)
        .map_err(|err| arbor_wire::ApiError::invalid_response(err.to_string()))?;
    let outcome = client
        .invoke(
            description,
            services::SEARCH_DATA,
            "findSearchFilterObjects",
            vec![payload],
            None,
        )
        .await?;
    outcome.decode::<Vec<Value>>().map(|typed| {
        typed.map(|items| {
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect()
        })
    })
}
