//! The organization list.

use arbor_wire::transport::services;
use arbor_wire::{ApiResult, Outcome};

use crate::object::OrgNode;
use crate::session::DirectoryClient;

/// Lists every top-level organization in the directory.
pub async fn list(client: &DirectoryClient) -> ApiResult<Outcome<Vec<OrgNode>>> {
    let outcome = client
        .invoke(
            "Retrieving organizations list",
            services::CONTAINER,
            "getOrganizationTree",
            vec![],
            None,
        )
        .await?;
    outcome.decode()
}
