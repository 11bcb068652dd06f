//! Workflows.
//!
//! The remote API has no direct lookup or search for workflows, so both
//! operations here go through the generic attribute search. A workflow's
//! global id can be reused across organizations; the identifier's
//! organization suffix disambiguates.

use arbor_wire::{ApiError, ApiResult, Outcome};

use crate::search_data::{self, SearchArguments, BASE_GLOBAL};
use crate::session::DirectoryClient;

const CATEGORY: &str = "Workflow";

/// Reads one attribute of a workflow identified by its DN.
///
/// The DN cannot be looked up remotely; it is dissected into the global id
/// and the owning organization's DN, which together identify the workflow.
pub async fn get_attribute(
    client: &DirectoryClient,
    workflow_dn: &str,
    attribute_name: &str,
) -> ApiResult<Outcome<Vec<String>>> {
    let (global_id, organization_dn) = dissect_dn(workflow_dn)?;

    // erparent is not guaranteed to equal the organization DN, but every
    // workflow of an organization carries that DN within its erparent
    // value, so a suffix match narrows the shared global id space.
    let filter = format!("(&(erglobalid={global_id})(erparent=*{organization_dn}))");
    search_data::find(
        client,
        "Retrieving a workflow",
        &SearchArguments::new(CATEGORY, attribute_name, filter, BASE_GLOBAL),
    )
    .await
}

/// Searches for workflows that are direct children of a container and
/// returns one attribute value per match.
///
/// Unlike the entity searches, descendants of child containers are not
/// included.
pub async fn search_attribute(
    client: &DirectoryClient,
    container_dn: &str,
    filter: &str,
    attribute_name: &str,
) -> ApiResult<Outcome<Vec<String>>> {
    let filter = format!("(&{filter}(erparent={container_dn}))");
    search_data::find(
        client,
        "Retrieving a workflow",
        &SearchArguments::new(CATEGORY, attribute_name, filter, BASE_GLOBAL),
    )
    .await
}

/// Splits a workflow DN into its global id and organization DN.
fn dissect_dn(workflow_dn: &str) -> ApiResult<(&str, &str)> {
    let mut components = workflow_dn.splitn(2, ",ou=workflow,");
    let (Some(head), Some(organization_dn)) = (components.next(), components.next()) else {
        return Err(ApiError::validation(format!(
            "'{workflow_dn}' is not a valid workflow identifier"
        )));
    };
    let global_id = head.strip_prefix("erglobalid=").ok_or_else(|| {
        ApiError::validation(format!("'{workflow_dn}' is not a valid workflow identifier"))
    })?;
    if global_id.is_empty() || global_id.contains('=') || organization_dn.contains(",ou=workflow,")
    {
        return Err(ApiError::validation(format!(
            "'{workflow_dn}' is not a valid workflow identifier"
        )));
    }
    Ok((global_id, organization_dn))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dissects_a_well_formed_workflow_dn() {
        let (global_id, organization_dn) =
            dissect_dn("erglobalid=123,ou=workflow,erglobalid=1,ou=demo,dc=com")
                .expect("dn should dissect");
        assert_eq!(global_id, "123");
        assert_eq!(organization_dn, "erglobalid=1,ou=demo,dc=com");
    }

    #[test]
    fn rejects_malformed_workflow_dns() {
        for dn in [
            "erglobalid=123,ou=demo,dc=com",
            "uid=bjones,ou=workflow,ou=demo,dc=com",
            "erglobalid=,ou=workflow,ou=demo,dc=com",
            "erglobalid=1,ou=workflow,erglobalid=2,ou=workflow,ou=demo,dc=com",
        ] {
            assert!(dissect_dn(dn).is_err(), "{dn} should be rejected");
        }
    }
}
