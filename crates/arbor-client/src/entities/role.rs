//! Static roles.
//!
//! Roles double as accesses: a role carries a tri-state access option
//! ('1' disabled, '2' enabled, '3' enabled and common) plus the access
//! presentation attributes. Role owners and user owners share a single
//! merged 'owner' attribute on the server, so writing either list rewrites
//! both.

use arbor_wire::attrs::AttributeSet;
use arbor_wire::transport::services;
use arbor_wire::{ApiError, ApiResult, Attribute, Outcome};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::apply::{
    self, diff_multiset, diff_scalar, ApplyContext, ApplyOptions, Desired, Diff, Reconcile,
};
use crate::entities::{access_category, container, require_payload, Badge, ObjectRef};
use crate::object::DirectoryObject;
use crate::paths::ContainerPath;
use crate::resolver::{Located, ObjectKind};
use crate::session::DirectoryClient;

const SERVICE: &str = services::ROLE;
const REQUIRES_VERSION: Option<&str> = None;

/// Retrieves a role by DN.
pub async fn get(client: &DirectoryClient, role_dn: &str) -> ApiResult<Outcome<DirectoryObject>> {
    let outcome = client
        .invoke(
            "Retrieving a static role",
            SERVICE,
            "lookupRole",
            vec![Value::String(role_dn.to_string())],
            REQUIRES_VERSION,
        )
        .await?;
    outcome.decode()
}

/// Searches for roles matching an LDAP filter, everywhere or within one
/// container.
pub async fn search(
    client: &DirectoryClient,
    container_dn: Option<&str>,
    filter: &str,
) -> ApiResult<Outcome<Vec<DirectoryObject>>> {
    match container_dn {
        None => {
            let outcome = client
                .invoke(
                    "Searching for roles",
                    SERVICE,
                    "searchRoles",
                    vec![Value::String(filter.to_string())],
                    REQUIRES_VERSION,
                )
                .await?;
            outcome.decode()
        }
        Some(container_dn) => search_in_container(client, container_dn, filter).await,
    }
}

/// Searches for roles within one container.
pub async fn search_in_container(
    client: &DirectoryClient,
    container_dn: &str,
    filter: &str,
) -> ApiResult<Outcome<Vec<DirectoryObject>>> {
    let parent = container::get(client, container_dn).await?;
    if parent.failed() {
        return Ok(parent.carry());
    }
    let container_object = require_payload(parent, "container information")?;
    let container_value = serde_json::to_value(&container_object)
        .map_err(|err| ApiError::invalid_response(err.to_string()))?;

    let outcome = client
        .invoke(
            &format!("Searching for roles in container {container_dn}"),
            SERVICE,
            "searchForRolesInContainer",
            vec![container_value, Value::String(filter.to_string())],
            REQUIRES_VERSION,
        )
        .await?;
    outcome.decode()
}

/// Desired state of one role.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    pub container_path: String,
    pub name: String,
    /// 'application' or 'business'.
    pub classification: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Roles that own this role.
    #[serde(default)]
    pub role_owners: Vec<ObjectRef>,
    /// People that own this role, referenced by uid.
    #[serde(default)]
    pub user_owners: Vec<ObjectRef>,
    #[serde(default)]
    pub enable_access: bool,
    #[serde(default)]
    pub common_access: bool,
    /// 'application', 'sharedfolder', 'emailgroup', or 'role'. Absent means
    /// no access type.
    #[serde(default)]
    pub access_type: Option<String>,
    #[serde(default)]
    pub access_image_uri: Option<String>,
    #[serde(default)]
    pub access_search_terms: Vec<String>,
    #[serde(default)]
    pub access_additional_info: Option<String>,
    #[serde(default)]
    pub access_badges: Vec<Badge>,
    /// Attribute names assigned to the role.
    #[serde(default)]
    pub assignment_attributes: Vec<String>,
}

fn classification_token(classification: &str) -> ApiResult<&'static str> {
    match classification.to_lowercase().as_str() {
        "application" => Ok("role.classification.application"),
        "business" => Ok("role.classification.business"),
        other => Err(ApiError::validation(format!(
            "'{other}' is not a valid role classification. Must be 'application' or 'business'."
        ))),
    }
}

/// Applies a role configuration: creates the role if no role with the same
/// name exists in the container, otherwise modifies the attributes that
/// differ.
pub async fn apply(
    cx: &ApplyContext<'_>,
    config: &RoleConfig,
    options: ApplyOptions,
) -> ApiResult<Outcome<Value>> {
    if config.container_path.is_empty() || config.name.is_empty() || config.classification.is_empty()
    {
        return Err(ApiError::validation(
            "Invalid role configuration. container_path, name, and classification must have \
             non-empty string values."
            .to_string(),
        ));
    }
    let classification = classification_token(&config.classification)?.to_string();
    let access_profile = match config.access_type.as_deref() {
        None | Some("") => String::new(),
        Some(access_type) => access_category(access_type)?.to_string(),
    };
    let access_option = if !config.enable_access {
        "1"
    } else if !config.common_access {
        "2"
    } else {
        "3"
    };

    let container_path = ContainerPath::parse(&config.container_path)?;
    let container_dn = cx.resolver.path_to_dn(cx.client, &container_path).await?;

    let mut owner_dns = Vec::new();
    for owner in &config.role_owners {
        owner_dns.push(resolve_owner(cx, owner, ObjectKind::Role).await?);
    }
    for owner in &config.user_owners {
        owner_dns.push(resolve_owner(cx, owner, ObjectKind::Person).await?);
    }

    let plan = RolePlan {
        container_path,
        container_dn,
        name: config.name.clone(),
        classification,
        description: config.description.clone().unwrap_or_default(),
        owner_dns,
        access_option,
        access_profile,
        access_image_uri: config.access_image_uri.clone().unwrap_or_default(),
        access_search_terms: config.access_search_terms.clone(),
        access_additional_info: config.access_additional_info.clone().unwrap_or_default(),
        access_badges: config.access_badges.iter().map(Badge::render).collect(),
        assignment_attributes: config.assignment_attributes.clone(),
    };
    apply::reconcile(cx, &plan, options).await
}

async fn resolve_owner(
    cx: &ApplyContext<'_>,
    owner: &ObjectRef,
    kind: ObjectKind,
) -> ApiResult<String> {
    let path = ContainerPath::parse(&owner.path)?;
    cx.resolver
        .encode_object_dn(cx.client, &path, &owner.name, kind)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "{} '{}' in '{}'",
                kind.name(),
                owner.name,
                owner.path
            ))
        })
}

struct RolePlan {
    container_path: ContainerPath,
    container_dn: String,
    name: String,
    classification: String,
    description: String,
    owner_dns: Vec<String>,
    access_option: &'static str,
    access_profile: String,
    access_image_uri: String,
    access_search_terms: Vec<String>,
    access_additional_info: String,
    access_badges: Vec<String>,
    assignment_attributes: Vec<String>,
}

impl RolePlan {
    fn attribute_changes(&self, existing: &AttributeSet) -> Vec<Attribute> {
        let mut changes = Vec::new();

        // The description is mirrored into the access description.
        match diff_scalar(&self.description, existing.get("description")) {
            Desired::Unchanged => {}
            Desired::Clear => {
                changes.push(Attribute::empty("description"));
                changes.push(Attribute::empty("eraccessdescription"));
            }
            Desired::Set(value) => {
                changes.push(Attribute::single("description", value.clone()));
                changes.push(Attribute::single("eraccessdescription", value));
            }
        }

        if let Some(attribute) = diff_scalar(&self.classification, existing.get("erroleclassification"))
            .into_attribute("erroleclassification")
        {
            changes.push(attribute);
        }
        if let Some(attribute) =
            diff_multiset(&self.owner_dns, existing.get("owner")).into_attribute("owner")
        {
            changes.push(attribute);
        }
        if let Some(attribute) = diff_scalar(self.access_option, existing.get("eraccessoption"))
            .into_attribute("eraccessoption")
        {
            changes.push(attribute);
        }
        if let Some(attribute) = diff_scalar(&self.access_profile, existing.get("erobjectprofilename"))
            .into_attribute("erobjectprofilename")
        {
            changes.push(attribute);
        }
        if let Some(attribute) =
            diff_scalar(&self.access_image_uri, existing.get("erimageuri")).into_attribute("erimageuri")
        {
            changes.push(attribute);
        }
        if let Some(attribute) = diff_multiset(&self.access_search_terms, existing.get("eraccesstag"))
            .into_attribute("eraccesstag")
        {
            changes.push(attribute);
        }
        if let Some(attribute) =
            diff_scalar(&self.access_additional_info, existing.get("eradditionalinformation"))
                .into_attribute("eradditionalinformation")
        {
            changes.push(attribute);
        }
        if let Some(attribute) =
            diff_multiset(&self.access_badges, existing.get("erbadge")).into_attribute("erbadge")
        {
            changes.push(attribute);
        }
        if let Some(attribute) = diff_multiset(
            &self.assignment_attributes,
            existing.get("erroleassignmentkey"),
        )
        .into_attribute("erroleassignmentkey")
        {
            changes.push(attribute);
        }

        changes
    }

    fn create_attributes(&self) -> AttributeSet {
        let mut attributes = AttributeSet::default();
        if self.description.is_empty() {
            attributes.push(Attribute::empty("description"));
            attributes.push(Attribute::empty("eraccessdescription"));
        } else {
            attributes.push(Attribute::single("description", self.description.clone()));
            attributes.push(Attribute::single(
                "eraccessdescription",
                self.description.clone(),
            ));
        }
        attributes.push(Attribute::single(
            "erroleclassification",
            self.classification.clone(),
        ));
        attributes.push(Attribute::new("owner", self.owner_dns.clone()));
        attributes.push(Attribute::single("eraccessoption", self.access_option));
        if !self.access_profile.is_empty() {
            attributes.push(Attribute::single(
                "erobjectprofilename",
                self.access_profile.clone(),
            ));
        }
        attributes.push(if self.access_image_uri.is_empty() {
            Attribute::empty("erimageuri")
        } else {
            Attribute::single("erimageuri", self.access_image_uri.clone())
        });
        attributes.push(Attribute::new(
            "eraccesstag",
            self.access_search_terms.clone(),
        ));
        attributes.push(if self.access_additional_info.is_empty() {
            Attribute::empty("eradditionalinformation")
        } else {
            Attribute::single("eradditionalinformation", self.access_additional_info.clone())
        });
        attributes.push(Attribute::new("erbadge", self.access_badges.clone()));
        attributes.push(Attribute::new(
            "erroleassignmentkey",
            self.assignment_attributes.clone(),
        ));
        attributes
    }
}

#[async_trait]
impl Reconcile for RolePlan {
    type Existing = DirectoryObject;
    type Change = Vec<Attribute>;

    fn describe(&self) -> String {
        format!("the role '{}' in '{}'", self.name, self.container_path)
    }

    async fn locate(&self, cx: &ApplyContext<'_>) -> ApiResult<Located<DirectoryObject>> {
        cx.resolver
            .resolve_unique(cx.client, &self.container_path, &self.name, ObjectKind::Role)
            .await
    }

    fn diff(&self, existing: &DirectoryObject) -> ApiResult<Diff<Vec<Attribute>>> {
        let changes = self.attribute_changes(&existing.attributes);
        Ok(if changes.is_empty() {
            Diff::Unchanged
        } else {
            Diff::Changed(changes)
        })
    }

    async fn create(&self, cx: &ApplyContext<'_>) -> ApiResult<Outcome<Value>> {
        let parent = container::get(cx.client, &self.container_dn).await?;
        if parent.failed() {
            return Ok(parent.carry());
        }
        let container_object = require_payload(parent, "container information")?;
        let container_value = serde_json::to_value(&container_object)
            .map_err(|err| ApiError::invalid_response(err.to_string()))?;

        // Unlike other entities, the role record carries its description as
        // a top-level field as well as an attribute.
        let role_value = json!({
            "name": self.name,
            "description": self.description,
            "select": false,
            "attributes": self.create_attributes(),
        });

        cx.client
            .invoke(
                "Creating a Role",
                SERVICE,
                "createStaticRole",
                vec![container_value, role_value],
                REQUIRES_VERSION,
            )
            .await
    }

    async fn modify(
        &self,
        cx: &ApplyContext<'_>,
        existing: &DirectoryObject,
        change: Vec<Attribute>,
    ) -> ApiResult<Outcome<Value>> {
        let change_value = serde_json::to_value(&change)
            .map_err(|err| ApiError::invalid_response(err.to_string()))?;

        cx.client
            .invoke(
                "Modifying a Role",
                SERVICE,
                "modifyStaticRole",
                vec![Value::String(existing.itim_dn.clone()), change_value],
                REQUIRES_VERSION,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> RolePlan {
        RolePlan {
            container_path: ContainerPath::parse("//Acme//ou::Engineering").expect("valid path"),
            container_dn: "erglobalid=1,ou=orgChart,ou=demo,dc=com".to_string(),
            name: "Service Desk".to_string(),
            classification: "role.classification.business".to_string(),
            description: "front line".to_string(),
            owner_dns: vec!["owner-role-dn".to_string(), "owner-person-dn".to_string()],
            access_option: "2",
            access_profile: "Application".to_string(),
            access_image_uri: String::new(),
            access_search_terms: vec!["desk".to_string()],
            access_additional_info: String::new(),
            access_badges: vec!["restricted~red".to_string()],
            assignment_attributes: Vec::new(),
        }
    }

    fn existing(attributes: Vec<Attribute>) -> DirectoryObject {
        DirectoryObject {
            itim_dn: "erglobalid=4,ou=roles,erglobalid=1,ou=demo,dc=com".to_string(),
            name: "Service Desk".to_string(),
            profile_name: "Role".to_string(),
            select: false,
            attributes: AttributeSet::from_attributes(attributes),
        }
    }

    fn matching_attributes() -> Vec<Attribute> {
        vec![
            Attribute::single("description", "front line"),
            Attribute::single("eraccessdescription", "front line"),
            Attribute::single("erroleclassification", "role.classification.business"),
            Attribute::new(
                "owner",
                vec!["owner-person-dn".to_string(), "owner-role-dn".to_string()],
            ),
            Attribute::single("eraccessoption", "2"),
            Attribute::single("erobjectprofilename", "Application"),
            Attribute::single("eraccesstag", "desk"),
            Attribute::single("erbadge", "restricted~red"),
        ]
    }

    #[test]
    fn matching_role_needs_no_change() {
        let plan = plan();
        let existing = existing(matching_attributes());
        assert!(plan.diff(&existing).expect("diff succeeds").is_unchanged());
    }

    #[test]
    fn owners_are_compared_as_one_merged_list() {
        let mut plan = plan();
        plan.owner_dns = vec!["owner-role-dn".to_string()];
        let existing = existing(matching_attributes());
        let change = plan
            .diff(&existing)
            .expect("diff succeeds")
            .into_change()
            .expect("a change is needed");
        let owner = change
            .iter()
            .find(|a| a.name == "owner")
            .expect("owner attribute present");
        assert_eq!(owner.values.item, vec!["owner-role-dn".to_string()]);
    }

    #[test]
    fn disabling_access_rewrites_the_tri_state_option() {
        let mut plan = plan();
        plan.access_option = "1";
        let existing = existing(matching_attributes());
        let change = plan
            .diff(&existing)
            .expect("diff succeeds")
            .into_change()
            .expect("a change is needed");
        let option = change
            .iter()
            .find(|a| a.name == "eraccessoption")
            .expect("access option present");
        assert_eq!(option.values.item, vec!["1".to_string()]);
    }

    #[test]
    fn description_changes_mirror_into_the_access_description() {
        let mut plan = plan();
        plan.description = "second line".to_string();
        let existing = existing(matching_attributes());
        let change = plan
            .diff(&existing)
            .expect("diff succeeds")
            .into_change()
            .expect("a change is needed");
        assert!(change.iter().any(|a| a.name == "description"));
        assert!(change.iter().any(|a| a.name == "eraccessdescription"));
    }

    #[test]
    fn classification_tokens_are_validated() {
        assert_eq!(
            classification_token("Business").unwrap(),
            "role.classification.business"
        );
        assert!(classification_token("technical").is_err());
    }

    #[test]
    fn create_skips_the_access_profile_when_none_is_configured() {
        let mut plan = plan();
        plan.access_profile = String::new();
        let attributes = plan.create_attributes();
        assert!(attributes.get("erobjectprofilename").is_none());
        assert!(attributes.get("eraccessoption").is_some());
    }
}
