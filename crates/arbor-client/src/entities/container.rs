//! Organizational containers.
//!
//! Containers form the directory tree itself: organizations at the top,
//! with organizational units, business partner units, locations and admin
//! domains nested below. The name, kind and parent of a container identify
//! it and cannot be changed by apply; only the descriptive attributes can.

use arbor_wire::attrs::AttributeSet;
use arbor_wire::transport::services;
use arbor_wire::{ApiError, ApiResult, Attribute, Outcome};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::apply::{
    self, diff_multiset, diff_scalar, ApplyContext, ApplyOptions, Desired, Diff, Reconcile,
};
use crate::entities::{require_payload, ObjectRef};
use crate::object::DirectoryObject;
use crate::paths::{ContainerKind, ContainerPath};
use crate::resolver::{Located, ObjectKind};
use crate::session::DirectoryClient;

const SERVICE: &str = services::CONTAINER;
const REQUIRES_VERSION: Option<&str> = None;

/// Retrieves a container by its DN.
pub async fn get(
    client: &DirectoryClient,
    container_dn: &str,
) -> ApiResult<Outcome<DirectoryObject>> {
    let outcome = client
        .invoke(
            "Retrieving an organizational container",
            SERVICE,
            "lookupContainer",
            vec![Value::String(container_dn.to_string())],
            REQUIRES_VERSION,
        )
        .await?;
    outcome.decode()
}

/// Searches for containers by name under a parent container.
///
/// The remote search covers all descendants of the parent, not just its
/// direct children. `exact_name_only` and `direct_children_only` narrow the
/// results on the client side.
pub async fn search(
    client: &DirectoryClient,
    parent_dn: &str,
    name: &str,
    kind: ContainerKind,
    exact_name_only: bool,
    direct_children_only: bool,
) -> ApiResult<Outcome<Vec<DirectoryObject>>> {
    let parent = get(client, parent_dn).await?;
    if parent.failed() {
        return Ok(parent.carry());
    }
    let parent_object = require_payload(parent, "container information")?;
    let parent_value = serde_json::to_value(&parent_object)
        .map_err(|err| ApiError::invalid_response(err.to_string()))?;

    let outcome = client
        .invoke(
            "Searching for containers",
            SERVICE,
            "searchContainerByName",
            vec![
                parent_value,
                Value::String(kind.name().to_string()),
                Value::String(name.to_string()),
            ],
            REQUIRES_VERSION,
        )
        .await?;
    let outcome = outcome.decode::<Vec<DirectoryObject>>()?;
    Ok(outcome.map(|candidates| {
        candidates
            .into_iter()
            .filter(|candidate| !exact_name_only || candidate.name == name)
            .filter(|candidate| {
                !direct_children_only || candidate.parent_dn() == Some(parent_dn)
            })
            .collect()
    }))
}

/// Finds at most one container with the given kind and exact name whose
/// direct parent is `parent_dn`.
pub async fn locate(
    client: &DirectoryClient,
    parent_dn: &str,
    name: &str,
    kind: ContainerKind,
) -> ApiResult<Located<DirectoryObject>> {
    let outcome = search(client, parent_dn, name, kind, true, true).await?;
    let matches = require_payload(outcome, "container search results")?;
    Ok(Located::from_matches(matches))
}

/// Desired state of one container.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerConfig {
    /// Path of the container this one lives in; `//` for an organization.
    pub parent_container_path: String,
    /// Kind name: 'Organization', 'OrganizationalUnit', 'BPOrganization',
    /// 'Location', or 'AdminDomain'.
    pub profile: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// People associated with the container. Interpreted by kind: the
    /// first entry becomes the supervisor of an organizational unit or
    /// location, or the sponsor of a business partner unit; every entry
    /// becomes an administrator of an admin domain; organizations ignore
    /// the list.
    #[serde(default)]
    pub associated_people: Vec<ObjectRef>,
}

/// Applies a container configuration: creates the container if absent,
/// otherwise modifies only the attributes that differ.
pub async fn apply(
    cx: &ApplyContext<'_>,
    config: &ContainerConfig,
    options: ApplyOptions,
) -> ApiResult<Outcome<Value>> {
    if config.parent_container_path.is_empty() || config.profile.is_empty() || config.name.is_empty()
    {
        return Err(ApiError::validation(
            "Invalid container configuration. parent_container_path, profile, and name must \
             have non-empty string values."
            .to_string(),
        ));
    }
    let kind: ContainerKind = config.profile.parse()?;
    let parent_path = ContainerPath::parse(&config.parent_container_path)?;
    let parent_dn = cx.resolver.path_to_dn(cx.client, &parent_path).await?;

    // Organizations have no associated people; everyone else's references
    // must resolve before any write is attempted.
    let mut people_dns = Vec::new();
    if kind != ContainerKind::Organization {
        for person in &config.associated_people {
            let path = ContainerPath::parse(&person.path)?;
            let dn = cx
                .resolver
                .encode_object_dn(cx.client, &path, &person.name, ObjectKind::Person)
                .await?
                .ok_or_else(|| {
                    ApiError::not_found(format!("person '{}' in '{}'", person.name, person.path))
                })?;
            people_dns.push(dn);
        }
    }

    let plan = ContainerPlan {
        parent_dn,
        kind,
        name: config.name.clone(),
        description: config.description.clone().unwrap_or_default(),
        people_dns,
    };
    apply::reconcile(cx, &plan, options).await
}

struct ContainerPlan {
    parent_dn: String,
    kind: ContainerKind,
    name: String,
    description: String,
    people_dns: Vec<String>,
}

impl ContainerPlan {
    fn has_description(&self) -> bool {
        self.kind != ContainerKind::BPOrganization
    }

    fn desired_people_attribute(&self, existing: &AttributeSet) -> (Option<&'static str>, Desired<Vec<String>>) {
        match self.kind {
            ContainerKind::Organization => (None, Desired::Unchanged),
            ContainerKind::OrganizationalUnit | ContainerKind::Location => {
                let desired = self.people_dns.first().map(String::as_str).unwrap_or("");
                let diff = diff_scalar(desired, existing.get("ersupervisor"));
                (
                    Some("erSupervisor"),
                    match diff {
                        Desired::Unchanged => Desired::Unchanged,
                        Desired::Clear => Desired::Clear,
                        Desired::Set(value) => Desired::Set(vec![value]),
                    },
                )
            }
            ContainerKind::BPOrganization => {
                let desired = self.people_dns.first().map(String::as_str).unwrap_or("");
                let diff = diff_scalar(desired, existing.get("ersponsor"));
                (
                    Some("erSponsor"),
                    match diff {
                        Desired::Unchanged => Desired::Unchanged,
                        Desired::Clear => Desired::Clear,
                        Desired::Set(value) => Desired::Set(vec![value]),
                    },
                )
            }
            ContainerKind::AdminDomain => (
                Some("erAdministrator"),
                diff_multiset(&self.people_dns, existing.get("eradministrator")),
            ),
        }
    }

    fn create_attributes(&self) -> AttributeSet {
        let mut attributes = AttributeSet::default();
        attributes.push(Attribute::single(
            self.kind.name_attribute(),
            self.name.clone(),
        ));
        if self.has_description() {
            attributes.push(if self.description.is_empty() {
                Attribute::empty("description")
            } else {
                Attribute::single("description", self.description.clone())
            });
        }
        match self.kind {
            ContainerKind::Organization => {}
            ContainerKind::OrganizationalUnit | ContainerKind::Location => {
                attributes.push(match self.people_dns.first() {
                    Some(dn) => Attribute::single("erSupervisor", dn.clone()),
                    None => Attribute::empty("erSupervisor"),
                });
            }
            ContainerKind::BPOrganization => {
                attributes.push(match self.people_dns.first() {
                    Some(dn) => Attribute::single("erSponsor", dn.clone()),
                    None => Attribute::empty("erSponsor"),
                });
            }
            ContainerKind::AdminDomain => {
                attributes.push(Attribute::new("erAdministrator", self.people_dns.clone()));
            }
        }
        attributes
    }
}

#[async_trait]
impl Reconcile for ContainerPlan {
    type Existing = DirectoryObject;
    type Change = Vec<Attribute>;

    fn describe(&self) -> String {
        format!(
            "the container '{}::{}' in '{}'",
            self.kind.prefix(),
            self.name,
            self.parent_dn
        )
    }

    async fn locate(&self, cx: &ApplyContext<'_>) -> ApiResult<Located<DirectoryObject>> {
        locate(cx.client, &self.parent_dn, &self.name, self.kind).await
    }

    fn diff(&self, existing: &DirectoryObject) -> ApiResult<Diff<Vec<Attribute>>> {
        let mut changes = Vec::new();

        if self.has_description() {
            if let Some(attribute) =
                diff_scalar(&self.description, existing.attributes.get("description"))
                    .into_attribute("description")
            {
                changes.push(attribute);
            }
        }

        let (name, desired) = self.desired_people_attribute(&existing.attributes);
        if let Some(name) = name {
            if let Some(attribute) = desired.into_attribute(name) {
                changes.push(attribute);
            }
        }

        Ok(if changes.is_empty() {
            Diff::Unchanged
        } else {
            Diff::Changed(changes)
        })
    }

    async fn create(&self, cx: &ApplyContext<'_>) -> ApiResult<Outcome<Value>> {
        let parent = get(cx.client, &self.parent_dn).await?;
        if parent.failed() {
            return Ok(parent.carry());
        }
        let parent_object = require_payload(parent, "container information")?;
        let parent_value = serde_json::to_value(&parent_object)
            .map_err(|err| ApiError::invalid_response(err.to_string()))?;

        let container = DirectoryObject {
            itim_dn: String::new(),
            name: self.name.clone(),
            profile_name: self.kind.create_profile().to_string(),
            select: false,
            attributes: self.create_attributes(),
        };
        let container_value = serde_json::to_value(&container)
            .map_err(|err| ApiError::invalid_response(err.to_string()))?;

        cx.client
            .invoke(
                "Creating a Container",
                SERVICE,
                "createContainer",
                vec![parent_value, container_value],
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
        let container = DirectoryObject {
            itim_dn: existing.itim_dn.clone(),
            name: String::new(),
            profile_name: String::new(),
            select: false,
            attributes: AttributeSet::from_attributes(change),
        };
        let container_value = serde_json::to_value(&container)
            .map_err(|err| ApiError::invalid_response(err.to_string()))?;

        cx.client
            .invoke(
                "Modifying a Container",
                SERVICE,
                "modifyContainer",
                vec![container_value],
                REQUIRES_VERSION,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(kind: ContainerKind, people: &[&str]) -> ContainerPlan {
        ContainerPlan {
            parent_dn: "ou=demo,dc=com".to_string(),
            kind,
            name: "Engineering".to_string(),
            description: "eng unit".to_string(),
            people_dns: people.iter().map(ToString::to_string).collect(),
        }
    }

    fn existing(attributes: Vec<Attribute>) -> DirectoryObject {
        DirectoryObject {
            itim_dn: "erglobalid=1,ou=orgChart,ou=demo,dc=com".to_string(),
            name: "Engineering".to_string(),
            profile_name: "OrganizationalUnit".to_string(),
            select: false,
            attributes: AttributeSet::from_attributes(attributes),
        }
    }

    #[test]
    fn matching_container_needs_no_change() {
        let plan = plan(
            ContainerKind::OrganizationalUnit,
            &["erglobalid=9,ou=0,ou=people,ou=demo,dc=com"],
        );
        let existing = existing(vec![
            Attribute::single("description", "eng unit"),
            Attribute::single("erSupervisor", "erglobalid=9,ou=0,ou=people,ou=demo,dc=com"),
        ]);
        assert!(plan.diff(&existing).expect("diff succeeds").is_unchanged());
    }

    #[test]
    fn description_difference_triggers_a_change() {
        let plan = plan(ContainerKind::OrganizationalUnit, &[]);
        let existing = existing(vec![Attribute::single("description", "old words")]);
        let change = plan
            .diff(&existing)
            .expect("diff succeeds")
            .into_change()
            .expect("a change is needed");
        assert!(change.iter().any(|a| a.name == "description"));
    }

    #[test]
    fn removing_a_supervisor_is_an_explicit_clear() {
        let plan = plan(ContainerKind::OrganizationalUnit, &[]);
        let existing = existing(vec![
            Attribute::single("description", "eng unit"),
            Attribute::single("erSupervisor", "erglobalid=9,ou=0,ou=people,ou=demo,dc=com"),
        ]);
        let change = plan
            .diff(&existing)
            .expect("diff succeeds")
            .into_change()
            .expect("a change is needed");
        let supervisor = change
            .iter()
            .find(|a| a.name == "erSupervisor")
            .expect("supervisor attribute present");
        assert!(supervisor.values.item.is_empty());
    }

    #[test]
    fn admin_domain_administrators_compare_as_a_multiset() {
        let plan = plan(ContainerKind::AdminDomain, &["dn-a", "dn-b"]);
        let unchanged = existing(vec![
            Attribute::single("description", "eng unit"),
            Attribute::new(
                "erAdministrator",
                vec!["dn-b".to_string(), "dn-a".to_string()],
            ),
        ]);
        assert!(plan.diff(&unchanged).expect("diff succeeds").is_unchanged());

        let differing = existing(vec![
            Attribute::single("description", "eng unit"),
            Attribute::new("erAdministrator", vec!["dn-a".to_string()]),
        ]);
        assert!(!plan.diff(&differing).expect("diff succeeds").is_unchanged());
    }

    #[test]
    fn bp_organization_has_no_description_attribute() {
        let plan = plan(ContainerKind::BPOrganization, &[]);
        let attributes = plan.create_attributes();
        assert!(attributes.get("description").is_none());
        assert_eq!(attributes.get("ou").map(<[String]>::len), Some(1));
        assert_eq!(attributes.get("erSponsor"), Some(&[][..]));
    }
}
