//! Translation between container paths and the identifiers the server
//! assigns.
//!
//! The resolver holds the organization map: every top-level organization's
//! name and DN, fetched once at construction and immutable afterwards. It
//! stays correct for the resolver's lifetime only; organizations added to
//! the directory later require a fresh resolver.
//!
//! Path resolution walks the tree one segment at a time, demanding exactly
//! one matching child at every step. Sibling containers are unique by
//! (kind, name) under a well-behaved server; the resolver enforces this
//! rather than assuming it.

use std::collections::HashMap;

use arbor_wire::transport::services;
use arbor_wire::{ApiError, ApiResult, Filter};

use crate::entities::{self, require_payload};
use crate::object::{DirectoryObject, OrgNode};
use crate::paths::{ContainerKind, ContainerPath, PathSegment};
use crate::search_data::{self, SearchArguments, BASE_ORG};
use crate::session::DirectoryClient;

/// Walks deeper than any sane directory tree; a DN chain longer than this
/// means the parent links loop.
const MAX_WALK_DEPTH: usize = 32;

/// The result of looking for exactly one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located<T> {
    Absent,
    One(T),
    /// More than one candidate matched; carries the match count.
    Ambiguous(usize),
}

impl<T> Located<T> {
    pub fn from_matches(mut matches: Vec<T>) -> Self {
        match matches.len() {
            0 => Located::Absent,
            1 => Located::One(matches.swap_remove(0)),
            n => Located::Ambiguous(n),
        }
    }
}

/// The non-container object kinds the resolver can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Person,
    Role,
    Service,
    Workflow,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 4] = [
        ObjectKind::Person,
        ObjectKind::Role,
        ObjectKind::Service,
        ObjectKind::Workflow,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Person => "person",
            ObjectKind::Role => "role",
            ObjectKind::Service => "service",
            ObjectKind::Workflow => "workflow",
        }
    }

    /// The search-data category for this kind.
    pub fn category(self) -> &'static str {
        match self {
            ObjectKind::Person => "Person",
            ObjectKind::Role => "Role",
            ObjectKind::Service => "Service",
            ObjectKind::Workflow => "Workflow",
        }
    }

    /// The DN component that places objects of this kind under their
    /// organization.
    pub fn ou_component(self) -> &'static str {
        match self {
            ObjectKind::Person => "ou=people",
            ObjectKind::Role => "ou=roles",
            ObjectKind::Service => "ou=services",
            ObjectKind::Workflow => "ou=workflow",
        }
    }

    /// The attribute that names objects of this kind.
    pub fn name_attribute(self) -> &'static str {
        match self {
            ObjectKind::Person => "uid",
            ObjectKind::Role => "erRoleName",
            ObjectKind::Service => "erServiceName",
            ObjectKind::Workflow => "erProcessName",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == name.to_lowercase())
    }
}

/// A decoded object identifier: which organization the object lives in,
/// what kind it is and what it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedObject {
    pub organization: String,
    pub kind: ObjectKind,
    pub name: String,
}

/// Path-to-identifier translation over one snapshot of the organizations.
pub struct PathResolver {
    organization_map: HashMap<String, String>,
    dn_map: HashMap<String, String>,
}

impl PathResolver {
    /// Builds a resolver by listing every organization once.
    pub async fn bootstrap(client: &DirectoryClient) -> ApiResult<Self> {
        let outcome = client
            .invoke(
                "Retrieving organizations list",
                services::CONTAINER,
                "getOrganizationTree",
                vec![],
                None,
            )
            .await?;
        let organizations: Vec<OrgNode> =
            require_payload(outcome.decode()?, "organization information")?;

        let mut organization_map = HashMap::with_capacity(organizations.len());
        let mut dn_map = HashMap::with_capacity(organizations.len());
        for org in organizations {
            organization_map.insert(org.name.clone(), org.itim_dn.clone());
            dn_map.insert(org.itim_dn, org.name);
        }
        Ok(Self {
            organization_map,
            dn_map,
        })
    }

    /// A resolver over a fixed organization map; used by tests.
    #[doc(hidden)]
    pub fn from_organizations(organizations: Vec<(String, String)>) -> Self {
        let mut organization_map = HashMap::new();
        let mut dn_map = HashMap::new();
        for (name, dn) in organizations {
            organization_map.insert(name.clone(), dn.clone());
            dn_map.insert(dn, name);
        }
        Self {
            organization_map,
            dn_map,
        }
    }

    /// The DN of a named organization.
    pub fn organization_dn(&self, name: &str) -> ApiResult<&str> {
        self.organization_map
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ApiError::not_found(format!("organization '{name}'")))
    }

    /// The names of every known organization, sorted.
    pub fn organization_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.organization_map.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Splits a DN into its organization and the remainder, by matching the
    /// DN's suffix against the known organizations.
    fn split_by_organization<'a>(&self, dn: &'a str) -> ApiResult<(&str, &str, &'a str)> {
        for (org_dn, org_name) in &self.dn_map {
            if let Some(prefix) = dn.strip_suffix(org_dn.as_str()) {
                let remainder = prefix.trim_end_matches(',');
                return Ok((org_name, org_dn, remainder));
            }
        }
        Err(ApiError::not_found(format!(
            "an organization owning the identifier '{dn}'"
        )))
    }

    /// Resolves a container path to the DN of the container it names.
    ///
    /// The root path `//` resolves to the directory root without a remote
    /// call. Every other path walks the tree one segment at a time; each
    /// step must match exactly one child with the segment's kind, exact
    /// name and the current container as its direct parent.
    pub async fn path_to_dn(
        &self,
        client: &DirectoryClient,
        path: &ContainerPath,
    ) -> ApiResult<String> {
        let Some(organization) = &path.organization else {
            return Ok(client.root_dn().to_string());
        };
        let mut current = self.organization_dn(organization)?.to_string();

        for segment in &path.segments {
            current = self.resolve_segment(client, &current, segment).await?;
        }
        Ok(current)
    }

    async fn resolve_segment(
        &self,
        client: &DirectoryClient,
        parent_dn: &str,
        segment: &PathSegment,
    ) -> ApiResult<String> {
        // The remote search is descendant-recursive and name-based; narrow
        // to exact name and direct children of the current container.
        let outcome = entities::container::search(
            client,
            parent_dn,
            &segment.name,
            segment.kind,
            true,
            true,
        )
        .await?;
        let matches: Vec<DirectoryObject> = require_payload(outcome, "container search results")?;

        let what = format!(
            "container '{}::{}' under '{parent_dn}'",
            segment.kind.prefix(),
            segment.name
        );
        match Located::from_matches(matches) {
            Located::Absent => Err(ApiError::not_found(what)),
            Located::Ambiguous(count) => Err(ApiError::ambiguous(what, count)),
            Located::One(container) => Ok(container.itim_dn),
        }
    }

    /// Reconstructs the container path of a container DN by walking parent
    /// links upward until an organization is reached.
    pub async fn dn_to_path(
        &self,
        client: &DirectoryClient,
        dn: &str,
    ) -> ApiResult<ContainerPath> {
        if dn == client.root_dn() {
            return Ok(ContainerPath::root());
        }

        let mut segments: Vec<PathSegment> = Vec::new();
        let mut current = dn.to_string();

        for _ in 0..MAX_WALK_DEPTH {
            if let Some(org_name) = self.dn_map.get(&current) {
                segments.reverse();
                return Ok(ContainerPath {
                    organization: Some(org_name.clone()),
                    segments,
                });
            }

            let outcome = entities::container::get(client, &current).await?;
            let container: DirectoryObject = require_payload(outcome, "container information")?;
            let kind = ContainerKind::from_search_profile(&container.profile_name)
                .ok_or_else(|| {
                    ApiError::validation(format!("the object '{current}' is not a container"))
                })?;

            if kind == ContainerKind::Organization {
                segments.reverse();
                return Ok(ContainerPath {
                    organization: Some(container.name),
                    segments,
                });
            }

            let parent = container.parent_dn().ok_or_else(|| {
                ApiError::invalid_response(format!(
                    "the container '{current}' has no parent link"
                ))
            })?;
            let parent = parent.to_string();
            segments.push(PathSegment {
                kind,
                name: container.name,
            });
            current = parent;
        }

        Err(ApiError::validation(format!(
            "the identifier '{dn}' nests deeper than {MAX_WALK_DEPTH} containers"
        )))
    }

    /// Finds at most one person, role or service with the given name whose
    /// direct parent is the container named by `path`.
    ///
    /// Absence is reported, not raised, so idempotent callers can create;
    /// workflows have no direct search and are rejected here.
    pub async fn resolve_unique(
        &self,
        client: &DirectoryClient,
        path: &ContainerPath,
        name: &str,
        kind: ObjectKind,
    ) -> ApiResult<Located<DirectoryObject>> {
        let container_dn = self.path_to_dn(client, path).await?;
        self.resolve_unique_in(client, &container_dn, name, kind)
            .await
    }

    /// As [`PathResolver::resolve_unique`], with the container DN already
    /// known.
    pub async fn resolve_unique_in(
        &self,
        client: &DirectoryClient,
        container_dn: &str,
        name: &str,
        kind: ObjectKind,
    ) -> ApiResult<Located<DirectoryObject>> {
        let filter = Filter::equals(kind.name_attribute(), name).to_string();
        let outcome = match kind {
            ObjectKind::Person => entities::person::search_from_root(client, &filter).await?,
            ObjectKind::Role => {
                entities::role::search_in_container(client, container_dn, &filter).await?
            }
            ObjectKind::Service => {
                entities::service::search(client, container_dn, &filter).await?
            }
            ObjectKind::Workflow => {
                return Err(ApiError::validation(
                    "workflows cannot be looked up directly; use an attribute search".to_string(),
                ))
            }
        };
        let candidates: Vec<DirectoryObject> =
            require_payload(outcome, &format!("{} search results", kind.name()))?;

        let matches: Vec<DirectoryObject> = candidates
            .into_iter()
            .filter(|candidate| {
                candidate.attributes.first(kind.name_attribute()) == Some(name)
                    && candidate.parent_dn() == Some(container_dn)
            })
            .collect();
        Ok(Located::from_matches(matches))
    }

    /// Resolves a named object under a container path to its identifier.
    ///
    /// Workflows are located indirectly through an attribute search and
    /// their identifier synthesized by template; every other kind goes
    /// through [`PathResolver::resolve_unique`]. `None` means no such
    /// object exists.
    pub async fn encode_object_dn(
        &self,
        client: &DirectoryClient,
        path: &ContainerPath,
        name: &str,
        kind: ObjectKind,
    ) -> ApiResult<Option<String>> {
        if kind != ObjectKind::Workflow {
            return match self.resolve_unique(client, path, name, kind).await? {
                Located::Absent => Ok(None),
                Located::One(object) => Ok(Some(object.itim_dn)),
                Located::Ambiguous(count) => Err(ApiError::ambiguous(
                    format!("{} '{name}' in '{path}'", kind.name()),
                    count,
                )),
            };
        }

        let container_dn = self.path_to_dn(client, path).await?;
        let filter = Filter::and(vec![
            Filter::equals(kind.name_attribute(), name),
            Filter::equals("erparent", container_dn.clone()),
        ]);
        let arguments = SearchArguments::new(
            kind.category(),
            "erglobalid",
            filter.to_string(),
            BASE_ORG,
        );
        let outcome = search_data::find(client, "Retrieving an object", &arguments).await?;
        let ids = require_payload(outcome, "workflow search results")?;

        match Located::from_matches(ids) {
            Located::Absent => Ok(None),
            Located::Ambiguous(count) => Err(ApiError::ambiguous(
                format!("workflow '{name}' in '{path}'"),
                count,
            )),
            Located::One(erglobalid) => Ok(Some(format!(
                "erglobalid={erglobalid},{},{container_dn}",
                ObjectKind::Workflow.ou_component()
            ))),
        }
    }

    /// Makes an object identifier human-readable: which organization it
    /// belongs to, what kind of object it refers to, and the object's name.
    pub async fn decode_object_dn(
        &self,
        client: &DirectoryClient,
        dn: &str,
    ) -> ApiResult<DecodedObject> {
        let (org_name, org_dn, remainder) = self.split_by_organization(dn)?;
        let org_name = org_name.to_string();
        let org_dn = org_dn.to_string();

        let kind = ObjectKind::ALL
            .iter()
            .copied()
            .find(|kind| remainder.ends_with(kind.ou_component()))
            .ok_or_else(|| {
                ApiError::validation(format!(
                    "the identifier '{dn}' does not refer to a supported object kind; \
                     supported kinds are 'person', 'role', 'service', and 'workflow'"
                ))
            })?;

        let erglobalid = remainder
            .split(',')
            .next()
            .and_then(|component| component.strip_prefix("erglobalid="))
            .ok_or_else(|| {
                ApiError::validation(format!(
                    "the identifier '{dn}' does not carry a global id component"
                ))
            })?;

        // People are placed in numbered sub-units below ou=people, so their
        // parent link does not point at the organization; the global id
        // alone identifies them.
        let filter = if kind == ObjectKind::Person {
            Filter::equals("erglobalid", erglobalid)
        } else {
            Filter::and(vec![
                Filter::equals("erglobalid", erglobalid),
                Filter::ends_with("erparent", org_dn),
            ])
        };
        let arguments = SearchArguments::new(
            kind.category(),
            kind.name_attribute(),
            filter.to_string(),
            BASE_ORG,
        );
        let outcome = search_data::find(client, "Retrieving an object", &arguments).await?;
        let names = require_payload(outcome, "object search results")?;

        match Located::from_matches(names) {
            Located::Absent => Err(ApiError::not_found(format!("an object with identifier '{dn}'"))),
            Located::Ambiguous(count) => Err(ApiError::ambiguous(
                format!("{} with identifier '{dn}'", kind.name()),
                count,
            )),
            Located::One(name) => Ok(DecodedObject {
                organization: org_name,
                kind,
                name,
            }),
        }
    }
}
