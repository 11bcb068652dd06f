//! Hierarchical container paths.
//!
//! Containers are addressed by slash-delimited paths of the form
//! `//orgName//prefix::name//prefix::name`, where the prefix selects the
//! container kind. The root of the directory tree is the bare path `//`.

use std::fmt;
use std::str::FromStr;

use arbor_wire::{ApiError, ApiResult};

/// The kinds of organizational container the directory knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Organization,
    OrganizationalUnit,
    BPOrganization,
    Location,
    AdminDomain,
}

impl ContainerKind {
    pub const ALL: [ContainerKind; 5] = [
        ContainerKind::Organization,
        ContainerKind::OrganizationalUnit,
        ContainerKind::BPOrganization,
        ContainerKind::Location,
        ContainerKind::AdminDomain,
    ];

    /// The short prefix used in path segments.
    pub fn prefix(self) -> &'static str {
        match self {
            ContainerKind::Organization => "o",
            ContainerKind::OrganizationalUnit => "ou",
            ContainerKind::BPOrganization => "bp",
            ContainerKind::Location => "lo",
            ContainerKind::AdminDomain => "ad",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "o" => Some(ContainerKind::Organization),
            "ou" => Some(ContainerKind::OrganizationalUnit),
            "bp" => Some(ContainerKind::BPOrganization),
            "lo" => Some(ContainerKind::Location),
            "ad" => Some(ContainerKind::AdminDomain),
            _ => None,
        }
    }

    /// The canonical kind name used in configuration.
    pub fn name(self) -> &'static str {
        match self {
            ContainerKind::Organization => "Organization",
            ContainerKind::OrganizationalUnit => "OrganizationalUnit",
            ContainerKind::BPOrganization => "BPOrganization",
            ContainerKind::Location => "Location",
            ContainerKind::AdminDomain => "AdminDomain",
        }
    }

    /// The profile name the server expects on a create call.
    ///
    /// The endpoint names two of the kinds differently depending on the
    /// direction of the operation; this table must stay asymmetric with
    /// [`ContainerKind::search_profile`].
    pub fn create_profile(self) -> &'static str {
        match self {
            ContainerKind::BPOrganization => "BusinessPartnerOrganization",
            ContainerKind::AdminDomain => "SecurityDomain",
            other => other.name(),
        }
    }

    /// The profile name the server reports on search results.
    pub fn search_profile(self) -> &'static str {
        match self {
            ContainerKind::Organization => "Organization",
            ContainerKind::OrganizationalUnit => "OrganizationalUnit",
            ContainerKind::BPOrganization => "bporganization",
            ContainerKind::Location => "Location",
            ContainerKind::AdminDomain => "admindomain",
        }
    }

    /// Maps a profile name as reported by the server back to a kind.
    pub fn from_search_profile(profile: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.search_profile().eq_ignore_ascii_case(profile))
    }

    /// The directory attribute carrying the container's name.
    pub fn name_attribute(self) -> &'static str {
        match self {
            ContainerKind::Organization => "o",
            ContainerKind::OrganizationalUnit
            | ContainerKind::BPOrganization
            | ContainerKind::AdminDomain => "ou",
            ContainerKind::Location => "l",
        }
    }
}

impl FromStr for ContainerKind {
    type Err = ApiError;

    fn from_str(s: &str) -> ApiResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                ApiError::validation(format!(
                    "'{s}' is not a valid container profile. Valid values are 'Organization', \
                     'OrganizationalUnit', 'BPOrganization', 'Location', or 'AdminDomain'."
                ))
            })
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One `prefix::name` step of a container path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub kind: ContainerKind,
    pub name: String,
}

/// A parsed container path.
///
/// `//` is the root. `//Acme` is the organization named Acme.
/// `//Acme//ou::Engineering//lo::Sydney` walks two containers below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerPath {
    /// The organization the path descends from. `None` only for the root.
    pub organization: Option<String>,
    pub segments: Vec<PathSegment>,
}

impl ContainerPath {
    pub fn root() -> Self {
        Self {
            organization: None,
            segments: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.organization.is_none()
    }

    /// Parses a path string, rejecting malformed segments outright.
    pub fn parse(path: &str) -> ApiResult<Self> {
        if path == "//" {
            return Ok(Self::root());
        }
        let Some(rest) = path.strip_prefix("//") else {
            return Err(ApiError::validation(format!(
                "container path '{path}' must start with '//'"
            )));
        };

        let mut parts = rest.split("//");
        let organization = parts.next().unwrap_or_default();
        if organization.is_empty() {
            return Err(ApiError::validation(format!(
                "container path '{path}' has an empty organization name"
            )));
        }

        let mut segments = Vec::new();
        for part in parts {
            let mut pieces = part.split("::");
            let (Some(prefix), Some(name), None) = (pieces.next(), pieces.next(), pieces.next())
            else {
                return Err(ApiError::validation(format!(
                    "container path segment '{part}' must have the form 'prefix::name'"
                )));
            };
            let kind = ContainerKind::from_prefix(prefix).ok_or_else(|| {
                ApiError::validation(format!(
                    "'{prefix}' is not a valid container prefix. Valid values are 'o', 'ou', \
                     'bp', 'lo', or 'ad'."
                ))
            })?;
            if name.is_empty() {
                return Err(ApiError::validation(format!(
                    "container path segment '{part}' has an empty name"
                )));
            }
            segments.push(PathSegment {
                kind,
                name: name.to_string(),
            });
        }

        Ok(Self {
            organization: Some(organization.to_string()),
            segments,
        })
    }
}

impl FromStr for ContainerPath {
    type Err = ApiError;

    fn from_str(s: &str) -> ApiResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ContainerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(organization) = &self.organization else {
            return write!(f, "//");
        };
        write!(f, "//{organization}")?;
        for segment in &self.segments {
            write!(f, "//{}::{}", segment.kind.prefix(), segment.name)?;
        }
        Ok(())
    }
}
