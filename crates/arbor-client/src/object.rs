//! Directory entity shapes as returned by the remote object API.

use arbor_wire::AttributeSet;
use serde::{Deserialize, Serialize};

/// A directory entity: a container, person, role or service.
///
/// Every entity carries its distinguished name, a display name, the profile
/// it was created under and its attribute list. Lookups return the full
/// attribute list; searches may return a trimmed one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryObject {
    #[serde(rename = "itimDN", default)]
    pub itim_dn: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub profile_name: String,
    #[serde(default)]
    pub select: bool,
    #[serde(default)]
    pub attributes: AttributeSet,
}

impl DirectoryObject {
    /// The DN of the entity's parent container, if the server reported one.
    pub fn parent_dn(&self) -> Option<&str> {
        self.attributes.first("erparent")
    }
}

/// One node of the organization tree: a top-level organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgNode {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "itimDN", default)]
    pub itim_dn: String,
}
