//! Provisioning policies.
//!
//! Policies are structured records, not attribute bags: entitlements and
//! memberships are lists of structs with no server-side identity, so the
//! reconciliation diff matches entries by a derived equality key rather
//! than by position. Any mismatch, including a plain count mismatch,
//! rewrites the whole policy.

use arbor_wire::transport::services;
use arbor_wire::{ApiError, ApiResult, ItemList, Outcome};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::apply::{self, ApplyContext, ApplyOptions, Diff, Reconcile};
use crate::entities::{container, require_payload, ObjectRef};
use crate::paths::ContainerPath;
use crate::resolver::{Located, ObjectKind};
use crate::session::DirectoryClient;

const SERVICE: &str = services::PROVISIONING_POLICY;
const REQUIRES_VERSION: Option<&str> = None;

/// A provisioning policy as the server returns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyRecord {
    #[serde(rename = "itimDN")]
    pub itim_dn: String,
    pub name: String,
    pub description: String,
    pub keywords: String,
    pub caption: String,
    pub priority: i64,
    /// 1 for this business unit only, 2 to include subunits.
    pub scope: i64,
    pub enabled: bool,
    pub entitlements: ItemList<EntitlementRecord>,
    pub membership: ItemList<MembershipRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntitlementRecord {
    pub service_target: TargetRecord,
    /// 1 for automatic provisioning, 0 for manual.
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(rename = "processDN")]
    pub process_dn: String,
    pub ownership_type: String,
}

/// A service target: '0' service type, '1' specific service, '2' every
/// service (name `*`), '3' service selection policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A membership entry: '2' every user (name `*`), '3' a role by its
/// identifier, '4' all users not granted the entitlements elsewhere
/// (name `*`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Searches for provisioning policies by name in a container.
pub async fn search(
    client: &DirectoryClient,
    container_dn: &str,
    name: &str,
) -> ApiResult<Outcome<Vec<PolicyRecord>>> {
    let parent = container::get(client, container_dn).await?;
    if parent.failed() {
        return Ok(parent.carry());
    }
    let container_object = require_payload(parent, "container information")?;
    let container_value = serde_json::to_value(&container_object)
        .map_err(|err| ApiError::invalid_response(err.to_string()))?;

    let outcome = client
        .invoke(
            "Searching for a provisioning policy",
            SERVICE,
            "getPolicies",
            vec![container_value, Value::String(name.to_string())],
            REQUIRES_VERSION,
        )
        .await?;
    outcome.decode()
}

/// Desired state of one entitlement.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntitlementConfig {
    /// True for automatic provisioning, false for manual.
    pub automatic: bool,
    /// 'all', 'device', 'individual', 'system', or 'vendor'.
    pub ownership_type: String,
    /// 'all', 'type', 'policy', or 'specific'.
    pub target_type: String,
    /// The exact (case-sensitive) service profile name. Required when
    /// target_type is 'type' or 'policy'.
    #[serde(default)]
    pub service_type: Option<String>,
    /// The targeted service. Required when target_type is 'specific'.
    #[serde(default)]
    pub service: Option<ObjectRef>,
    /// A workflow to run for this entitlement.
    #[serde(default)]
    pub workflow: Option<ObjectRef>,
}

/// Desired state of one provisioning policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    pub container_path: String,
    pub name: String,
    /// An integer greater than zero; lower numbers take precedence.
    pub priority: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub available_to_subunits: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 'all', 'other', or 'roles'.
    pub membership_type: String,
    /// Roles determining membership; required non-empty when
    /// membership_type is 'roles', ignored otherwise.
    #[serde(default)]
    pub membership_roles: Vec<ObjectRef>,
    /// At least one entitlement is required.
    pub entitlements: Vec<EntitlementConfig>,
}

fn default_enabled() -> bool {
    true
}

fn ownership_token(ownership_type: &str) -> ApiResult<&'static str> {
    match ownership_type.to_lowercase().as_str() {
        "all" => Ok("*"),
        "device" => Ok("Device"),
        "individual" => Ok("Individual"),
        "system" => Ok("System"),
        "vendor" => Ok("Vendor"),
        _ => Err(ApiError::validation(
            "Invalid value for entitlement ownership_type. Valid values are 'all', 'device', \
             'individual', 'system', or 'vendor'."
            .to_string(),
        )),
    }
}

/// Applies a provisioning policy configuration: creates the policy if no
/// policy with the same name exists in the container, otherwise rewrites
/// it when anything differs.
pub async fn apply(
    cx: &ApplyContext<'_>,
    config: &PolicyConfig,
    options: ApplyOptions,
) -> ApiResult<Outcome<Value>> {
    if config.container_path.is_empty() || config.name.is_empty() {
        return Err(ApiError::validation(
            "Invalid policy configuration. container_path and name must have non-empty string \
             values."
            .to_string(),
        ));
    }
    if config.priority < 1 {
        return Err(ApiError::validation(
            "Invalid priority value. Priority must be an integer greater than 0.".to_string(),
        ));
    }
    if config.entitlements.is_empty() {
        return Err(ApiError::validation(
            "The entitlements argument must be a list containing at least one entry.".to_string(),
        ));
    }

    let container_path = ContainerPath::parse(&config.container_path)?;
    let container_dn = cx.resolver.path_to_dn(cx.client, &container_path).await?;

    let memberships = match config.membership_type.as_str() {
        "all" => vec![MembershipRecord {
            name: "*".to_string(),
            kind: "2".to_string(),
        }],
        "other" => vec![MembershipRecord {
            name: "*".to_string(),
            kind: "4".to_string(),
        }],
        "roles" => {
            if config.membership_roles.is_empty() {
                return Err(ApiError::validation(
                    "The membership_roles argument must contain a list with at least one entry \
                     if membership_type is set to 'roles'."
                    .to_string(),
                ));
            }
            let mut memberships = Vec::with_capacity(config.membership_roles.len());
            for role in &config.membership_roles {
                let dn = resolve_reference(cx, role, ObjectKind::Role).await?;
                memberships.push(MembershipRecord {
                    name: dn,
                    kind: "3".to_string(),
                });
            }
            memberships
        }
        _ => {
            return Err(ApiError::validation(
                "Invalid value for membership_type. Valid values are 'all', 'other', or 'roles'."
                    .to_string(),
            ))
        }
    };

    let mut entitlements = Vec::with_capacity(config.entitlements.len());
    for entitlement in &config.entitlements {
        entitlements.push(build_entitlement(cx, entitlement).await?);
    }

    let plan = PolicyPlan {
        container_dn,
        name: config.name.clone(),
        priority: config.priority,
        description: config.description.clone().unwrap_or_default(),
        keywords: config.keywords.clone().unwrap_or_default(),
        caption: config.caption.clone().unwrap_or_default(),
        scope: if config.available_to_subunits { 2 } else { 1 },
        enabled: config.enabled,
        memberships,
        entitlements,
    };
    apply::reconcile(cx, &plan, options).await
}

async fn build_entitlement(
    cx: &ApplyContext<'_>,
    config: &EntitlementConfig,
) -> ApiResult<EntitlementRecord> {
    let target = match config.target_type.as_str() {
        "all" => TargetRecord {
            name: "*".to_string(),
            kind: "2".to_string(),
        },
        "type" | "policy" => {
            let service_type = config.service_type.as_deref().filter(|s| !s.is_empty());
            let Some(service_type) = service_type else {
                return Err(ApiError::validation(
                    "An entitlement with target_type 'type' or 'policy' requires a service_type."
                        .to_string(),
                ));
            };
            TargetRecord {
                name: service_type.to_string(),
                kind: if config.target_type == "type" { "0" } else { "3" }.to_string(),
            }
        }
        "specific" => {
            let Some(service) = &config.service else {
                return Err(ApiError::validation(
                    "An entitlement with target_type 'specific' requires a service reference."
                        .to_string(),
                ));
            };
            TargetRecord {
                name: resolve_reference(cx, service, ObjectKind::Service).await?,
                kind: "1".to_string(),
            }
        }
        _ => {
            return Err(ApiError::validation(
                "Invalid target_type value in entitlement. Valid values are 'all', 'type', \
                 'policy', or 'specific'."
                .to_string(),
            ))
        }
    };

    let process_dn = match &config.workflow {
        None => String::new(),
        Some(workflow) => resolve_reference(cx, workflow, ObjectKind::Workflow).await?,
    };

    Ok(EntitlementRecord {
        service_target: target,
        kind: i64::from(config.automatic),
        process_dn,
        ownership_type: ownership_token(&config.ownership_type)?.to_string(),
    })
}

async fn resolve_reference(
    cx: &ApplyContext<'_>,
    reference: &ObjectRef,
    kind: ObjectKind,
) -> ApiResult<String> {
    let path = ContainerPath::parse(&reference.path)?;
    cx.resolver
        .encode_object_dn(cx.client, &path, &reference.name, kind)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "{} '{}' in '{}'",
                kind.name(),
                reference.name,
                reference.path
            ))
        })
}

struct PolicyPlan {
    container_dn: String,
    name: String,
    priority: i64,
    description: String,
    keywords: String,
    caption: String,
    scope: i64,
    enabled: bool,
    memberships: Vec<MembershipRecord>,
    entitlements: Vec<EntitlementRecord>,
}

/// The derived equality key of an entitlement: the server assigns no
/// identity to entries, so matching is by content.
fn entitlement_key(record: &EntitlementRecord) -> (String, String, i64, String, String) {
    (
        record.service_target.kind.clone(),
        record.service_target.name.clone(),
        record.kind,
        record.ownership_type.clone(),
        record.process_dn.clone(),
    )
}

fn membership_key(record: &MembershipRecord) -> (String, String) {
    (record.kind.clone(), record.name.clone())
}

impl PolicyPlan {
    fn matches(&self, existing: &PolicyRecord) -> bool {
        if self.description != existing.description
            || self.keywords != existing.keywords
            || self.caption != existing.caption
            || self.priority != existing.priority
            || self.scope != existing.scope
            || self.enabled != existing.enabled
        {
            return false;
        }

        // Count mismatch alone forces a rewrite.
        if self.entitlements.len() != existing.entitlements.item.len()
            || self.memberships.len() != existing.membership.item.len()
        {
            return false;
        }

        let mut desired: Vec<_> = self.entitlements.iter().map(entitlement_key).collect();
        let mut current: Vec<_> = existing.entitlements.item.iter().map(entitlement_key).collect();
        desired.sort();
        current.sort();
        if desired != current {
            return false;
        }

        let mut desired: Vec<_> = self.memberships.iter().map(membership_key).collect();
        let mut current: Vec<_> = existing.membership.item.iter().map(membership_key).collect();
        desired.sort();
        current.sort();
        desired == current
    }

    fn policy_value(&self, container_value: Value, itim_dn: Option<&str>) -> Value {
        let mut policy = json!({
            "name": &self.name,
            "description": &self.description,
            "keywords": &self.keywords,
            "caption": &self.caption,
            "entitlements": {"item": &self.entitlements},
            "membership": {"item": &self.memberships},
            "priority": self.priority,
            "scope": self.scope,
            "organizationalContainer": container_value,
            "enabled": self.enabled,
        });
        if let (Some(dn), Some(object)) = (itim_dn, policy.as_object_mut()) {
            object.insert("itimDN".to_string(), Value::String(dn.to_string()));
        }
        policy
    }

    async fn container_value(&self, cx: &ApplyContext<'_>) -> ApiResult<Result<Value, Outcome<Value>>> {
        let parent = container::get(cx.client, &self.container_dn).await?;
        if parent.failed() {
            return Ok(Err(parent.carry()));
        }
        let container_object = require_payload(parent, "container information")?;
        let value = serde_json::to_value(&container_object)
            .map_err(|err| ApiError::invalid_response(err.to_string()))?;
        Ok(Ok(value))
    }
}

#[async_trait]
impl Reconcile for PolicyPlan {
    type Existing = PolicyRecord;
    type Change = ();

    fn describe(&self) -> String {
        format!(
            "the provisioning policy '{}' in container '{}'",
            self.name, self.container_dn
        )
    }

    async fn locate(&self, cx: &ApplyContext<'_>) -> ApiResult<Located<PolicyRecord>> {
        let outcome = search(cx.client, &self.container_dn, &self.name).await?;
        let candidates = require_payload(outcome, "provisioning policy search results")?;
        let matches: Vec<PolicyRecord> = candidates
            .into_iter()
            .filter(|candidate| candidate.name == self.name)
            .collect();
        Ok(Located::from_matches(matches))
    }

    fn diff(&self, existing: &PolicyRecord) -> ApiResult<Diff<()>> {
        Ok(if self.matches(existing) {
            Diff::Unchanged
        } else {
            Diff::Changed(())
        })
    }

    async fn create(&self, cx: &ApplyContext<'_>) -> ApiResult<Outcome<Value>> {
        let container_value = match self.container_value(cx).await? {
            Ok(value) => value,
            Err(carried) => return Ok(carried),
        };
        let policy_value = self.policy_value(container_value.clone(), None);

        cx.client
            .invoke(
                "Creating a provisioning policy",
                SERVICE,
                "createPolicy",
                vec![container_value, policy_value, Value::Null],
                REQUIRES_VERSION,
            )
            .await
    }

    async fn modify(
        &self,
        cx: &ApplyContext<'_>,
        existing: &PolicyRecord,
        _change: (),
    ) -> ApiResult<Outcome<Value>> {
        let container_value = match self.container_value(cx).await? {
            Ok(value) => value,
            Err(carried) => return Ok(carried),
        };
        let policy_value = self.policy_value(container_value.clone(), Some(&existing.itim_dn));

        cx.client
            .invoke(
                "Modifying a provisioning policy",
                SERVICE,
                "modifyPolicy",
                vec![container_value, policy_value, Value::Null],
                REQUIRES_VERSION,
            )
            .await
    }
}
