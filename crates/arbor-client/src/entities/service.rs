//! Services: managed account targets and identity feeds.
//!
//! Both flavours share the same remote create and modify operations; they
//! differ in which attributes apply manages. The service type is immutable
//! once created, so a type change is reported as a warning and no action
//! is taken. Profile-specific configuration is an open key/value map;
//! attributes present on the server but absent from the configuration are
//! explicitly cleared whenever a modify is issued.

use std::collections::BTreeMap;

use arbor_wire::attrs::AttributeSet;
use arbor_wire::transport::services;
use arbor_wire::{ApiError, ApiResult, Attribute, Outcome};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::apply::{
    self, diff_multiset, diff_scalar, ApplyContext, ApplyOptions, Diff, Reconcile,
};
use crate::entities::{access_category, container, require_payload, Badge, ObjectRef};
use crate::object::DirectoryObject;
use crate::paths::ContainerPath;
use crate::resolver::{Located, ObjectKind};
use crate::session::DirectoryClient;

const SERVICE: &str = services::SERVICE;
const REQUIRES_VERSION: Option<&str> = None;

/// Attributes apply manages itself for an account service, plus server
/// bookkeeping attributes; everything else on the existing object is
/// profile-specific configuration.
const ACCOUNT_MANAGED_KEYS: &[&str] = &[
    "description",
    "owner",
    "erprerequisite",
    "eraccessoption",
    "eraccessname",
    "eraccesscategory",
    "eraccessdescription",
    "erimageuri",
    "eraccesstag",
    "eradditionalinformation",
    "erbadge",
    "eradapterprofileversion",
    "eradapterlaststatustime",
    "erparent",
    "objectclass",
    "erlastmodifiedtime",
    "eradapteruptime",
    "erglobalid",
    "erservicename",
];

const FEED_MANAGED_KEYS: &[&str] = &[
    "description",
    "eruseworkflow",
    "erevaluatesod",
    "erplacementrule",
    "eradapterprofileversion",
    "eradapterlaststatustime",
    "erparent",
    "objectclass",
    "erlastmodifiedtime",
    "eradapteruptime",
    "erglobalid",
    "erservicename",
];

/// Retrieves a service by DN.
pub async fn get(client: &DirectoryClient, service_dn: &str) -> ApiResult<Outcome<DirectoryObject>> {
    let outcome = client
        .invoke(
            "Retrieving a service",
            SERVICE,
            "lookupService",
            vec![Value::String(service_dn.to_string())],
            REQUIRES_VERSION,
        )
        .await?;
    outcome.decode()
}

/// Searches for services in a container matching an LDAP filter.
pub async fn search(
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
            &format!("Searching for services in container {container_dn}"),
            SERVICE,
            "searchServices",
            vec![container_value, Value::String(filter.to_string())],
            REQUIRES_VERSION,
        )
        .await?;
    outcome.decode()
}

/// One profile-specific configuration value: a scalar or a value list.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ConfigValue {
    One(String),
    Many(Vec<String>),
}

impl ConfigValue {
    fn is_empty(&self) -> bool {
        match self {
            ConfigValue::One(value) => value.is_empty(),
            ConfigValue::Many(values) => values.is_empty(),
        }
    }

    fn into_attribute(self, name: &str) -> Attribute {
        match self {
            ConfigValue::One(value) if value.is_empty() => Attribute::empty(name),
            ConfigValue::One(value) => Attribute::single(name, value),
            ConfigValue::Many(values) => Attribute::new(name, values),
        }
    }
}

/// Desired state of one account service.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountServiceConfig {
    pub container_path: String,
    pub name: String,
    /// The service profile, e.g. 'LdapProfile' or 'PosixLinuxProfile'.
    /// Immutable once the service exists.
    pub service_type: String,
    #[serde(default)]
    pub description: Option<String>,
    /// The person that owns the service.
    #[serde(default)]
    pub owner: Option<ObjectRef>,
    /// A service that must exist before this one.
    #[serde(default)]
    pub prerequisite: Option<ObjectRef>,
    #[serde(default)]
    pub define_access: bool,
    #[serde(default)]
    pub access_name: Option<String>,
    /// 'application', 'sharedfolder', 'emailgroup', or 'role'.
    #[serde(default)]
    pub access_type: Option<String>,
    #[serde(default)]
    pub access_description: Option<String>,
    #[serde(default)]
    pub access_image_uri: Option<String>,
    #[serde(default)]
    pub access_search_terms: Vec<String>,
    #[serde(default)]
    pub access_additional_info: Option<String>,
    #[serde(default)]
    pub access_badges: Vec<Badge>,
    /// Profile-specific attributes. Keys are matched case-insensitively.
    pub configuration: BTreeMap<String, ConfigValue>,
}

/// Desired state of one identity feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityFeedConfig {
    pub container_path: String,
    pub name: String,
    /// The feed profile, e.g. 'CSVFeed' or 'DSML2Service'. Immutable once
    /// the feed exists.
    pub service_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub use_workflow: bool,
    #[serde(default)]
    pub evaluate_sod: bool,
    #[serde(default)]
    pub placement_rule: Option<String>,
    /// Profile-specific attributes. Keys are matched case-insensitively.
    /// Values of the `ernamingcontexts` key are container paths and are
    /// translated to identifiers before comparison.
    pub configuration: BTreeMap<String, ConfigValue>,
}

/// Applies an account service configuration.
pub async fn apply_account(
    cx: &ApplyContext<'_>,
    config: &AccountServiceConfig,
    options: ApplyOptions,
) -> ApiResult<Outcome<Value>> {
    if config.container_path.is_empty()
        || config.name.is_empty()
        || config.service_type.is_empty()
        || config.configuration.is_empty()
    {
        return Err(ApiError::validation(
            "Invalid service configuration. container_path, name, and service_type must have \
             non-empty string values. configuration must be a non-empty dictionary."
            .to_string(),
        ));
    }
    if config.define_access && config.access_name.as_deref().unwrap_or("").is_empty() {
        return Err(ApiError::validation(
            "Invalid service configuration. A valid access name must be supplied if \
             define_access is true."
            .to_string(),
        ));
    }
    let access_category = match config.access_type.as_deref() {
        None | Some("") => String::new(),
        Some(access_type) => access_category(access_type)?.to_string(),
    };

    let container_path = ContainerPath::parse(&config.container_path)?;
    let container_dn = cx.resolver.path_to_dn(cx.client, &container_path).await?;

    let owner_dn = match &config.owner {
        None => String::new(),
        Some(owner) => resolve_reference(cx, owner, ObjectKind::Person).await?,
    };
    let prerequisite_dn = match &config.prerequisite {
        None => String::new(),
        Some(prerequisite) => resolve_reference(cx, prerequisite, ObjectKind::Service).await?,
    };

    let plan = ServicePlan {
        container_dn,
        name: config.name.clone(),
        service_type: config.service_type.clone(),
        description: config.description.clone().unwrap_or_default(),
        configuration: normalize_configuration(&config.configuration),
        mode: ServiceMode::Account {
            owner_dn,
            prerequisite_dn,
            define_access: config.define_access,
            access_name: config.access_name.clone().unwrap_or_default(),
            access_category,
            access_description: config.access_description.clone().unwrap_or_default(),
            access_image_uri: config.access_image_uri.clone().unwrap_or_default(),
            access_search_terms: config.access_search_terms.clone(),
            access_additional_info: config.access_additional_info.clone().unwrap_or_default(),
            access_badges: config.access_badges.iter().map(Badge::render).collect(),
        },
    };
    apply::reconcile(cx, &plan, options).await
}

/// Applies an identity feed configuration.
pub async fn apply_feed(
    cx: &ApplyContext<'_>,
    config: &IdentityFeedConfig,
    options: ApplyOptions,
) -> ApiResult<Outcome<Value>> {
    if config.container_path.is_empty()
        || config.name.is_empty()
        || config.service_type.is_empty()
        || config.configuration.is_empty()
    {
        return Err(ApiError::validation(
            "Invalid service configuration. container_path, name, and service_type must have \
             non-empty string values. configuration must be a non-empty dictionary."
            .to_string(),
        ));
    }

    let container_path = ContainerPath::parse(&config.container_path)?;
    let container_dn = cx.resolver.path_to_dn(cx.client, &container_path).await?;

    let mut configuration = normalize_configuration(&config.configuration);
    // Naming contexts are written as container paths; the server stores
    // identifiers.
    if let Some(value) = configuration.remove("ernamingcontexts") {
        let paths = match value {
            ConfigValue::One(path) => vec![path],
            ConfigValue::Many(paths) => paths,
        };
        let mut dns = Vec::with_capacity(paths.len());
        for path in &paths {
            let parsed = ContainerPath::parse(path)?;
            dns.push(cx.resolver.path_to_dn(cx.client, &parsed).await?);
        }
        configuration.insert("ernamingcontexts".to_string(), ConfigValue::Many(dns));
    }

    let plan = ServicePlan {
        container_dn,
        name: config.name.clone(),
        service_type: config.service_type.clone(),
        description: config.description.clone().unwrap_or_default(),
        configuration,
        mode: ServiceMode::Feed {
            use_workflow: config.use_workflow,
            evaluate_sod: config.evaluate_sod,
            placement_rule: config.placement_rule.clone().unwrap_or_default(),
        },
    };
    apply::reconcile(cx, &plan, options).await
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

fn normalize_configuration(
    configuration: &BTreeMap<String, ConfigValue>,
) -> BTreeMap<String, ConfigValue> {
    configuration
        .iter()
        .map(|(key, value)| (key.to_lowercase(), value.clone()))
        .collect()
}

enum ServiceMode {
    Account {
        owner_dn: String,
        prerequisite_dn: String,
        define_access: bool,
        access_name: String,
        access_category: String,
        access_description: String,
        access_image_uri: String,
        access_search_terms: Vec<String>,
        access_additional_info: String,
        access_badges: Vec<String>,
    },
    Feed {
        use_workflow: bool,
        evaluate_sod: bool,
        placement_rule: String,
    },
}

struct ServicePlan {
    container_dn: String,
    name: String,
    service_type: String,
    description: String,
    configuration: BTreeMap<String, ConfigValue>,
    mode: ServiceMode,
}

fn bool_literal(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

impl ServicePlan {
    fn managed_keys(&self) -> &'static [&'static str] {
        match self.mode {
            ServiceMode::Account { .. } => ACCOUNT_MANAGED_KEYS,
            ServiceMode::Feed { .. } => FEED_MANAGED_KEYS,
        }
    }

    fn mode_changes(&self, attrs: &AttributeSet, changes: &mut Vec<Attribute>) {
        match &self.mode {
            ServiceMode::Account {
                owner_dn,
                prerequisite_dn,
                define_access,
                access_name,
                access_category,
                access_description,
                access_image_uri,
                access_search_terms,
                access_additional_info,
                access_badges,
            } => {
                if let Some(attribute) =
                    diff_scalar(owner_dn, attrs.get("owner")).into_attribute("owner")
                {
                    changes.push(attribute);
                }
                if let Some(attribute) = diff_scalar(prerequisite_dn, attrs.get("erprerequisite"))
                    .into_attribute("erprerequisite")
                {
                    changes.push(attribute);
                }
                // eraccessoption is '2' when an access is defined, empty
                // otherwise.
                let access_option = if *define_access { "2" } else { "" };
                if let Some(attribute) = diff_scalar(access_option, attrs.get("eraccessoption"))
                    .into_attribute("eraccessoption")
                {
                    changes.push(attribute);
                }
                if let Some(attribute) =
                    diff_scalar(access_name, attrs.get("eraccessname")).into_attribute("eraccessname")
                {
                    changes.push(attribute);
                }
                if let Some(attribute) = diff_scalar(access_category, attrs.get("eraccesscategory"))
                    .into_attribute("eraccesscategory")
                {
                    changes.push(attribute);
                }
                if let Some(attribute) =
                    diff_scalar(access_description, attrs.get("eraccessdescription"))
                        .into_attribute("eraccessdescription")
                {
                    changes.push(attribute);
                }
                if let Some(attribute) =
                    diff_scalar(access_image_uri, attrs.get("erimageuri")).into_attribute("erimageuri")
                {
                    changes.push(attribute);
                }
                if let Some(attribute) = diff_multiset(access_search_terms, attrs.get("eraccesstag"))
                    .into_attribute("eraccesstag")
                {
                    changes.push(attribute);
                }
                if let Some(attribute) =
                    diff_scalar(access_additional_info, attrs.get("eradditionalinformation"))
                        .into_attribute("eradditionalinformation")
                {
                    changes.push(attribute);
                }
                if let Some(attribute) =
                    diff_multiset(access_badges, attrs.get("erbadge")).into_attribute("erbadge")
                {
                    changes.push(attribute);
                }
            }
            ServiceMode::Feed {
                use_workflow,
                evaluate_sod,
                placement_rule,
            } => {
                // The server stores these flags as literal 'True'/'False'
                // strings; an absent flag always forces a write.
                let desired = bool_literal(*use_workflow);
                if attrs.first("eruseworkflow") != Some(desired) {
                    changes.push(Attribute::single("eruseworkflow", desired));
                }
                let desired = bool_literal(*evaluate_sod);
                if attrs.first("erevaluatesod") != Some(desired) {
                    changes.push(Attribute::single("erevaluatesod", desired));
                }
                if let Some(attribute) = diff_scalar(placement_rule, attrs.get("erplacementrule"))
                    .into_attribute("erplacementrule")
                {
                    changes.push(attribute);
                }
            }
        }
    }

    fn configuration_changes(&self, attrs: &AttributeSet, changes: &mut Vec<Attribute>) {
        for (key, value) in &self.configuration {
            match value {
                ConfigValue::Many(values) => {
                    if let Some(attribute) =
                        diff_multiset(values, attrs.get(key)).into_attribute(key)
                    {
                        changes.push(attribute);
                    }
                }
                ConfigValue::One(value) => {
                    if let Some(attribute) = diff_scalar(value, attrs.get(key)).into_attribute(key)
                    {
                        changes.push(attribute);
                    }
                }
            }
        }
    }

    /// Attributes present on the server that apply does not manage and the
    /// configuration does not mention. They are swept to empty whenever a
    /// modify is already warranted.
    fn stale_keys(&self, attrs: &AttributeSet) -> Vec<String> {
        let managed = self.managed_keys();
        attrs
            .keys()
            .into_iter()
            .filter(|key| !managed.contains(&key.as_str()))
            .filter(|key| !self.configuration.contains_key(key))
            .collect()
    }

    fn create_attributes(&self) -> AttributeSet {
        let mut attributes = AttributeSet::default();
        attributes.push(Attribute::single("erservicename", self.name.clone()));
        attributes.push(if self.description.is_empty() {
            Attribute::empty("description")
        } else {
            Attribute::single("description", self.description.clone())
        });
        for (key, value) in &self.configuration {
            attributes.push(value.clone().into_attribute(key));
        }
        match &self.mode {
            ServiceMode::Account {
                owner_dn,
                prerequisite_dn,
                define_access,
                access_name,
                access_category,
                access_description,
                access_image_uri,
                access_search_terms,
                access_additional_info,
                access_badges,
            } => {
                attributes.push(scalar_attribute("owner", owner_dn));
                attributes.push(scalar_attribute("erprerequisite", prerequisite_dn));
                attributes.push(if *define_access {
                    Attribute::single("eraccessoption", "2")
                } else {
                    Attribute::empty("eraccessoption")
                });
                attributes.push(scalar_attribute("eraccessname", access_name));
                attributes.push(scalar_attribute("eraccessdescription", access_description));
                if !access_category.is_empty() {
                    attributes.push(Attribute::single("eraccesscategory", access_category.clone()));
                }
                attributes.push(scalar_attribute("erimageuri", access_image_uri));
                attributes.push(Attribute::new("eraccesstag", access_search_terms.clone()));
                attributes.push(scalar_attribute(
                    "eradditionalinformation",
                    access_additional_info,
                ));
                attributes.push(Attribute::new("erbadge", access_badges.clone()));
            }
            ServiceMode::Feed {
                use_workflow,
                evaluate_sod,
                placement_rule,
            } => {
                attributes.push(Attribute::single(
                    "eruseworkflow",
                    bool_literal(*use_workflow),
                ));
                attributes.push(Attribute::single(
                    "erevaluatesod",
                    bool_literal(*evaluate_sod),
                ));
                attributes.push(scalar_attribute("erplacementrule", placement_rule));
            }
        }
        attributes
    }

    fn operation_noun(&self) -> &'static str {
        match self.mode {
            ServiceMode::Account { .. } => "an account service",
            ServiceMode::Feed { .. } => "an identity feed",
        }
    }
}

fn scalar_attribute(name: &str, value: &str) -> Attribute {
    if value.is_empty() {
        Attribute::empty(name)
    } else {
        Attribute::single(name, value)
    }
}

#[async_trait]
impl Reconcile for ServicePlan {
    type Existing = DirectoryObject;
    type Change = Vec<Attribute>;

    fn describe(&self) -> String {
        format!(
            "the service '{}' in container '{}'",
            self.name, self.container_dn
        )
    }

    async fn locate(&self, cx: &ApplyContext<'_>) -> ApiResult<Located<DirectoryObject>> {
        cx.resolver
            .resolve_unique_in(cx.client, &self.container_dn, &self.name, ObjectKind::Service)
            .await
    }

    fn diff(&self, existing: &DirectoryObject) -> ApiResult<Diff<Vec<Attribute>>> {
        if existing.profile_name != self.service_type {
            return Ok(Diff::Blocked(format!(
                "The service '{}' in container '{}' is of service type '{}'. You can't change \
                 the service type to '{}'. Create a new service with a different name instead.",
                self.name, self.container_dn, existing.profile_name, self.service_type
            )));
        }

        let attrs = &existing.attributes;
        let mut changes = Vec::new();
        if let Some(attribute) =
            diff_scalar(&self.description, attrs.get("description")).into_attribute("description")
        {
            changes.push(attribute);
        }
        self.mode_changes(attrs, &mut changes);
        self.configuration_changes(attrs, &mut changes);

        if changes.is_empty() {
            return Ok(Diff::Unchanged);
        }
        for key in self.stale_keys(attrs) {
            changes.push(Attribute::empty(&key));
        }
        Ok(Diff::Changed(changes))
    }

    async fn create(&self, cx: &ApplyContext<'_>) -> ApiResult<Outcome<Value>> {
        let attributes_value = serde_json::to_value(self.create_attributes().item)
            .map_err(|err| ApiError::invalid_response(err.to_string()))?;

        cx.client
            .invoke(
                &format!("Creating {}", self.operation_noun()),
                SERVICE,
                "createService",
                vec![
                    Value::String(self.container_dn.clone()),
                    Value::String(self.service_type.clone()),
                    attributes_value,
                ],
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
                &format!("Modifying {}", self.operation_noun()),
                SERVICE,
                "modifyService",
                vec![Value::String(existing.itim_dn.clone()), change_value],
                REQUIRES_VERSION,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_plan() -> ServicePlan {
        let mut configuration = BTreeMap::new();
        configuration.insert(
            "erurl".to_string(),
            ConfigValue::One("ldap://directory:389".to_string()),
        );
        ServicePlan {
            container_dn: "erglobalid=1,ou=orgChart,ou=demo,dc=com".to_string(),
            name: "Corporate LDAP".to_string(),
            service_type: "LdapProfile".to_string(),
            description: "corporate directory".to_string(),
            configuration,
            mode: ServiceMode::Account {
                owner_dn: String::new(),
                prerequisite_dn: String::new(),
                define_access: false,
                access_name: String::new(),
                access_category: String::new(),
                access_description: String::new(),
                access_image_uri: String::new(),
                access_search_terms: Vec::new(),
                access_additional_info: String::new(),
                access_badges: Vec::new(),
            },
        }
    }

    fn feed_plan() -> ServicePlan {
        let mut configuration = BTreeMap::new();
        configuration.insert(
            "eruid".to_string(),
            ConfigValue::One("feedadmin".to_string()),
        );
        ServicePlan {
            container_dn: "erglobalid=1,ou=orgChart,ou=demo,dc=com".to_string(),
            name: "HR Feed".to_string(),
            service_type: "CSVFeed".to_string(),
            description: String::new(),
            configuration,
            mode: ServiceMode::Feed {
                use_workflow: true,
                evaluate_sod: false,
                placement_rule: String::new(),
            },
        }
    }

    fn existing(service_type: &str, attributes: Vec<Attribute>) -> DirectoryObject {
        DirectoryObject {
            itim_dn: "erglobalid=8,ou=services,erglobalid=1,ou=demo,dc=com".to_string(),
            name: "Corporate LDAP".to_string(),
            profile_name: service_type.to_string(),
            select: false,
            attributes: AttributeSet::from_attributes(attributes),
        }
    }

    #[test]
    fn matching_service_needs_no_change() {
        let plan = account_plan();
        let existing = existing(
            "LdapProfile",
            vec![
                Attribute::single("description", "corporate directory"),
                Attribute::single("erurl", "ldap://directory:389"),
            ],
        );
        assert!(plan.diff(&existing).expect("diff succeeds").is_unchanged());
    }

    #[test]
    fn a_service_type_change_is_blocked_with_a_warning() {
        let plan = account_plan();
        let existing = existing("ADprofile", vec![]);
        match plan.diff(&existing).expect("diff succeeds") {
            Diff::Blocked(message) => {
                assert!(message.contains("You can't change the service type"));
                assert!(message.contains("ADprofile"));
            }
            other => panic!("expected a blocked diff, got {other:?}"),
        }
    }

    #[test]
    fn unknown_remote_attributes_are_swept_once_a_change_exists() {
        let mut plan = account_plan();
        plan.description = "updated words".to_string();
        let existing = existing(
            "LdapProfile",
            vec![
                Attribute::single("description", "corporate directory"),
                Attribute::single("erurl", "ldap://directory:389"),
                Attribute::single("erstalekey", "left over"),
            ],
        );
        let change = plan
            .diff(&existing)
            .expect("diff succeeds")
            .into_change()
            .expect("a change is needed");
        let stale = change
            .iter()
            .find(|a| a.name == "erstalekey")
            .expect("stale attribute swept");
        assert!(stale.values.item.is_empty());
    }

    #[test]
    fn stale_attributes_alone_do_not_trigger_a_modify() {
        let plan = account_plan();
        let existing = existing(
            "LdapProfile",
            vec![
                Attribute::single("description", "corporate directory"),
                Attribute::single("erurl", "ldap://directory:389"),
                Attribute::single("erstalekey", "left over"),
            ],
        );
        assert!(plan.diff(&existing).expect("diff succeeds").is_unchanged());
    }

    #[test]
    fn feed_flags_compare_against_literal_strings() {
        let plan = feed_plan();
        let unchanged = existing(
            "CSVFeed",
            vec![
                Attribute::single("eruseworkflow", "True"),
                Attribute::single("erevaluatesod", "False"),
                Attribute::single("eruid", "feedadmin"),
            ],
        );
        assert!(plan.diff(&unchanged).expect("diff succeeds").is_unchanged());
    }

    #[test]
    fn absent_feed_flags_force_a_modify() {
        let plan = feed_plan();
        let existing = existing("CSVFeed", vec![Attribute::single("eruid", "feedadmin")]);
        let change = plan
            .diff(&existing)
            .expect("diff succeeds")
            .into_change()
            .expect("a change is needed");
        assert!(change.iter().any(|a| a.name == "eruseworkflow"));
        assert!(change.iter().any(|a| a.name == "erevaluatesod"));
    }

    #[test]
    fn defining_an_access_sets_the_option_to_two() {
        let mut plan = account_plan();
        if let ServiceMode::Account {
            define_access,
            access_name,
            ..
        } = &mut plan.mode
        {
            *define_access = true;
            *access_name = "LDAP access".to_string();
        }
        let existing = existing(
            "LdapProfile",
            vec![
                Attribute::single("description", "corporate directory"),
                Attribute::single("erurl", "ldap://directory:389"),
            ],
        );
        let change = plan
            .diff(&existing)
            .expect("diff succeeds")
            .into_change()
            .expect("a change is needed");
        let option = change
            .iter()
            .find(|a| a.name == "eraccessoption")
            .expect("access option present");
        assert_eq!(option.values.item, vec!["2".to_string()]);
    }
}
