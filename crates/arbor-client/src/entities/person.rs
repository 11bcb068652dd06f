//! People.

use arbor_wire::attrs::AttributeSet;
use arbor_wire::transport::services;
use arbor_wire::{ApiError, ApiResult, Attribute, Outcome};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::apply::{self, diff_multiset, diff_scalar, ApplyContext, ApplyOptions, Diff, Reconcile};
use crate::entities::{container, require_payload, ObjectRef};
use crate::object::DirectoryObject;
use crate::paths::ContainerPath;
use crate::resolver::{Located, ObjectKind};
use crate::session::DirectoryClient;

const SERVICE: &str = services::PERSON;
const REQUIRES_VERSION: Option<&str> = None;

/// Retrieves a person by DN.
pub async fn get(client: &DirectoryClient, person_dn: &str) -> ApiResult<Outcome<DirectoryObject>> {
    let outcome = client
        .invoke(
            "Retrieving a person",
            SERVICE,
            "lookupPerson",
            vec![Value::String(person_dn.to_string())],
            REQUIRES_VERSION,
        )
        .await?;
    outcome.decode()
}

/// Searches for people matching an LDAP filter, from the directory root.
pub async fn search_from_root(
    client: &DirectoryClient,
    filter: &str,
) -> ApiResult<Outcome<Vec<DirectoryObject>>> {
    let outcome = client
        .invoke(
            "Searching for people",
            SERVICE,
            "searchPersonsFromRoot",
            vec![
                Value::String(filter.to_string()),
                // An empty attribute list: return every attribute.
                Value::String(String::new()),
            ],
            REQUIRES_VERSION,
        )
        .await?;
    outcome.decode()
}

/// Desired state of one person.
///
/// The uid, container and profile identify the person and cannot be changed
/// by apply. The password is an encrypted attribute on the server, so a
/// configured password that differs from the stored representation is
/// always re-sent.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonConfig {
    pub container_path: String,
    pub uid: String,
    #[serde(default = "default_profile")]
    pub profile: String,
    pub full_name: String,
    pub surname: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Roles the person holds, as container path plus role name references.
    #[serde(default)]
    pub roles: Vec<ObjectRef>,
}

fn default_profile() -> String {
    "Person".to_string()
}

/// Applies a person configuration: creates the person if no person with the
/// same uid exists in the container, otherwise modifies the attributes that
/// differ.
pub async fn apply(
    cx: &ApplyContext<'_>,
    config: &PersonConfig,
    options: ApplyOptions,
) -> ApiResult<Outcome<Value>> {
    if config.container_path.is_empty()
        || config.uid.is_empty()
        || config.profile.is_empty()
        || config.full_name.is_empty()
        || config.surname.is_empty()
    {
        return Err(ApiError::validation(
            "Invalid person configuration. container_path, uid, profile, full_name, and surname \
             must have non-empty string values."
            .to_string(),
        ));
    }
    if !config.profile.eq_ignore_ascii_case("person") {
        return Err(ApiError::validation(format!(
            "'{}' is not a valid profile. Must be 'Person'.",
            config.profile
        )));
    }

    let container_path = ContainerPath::parse(&config.container_path)?;
    let container_dn = cx.resolver.path_to_dn(cx.client, &container_path).await?;

    let mut role_dns = Vec::new();
    for role in &config.roles {
        let path = ContainerPath::parse(&role.path)?;
        let dn = cx
            .resolver
            .encode_object_dn(cx.client, &path, &role.name, ObjectKind::Role)
            .await?
            .ok_or_else(|| {
                ApiError::not_found(format!("role '{}' in '{}'", role.name, role.path))
            })?;
        role_dns.push(dn);
    }

    let plan = PersonPlan {
        container_path,
        container_dn,
        uid: config.uid.clone(),
        full_name: config.full_name.clone(),
        surname: config.surname.clone(),
        aliases: config.aliases.clone(),
        password: config.password.clone().unwrap_or_default(),
        role_dns,
    };
    apply::reconcile(cx, &plan, options).await
}

struct PersonPlan {
    container_path: ContainerPath,
    container_dn: String,
    uid: String,
    full_name: String,
    surname: String,
    aliases: Vec<String>,
    password: String,
    role_dns: Vec<String>,
}

impl PersonPlan {
    fn create_attributes(&self) -> AttributeSet {
        let mut attributes = AttributeSet::default();
        attributes.push(Attribute::single("uid", self.uid.clone()));
        attributes.push(Attribute::single("cn", self.full_name.clone()));
        attributes.push(Attribute::single("sn", self.surname.clone()));
        attributes.push(Attribute::new("eraliases", self.aliases.clone()));
        attributes.push(if self.password.is_empty() {
            Attribute::empty("erpersonpassword")
        } else {
            Attribute::single("erpersonpassword", self.password.clone())
        });
        attributes.push(Attribute::new("erroles", self.role_dns.clone()));
        attributes
    }
}

#[async_trait]
impl Reconcile for PersonPlan {
    type Existing = DirectoryObject;
    type Change = Vec<Attribute>;

    fn describe(&self) -> String {
        format!("the person '{}' in '{}'", self.uid, self.container_path)
    }

    async fn locate(&self, cx: &ApplyContext<'_>) -> ApiResult<Located<DirectoryObject>> {
        cx.resolver
            .resolve_unique(cx.client, &self.container_path, &self.uid, ObjectKind::Person)
            .await
    }

    fn diff(&self, existing: &DirectoryObject) -> ApiResult<Diff<Vec<Attribute>>> {
        let attrs = &existing.attributes;
        let mut changes = Vec::new();

        if let Some(attribute) =
            diff_scalar(&self.full_name, attrs.get("cn")).into_attribute("cn")
        {
            changes.push(attribute);
        }
        if let Some(attribute) = diff_scalar(&self.surname, attrs.get("sn")).into_attribute("sn") {
            changes.push(attribute);
        }
        if let Some(attribute) =
            diff_multiset(&self.aliases, attrs.get("eraliases")).into_attribute("eraliases")
        {
            changes.push(attribute);
        }
        if let Some(attribute) = diff_scalar(&self.password, attrs.get("erpersonpassword"))
            .into_attribute("erpersonpassword")
        {
            changes.push(attribute);
        }
        if let Some(attribute) =
            diff_multiset(&self.role_dns, attrs.get("erroles")).into_attribute("erroles")
        {
            changes.push(attribute);
        }

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

        let person = DirectoryObject {
            itim_dn: String::new(),
            name: String::new(),
            profile_name: "Person".to_string(),
            select: false,
            attributes: self.create_attributes(),
        };
        let person_value = serde_json::to_value(&person)
            .map_err(|err| ApiError::invalid_response(err.to_string()))?;

        cx.client
            .invoke(
                "Creating a Person",
                SERVICE,
                "createPerson",
                vec![container_value, person_value, Value::Null],
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
                "Modifying a Person",
                SERVICE,
                "modifyPerson",
                vec![
                    Value::String(existing.itim_dn.clone()),
                    change_value,
                    Value::Null,
                ],
                REQUIRES_VERSION,
            )
            .await
    }
}
