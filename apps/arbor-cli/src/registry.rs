//! Action dispatch: maps task action names to typed handlers.
//!
//! The table is an explicit match, so every action's argument shape is a
//! concrete struct and an unknown action is a validation error naming the
//! alternatives.

use arbor_client::entities::{container, organization, person, policy, role, service, workflow};
use arbor_client::{ApplyContext, ApplyOptions, ContainerKind, ContainerPath};
use arbor_wire::{ApiError, ApiResult, Outcome};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every action name the dispatcher knows, in reporting order.
pub const ACTIONS: &[&str] = &[
    "organizations.list",
    "container.get",
    "container.search",
    "container.apply",
    "person.get",
    "person.search",
    "person.apply",
    "role.get",
    "role.search",
    "role.apply",
    "service.get",
    "service.search",
    "service.apply_account",
    "service.apply_feed",
    "policy.search",
    "policy.apply",
    "workflow.get_attribute",
    "workflow.search_attribute",
];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetArgs {
    dn: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ContainerSearchArgs {
    parent_container_path: String,
    profile: String,
    name: String,
    #[serde(default)]
    exact_name_only: bool,
    #[serde(default)]
    direct_children_only: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FilterArgs {
    filter: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RoleSearchArgs {
    filter: String,
    #[serde(default)]
    container_path: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ServiceSearchArgs {
    container_path: String,
    filter: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicySearchArgs {
    container_path: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkflowGetAttributeArgs {
    dn: String,
    #[serde(default = "default_workflow_attribute")]
    attribute_name: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkflowSearchAttributeArgs {
    container_path: String,
    #[serde(default = "default_workflow_filter")]
    filter: String,
    #[serde(default = "default_workflow_attribute")]
    attribute_name: String,
}

fn default_workflow_attribute() -> String {
    "erglobalid".to_string()
}

fn default_workflow_filter() -> String {
    "(erprocessname=*)".to_string()
}

/// Runs one action with the given keyword arguments.
pub async fn dispatch(
    cx: &ApplyContext<'_>,
    action: &str,
    kwargs: Value,
    options: ApplyOptions,
) -> ApiResult<Outcome<Value>> {
    match action {
        "organizations.list" => erase(organization::list(cx.client).await?),
        "container.get" => {
            let args: GetArgs = parse(action, kwargs)?;
            erase(container::get(cx.client, &args.dn).await?)
        }
        "container.search" => {
            let args: ContainerSearchArgs = parse(action, kwargs)?;
            let kind: ContainerKind = args.profile.parse()?;
            let parent_dn = resolve_path(cx, &args.parent_container_path).await?;
            erase(
                container::search(
                    cx.client,
                    &parent_dn,
                    &args.name,
                    kind,
                    args.exact_name_only,
                    args.direct_children_only,
                )
                .await?,
            )
        }
        "container.apply" => {
            let config: container::ContainerConfig = parse(action, kwargs)?;
            container::apply(cx, &config, options).await
        }
        "person.get" => {
            let args: GetArgs = parse(action, kwargs)?;
            erase(person::get(cx.client, &args.dn).await?)
        }
        "person.search" => {
            let args: FilterArgs = parse(action, kwargs)?;
            erase(person::search_from_root(cx.client, &args.filter).await?)
        }
        "person.apply" => {
            let config: person::PersonConfig = parse(action, kwargs)?;
            person::apply(cx, &config, options).await
        }
        "role.get" => {
            let args: GetArgs = parse(action, kwargs)?;
            erase(role::get(cx.client, &args.dn).await?)
        }
        "role.search" => {
            let args: RoleSearchArgs = parse(action, kwargs)?;
            let container_dn = match &args.container_path {
                None => None,
                Some(path) => Some(resolve_path(cx, path).await?),
            };
            erase(role::search(cx.client, container_dn.as_deref(), &args.filter).await?)
        }
        "role.apply" => {
            let config: role::RoleConfig = parse(action, kwargs)?;
            role::apply(cx, &config, options).await
        }
        "service.get" => {
            let args: GetArgs = parse(action, kwargs)?;
            erase(service::get(cx.client, &args.dn).await?)
        }
        "service.search" => {
            let args: ServiceSearchArgs = parse(action, kwargs)?;
            let container_dn = resolve_path(cx, &args.container_path).await?;
            erase(service::search(cx.client, &container_dn, &args.filter).await?)
        }
        "service.apply_account" => {
            let config: service::AccountServiceConfig = parse(action, kwargs)?;
            service::apply_account(cx, &config, options).await
        }
        "service.apply_feed" => {
            let config: service::IdentityFeedConfig = parse(action, kwargs)?;
            service::apply_feed(cx, &config, options).await
        }
        "policy.search" => {
            let args: PolicySearchArgs = parse(action, kwargs)?;
            let container_dn = resolve_path(cx, &args.container_path).await?;
            erase(policy::search(cx.client, &container_dn, &args.name).await?)
        }
        "policy.apply" => {
            let config: policy::PolicyConfig = parse(action, kwargs)?;
            policy::apply(cx, &config, options).await
        }
        "workflow.get_attribute" => {
            let args: WorkflowGetAttributeArgs = parse(action, kwargs)?;
            erase(workflow::get_attribute(cx.client, &args.dn, &args.attribute_name).await?)
        }
        "workflow.search_attribute" => {
            let args: WorkflowSearchAttributeArgs = parse(action, kwargs)?;
            let container_dn = resolve_path(cx, &args.container_path).await?;
            erase(
                workflow::search_attribute(
                    cx.client,
                    &container_dn,
                    &args.filter,
                    &args.attribute_name,
                )
                .await?,
            )
        }
        other => Err(ApiError::validation(format!(
            "'{other}' is not a known action. Known actions are: {}.",
            ACTIONS.join(", ")
        ))),
    }
}

async fn resolve_path(cx: &ApplyContext<'_>, path: &str) -> ApiResult<String> {
    let parsed = ContainerPath::parse(path)?;
    cx.resolver.path_to_dn(cx.client, &parsed).await
}

fn parse<T: DeserializeOwned>(action: &str, kwargs: Value) -> ApiResult<T> {
    serde_json::from_value(kwargs)
        .map_err(|err| ApiError::validation(format!("invalid arguments for '{action}': {err}")))
}

/// Re-types an outcome's payload as raw JSON for uniform reporting.
fn erase<T: Serialize>(outcome: Outcome<T>) -> ApiResult<Outcome<Value>> {
    let payload = match outcome.payload {
        None => None,
        Some(payload) => Some(
            serde_json::to_value(payload)
                .map_err(|err| ApiError::invalid_response(err.to_string()))?,
        ),
    };
    Ok(Outcome {
        return_code: outcome.return_code,
        payload,
        changed: outcome.changed,
        warnings: outcome.warnings,
    })
}
