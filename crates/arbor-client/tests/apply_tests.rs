//! End-to-end tests of the apply engine: one transition per call, at most
//! one write, and no writes at all when the directory already matches.

mod common;

use std::collections::BTreeMap;

use arbor_client::entities::service::{AccountServiceConfig, ConfigValue, IdentityFeedConfig};
use arbor_client::entities::{container, person, service};
use arbor_client::{ApplyContext, ApplyOptions};
use arbor_wire::envelope::{RC_REMOTE_FAULT, RC_UNSUPPORTED_VERSION};
use arbor_wire::ApiError;
use serde_json::{json, Value};

use common::{connect_with_resolver, object, MockDirectory, ORG_DN};

const ENG_DN: &str = "erglobalid=2,ou=orgChart,erglobalid=1,ou=demo,dc=com";

fn container_config(profile: &str, name: &str) -> container::ContainerConfig {
    container::ContainerConfig {
        parent_container_path: "//Acme".to_string(),
        profile: profile.to_string(),
        name: name.to_string(),
        description: Some("eng unit".to_string()),
        associated_people: Vec::new(),
    }
}

fn org_lookup(mock: &MockDirectory) {
    mock.respond(
        "WSOrganizationalContainerService",
        "lookupContainer",
        object(ORG_DN, "Acme", "Organization", &[("o", &["Acme"])]),
    );
}

#[tokio::test]
async fn a_matching_container_produces_no_write() {
    let mock = MockDirectory::new();
    org_lookup(&mock);
    mock.script(
        "WSOrganizationalContainerService",
        "searchContainerByName",
        json!([object(
            ENG_DN,
            "Engineering",
            "OrganizationalUnit",
            &[("erparent", &[ORG_DN]), ("description", &["eng unit"])],
        )]),
    );
    let (client, resolver) = connect_with_resolver(mock.clone(), false).await;
    let cx = ApplyContext {
        client: &client,
        resolver: &resolver,
    };

    let outcome = container::apply(
        &cx,
        &container_config("OrganizationalUnit", "Engineering"),
        ApplyOptions::default(),
    )
    .await
    .expect("apply succeeds");

    assert!(outcome.succeeded());
    assert!(!outcome.changed);
    assert_eq!(mock.mutating_call_count(), 0);
}

#[tokio::test]
async fn applying_twice_creates_exactly_once() {
    let mock = MockDirectory::new();
    org_lookup(&mock);
    // First run: nothing exists yet. Second run: the created container is
    // found and matches the desired state.
    mock.script(
        "WSOrganizationalContainerService",
        "searchContainerByName",
        json!([]),
    );
    mock.script("WSOrganizationalContainerService", "createContainer", Value::Null);
    mock.script(
        "WSOrganizationalContainerService",
        "searchContainerByName",
        json!([object(
            ENG_DN,
            "Engineering",
            "OrganizationalUnit",
            &[("erparent", &[ORG_DN]), ("description", &["eng unit"])],
        )]),
    );
    let (client, resolver) = connect_with_resolver(mock.clone(), false).await;
    let cx = ApplyContext {
        client: &client,
        resolver: &resolver,
    };
    let config = container_config("OrganizationalUnit", "Engineering");

    let first = container::apply(&cx, &config, ApplyOptions::default())
        .await
        .expect("first apply succeeds");
    let second = container::apply(&cx, &config, ApplyOptions::default())
        .await
        .expect("second apply succeeds");

    assert!(first.changed);
    assert!(!second.changed);
    assert_eq!(mock.calls_of("createContainer").len(), 1);
    assert_eq!(mock.mutating_call_count(), 1);
}

#[tokio::test]
async fn creating_an_admin_domain_sends_the_create_spelling_of_the_profile() {
    let mock = MockDirectory::new();
    org_lookup(&mock);
    mock.script(
        "WSOrganizationalContainerService",
        "searchContainerByName",
        json!([]),
    );
    mock.script("WSOrganizationalContainerService", "createContainer", Value::Null);
    let (client, resolver) = connect_with_resolver(mock.clone(), false).await;
    let cx = ApplyContext {
        client: &client,
        resolver: &resolver,
    };

    container::apply(
        &cx,
        &container_config("AdminDomain", "Secure"),
        ApplyOptions::default(),
    )
    .await
    .expect("apply succeeds");

    // The search uses the canonical kind name; the create uses the
    // endpoint's other spelling.
    let searches = mock.calls_of("searchContainerByName");
    assert_eq!(searches[0].args[2], json!("AdminDomain"));
    let creates = mock.calls_of("createContainer");
    assert_eq!(creates[0].args[2]["profileName"], json!("SecurityDomain"));
}

#[tokio::test]
async fn check_mode_reports_the_create_without_contacting_the_server() {
    let mock = MockDirectory::new();
    org_lookup(&mock);
    mock.script(
        "WSOrganizationalContainerService",
        "searchContainerByName",
        json!([]),
    );
    let (client, resolver) = connect_with_resolver(mock.clone(), false).await;
    let cx = ApplyContext {
        client: &client,
        resolver: &resolver,
    };

    let outcome = container::apply(
        &cx,
        &container_config("OrganizationalUnit", "Engineering"),
        ApplyOptions {
            check_mode: true,
            force: false,
        },
    )
    .await
    .expect("apply succeeds");

    assert!(outcome.changed);
    assert!(mock.calls_of("createContainer").is_empty());
    assert_eq!(mock.mutating_call_count(), 0);
}

#[tokio::test]
async fn several_candidates_block_the_apply_with_a_warning() {
    let mock = MockDirectory::new();
    org_lookup(&mock);
    let twin = object(
        ENG_DN,
        "Engineering",
        "OrganizationalUnit",
        &[("erparent", &[ORG_DN])],
    );
    mock.script(
        "WSOrganizationalContainerService",
        "searchContainerByName",
        json!([twin.clone(), twin]),
    );
    let (client, resolver) = connect_with_resolver(mock.clone(), false).await;
    let cx = ApplyContext {
        client: &client,
        resolver: &resolver,
    };

    let outcome = container::apply(
        &cx,
        &container_config("OrganizationalUnit", "Engineering"),
        ApplyOptions::default(),
    )
    .await
    .expect("apply succeeds");

    assert!(!outcome.changed);
    assert!(outcome.warnings[0].contains("More than one instance of"));
    assert!(outcome.warnings[0].contains("No action was taken."));
    assert_eq!(mock.mutating_call_count(), 0);
}

#[tokio::test]
async fn omitted_person_fields_are_cleared_not_skipped() {
    let mock = MockDirectory::new();
    mock.script(
        "WSPersonService",
        "searchPersonsFromRoot",
        json!([object(
            "erglobalid=7,ou=0,ou=people,ou=demo,dc=com",
            "Betty Jones",
            "Person",
            &[
                ("uid", &["bjones"]),
                ("erparent", &[ORG_DN]),
                ("cn", &["Betty Jones"]),
                ("sn", &["Jones"]),
                ("eraliases", &["betty", "bj"]),
            ],
        )]),
    );
    mock.script("WSPersonService", "modifyPerson", Value::Null);
    let (client, resolver) = connect_with_resolver(mock.clone(), false).await;
    let cx = ApplyContext {
        client: &client,
        resolver: &resolver,
    };

    let config = person::PersonConfig {
        container_path: "//Acme".to_string(),
        uid: "bjones".to_string(),
        profile: "Person".to_string(),
        full_name: "Betty Jones".to_string(),
        surname: "Jones".to_string(),
        aliases: Vec::new(),
        password: None,
        roles: Vec::new(),
    };
    let outcome = person::apply(&cx, &config, ApplyOptions::default())
        .await
        .expect("apply succeeds");
    assert!(outcome.changed);

    let modifies = mock.calls_of("modifyPerson");
    assert_eq!(modifies.len(), 1);
    let changes = modifies[0].args[2].as_array().expect("change list");
    let aliases = changes
        .iter()
        .find(|change| change["name"] == json!("eraliases"))
        .expect("aliases are in the change list");
    assert_eq!(aliases["values"]["item"], json!([]));
    // Fields that already match are not re-sent.
    assert!(!changes.iter().any(|change| change["name"] == json!("cn")));
}

#[tokio::test]
async fn a_service_type_change_warns_and_writes_nothing() {
    let mock = MockDirectory::new();
    org_lookup(&mock);
    mock.script(
        "WSServiceService",
        "searchServices",
        json!([object(
            "erglobalid=8,ou=services,erglobalid=1,ou=demo,dc=com",
            "Corporate LDAP",
            "ADprofile",
            &[
                ("erservicename", &["Corporate LDAP"]),
                ("erparent", &[ORG_DN]),
            ],
        )]),
    );
    let (client, resolver) = connect_with_resolver(mock.clone(), false).await;
    let cx = ApplyContext {
        client: &client,
        resolver: &resolver,
    };

    let mut configuration = BTreeMap::new();
    configuration.insert(
        "erurl".to_string(),
        ConfigValue::One("ldap://directory:389".to_string()),
    );
    let config = AccountServiceConfig {
        container_path: "//Acme".to_string(),
        name: "Corporate LDAP".to_string(),
        service_type: "LdapProfile".to_string(),
        description: None,
        owner: None,
        prerequisite: None,
        define_access: false,
        access_name: None,
        access_type: None,
        access_description: None,
        access_image_uri: None,
        access_search_terms: Vec::new(),
        access_additional_info: None,
        access_badges: Vec::new(),
        configuration,
    };
    let outcome = service::apply_account(&cx, &config, ApplyOptions::default())
        .await
        .expect("apply succeeds");

    assert!(!outcome.changed);
    assert!(outcome.warnings[0].contains("You can't change the service type"));
    assert!(mock.calls_of("modifyService").is_empty());
    assert_eq!(mock.mutating_call_count(), 0);
}

#[tokio::test]
async fn feed_naming_contexts_compare_as_identifiers() {
    let mock = MockDirectory::new();
    org_lookup(&mock);
    mock.script(
        "WSServiceService",
        "searchServices",
        json!([object(
            "erglobalid=9,ou=services,erglobalid=1,ou=demo,dc=com",
            "HR Feed",
            "CSVFeed",
            &[
                ("erservicename", &["HR Feed"]),
                ("erparent", &[ORG_DN]),
                ("eruseworkflow", &["False"]),
                ("erevaluatesod", &["False"]),
                ("ernamingcontexts", &[ORG_DN]),
                ("eruid", &["feedadmin"]),
            ],
        )]),
    );
    let (client, resolver) = connect_with_resolver(mock.clone(), false).await;
    let cx = ApplyContext {
        client: &client,
        resolver: &resolver,
    };

    let mut configuration = BTreeMap::new();
    // Written as a container path; the server stores the identifier.
    configuration.insert(
        "erNamingContexts".to_string(),
        ConfigValue::One("//Acme".to_string()),
    );
    configuration.insert(
        "eruid".to_string(),
        ConfigValue::One("feedadmin".to_string()),
    );
    let config = IdentityFeedConfig {
        container_path: "//Acme".to_string(),
        name: "HR Feed".to_string(),
        service_type: "CSVFeed".to_string(),
        description: None,
        use_workflow: false,
        evaluate_sod: false,
        placement_rule: None,
        configuration,
    };
    let outcome = service::apply_feed(&cx, &config, ApplyOptions::default())
        .await
        .expect("apply succeeds");

    assert!(!outcome.changed);
    assert_eq!(mock.mutating_call_count(), 0);
}

#[tokio::test]
async fn the_version_gate_refuses_before_contacting_the_server() {
    let mock = MockDirectory::new();
    mock.report_version("6.0", "5");
    let (client, _resolver) = connect_with_resolver(mock.clone(), false).await;

    let result = client
        .invoke("", "WSRoleService", "searchRoles", vec![], Some("7.0"))
        .await;
    assert!(matches!(result, Err(ApiError::UnsupportedVersion { .. })));
    assert!(mock.calls_of("searchRoles").is_empty());
}

#[tokio::test]
async fn the_tolerant_version_gate_reports_a_return_code() {
    let mock = MockDirectory::new();
    mock.report_version("6.0", "5");
    let (client, _resolver) = connect_with_resolver(mock.clone(), true).await;

    let outcome = client
        .invoke("", "WSRoleService", "searchRoles", vec![], Some("7.0"))
        .await
        .expect("tolerated refusal");
    assert_eq!(outcome.return_code, RC_UNSUPPORTED_VERSION);
    assert!(!outcome.changed);
    assert!(mock.calls_of("searchRoles").is_empty());
}

#[tokio::test]
async fn tolerated_faults_become_return_codes() {
    let mock = MockDirectory::new();
    mock.script_fault(
        "WSPersonService",
        "searchPersonsFromRoot",
        "CTGIMS003E",
        "search failed",
    );
    let (client, _resolver) = connect_with_resolver(mock.clone(), true).await;

    let outcome = person::search_from_root(&client, "(uid=bjones)")
        .await
        .expect("fault tolerated");
    assert_eq!(outcome.return_code, RC_REMOTE_FAULT);
    assert!(outcome.warnings[0].contains("CTGIMS003E"));
}

#[tokio::test]
async fn fatal_faults_abort_even_in_tolerant_mode() {
    let mock = MockDirectory::new();
    mock.script_fault(
        "WSPersonService",
        "searchPersonsFromRoot",
        "axis2ns1:Server",
        "Internal Error",
    );
    let (client, _resolver) = connect_with_resolver(mock.clone(), true).await;

    let result = person::search_from_root(&client, "(uid=bjones)").await;
    assert!(matches!(result, Err(ApiError::FatalFault { .. })));
}
