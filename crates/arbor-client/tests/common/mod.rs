//! Test doubles and fixtures for exercising the client end to end against
//! a scripted directory service.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use arbor_client::session::operation_mutates;
use arbor_client::{DirectoryClient, DirectoryConfig, PathResolver};
use arbor_wire::{RpcFailure, RpcTransport};
use async_trait::async_trait;
use serde_json::{json, Value};

/// DN of the directory root used by every fixture.
pub const ROOT_DN: &str = "ou=demo,dc=com";
/// Name and DN of the one organization the default fixture knows about.
pub const ORG_NAME: &str = "Acme";
pub const ORG_DN: &str = "erglobalid=1,ou=demo,dc=com";

type Key = (String, String);

#[derive(Clone)]
enum Scripted {
    Payload(Value),
    Fault { code: String, message: String },
    Connection(String),
}

impl Scripted {
    fn into_result(self) -> Result<Value, RpcFailure> {
        match self {
            Scripted::Payload(value) => Ok(value),
            Scripted::Fault { code, message } => Err(RpcFailure::fault(code, message)),
            Scripted::Connection(message) => Err(RpcFailure::connection(message)),
        }
    }
}

/// One call the mock received, session argument included.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub service: String,
    pub operation: String,
    pub args: Vec<Value>,
}

#[derive(Default)]
struct Inner {
    queued: HashMap<Key, VecDeque<Scripted>>,
    sticky: HashMap<Key, Scripted>,
    calls: Vec<RecordedCall>,
}

/// An in-memory transport answering from scripted responses.
///
/// Responses are keyed by (service, operation). Queued responses are
/// consumed in order; when the queue for a key is empty the sticky response
/// answers every remaining call. An operation with neither is a test bug
/// and panics.
pub struct MockDirectory {
    inner: Mutex<Inner>,
}

impl MockDirectory {
    /// A mock with a working session service and one organization.
    pub fn new() -> Arc<Self> {
        let mock = Self {
            inner: Mutex::new(Inner::default()),
        };
        mock.respond(
            "WSSessionService",
            "login",
            json!({"sessionID": "test-session"}),
        );
        mock.respond(
            "WSSessionService",
            "getItimVersionInfo",
            json!({"version": "7.0.1", "fixPackLevel": "15"}),
        );
        mock.respond(
            "WSOrganizationalContainerService",
            "getOrganizationTree",
            json!([org_node(ORG_NAME, ORG_DN)]),
        );
        Arc::new(mock)
    }

    /// Overrides the version the session service reports.
    pub fn report_version(&self, version: &str, fix_pack_level: &str) {
        self.respond(
            "WSSessionService",
            "getItimVersionInfo",
            json!({"version": version, "fixPackLevel": fix_pack_level}),
        );
    }

    /// Queues one response for the next call of the operation.
    pub fn script(&self, service: &str, operation: &str, payload: Value) {
        self.inner
            .lock()
            .expect("mock lock")
            .queued
            .entry((service.to_string(), operation.to_string()))
            .or_default()
            .push_back(Scripted::Payload(payload));
    }

    /// Queues one fault for the next call of the operation.
    pub fn script_fault(&self, service: &str, operation: &str, code: &str, message: &str) {
        self.inner
            .lock()
            .expect("mock lock")
            .queued
            .entry((service.to_string(), operation.to_string()))
            .or_default()
            .push_back(Scripted::Fault {
                code: code.to_string(),
                message: message.to_string(),
            });
    }

    /// Queues one connection failure for the next call of the operation.
    pub fn script_connection_failure(&self, service: &str, operation: &str, message: &str) {
        self.inner
            .lock()
            .expect("mock lock")
            .queued
            .entry((service.to_string(), operation.to_string()))
            .or_default()
            .push_back(Scripted::Connection(message.to_string()));
    }

    /// Answers every call of the operation once its queue is empty.
    pub fn respond(&self, service: &str, operation: &str, payload: Value) {
        self.inner
            .lock()
            .expect("mock lock")
            .sticky
            .insert(
                (service.to_string(), operation.to_string()),
                Scripted::Payload(payload),
            );
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.inner.lock().expect("mock lock").calls.clone()
    }

    /// Calls of one operation, in order.
    pub fn calls_of(&self, operation: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.operation == operation)
            .collect()
    }

    /// How many received calls would have changed server state.
    pub fn mutating_call_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| operation_mutates(&call.operation))
            .count()
    }
}

#[async_trait]
impl RpcTransport for MockDirectory {
    async fn call(
        &self,
        service: &str,
        operation: &str,
        args: &[Value],
    ) -> Result<Value, RpcFailure> {
        let mut inner = self.inner.lock().expect("mock lock");
        inner.calls.push(RecordedCall {
            service: service.to_string(),
            operation: operation.to_string(),
            args: args.to_vec(),
        });

        let key = (service.to_string(), operation.to_string());
        let scripted = inner
            .queued
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .or_else(|| inner.sticky.get(&key).cloned());
        match scripted {
            Some(scripted) => scripted.into_result(),
            None => panic!("no scripted response for {service}.{operation}"),
        }
    }
}

/// Connects a client to the mock.
pub async fn connect(transport: Arc<MockDirectory>, tolerant: bool) -> DirectoryClient {
    let config = DirectoryConfig {
        hostname: "isim.test".to_string(),
        port: 9082,
        root_dn: ROOT_DN.to_string(),
        username: "itim manager".to_string(),
        password: "secret".to_string(),
        tolerant,
        accept_invalid_certs: false,
    };
    DirectoryClient::connect(&config, transport)
        .await
        .expect("connect to mock")
}

/// Connects and bootstraps a resolver against the default organization.
pub async fn connect_with_resolver(
    transport: Arc<MockDirectory>,
    tolerant: bool,
) -> (DirectoryClient, PathResolver) {
    let client = connect(transport, tolerant).await;
    let resolver = PathResolver::bootstrap(&client)
        .await
        .expect("bootstrap resolver");
    (client, resolver)
}

/// One organization tree node as the server serializes it.
pub fn org_node(name: &str, dn: &str) -> Value {
    json!({"name": name, "itimDN": dn})
}

/// One directory entity as the server serializes it.
pub fn object(dn: &str, name: &str, profile: &str, attributes: &[(&str, &[&str])]) -> Value {
    let items: Vec<Value> = attributes
        .iter()
        .map(|(attr_name, values)| {
            json!({
                "name": attr_name,
                "operation": 0,
                "isEncoded": false,
                "values": {"item": values},
            })
        })
        .collect();
    json!({
        "itimDN": dn,
        "name": name,
        "profileName": profile,
        "select": false,
        "attributes": {"item": items},
    })
}
