//! Client for a directory-backed identity management service.
//!
//! The service stores organizational containers, people, roles, services,
//! provisioning policies and workflows in a directory tree and exposes them
//! through a remote object API. This crate layers two things on top of that
//! API:
//!
//! - the [`resolver`]: translation between human-readable container paths
//!   (`//Acme//ou::Engineering`) and the opaque distinguished names the
//!   server assigns, including the inverse walk and leaf disambiguation
//! - the [`apply`] engine: idempotent create-or-update per entity kind,
//!   where only attributes that differ from the existing object are sent
//!
//! Everything talks to the server through a [`DirectoryClient`], which owns
//! the session, gates operations on the server version and classifies
//! faults. The transport itself is pluggable (see
//! [`arbor_wire::transport::RpcTransport`]); [`http::HttpTransport`] is the
//! production implementation.

pub mod apply;
pub mod config;
pub mod entities;
pub mod http;
pub mod object;
pub mod paths;
pub mod resolver;
pub mod search_data;
pub mod session;

pub use apply::{ApplyContext, ApplyOptions, Desired};
pub use config::DirectoryConfig;
pub use object::DirectoryObject;
pub use paths::{ContainerKind, ContainerPath};
pub use resolver::{Located, ObjectKind, PathResolver};
pub use session::DirectoryClient;
