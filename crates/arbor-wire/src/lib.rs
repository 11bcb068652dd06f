//! Wire vocabulary for the directory services API.
//!
//! This crate holds everything the higher-level client needs to talk about
//! requests and responses without committing to a concrete transport:
//!
//! - [`transport`]: the [`RpcTransport`](transport::RpcTransport) contract,
//!   the sub-service name catalog and fault classification
//! - [`envelope`]: the uniform [`Outcome`](envelope::Outcome) result shape
//!   with its tolerated-failure return codes
//! - [`attrs`]: multi-valued attribute lists in the endpoint's encoding
//! - [`filter`]: search filter construction and value escaping
//! - [`version`]: dotted server-version comparison for operation gating
//! - [`error`]: the [`ApiError`](error::ApiError) taxonomy

pub mod attrs;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod transport;
pub mod version;

pub use attrs::{Attribute, AttributeSet, ItemList};
pub use envelope::Outcome;
pub use error::{ApiError, ApiResult};
pub use filter::Filter;
pub use transport::{RpcFailure, RpcFault, RpcTransport};
