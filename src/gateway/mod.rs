//! RemoteSyncGateway - asynchronous CRUD and search over a named remote
//! collection.
//!
//! The list controller only ever talks to the remote store through this
//! trait. Credentials, transport and the store's persistence format live
//! behind it.
//!
//! Two implementations ship with the crate:
//! - [`InMemoryGateway`] - shared in-process storage for tests and demos,
//!   with fault injection and a call journal.
//! - [`HttpGateway`] - the REST backend over `reqwest` (requires the
//!   `http` feature).

mod in_memory;

#[cfg(feature = "http")]
mod http;

use std::fmt;

use async_trait::async_trait;

use crate::Record;

pub use in_memory::{Fault, GatewayCall, InMemoryGateway};

#[cfg(feature = "http")]
pub use http::HttpGateway;

/// Error type for remote store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The record does not exist (e.g. already deleted).
    NotFound { collection: String, id: String },
    /// Missing or rejected credentials.
    Unauthorized(String),
    /// The record conflicts with an existing one.
    Conflict { collection: String, id: String },
    /// Any other non-success status from the remote store.
    Status { code: u16, message: String },
    /// The request never completed.
    Transport(String),
    /// The response body could not be decoded.
    Decode(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::NotFound { collection, id } => {
                write!(f, "record not found: {}:{}", collection, id)
            }
            GatewayError::Unauthorized(msg) => write!(f, "unauthorized: {}", msg),
            GatewayError::Conflict { collection, id } => {
                write!(f, "record already exists: {}:{}", collection, id)
            }
            GatewayError::Status { code, message } => {
                write!(f, "remote store returned {}: {}", code, message)
            }
            GatewayError::Transport(msg) => write!(f, "transport error: {}", msg),
            GatewayError::Decode(msg) => write!(f, "response decode error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

/// Abstract asynchronous access to a remote collection of records.
#[async_trait]
pub trait RemoteSyncGateway<R: Record>: Send + Sync + 'static {
    /// Fetch the whole collection, in server order.
    async fn list(&self, collection: &str) -> Result<Vec<R>, GatewayError>;

    /// Fetch the records whose `field` matches `term`.
    async fn search(&self, collection: &str, field: &str, term: &str)
        -> Result<Vec<R>, GatewayError>;

    /// Store a new record. The server assigns its identity.
    async fn create(&self, collection: &str, record: &R) -> Result<R, GatewayError>;

    /// Replace the record stored under `id`.
    async fn update(&self, collection: &str, id: &R::Id, record: &R) -> Result<R, GatewayError>;

    /// Delete the record stored under `id`. Fails with `NotFound` if it is
    /// already absent.
    async fn delete(&self, collection: &str, id: &R::Id) -> Result<(), GatewayError>;
}
