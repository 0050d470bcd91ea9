//! tracknest - client-side list controllers for the TrackNest dashboard.
//!
//! A `ListController` keeps a local copy of one remote collection (entries,
//! groups, users), derives the sorted and paginated view, scopes selection
//! to the visible page and removes records optimistically with a timed undo
//! window before the remote delete is issued.

extern crate self as tracknest;

pub mod controller;
pub mod domain;
pub mod gateway;
mod record;
pub mod removal;
pub mod selection;
pub mod session;
pub mod store;
pub mod view;

pub use controller::{
    CommitOutcome, ControllerConfig, ControllerError, ListController, ListEvent, PageResetPolicy,
    RestorePosition, SearchQuery, StagingConflict, UndoOutcome,
};
pub use domain::{Entry, EntryGroup, EntryType, GroupRef, User, Visibility};
pub use gateway::{Fault, GatewayCall, GatewayError, InMemoryGateway, RemoteSyncGateway};
#[cfg(feature = "http")]
pub use gateway::HttpGateway;
pub use record::{FieldValue, Record, RecordId};
pub use removal::{RemovalBatch, StagedRemovalBuffer};
pub use selection::SelectionManager;
pub use session::{Capability, Claims, Role, Session, SessionError};
pub use store::{Position, ResourceCollectionStore};
pub use view::{DerivedView, PageSpec, SortDirection, SortSpec};

// Re-export the derive macro
pub use tracknest_macros::Record;

// Re-export the async_trait macro for custom gateways
pub use async_trait::async_trait;
