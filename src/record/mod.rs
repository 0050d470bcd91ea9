//! Records - remotely owned entities materialized locally by a list controller.
//!
//! A record is anything the remote store keeps in a named collection and
//! hands back as JSON: log entries, groups, user accounts.
//!
//! ## Example
//!
//! ```ignore
//! use tracknest::Record;
//!
//! #[derive(Serialize, Deserialize, Clone, Record)]
//! #[record(collection = "groups")]  // or: collection = "users", requires = "ManageUsers"
//! struct EntryGroup {
//!     #[record(id)]
//!     pub id: i64,
//!     pub name: String,
//! }
//!
//! let group = EntryGroup { id: 7, name: "Fitness".into() };
//! assert_eq!(group.field("name"), FieldValue::from("Fitness"));
//! ```

mod field;

use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::{de::DeserializeOwned, Serialize};

pub use field::FieldValue;

use crate::session::Capability;

/// Identity of a record. Opaque to the controller apart from equality,
/// ordering and hashing.
pub trait RecordId:
    Clone + Eq + Hash + Ord + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> RecordId for T where
    T: Clone
        + Eq
        + Hash
        + Ord
        + Debug
        + Display
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Trait for types that can be listed, searched and mutated through a
/// remote collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Stable identity type (`i64` for server-assigned ids, `String` for
    /// natural keys such as usernames).
    type Id: RecordId;

    /// The remote collection name (e.g., "entries", "groups", "users").
    const COLLECTION: &'static str;

    /// Capability a role needs to create, update or remove records of this
    /// collection. `None` leaves record edits open to every role.
    const REQUIRES: Option<Capability> = None;

    /// Returns the unique identifier for this record.
    fn id(&self) -> &Self::Id;

    /// Overwrite the identifier. Used when the server assigns identity.
    fn set_id(&mut self, id: Self::Id);

    /// Resolve a field by its serialized name.
    ///
    /// Dotted keys address nested objects (`"group.name"`). Missing fields
    /// and non-scalar values resolve to [`FieldValue::Null`].
    fn field(&self, key: &str) -> FieldValue {
        match serde_json::to_value(self) {
            Ok(value) => FieldValue::lookup(&value, key),
            Err(_) => FieldValue::Null,
        }
    }
}
