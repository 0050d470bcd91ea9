//! The TrackNest records: log entries, the groups they belong to, and user
//! accounts.

mod entry;
mod group;
mod user;

pub use entry::{Entry, EntryType, GroupRef};
pub use group::{EntryGroup, Visibility};
pub use user::User;
