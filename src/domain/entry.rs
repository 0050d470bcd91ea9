use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Visibility;
use crate::Record;

/// Category of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntryType {
    #[default]
    Workout,
    Diet,
    Symptom,
    Other,
}

/// Foreign key to the group an entry belongs to. The backend inlines the
/// group's name when listing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A single personal log entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Record)]
#[record(collection = "entries")]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: EntryType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub group: Option<GroupRef>,
}

impl Entry {
    /// An entry that has not been stored yet. The server assigns its id.
    pub fn draft(title: impl Into<String>, kind: EntryType) -> Self {
        Self {
            title: title.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn in_group(mut self, id: i64, name: impl Into<String>) -> Self {
        self.group = Some(GroupRef {
            id,
            name: Some(name.into()),
        });
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}
