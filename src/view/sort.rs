use serde::{Deserialize, Serialize};

use crate::{FieldValue, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Sort key and direction. No key means natural (server/insertion) order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: Option<String>,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Natural order.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn ascending(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            direction: SortDirection::Descending,
        }
    }

    /// The sort after a click on column `key`: the same key flips
    /// direction, a new key starts ascending.
    pub fn toggled(&self, key: &str) -> Self {
        match &self.key {
            Some(current) if current == key => Self {
                key: Some(key.to_string()),
                direction: self.direction.flipped(),
            },
            _ => Self::ascending(key),
        }
    }

    /// Stable sort of `records` under this key and direction. Ties keep
    /// their relative order in both directions.
    pub fn apply<'a, R: Record>(&self, records: &'a [R]) -> Vec<&'a R> {
        let key = match &self.key {
            Some(key) => key,
            None => return records.iter().collect(),
        };

        let mut keyed: Vec<(FieldValue, &R)> =
            records.iter().map(|r| (r.field(key), r)).collect();

        keyed.sort_by(|(a, _), (b, _)| {
            let ordering = a.compare(b);
            match self.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });

        keyed.into_iter().map(|(_, r)| r).collect()
    }
}
