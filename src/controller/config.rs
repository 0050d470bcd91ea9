use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What happens to the current page when the sort changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageResetPolicy {
    /// Stay on the current page (clamped).
    #[default]
    KeepPage,
    /// Jump back to page 1, clearing the selection.
    FirstPage,
}

/// What happens when a removal is staged while another batch is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagingConflict {
    /// Refuse the new removal; the store is left untouched.
    #[default]
    Reject,
    /// Add the new records to the pending batch under its deadline.
    Fold,
}

/// Where undone records are put back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestorePosition {
    /// At the head of the collection, in batch order.
    #[default]
    Head,
    /// At the index each record occupied when it was removed (clamped).
    OriginalIndex,
}

/// Controller settings.
///
/// ```
/// use std::time::Duration;
/// use tracknest::{ControllerConfig, PageResetPolicy};
///
/// let config = ControllerConfig::default()
///     .with_page_size(25)
///     .with_undo_window(Duration::from_secs(3))
///     .with_page_reset(PageResetPolicy::FirstPage);
/// assert_eq!(config.page_size, 25);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub page_size: usize,
    #[serde(rename = "undo_window_ms", with = "millis")]
    pub undo_window: Duration,
    pub page_reset: PageResetPolicy,
    pub staging_conflict: StagingConflict,
    pub restore_position: RestorePosition,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            undo_window: Duration::from_millis(5000),
            page_reset: PageResetPolicy::default(),
            staging_conflict: StagingConflict::default(),
            restore_position: RestorePosition::default(),
        }
    }
}

impl ControllerConfig {
    /// Set the rows per page. Zero is treated as one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Set the grace period before a staged removal is committed.
    pub fn with_undo_window(mut self, window: Duration) -> Self {
        self.undo_window = window;
        self
    }

    pub fn with_page_reset(mut self, policy: PageResetPolicy) -> Self {
        self.page_reset = policy;
        self
    }

    pub fn with_staging_conflict(mut self, policy: StagingConflict) -> Self {
        self.staging_conflict = policy;
        self
    }

    pub fn with_restore_position(mut self, position: RestorePosition) -> Self {
        self.restore_position = position;
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
