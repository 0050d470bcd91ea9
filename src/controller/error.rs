//! Error types for list controller operations.

use std::error::Error;
use std::fmt;

use crate::gateway::GatewayError;
use crate::removal::{BatchId, StageConflict};
use crate::session::Capability;

/// Error type for list controller operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// A remote call failed. The local view is unchanged.
    Gateway(GatewayError),
    /// A removal was requested while another batch is pending.
    RemovalPending { batch: BatchId, committing: bool },
    /// None of the requested ids are in the store.
    NotFound(String),
    /// Bulk removal with no visible row selected.
    NothingSelected,
    /// The session's role lacks the capability.
    Forbidden(Capability),
    /// Search field or term is blank.
    InvalidSearch(String),
    /// Undo after the deletes fired could not recreate every record.
    /// `lost` holds the ids that are gone for good.
    RecreateFailed {
        restored: usize,
        lost: Vec<String>,
        cause: GatewayError,
    },
    /// No Tokio runtime to run the removal countdown on.
    NoRuntime,
    LockPoisoned(&'static str),
    /// The controller was disposed.
    Disposed,
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Gateway(e) => write!(f, "remote store error: {}", e),
            ControllerError::RemovalPending { batch, committing } => {
                if *committing {
                    write!(f, "removal batch {} is being committed", batch)
                } else {
                    write!(f, "removal batch {} is still pending", batch)
                }
            }
            ControllerError::NotFound(id) => write!(f, "record not in view: {}", id),
            ControllerError::NothingSelected => write!(f, "no selected rows on the current page"),
            ControllerError::Forbidden(capability) => {
                write!(f, "role does not allow {:?}", capability)
            }
            ControllerError::InvalidSearch(msg) => write!(f, "invalid search: {}", msg),
            ControllerError::RecreateFailed {
                restored,
                lost,
                cause,
            } => write!(
                f,
                "undo restored {} record(s), lost {} ({}): {}",
                restored,
                lost.len(),
                lost.join(", "),
                cause
            ),
            ControllerError::NoRuntime => write!(f, "no tokio runtime for the removal countdown"),
            ControllerError::LockPoisoned(operation) => {
                write!(f, "controller lock poisoned during {}", operation)
            }
            ControllerError::Disposed => write!(f, "controller disposed"),
        }
    }
}

impl Error for ControllerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ControllerError::Gateway(e) => Some(e),
            ControllerError::RecreateFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl From<GatewayError> for ControllerError {
    fn from(err: GatewayError) -> Self {
        ControllerError::Gateway(err)
    }
}

impl From<StageConflict> for ControllerError {
    fn from(conflict: StageConflict) -> Self {
        ControllerError::RemovalPending {
            batch: conflict.pending,
            committing: conflict.committing,
        }
    }
}
