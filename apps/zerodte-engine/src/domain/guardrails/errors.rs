//! Guardrail errors.

use thiserror::Error;
use uuid::Uuid;

use super::approval::ApprovalStatus;

/// Errors from operator actions on the approval gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalError {
    /// No entry with this id.
    #[error("approval {id} not found")]
    NotFound {
        /// Requested id.
        id: Uuid,
    },

    /// Entry already resolved.
    #[error("approval {id} is {status}, not pending")]
    NotPending {
        /// Requested id.
        id: Uuid,
        /// Terminal status.
        status: ApprovalStatus,
    },
}
