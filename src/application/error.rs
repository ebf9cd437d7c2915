use std::fmt;
use thiserror::Error;

use crate::domain::{Cents, EntryId, FieldError, display_cents};
use crate::storage::{StoreError, join_field_errors};

/// Service operation during which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Operation::Create => "create entry",
            Operation::Update => "update entry",
            Operation::Delete => "delete entry",
        };
        f.write_str(action)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Entry not found: {id}")]
    NotFound { id: EntryId },

    #[error(
        "Insufficient balance for an expense of {}: available {}, short by {}",
        display_cents(.attempted),
        display_cents(.balance),
        display_cents(.shortfall)
    )]
    InsufficientBalance {
        /// Expense amount that was checked
        attempted: Cents,
        /// Balance it was checked against
        balance: Cents,
        /// `attempted - balance`
        shortfall: Cents,
    },

    #[error("Failed to {operation}: invalid data: {}", join_field_errors(.errors))]
    InvalidData {
        operation: Operation,
        errors: Vec<FieldError>,
    },
}

impl AppError {
    pub fn insufficient_balance(attempted: Cents, balance: Cents) -> Self {
        AppError::InsufficientBalance {
            attempted,
            balance,
            shortfall: attempted.saturating_sub(balance),
        }
    }

    /// Lift a store failure into the service taxonomy. `NotFound` passes
    /// through unchanged, anything else carries the operation it broke.
    pub fn from_store(operation: Operation, err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => AppError::NotFound { id },
            StoreError::InvalidData(errors) => AppError::InvalidData { operation, errors },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }

    pub fn is_insufficient_balance(&self) -> bool {
        matches!(self, AppError::InsufficientBalance { .. })
    }
}
