use chrono::Utc;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, trace};

use crate::domain::{
    BalanceSummary, Cents, Entry, EntryId, EntryKind, EntryPatch, FieldError, OwnerId,
    validate_fields,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("invalid entry data: {}", join_field_errors(.0))]
    InvalidData(Vec<FieldError>),

    #[error("entry {id} not found")]
    NotFound { id: EntryId },
}

pub(crate) fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug)]
struct LedgerState {
    /// Kept in insertion order
    entries: Vec<Entry>,
    next_id: EntryId,
}

/// In-memory store of ledger entries for every owner.
///
/// Every lookup and mutation is scoped by `(id, owner)`; an entry owned by
/// someone else behaves exactly like a missing one. The store knows nothing
/// about solvency, it only enforces the structural invariants of an entry.
#[derive(Debug)]
pub struct Repository {
    state: RwLock<LedgerState>,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository {
    /// Create an empty repository. Ids start at 1.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState {
                entries: Vec::new(),
                next_id: 1,
            }),
        }
    }

    // Mutations swap whole values, so a poisoned lock still guards consistent state.
    fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================
    // Entry operations
    // ========================

    /// Validate and append a new entry, assigning the next id.
    /// The description is stored trimmed.
    pub fn create(
        &self,
        owner: OwnerId,
        kind: EntryKind,
        amount_cents: Cents,
        description: &str,
    ) -> Result<Entry, StoreError> {
        let description =
            validate_fields(amount_cents, description).map_err(StoreError::InvalidData)?;

        let mut state = self.write();
        let entry = Entry {
            id: state.next_id,
            kind,
            amount_cents,
            description,
            owner_id: owner,
            created_at: Utc::now(),
        };
        state.next_id += 1;
        state.entries.push(entry.clone());

        trace!(id = entry.id, %owner, "entry stored");
        Ok(entry)
    }

    /// All entries of an owner, in insertion order.
    pub fn find_all_by_owner(&self, owner: OwnerId) -> Vec<Entry> {
        self.read()
            .entries
            .iter()
            .filter(|e| e.owner_id == owner)
            .cloned()
            .collect()
    }

    /// Exact match on id and owner. `None` means missing or not owned.
    pub fn find_by_id_and_owner(&self, id: EntryId, owner: OwnerId) -> Option<Entry> {
        self.read()
            .entries
            .iter()
            .find(|e| e.id == id && e.owner_id == owner)
            .cloned()
    }

    /// Merge a patch over an existing entry.
    /// The merged entry is validated before it replaces the stored one, so a
    /// rejected update leaves the entry untouched.
    pub fn update(
        &self,
        id: EntryId,
        owner: OwnerId,
        patch: &EntryPatch,
    ) -> Result<Entry, StoreError> {
        let mut state = self.write();
        let slot = state
            .entries
            .iter_mut()
            .find(|e| e.id == id && e.owner_id == owner)
            .ok_or(StoreError::NotFound { id })?;

        let updated = slot.merged(patch).map_err(StoreError::InvalidData)?;
        *slot = updated.clone();

        trace!(id, %owner, "entry replaced");
        Ok(updated)
    }

    /// Remove an entry and return it.
    pub fn delete(&self, id: EntryId, owner: OwnerId) -> Result<Entry, StoreError> {
        let mut state = self.write();
        let index = state
            .entries
            .iter()
            .position(|e| e.id == id && e.owner_id == owner)
            .ok_or(StoreError::NotFound { id })?;

        // `remove` rather than `swap_remove` to keep insertion order
        let removed = state.entries.remove(index);
        trace!(id, %owner, "entry removed");
        Ok(removed)
    }

    // ========================
    // Balance operations
    // ========================

    /// Income, expense and balance totals for an owner. All zero when the
    /// owner has no entries.
    pub fn balance(&self, owner: OwnerId) -> BalanceSummary {
        let state = self.read();
        let summary =
            BalanceSummary::from_entries(state.entries.iter().filter(|e| e.owner_id == owner));
        debug!(%owner, balance = summary.balance, "balance computed");
        summary
    }

    pub fn has_sufficient_balance(&self, owner: OwnerId, expense_cents: Cents) -> bool {
        self.balance(owner).covers(expense_cents)
    }

    /// An owner's entries and the totals computed from that same copy, so
    /// the two always agree even if writes land right after the read.
    pub fn snapshot(&self, owner: OwnerId) -> (Vec<Entry>, BalanceSummary) {
        let entries = self.find_all_by_owner(owner);
        let summary = BalanceSummary::from_entries(&entries);
        (entries, summary)
    }

    /// Total number of stored entries across all owners.
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
