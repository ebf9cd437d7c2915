use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::domain::{
    BalanceSummary, Cents, Entry, EntryId, EntryKind, EntryPatch, NewEntry, OwnerId, format_cents,
};
use crate::storage::Repository;

use super::{AppError, EntryList, LedgerSummary, Operation};

/// Application service enforcing the solvency rules on top of the repository.
/// This is the primary interface for any client (CLI, session scripts, import).
///
/// Every mutation of an owner's entries runs under that owner's lock, so the
/// balance read by a solvency check is still the balance when the write lands.
pub struct LedgerService {
    repo: Arc<Repository>,
    owner_locks: OwnerLocks,
}

type OwnerLocks = Mutex<HashMap<OwnerId, Arc<AsyncMutex<()>>>>;

/// Holds an owner's lock; on drop, forgets the owner's registry slot when no
/// other task holds or waits for it, so the registry only tracks owners with
/// a mutation in flight.
struct OwnerGuard<'a> {
    locks: &'a OwnerLocks,
    owner: OwnerId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // new waiters clone the Arc under this same registry lock
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.owner)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.owner);
        }
    }
}

/// Result of creating or updating an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryResult {
    pub entry: Entry,
    /// Owner's balance after the mutation
    pub current_balance: Cents,
}

/// Result of deleting an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedEntry {
    pub deleted_entry: Entry,
    pub current_balance: Cents,
}

impl LedgerService {
    /// Create a new ledger service on top of the given repository.
    pub fn new(repo: Arc<Repository>) -> Self {
        Self {
            repo,
            owner_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Service backed by a fresh, empty repository.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(Repository::new()))
    }

    pub fn repository(&self) -> &Arc<Repository> {
        &self.repo
    }

    async fn lock_owner(&self, owner: OwnerId) -> OwnerGuard<'_> {
        let lock = {
            let mut locks = self
                .owner_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(owner).or_default())
        };
        OwnerGuard {
            locks: &self.owner_locks,
            owner,
            guard: Some(lock.lock_owned().await),
        }
    }

    // ========================
    // Entry operations
    // ========================

    /// Record a new entry. Expenses must be covered by the current balance.
    pub async fn create_entry(
        &self,
        owner: OwnerId,
        new: NewEntry,
    ) -> Result<EntryResult, AppError> {
        let _guard = self.lock_owner(owner).await;

        if new.kind == EntryKind::Expense {
            let current = self.repo.balance(owner);
            if !current.covers(new.amount_cents) {
                warn!(
                    %owner,
                    amount = %format_cents(new.amount_cents),
                    balance = %format_cents(current.balance),
                    "expense rejected: insufficient balance"
                );
                return Err(AppError::insufficient_balance(
                    new.amount_cents,
                    current.balance,
                ));
            }
        }

        let entry = self
            .repo
            .create(owner, new.kind, new.amount_cents, &new.description)
            .map_err(|e| AppError::from_store(Operation::Create, e))?;
        let current_balance = self.repo.balance(owner).balance;

        info!(
            id = entry.id,
            %owner,
            kind = %entry.kind,
            amount = %format_cents(entry.amount_cents),
            balance = %format_cents(current_balance),
            "entry created"
        );
        Ok(EntryResult {
            entry,
            current_balance,
        })
    }

    /// All entries of an owner with their totals.
    pub async fn list_entries(&self, owner: OwnerId) -> Result<EntryList, AppError> {
        let (entries, totals) = self.repo.snapshot(owner);
        debug!(%owner, count = entries.len(), "entries listed");
        Ok(EntryList::new(entries, totals))
    }

    /// Get a single entry owned by `owner`.
    pub async fn get_entry(&self, id: EntryId, owner: OwnerId) -> Result<Entry, AppError> {
        self.repo
            .find_by_id_and_owner(id, owner)
            .ok_or(AppError::NotFound { id })
    }

    /// Apply a partial update.
    ///
    /// When the update makes the entry an expense, or changes the amount of
    /// an entry that already is one, the resulting expense must be covered
    /// by the balance of the owner's *other* entries.
    pub async fn update_entry(
        &self,
        id: EntryId,
        patch: EntryPatch,
        owner: OwnerId,
    ) -> Result<EntryResult, AppError> {
        let _guard = self.lock_owner(owner).await;

        let existing = self
            .repo
            .find_by_id_and_owner(id, owner)
            .ok_or(AppError::NotFound { id })?;

        if patch.needs_solvency_check(&existing) {
            let others = BalanceSummary::excluding(&self.repo.find_all_by_owner(owner), id);
            let amount = patch.amount_cents.unwrap_or(existing.amount_cents);
            if !others.covers(amount) {
                warn!(
                    id,
                    %owner,
                    amount = %format_cents(amount),
                    available = %format_cents(others.balance),
                    "update rejected: insufficient balance"
                );
                return Err(AppError::insufficient_balance(amount, others.balance));
            }
        }

        let entry = self
            .repo
            .update(id, owner, &patch)
            .map_err(|e| AppError::from_store(Operation::Update, e))?;
        let current_balance = self.repo.balance(owner).balance;

        info!(
            id,
            %owner,
            kind = %entry.kind,
            amount = %format_cents(entry.amount_cents),
            balance = %format_cents(current_balance),
            "entry updated"
        );
        Ok(EntryResult {
            entry,
            current_balance,
        })
    }

    /// Delete an entry. Deletions are never solvency-checked, so removing an
    /// income can leave the balance negative.
    pub async fn delete_entry(
        &self,
        id: EntryId,
        owner: OwnerId,
    ) -> Result<DeletedEntry, AppError> {
        let _guard = self.lock_owner(owner).await;

        if self.repo.find_by_id_and_owner(id, owner).is_none() {
            return Err(AppError::NotFound { id });
        }

        let deleted_entry = self
            .repo
            .delete(id, owner)
            .map_err(|e| AppError::from_store(Operation::Delete, e))?;
        let current_balance = self.repo.balance(owner).balance;

        if current_balance < 0 {
            warn!(
                id,
                %owner,
                balance = %format_cents(current_balance),
                "deletion left a negative balance"
            );
        } else {
            info!(id, %owner, balance = %format_cents(current_balance), "entry deleted");
        }
        Ok(DeletedEntry {
            deleted_entry,
            current_balance,
        })
    }

    // ========================
    // Balance operations
    // ========================

    /// Income, expense and balance totals.
    pub async fn balance(&self, owner: OwnerId) -> Result<BalanceSummary, AppError> {
        Ok(self.repo.balance(owner))
    }

    /// Totals plus the most recently created entries.
    pub async fn summary(&self, owner: OwnerId) -> Result<LedgerSummary, AppError> {
        let (entries, totals) = self.repo.snapshot(owner);
        Ok(LedgerSummary::new(entries, totals))
    }
}
