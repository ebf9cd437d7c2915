// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use saldo::application::{EntryResult, LedgerService};
use saldo::domain::{Cents, NewEntry, OwnerId};

pub const ALICE: OwnerId = OwnerId(1);
pub const BOB: OwnerId = OwnerId(2);

/// Helper to create a service over an empty repository
pub fn test_service() -> LedgerService {
    LedgerService::in_memory()
}

/// Record an income for `owner`
pub async fn income(service: &LedgerService, owner: OwnerId, cents: Cents) -> Result<EntryResult> {
    Ok(service
        .create_entry(owner, NewEntry::income(cents, "Salary"))
        .await?)
}

/// Record an expense for `owner`
pub async fn expense(
    service: &LedgerService,
    owner: OwnerId,
    cents: Cents,
) -> Result<EntryResult> {
    Ok(service
        .create_entry(owner, NewEntry::expense(cents, "Groceries"))
        .await?)
}

/// Current balance of `owner`, checked against its own totals
pub async fn balance_of(service: &LedgerService, owner: OwnerId) -> Result<Cents> {
    let summary = service.balance(owner).await?;
    assert_eq!(summary.balance, summary.income - summary.expense);
    Ok(summary.balance)
}
