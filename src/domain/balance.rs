use serde::{Deserialize, Serialize};

use super::{Cents, Entry, EntryId, EntryKind};

/// Income and expense totals for one owner, and their difference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub income: Cents,
    pub expense: Cents,
    pub balance: Cents,
}

impl BalanceSummary {
    /// Sum income and expense amounts over a set of entries.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Self {
        entries
            .into_iter()
            .fold(Self::default(), |acc, entry| acc.record(entry.kind, entry.amount_cents))
    }

    /// Totals after recording one more entry.
    ///
    /// Saturates instead of overflowing; amounts are bounded by
    /// `MAX_AMOUNT_CENTS`, so a ledger only reaches the limit with close to
    /// a million maximal entries.
    pub fn record(self, kind: EntryKind, amount_cents: Cents) -> Self {
        let (income, expense) = match kind {
            EntryKind::Income => (self.income.saturating_add(amount_cents), self.expense),
            EntryKind::Expense => (self.income, self.expense.saturating_add(amount_cents)),
        };
        Self {
            income,
            expense,
            balance: income.saturating_sub(expense),
        }
    }

    /// Balance over every entry except `excluded`, whatever its kind.
    /// Used to re-check an entry's solvency as if it were not yet recorded.
    pub fn excluding<'a>(entries: impl IntoIterator<Item = &'a Entry>, excluded: EntryId) -> Self {
        Self::from_entries(entries.into_iter().filter(|e| e.id != excluded))
    }

    pub fn covers(&self, expense_cents: Cents) -> bool {
        self.balance >= expense_cents
    }

    /// How much is missing to cover an expense; zero when covered.
    pub fn shortfall(&self, expense_cents: Cents) -> Cents {
        expense_cents.saturating_sub(self.balance).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OwnerId;
    use chrono::Utc;

    fn entry(id: EntryId, kind: EntryKind, amount_cents: Cents) -> Entry {
        Entry {
            id,
            kind,
            amount_cents,
            description: "test entry".into(),
            owner_id: OwnerId(1),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_is_zero() {
        let entries: Vec<Entry> = Vec::new();
        let summary = BalanceSummary::from_entries(&entries);
        assert_eq!(summary, BalanceSummary::default());
    }

    #[test]
    fn test_income_minus_expense() {
        let entries = vec![
            entry(1, EntryKind::Income, 100_000),
            entry(2, EntryKind::Expense, 40_000),
            entry(3, EntryKind::Income, 2_550),
        ];
        let summary = BalanceSummary::from_entries(&entries);
        assert_eq!(summary.income, 102_550);
        assert_eq!(summary.expense, 40_000);
        assert_eq!(summary.balance, 62_550);
    }

    #[test]
    fn test_excluding_drops_entry_regardless_of_kind() {
        let entries = vec![
            entry(1, EntryKind::Income, 20_000),
            entry(2, EntryKind::Expense, 5_000),
        ];
        assert_eq!(BalanceSummary::excluding(&entries, 2).balance, 20_000);
        assert_eq!(BalanceSummary::excluding(&entries, 1).balance, -5_000);
        assert_eq!(BalanceSummary::excluding(&entries, 99).balance, 15_000);
    }

    #[test]
    fn test_covers_and_shortfall() {
        let summary = BalanceSummary {
            income: 10_000,
            expense: 0,
            balance: 10_000,
        };
        assert!(summary.covers(10_000));
        assert!(!summary.covers(15_000));
        assert_eq!(summary.shortfall(15_000), 5_000);
        assert_eq!(summary.shortfall(500), 0);
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let entries = vec![
            entry(1, EntryKind::Income, i64::MAX / 2 + 1),
            entry(2, EntryKind::Income, i64::MAX / 2 + 1),
            entry(3, EntryKind::Expense, i64::MAX),
            entry(4, EntryKind::Expense, i64::MAX),
        ];
        let summary = BalanceSummary::from_entries(&entries);
        assert_eq!(summary.income, i64::MAX);
        assert_eq!(summary.expense, i64::MAX);
        assert_eq!(summary.balance, 0);

        let overdrawn = BalanceSummary::default().record(EntryKind::Expense, i64::MAX);
        assert_eq!(overdrawn.balance, -i64::MAX);
        assert_eq!(overdrawn.shortfall(i64::MAX), i64::MAX);
    }
}
