use serde::{Deserialize, Serialize};

use crate::domain::{BalanceSummary, Cents, Entry};

/// How many entries `summary` lists as recent activity.
pub const RECENT_ENTRIES: usize = 5;

/// Totals reported alongside an entry listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSummary {
    pub total_income: Cents,
    pub total_expense: Cents,
    pub balance: Cents,
    pub entry_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryList {
    pub entries: Vec<Entry>,
    pub summary: ListSummary,
}

impl EntryList {
    pub fn new(entries: Vec<Entry>, totals: BalanceSummary) -> Self {
        let summary = ListSummary {
            total_income: totals.income,
            total_expense: totals.expense,
            balance: totals.balance,
            entry_count: entries.len(),
        };
        Self { entries, summary }
    }
}

/// Financial overview of one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub balance: Cents,
    pub total_income: Cents,
    pub total_expense: Cents,
    pub entry_count: usize,
    /// Newest first
    pub recent_entries: Vec<Entry>,
}

impl LedgerSummary {
    pub fn new(mut entries: Vec<Entry>, totals: BalanceSummary) -> Self {
        let entry_count = entries.len();
        // Entries created within the same clock tick fall back to id order
        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        entries.truncate(RECENT_ENTRIES);

        Self {
            balance: totals.balance,
            total_income: totals.income,
            total_expense: totals.expense,
            entry_count,
            recent_entries: entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntryKind, OwnerId};
    use chrono::{Duration, TimeZone, Utc};

    fn entries(count: u64) -> Vec<Entry> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (1..=count)
            .map(|id| Entry {
                id,
                kind: EntryKind::Income,
                amount_cents: 100,
                description: format!("entry {id}"),
                owner_id: OwnerId(1),
                // every other entry shares a timestamp with its predecessor
                created_at: start + Duration::minutes((id / 2) as i64),
            })
            .collect()
    }

    #[test]
    fn test_summary_keeps_five_newest() {
        let all = entries(8);
        let totals = BalanceSummary::from_entries(&all);
        let summary = LedgerSummary::new(all, totals);

        assert_eq!(summary.entry_count, 8);
        assert_eq!(summary.total_income, 800);
        let ids: Vec<_> = summary.recent_entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, [8, 7, 6, 5, 4]);
    }

    #[test]
    fn test_list_summary_counts_entries() {
        let all = entries(3);
        let totals = BalanceSummary::from_entries(&all);
        let list = EntryList::new(all, totals);
        assert_eq!(list.summary.entry_count, 3);
        assert_eq!(list.summary.balance, 300);
    }
}
