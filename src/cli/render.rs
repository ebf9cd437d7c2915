use std::io::{Result, Write};

use crate::application::{EntryList, LedgerSummary};
use crate::domain::{BalanceSummary, Cents, Entry, format_cents};
use crate::io::ImportResult;

pub fn entry_change<W: Write>(
    out: &mut W,
    action: &str,
    entry: &Entry,
    current_balance: Cents,
) -> Result<()> {
    writeln!(
        out,
        "{} entry #{}: {} {} \"{}\"",
        action,
        entry.id,
        entry.kind,
        format_cents(entry.amount_cents),
        entry.description
    )?;
    writeln!(out, "Balance: {}", format_cents(current_balance))
}

pub fn entry_list<W: Write>(out: &mut W, list: &EntryList) -> Result<()> {
    if list.entries.is_empty() {
        writeln!(out, "No entries found.")?;
    } else {
        entry_table(out, &list.entries)?;
    }

    let summary = &list.summary;
    writeln!(out)?;
    writeln!(
        out,
        "{} entries | income {} | expense {} | balance {}",
        summary.entry_count,
        format_cents(summary.total_income),
        format_cents(summary.total_expense),
        format_cents(summary.balance)
    )
}

pub fn entry_detail<W: Write>(out: &mut W, entry: &Entry) -> Result<()> {
    writeln!(out, "Entry #{}", entry.id)?;
    writeln!(out, "  Kind:        {}", entry.kind)?;
    writeln!(out, "  Amount:      {}", format_cents(entry.amount_cents))?;
    writeln!(out, "  Description: {}", entry.description)?;
    writeln!(out, "  Owner:       {}", entry.owner_id)?;
    writeln!(
        out,
        "  Created:     {}",
        entry.created_at.format("%Y-%m-%d %H:%M:%S")
    )
}

pub fn summary<W: Write>(out: &mut W, summary: &LedgerSummary) -> Result<()> {
    writeln!(out, "Balance:  {:>12}", format_cents(summary.balance))?;
    writeln!(out, "Income:   {:>12}", format_cents(summary.total_income))?;
    writeln!(out, "Expense:  {:>12}", format_cents(summary.total_expense))?;
    writeln!(out, "Entries:  {:>12}", summary.entry_count)?;

    if !summary.recent_entries.is_empty() {
        writeln!(out)?;
        writeln!(out, "Recent entries:")?;
        entry_table(out, &summary.recent_entries)?;
    }
    Ok(())
}

pub fn balance<W: Write>(out: &mut W, balance: &BalanceSummary) -> Result<()> {
    writeln!(out, "Income:   {:>12}", format_cents(balance.income))?;
    writeln!(out, "Expense:  {:>12}", format_cents(balance.expense))?;
    writeln!(out, "Balance:  {:>12}", format_cents(balance.balance))
}

pub fn import_result<W: Write>(out: &mut W, result: &ImportResult, dry_run: bool) -> Result<()> {
    if dry_run {
        writeln!(
            out,
            "Validated {} entries ({} would be skipped for insufficient balance, dry run)",
            result.imported, result.skipped
        )?;
    } else {
        writeln!(
            out,
            "Imported {} entries ({} skipped for insufficient balance)",
            result.imported, result.skipped
        )?;
    }

    for err in &result.errors {
        match &err.field {
            Some(field) => writeln!(out, "  line {} [{}]: {}", err.line, field, err.error)?,
            None => writeln!(out, "  line {}: {}", err.line, err.error)?,
        }
    }
    Ok(())
}

fn entry_table<W: Write>(out: &mut W, entries: &[Entry]) -> Result<()> {
    writeln!(
        out,
        "{:<6} {:<8} {:>12}  {:<30} {:<19}",
        "ID", "KIND", "AMOUNT", "DESCRIPTION", "CREATED"
    )?;
    writeln!(out, "{}", "-".repeat(80))?;
    for entry in entries {
        writeln!(
            out,
            "{:<6} {:<8} {:>12}  {:<30} {:<19}",
            entry.id,
            entry.kind.as_str(),
            format_cents(entry.amount_cents),
            truncate(&entry.description, 30),
            entry.created_at.format("%Y-%m-%d %H:%M:%S")
        )?;
    }
    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", kept)
    }
}
