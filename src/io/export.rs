use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::{LedgerService, ListSummary};
use crate::domain::{Entry, OwnerId, format_cents};

/// Column layout shared by export and import.
pub const ENTRY_CSV_HEADER: [&str; 5] = ["id", "kind", "amount", "description", "created_at"];

/// Snapshot of one owner's ledger for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub owner: OwnerId,
    pub entries: Vec<Entry>,
    pub summary: ListSummary,
}

/// Exporter for converting an owner's entries to CSV or JSON
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export entries to CSV, amounts as two-decimal strings.
    /// Returns the number of rows written.
    pub async fn export_entries_csv<W: Write>(&self, owner: OwnerId, writer: W) -> Result<usize> {
        let list = self.service.list_entries(owner).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(ENTRY_CSV_HEADER)?;
        for entry in &list.entries {
            csv_writer.write_record([
                entry.id.to_string(),
                entry.kind.as_str().to_string(),
                format_cents(entry.amount_cents),
                entry.description.clone(),
                entry.created_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(list.entries.len())
    }

    /// Export entries and totals as a pretty-printed JSON snapshot
    pub async fn export_owner_json<W: Write>(
        &self,
        owner: OwnerId,
        mut writer: W,
    ) -> Result<OwnerSnapshot> {
        let list = self.service.list_entries(owner).await?;

        let snapshot = OwnerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            owner,
            entries: list.entries,
            summary: list.summary,
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writeln!(writer)?;
        writer.flush()?;

        Ok(snapshot)
    }
}
