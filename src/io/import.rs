use anyhow::{Context, Result};
use std::io::Read;
use tracing::{debug, info};

use crate::application::{AppError, LedgerService};
use crate::domain::{EntryKind, NewEntry, OwnerId, parse_cents, validate_fields};
use crate::storage::join_field_errors;

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    /// Rows rejected by the ledger's rules (e.g. an uncovered expense)
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

impl ImportResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Error that occurred during import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Parse, validate and solvency-check rows against running totals
    /// without recording them
    pub dry_run: bool,
}

/// Importer replaying CSV rows through the ledger service
pub struct Importer<'a> {
    service: &'a LedgerService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Import entries from CSV with `kind`, `amount` and `description` columns.
    ///
    /// Columns are located by header name, so files written by the exporter
    /// can be read back. Rows are created in file order, each one subject to
    /// the same solvency check as an interactive `add`; a row that fails is
    /// recorded in `errors` and the import carries on.
    pub async fn import_entries_csv<R: Read>(
        &self,
        owner: OwnerId,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let headers = csv_reader.headers().context("Failed to read CSV header")?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .with_context(|| format!("CSV header is missing the '{}' column", name))
        };
        let kind_col = column("kind")?;
        let amount_col = column("amount")?;
        let description_col = column("description")?;

        let mut result = ImportResult::default();
        // running totals a dry run checks expenses against
        let mut projected = self.service.balance(owner).await?;

        for (line_num, record) in csv_reader.records().enumerate() {
            let line = line_num + 2; // +2 for header and 0-indexing

            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let kind_str = record.get(kind_col).unwrap_or("");
            let amount_str = record.get(amount_col).unwrap_or("");
            let description = record.get(description_col).unwrap_or("");

            let kind: EntryKind = match kind_str.parse() {
                Ok(k) => k,
                Err(e) => {
                    result.errors.push(field_error(line, "kind", e));
                    continue;
                }
            };

            let amount_cents = match parse_cents(amount_str) {
                Ok(a) => a,
                Err(e) => {
                    result.errors.push(field_error(line, "amount", e));
                    continue;
                }
            };

            if options.dry_run {
                // same order as `create_entry`: solvency, then field checks
                if kind == EntryKind::Expense && !projected.covers(amount_cents) {
                    let err = AppError::insufficient_balance(amount_cents, projected.balance);
                    result.skipped += 1;
                    result.errors.push(field_error(line, "amount", err));
                } else if let Err(errors) = validate_fields(amount_cents, description) {
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("invalid entry data: {}", join_field_errors(&errors)),
                    });
                } else {
                    projected = projected.record(kind, amount_cents);
                    result.imported += 1;
                }
                continue;
            }

            let new = NewEntry::new(kind, amount_cents, description);
            match self.service.create_entry(owner, new).await {
                Ok(created) => {
                    debug!(line, id = created.entry.id, "row imported");
                    result.imported += 1;
                }
                Err(err @ AppError::InsufficientBalance { .. }) => {
                    result.skipped += 1;
                    result.errors.push(field_error(line, "amount", err));
                }
                Err(err) => {
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            %owner,
            imported = result.imported,
            skipped = result.skipped,
            errors = result.errors.len(),
            dry_run = options.dry_run,
            "import finished"
        );
        Ok(result)
    }
}

fn field_error(line: usize, field: &str, err: impl std::fmt::Display) -> ImportError {
    ImportError {
        line,
        field: Some(field.to_string()),
        error: err.to_string(),
    }
}
