use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::application::LedgerService;
use crate::domain::{Cents, EntryId, EntryKind, EntryPatch, NewEntry, OwnerId, parse_cents};
use crate::io::{Exporter, ImportOptions, Importer};

use super::OutputFormat;
use super::render;

/// One line of a session, parsed without a binary name.
#[derive(Parser, Debug)]
#[command(name = "saldo", no_binary_name = true, disable_version_flag = true)]
struct SessionLine {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    /// Record an income or expense
    Add {
        /// income or expense
        kind: EntryKind,

        /// Amount (e.g. "50.00" or "50")
        #[arg(value_parser = parse_cents, allow_negative_numbers = true)]
        amount: Cents,

        /// Description, 3 to 255 characters (words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
    },

    /// List all entries with totals
    List,

    /// Show a single entry
    Show {
        /// Entry ID
        id: EntryId,
    },

    /// Change the kind, amount or description of an entry
    #[command(group(
        ArgGroup::new("fields")
            .required(true)
            .multiple(true)
            .args(["kind", "amount", "description"])
    ))]
    Update {
        /// Entry ID
        id: EntryId,

        /// New kind: income or expense
        #[arg(short, long)]
        kind: Option<EntryKind>,

        /// New amount
        #[arg(short, long, value_parser = parse_cents, allow_negative_numbers = true)]
        amount: Option<Cents>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete an entry
    Delete {
        /// Entry ID
        id: EntryId,
    },

    /// Balance, totals and the most recent entries
    Summary,

    /// Income, expense and balance totals
    Balance,

    /// Act as another owner (shows the current one when omitted)
    Owner {
        id: Option<OwnerId>,
    },

    /// Export the current owner's entries
    Export {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Output file (session output if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import entries from a CSV file with kind, amount and description columns
    Import {
        /// Input file
        input: PathBuf,

        /// Validate rows without recording them
        #[arg(long)]
        dry_run: bool,
    },

    /// End the session
    #[command(alias = "quit")]
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl SessionCommand {
    /// Parse a command line the way a shell would split it.
    pub fn parse_line(line: &str) -> Result<Self> {
        let words = shell_words::split(line).context("Unbalanced quotes in command")?;
        let parsed = SessionLine::try_parse_from(words)?;
        Ok(parsed.command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Prompt before each line, report errors and keep reading
    Interactive,
    /// Stop at the first failing line
    Strict,
    /// Report failing lines and keep reading
    KeepGoing,
}

/// A sequence of commands run against one ledger service, acting as one
/// owner at a time.
pub struct Session<'a> {
    service: &'a LedgerService,
    owner: OwnerId,
    format: OutputFormat,
}

impl<'a> Session<'a> {
    pub fn new(service: &'a LedgerService, owner: OwnerId, format: OutputFormat) -> Self {
        Self {
            service,
            owner,
            format,
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Read and execute lines until input ends or `exit` is given.
    /// Blank lines and lines starting with `#` are skipped.
    pub async fn run<R: BufRead, W: Write>(
        &mut self,
        reader: R,
        out: &mut W,
        mode: RunMode,
    ) -> Result<()> {
        let mut lines = reader.lines();
        let mut line_num = 0;

        loop {
            if mode == RunMode::Interactive {
                write!(out, "saldo[{}]> ", self.owner)?;
                out.flush()?;
            }

            let Some(line) = lines.next() else {
                break;
            };
            let line = line.context("Failed to read command")?;
            line_num += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            match self.execute_line(trimmed, out).await {
                Ok(LoopControl::Continue) => {}
                Ok(LoopControl::Exit) => break,
                Err(err) if mode == RunMode::Strict => {
                    return Err(err.context(format!("Line {}: {}", line_num, trimmed)));
                }
                Err(err) => writeln!(out, "{}", describe_error(&err))?,
            }
        }

        Ok(())
    }

    /// Execute a single command line.
    pub async fn execute_line<W: Write>(
        &mut self,
        line: &str,
        out: &mut W,
    ) -> Result<LoopControl> {
        let command = match SessionCommand::parse_line(line) {
            Ok(command) => command,
            Err(err) => {
                // help output is a successful command, not a failure
                if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
                    if matches!(
                        clap_err.kind(),
                        ErrorKind::DisplayHelp
                            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                    ) {
                        write!(out, "{}", clap_err.render())?;
                        return Ok(LoopControl::Continue);
                    }
                }
                return Err(err);
            }
        };

        debug!(owner = %self.owner, ?command, "executing session command");
        self.execute(command, out).await
    }

    pub async fn execute<W: Write>(
        &mut self,
        command: SessionCommand,
        out: &mut W,
    ) -> Result<LoopControl> {
        let owner = self.owner;

        match command {
            SessionCommand::Add {
                kind,
                amount,
                description,
            } => {
                let new = NewEntry::new(kind, amount, description.join(" "));
                let result = self.service.create_entry(owner, new).await?;
                self.emit(out, &result, |out| {
                    render::entry_change(out, "Created", &result.entry, result.current_balance)
                })?;
            }

            SessionCommand::List => {
                let list = self.service.list_entries(owner).await?;
                self.emit(out, &list, |out| render::entry_list(out, &list))?;
            }

            SessionCommand::Show { id } => {
                let entry = self.service.get_entry(id, owner).await?;
                self.emit(out, &entry, |out| render::entry_detail(out, &entry))?;
            }

            SessionCommand::Update {
                id,
                kind,
                amount,
                description,
            } => {
                let patch = EntryPatch {
                    kind,
                    amount_cents: amount,
                    description,
                };
                let result = self.service.update_entry(id, patch, owner).await?;
                self.emit(out, &result, |out| {
                    render::entry_change(out, "Updated", &result.entry, result.current_balance)
                })?;
            }

            SessionCommand::Delete { id } => {
                let result = self.service.delete_entry(id, owner).await?;
                self.emit(out, &result, |out| {
                    render::entry_change(
                        out,
                        "Deleted",
                        &result.deleted_entry,
                        result.current_balance,
                    )
                })?;
            }

            SessionCommand::Summary => {
                let summary = self.service.summary(owner).await?;
                self.emit(out, &summary, |out| render::summary(out, &summary))?;
            }

            SessionCommand::Balance => {
                let balance = self.service.balance(owner).await?;
                self.emit(out, &balance, |out| render::balance(out, &balance))?;
            }

            SessionCommand::Owner { id } => {
                if let Some(id) = id {
                    self.owner = id;
                }
                writeln!(out, "Acting as owner {}", self.owner)?;
            }

            SessionCommand::Export { format, output } => {
                self.export(format, output.as_deref(), out).await?;
            }

            SessionCommand::Import { input, dry_run } => {
                self.import_file(&input, dry_run, out).await?;
            }

            SessionCommand::Exit => return Ok(LoopControl::Exit),
        }

        Ok(LoopControl::Continue)
    }

    /// Import a CSV file for the current owner and report the outcome.
    pub async fn import_file<W: Write>(
        &mut self,
        path: &Path,
        dry_run: bool,
        out: &mut W,
    ) -> Result<()> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open input file: {}", path.display()))?;

        let result = Importer::new(self.service)
            .import_entries_csv(self.owner, file, ImportOptions { dry_run })
            .await?;

        render::import_result(out, &result, dry_run)?;
        Ok(())
    }

    async fn export<W: Write>(
        &self,
        format: ExportFormat,
        output: Option<&Path>,
        out: &mut W,
    ) -> Result<()> {
        let exporter = Exporter::new(self.service);

        match output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create output file: {}", path.display()))?;
                let count = match format {
                    ExportFormat::Csv => exporter.export_entries_csv(self.owner, file).await?,
                    ExportFormat::Json => {
                        exporter.export_owner_json(self.owner, file).await?.entries.len()
                    }
                };
                writeln!(out, "Exported {} entries to {}", count, path.display())?;
            }
            None => match format {
                ExportFormat::Csv => {
                    exporter.export_entries_csv(self.owner, &mut *out).await?;
                }
                ExportFormat::Json => {
                    exporter.export_owner_json(self.owner, &mut *out).await?;
                }
            },
        }

        Ok(())
    }

    fn emit<W, T, F>(&self, out: &mut W, value: &T, text: F) -> Result<()>
    where
        W: Write,
        T: Serialize,
        F: FnOnce(&mut W) -> std::io::Result<()>,
    {
        match self.format {
            OutputFormat::Text => text(out)?,
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, value)?;
                writeln!(out)?;
            }
        }
        Ok(())
    }
}

/// Render an error the way the session reports it.
pub fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<clap::Error>() {
        // clap already prefixes "error:" and appends usage
        Some(clap_err) => clap_err.render().to_string().trim_end().to_string(),
        None => format!("error: {:#}", err),
    }
}
