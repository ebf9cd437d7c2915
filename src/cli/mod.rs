use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use crate::application::LedgerService;
use crate::domain::OwnerId;
use crate::telemetry::{self, LogFormat};

mod render;
mod session;

pub use session::{ExportFormat, LoopControl, RunMode, Session, SessionCommand, describe_error};

/// Saldo - income and expense ledger
#[derive(Parser, Debug)]
#[command(name = "saldo")]
#[command(about = "Track income and expenses per user, refusing expenses the balance cannot cover")]
#[command(version)]
pub struct Cli {
    /// Owner the session starts acting as
    #[arg(long, env = "SALDO_OWNER", default_value = "1", global = true)]
    pub owner: OwnerId,

    /// Output format for command results
    #[arg(long, value_enum, env = "SALDO_FORMAT", default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Log format (logs are written to stderr)
    #[arg(long, value_enum, env = "SALDO_LOG_FORMAT", default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// CSV file of entries to import for the starting owner before running
    #[arg(long, global = true)]
    pub seed: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive session reading commands from stdin
    Shell,

    /// Execute a file of session commands, one per line
    Run {
        /// Script path
        script: PathBuf,

        /// Report failing lines and continue instead of stopping
        #[arg(long)]
        keep_going: bool,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tables and sentences
    #[default]
    Text,
    /// Pretty-printed JSON documents
    Json,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        telemetry::init(self.log_format, self.verbose);

        let service = LedgerService::in_memory();
        let mut session = Session::new(&service, self.owner, self.format);
        let stdout = io::stdout();
        let mut out = stdout.lock();

        if let Some(seed) = &self.seed {
            session.import_file(seed, false, &mut out).await?;
        }

        match self.command {
            Commands::Shell => {
                let stdin = io::stdin();
                session.run(stdin.lock(), &mut out, RunMode::Interactive).await
            }

            Commands::Run { script, keep_going } => {
                let file = File::open(&script)
                    .with_context(|| format!("Failed to open script: {}", script.display()))?;
                let mode = if keep_going {
                    RunMode::KeepGoing
                } else {
                    RunMode::Strict
                };
                session.run(BufReader::new(file), &mut out, mode).await
            }
        }
    }
}
