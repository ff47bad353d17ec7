// oplim - operational limit conversion from the command line

mod convert;
mod exit_codes;
mod input;
mod update;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{convert_exit_code, EXIT_ERROR, EXIT_INPUT, EXIT_SUCCESS, EXIT_USAGE};

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  oplimits-convert ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  oplimits-convert ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

#[derive(Parser)]
#[command(name = "oplim")]
#[command(about = "Convert operational limit records onto a network snapshot")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Attach limit records to a network snapshot (exit 5 with --strict = unattached records)
    #[command(after_help = "\
Examples:
  oplim convert network.json limits.csv
  oplim convert network.json limits.csv --output converted.json
  oplim convert network.json limits.csv --config oplim.toml --json
  oplim convert network.json limits.csv --strict")]
    Convert {
        /// Network snapshot (JSON)
        network: PathBuf,

        /// Limit records (CSV with a header row)
        records: PathBuf,

        /// Conversion config (TOML); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the converted network snapshot to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output summary and diagnostics as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Fail (exit 5) when any record could not be attached at all
        #[arg(long)]
        strict: bool,
    },

    /// Re-derive converted limit values from refreshed record values
    #[command(after_help = "\
Refreshed values are read from a CSV with columns source_id,value. Slots whose \
winning record has no refreshed value fall back to the recorded baseline.

Examples:
  oplim update converted.json refreshed.csv --output updated.json
  oplim update converted.json refreshed.csv --json")]
    Update {
        /// Converted network snapshot (JSON)
        network: PathBuf,

        /// Refreshed values (CSV: source_id,value)
        refreshed: PathBuf,

        /// Conversion config (TOML); must use the namespace of the conversion
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the updated network snapshot to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output the update report as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Validate a conversion config without running
    #[command(after_help = "\
Examples:
  oplim validate oplim.toml")]
    Validate {
        /// Path to the config file
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        None => Err(CliError {
            code: EXIT_USAGE,
            message: "no command given".into(),
            hint: Some("oplim --help for more information".into()),
        }),
        Some(Commands::Convert { network, records, config, output, json, strict }) => {
            convert::cmd_convert(network, records, config, output, json, strict)
        }
        Some(Commands::Update { network, refreshed, config, output, json }) => {
            update::cmd_update(network, refreshed, config, output, json)
        }
        Some(Commands::Validate { config }) => convert::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INPUT, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<oplimits_convert::ConvertError> for CliError {
    fn from(err: oplimits_convert::ConvertError) -> Self {
        Self { code: convert_exit_code(&err), message: err.to_string(), hint: None }
    }
}
