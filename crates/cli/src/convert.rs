//! `oplim convert` and `oplim validate`.

use std::path::PathBuf;

use serde::Serialize;

use oplimits_convert::{ConversionSummary, DiagnosticLog, LogReporter};

use crate::exit_codes::EXIT_INVALID_UNITS;
use crate::input::{load_config, load_network, load_records, write_network};
use crate::CliError;

#[derive(Serialize)]
struct ConvertOutput<'a> {
    summary: &'a ConversionSummary,
    diagnostic_counts: std::collections::BTreeMap<String, usize>,
    diagnostics: &'a DiagnosticLog,
}

pub fn cmd_convert(
    network_path: PathBuf,
    records_path: PathBuf,
    config_path: Option<PathBuf>,
    output_file: Option<PathBuf>,
    json_output: bool,
    strict: bool,
) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;
    let mut network = load_network(&network_path)?;
    let records = load_records(&records_path)?;

    // Also mirrored to the `log` facade, which stays silent unless a logger is installed.
    let mut log = DiagnosticLog::new();
    let summary = oplimits_convert::run(&config, &mut network, &records, &mut (&mut log, LogReporter))?;

    if let Some(ref path) = output_file {
        write_network(path, &network)?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        let out = ConvertOutput {
            summary: &summary,
            diagnostic_counts: log.counts(),
            diagnostics: &log,
        };
        let json_str = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        for d in log.entries() {
            println!("{d}");
        }
    }

    eprintln!(
        "{} records: {} converted, {} skipped, {} invalid units, {} slots written",
        summary.records, summary.converted, summary.skipped, summary.invalid_units, summary.slots_written,
    );

    if strict && summary.invalid_units > 0 {
        return Err(CliError {
            code: EXIT_INVALID_UNITS,
            message: format!("{} record(s) could not be attached", summary.invalid_units),
            hint: Some("see the [missing] diagnostics for the terminal and equipment ids".into()),
        });
    }
    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&config_path))?;
    eprintln!(
        "config valid: namespace {}, limit set identifiers {}, update fallback {}",
        config.namespace,
        if config.record_limit_set_identifiers { "recorded" } else { "not recorded" },
        config.update.fallback,
    );
    Ok(())
}
