//! `oplim update`.

use std::path::PathBuf;

use crate::input::{load_config, load_network, load_refreshed, write_network};
use crate::CliError;

pub fn cmd_update(
    network_path: PathBuf,
    refreshed_path: PathBuf,
    config_path: Option<PathBuf>,
    output_file: Option<PathBuf>,
    json_output: bool,
) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;
    let mut network = load_network(&network_path)?;
    let refreshed = load_refreshed(&refreshed_path)?;

    let report = oplimits_convert::reconcile_network(&config, &mut network, &refreshed)?;

    if let Some(ref path) = output_file {
        write_network(path, &network)?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    eprintln!(
        "{} slots: {} refreshed, {} from baseline, {} from current ({} fallback)",
        report.slots, report.refreshed, report.from_baseline, report.from_current, config.update.fallback,
    );
    Ok(())
}
