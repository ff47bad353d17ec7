//! Loading of network snapshots, limit records, refreshed values and config.

use std::collections::BTreeMap;
use std::path::Path;

use oplimits_convert::{ConversionConfig, LimitRecord, Network};

use crate::exit_codes::{EXIT_CONFIG_INVALID, EXIT_INPUT};
use crate::CliError;

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::input(format!("cannot read {}: {e}", path.display())))
}

pub fn load_config(path: Option<&Path>) -> Result<ConversionConfig, CliError> {
    let Some(path) = path else {
        return Ok(ConversionConfig::default());
    };
    let raw = std::fs::read_to_string(path).map_err(|e| CliError {
        code: EXIT_CONFIG_INVALID,
        message: format!("cannot read config {}: {e}", path.display()),
        hint: None,
    })?;
    ConversionConfig::from_toml(&raw).map_err(|e| CliError::from(e).with_hint(format!("in {}", path.display())))
}

pub fn load_network(path: &Path) -> Result<Network, CliError> {
    let raw = read(path)?;
    serde_json::from_str(&raw).map_err(|e| CliError {
        code: EXIT_INPUT,
        message: format!("{}: invalid network snapshot: {e}", path.display()),
        hint: Some("expected a JSON object with voltage_levels, equipment and terminals".into()),
    })
}

/// Parse limit records from CSV text. Columns are matched by header name;
/// empty cells read as absent.
pub fn parse_records(label: &str, data: &str) -> Result<Vec<LimitRecord>, CliError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(data.as_bytes());
    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<LimitRecord>().enumerate() {
        // Header is line 1.
        let record = row.map_err(|e| CliError::input(format!("{label}: line {}: {e}", i + 2)))?;
        records.push(record);
    }
    Ok(records)
}

pub fn load_records(path: &Path) -> Result<Vec<LimitRecord>, CliError> {
    parse_records(&path.display().to_string(), &read(path)?)
}

#[derive(Debug, serde::Deserialize)]
struct RefreshedRow {
    source_id: String,
    value: Option<f64>,
}

/// Parse `source_id,value` rows. Rows with an empty value are left out, so the
/// update pass falls back for them.
pub fn parse_refreshed(label: &str, data: &str) -> Result<BTreeMap<String, f64>, CliError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(data.as_bytes());
    let mut values = BTreeMap::new();
    for (i, row) in reader.deserialize::<RefreshedRow>().enumerate() {
        let row = row.map_err(|e| CliError::input(format!("{label}: line {}: {e}", i + 2)))?;
        if let Some(v) = row.value {
            if values.insert(row.source_id.clone(), v).is_some() {
                return Err(CliError::input(format!("{label}: duplicate source_id '{}'", row.source_id))
                    .with_hint("each source_id must appear at most once"));
            }
        }
    }
    Ok(values)
}

pub fn load_refreshed(path: &Path) -> Result<BTreeMap<String, f64>, CliError> {
    parse_refreshed(&path.display().to_string(), &read(path)?)
}

pub fn write_network(path: &Path, network: &Network) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(network)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
    std::fs::write(path, json).map_err(|e| CliError::input(format!("cannot write {}: {e}", path.display())))
}
