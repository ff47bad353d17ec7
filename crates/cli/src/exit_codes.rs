//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `oplim` exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Description                                                   |
//! |------|---------------------------------------------------------------|
//! | 0    | Success                                                       |
//! | 1    | General error (unspecified)                                   |
//! | 2    | CLI usage error (bad args)                                    |
//! | 3    | Configuration invalid (parse or validation)                   |
//! | 4    | Input unreadable or malformed (network snapshot, CSV)         |
//! | 5    | Conversion produced invalid units (only with `--strict`)      |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use oplimits_convert::ConvertError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config file failed to parse or validate.
pub const EXIT_CONFIG_INVALID: u8 = 3;

/// Network snapshot, record CSV or refreshed CSV could not be read or parsed,
/// or an output file could not be written.
pub const EXIT_INPUT: u8 = 4;

/// At least one record could not be attached to anything (`--strict`).
pub const EXIT_INVALID_UNITS: u8 = 5;

/// Map an engine error to its exit code.
pub fn convert_exit_code(err: &ConvertError) -> u8 {
    match err {
        ConvertError::ConfigParse(_) | ConvertError::ConfigValidation(_) => EXIT_CONFIG_INVALID,
        ConvertError::Unattached { .. } => EXIT_INVALID_UNITS,
        // The snapshot references an element it does not define.
        ConvertError::UnknownElement { .. } | ConvertError::Serialization(_) => EXIT_INPUT,
    }
}
