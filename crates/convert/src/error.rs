use std::fmt;

#[derive(Debug)]
pub enum ConvertError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty namespace, etc.).
    ConfigValidation(String),
    /// Neither the terminal nor the equipment of a record resolved to anything
    /// the limit could be attached to. Fatal to that record's conversion unit only.
    Unattached {
        record_id: String,
        terminal_id: Option<String>,
        equipment_id: Option<String>,
    },
    /// The directory handed out an id the limit storage does not know.
    UnknownElement { kind: &'static str, id: String },
    /// Limit-set identifier property could not be read or written.
    Serialization(String),
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Unattached { record_id, terminal_id, equipment_id } => write!(
                f,
                "limit '{record_id}': no attachment for terminal {} or equipment {}",
                terminal_id.as_deref().unwrap_or("-"),
                equipment_id.as_deref().unwrap_or("-"),
            ),
            Self::UnknownElement { kind, id } => write!(f, "unknown {kind}: {id}"),
            Self::Serialization(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for ConvertError {}

impl From<serde_json::Error> for ConvertError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
