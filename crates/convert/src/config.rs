use serde::Deserialize;

use crate::error::ConvertError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ConversionConfig {
    /// Prefix of every persisted provenance key.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Store the limit-set id/name pairs on the owning equipment.
    #[serde(default = "default_true")]
    pub record_limit_set_identifiers: bool,
    #[serde(default)]
    pub update: UpdateConfig,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            record_limit_set_identifiers: true,
            update: UpdateConfig::default(),
        }
    }
}

fn default_namespace() -> String {
    "CGMES".into()
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateConfig {
    #[serde(default)]
    pub fallback: UpdateFallback,
}

/// Value used by the update pass when the refreshed source has nothing for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateFallback {
    /// Baseline recorded at conversion time, then the current in-network value.
    #[default]
    Baseline,
    /// Always the current in-network value.
    Current,
}

impl std::fmt::Display for UpdateFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Baseline => write!(f, "baseline"),
            Self::Current => write!(f, "current"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ConversionConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConvertError> {
        let config: ConversionConfig =
            toml::from_str(input).map_err(|e| ConvertError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.namespace.is_empty() {
            return Err(ConvertError::ConfigValidation("namespace must not be empty".into()));
        }
        if self.namespace.chars().any(char::is_whitespace) {
            return Err(ConvertError::ConfigValidation(format!(
                "namespace must not contain whitespace, got '{}'",
                self.namespace
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ConversionConfig::from_toml("").unwrap();
        assert_eq!(config.namespace, "CGMES");
        assert!(config.record_limit_set_identifiers);
        assert_eq!(config.update.fallback, UpdateFallback::Baseline);
    }

    #[test]
    fn full_document() {
        let config = ConversionConfig::from_toml(
            r#"
namespace = "ENTSOE"
record_limit_set_identifiers = false

[update]
fallback = "current"
"#,
        )
        .unwrap();
        assert_eq!(config.namespace, "ENTSOE");
        assert!(!config.record_limit_set_identifiers);
        assert_eq!(config.update.fallback, UpdateFallback::Current);
    }

    #[test]
    fn rejects_empty_namespace() {
        let err = ConversionConfig::from_toml("namespace = \"\"").unwrap_err();
        assert!(matches!(err, ConvertError::ConfigValidation(_)));
    }

    #[test]
    fn rejects_whitespace_namespace() {
        let err = ConversionConfig::from_toml("namespace = \"CG MES\"").unwrap_err();
        assert!(err.to_string().contains("whitespace"));
    }

    #[test]
    fn rejects_unknown_fallback() {
        let err = ConversionConfig::from_toml("[update]\nfallback = \"zero\"").unwrap_err();
        assert!(matches!(err, ConvertError::ConfigParse(_)));
    }

    #[test]
    fn default_is_valid() {
        ConversionConfig::default().validate().unwrap();
    }
}
