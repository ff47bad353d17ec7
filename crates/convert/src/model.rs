use serde::{Deserialize, Serialize};

/// Duration key of a temporary limit declared without an acceptable duration.
pub const UNBOUNDED_DURATION: u32 = i32::MAX as u32;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One raw operational limit as delivered by the grid-model source.
///
/// Type fields are kept as the raw strings the source carries; the
/// classifier decides what they mean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitRecord {
    pub source_id: String,
    /// Limit subclass name, e.g. `CurrentLimit` or `VoltageLimit`.
    pub subclass: String,
    /// Legacy free-text type name (`PATL`, `TATL`, `highVoltage`, ...).
    #[serde(default)]
    pub type_name: Option<String>,
    /// Normalized type code (`LimitTypeKind.patl`, `LimitKind.tatl`, ...).
    #[serde(default)]
    pub limit_type: Option<String>,
    #[serde(default)]
    pub normal_value: Option<f64>,
    #[serde(default)]
    pub value: Option<f64>,
    pub limit_set_id: String,
    #[serde(default)]
    pub limit_set_name: Option<String>,
    #[serde(default)]
    pub acceptable_duration: Option<f64>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub terminal_id: Option<String>,
    #[serde(default)]
    pub equipment_id: Option<String>,
    /// Container of the equipment; used when the equipment itself is unknown.
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
}

impl LimitRecord {
    /// Normal value when present, otherwise value, otherwise NaN.
    pub fn effective_value(&self) -> f64 {
        self.normal_value.or(self.value).unwrap_or(f64::NAN)
    }

    pub fn limit_set_name(&self) -> &str {
        self.limit_set_name.as_deref().unwrap_or(&self.limit_set_id)
    }

    /// Display name for a temporary limit: short name, then name, then source id.
    pub fn display_name(&self) -> &str {
        self.short_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.source_id)
    }

    /// Temporary slot key. Absent duration maps to [`UNBOUNDED_DURATION`];
    /// `None` means the declared duration is negative or not a number.
    ///
    /// Keys are whole seconds: a fractional duration is truncated (59.9 and 59
    /// share a slot), and any duration at or above [`UNBOUNDED_DURATION`]
    /// seconds saturates onto the unbounded slot. Slots therefore group by
    /// this key, not by the raw declared value.
    pub fn duration_key(&self) -> Option<u32> {
        match self.acceptable_duration {
            None => Some(UNBOUNDED_DURATION),
            Some(d) if d.is_finite() && d >= 0.0 => Some(d.min(UNBOUNDED_DURATION as f64) as u32),
            Some(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LimitSubclass {
    #[serde(rename = "CurrentLimit")]
    Current,
    #[serde(rename = "ActivePowerLimit")]
    ActivePower,
    #[serde(rename = "ApparentPowerLimit")]
    ApparentPower,
}

impl LimitSubclass {
    pub const ALL: [LimitSubclass; 3] = [Self::Current, Self::ActivePower, Self::ApparentPower];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "CurrentLimit",
            Self::ActivePower => "ActivePowerLimit",
            Self::ApparentPower => "ApparentPowerLimit",
        }
    }

    pub fn from_key(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl std::fmt::Display for LimitSubclass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoltageBound {
    High,
    Low,
}

impl std::fmt::Display for VoltageBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingTier {
    Permanent,
    Temporary,
}

/// Declared direction of a temporary limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Direction {
    High,
    Low,
    Absolute,
    Unspecified,
    Other(String),
}

impl Direction {
    /// Directions arrive as enumeration IRIs (`...OperationalLimitDirectionKind.high`),
    /// so only the suffix is significant.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            None => Self::Unspecified,
            Some(d) if d.ends_with("high") => Self::High,
            Some(d) if d.ends_with("absoluteValue") => Self::Absolute,
            Some(d) if d.ends_with("low") => Self::Low,
            Some(d) => Self::Other(d.to_string()),
        }
    }

    /// Only high and absolute limits (or limits with no direction, which
    /// default to absolute) can fill a temporary slot.
    pub fn fills_temporary_slot(&self) -> bool {
        matches!(self, Self::High | Self::Absolute | Self::Unspecified)
    }
}

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/// Side of an equipment a limits group hangs off.
///
/// `Whole` is the implicit side of single-sided equipment; for symmetric
/// two-sided equipment it only exists transiently before fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Whole,
    One,
    Two,
    Three,
}

impl Side {
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            _ => None,
        }
    }

    /// Token used in persisted keys: empty for the implicit side.
    pub fn key_token(&self) -> &'static str {
        match self {
            Self::Whole => "",
            Self::One => "1",
            Self::Two => "2",
            Self::Three => "3",
        }
    }

    pub fn from_key_token(s: &str) -> Option<Self> {
        match s {
            "" => Some(Self::Whole),
            "1" => Some(Self::One),
            "2" => Some(Self::Two),
            "3" => Some(Self::Three),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Whole => write!(f, "whole"),
            Self::One => write!(f, "side1"),
            Self::Two => write!(f, "side2"),
            Self::Three => write!(f, "side3"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentKind {
    Line,
    TwoWindingTransformer,
    ThreeWindingTransformer,
    DanglingLine,
    Switch,
    Injection,
}

impl EquipmentKind {
    /// Name used in diagnostics.
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Line => "Line",
            Self::TwoWindingTransformer => "TwoWindingsTransformer",
            Self::ThreeWindingTransformer => "ThreeWindingsTransformer",
            Self::DanglingLine => "DanglingLine",
            Self::Switch => "Switch",
            Self::Injection => "Injection",
        }
    }
}

impl std::fmt::Display for EquipmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.class_name())
    }
}

/// Resolved destination of a loading limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentTarget {
    pub equipment_id: String,
    pub kind: EquipmentKind,
    pub side: Side,
}

/// What a record was attached through; names the scope in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Terminal(String),
    Equipment(String),
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Terminal(id) => write!(f, "Terminal {id}"),
            Self::Equipment(id) => write!(f, "Equipment {id}"),
        }
    }
}
