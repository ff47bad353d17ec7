//! Network-side collaborators: the id directory the resolver queries and the
//! in-memory limit storage the engine writes into.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::model::{EquipmentKind, LimitSubclass, Side};

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalRef {
    pub equipment_id: String,
    /// Terminal sequence number on its equipment (1-based).
    pub number: u8,
    /// `None` when the terminal names a voltage level the network doesn't have.
    pub voltage_level_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipmentRef {
    pub id: String,
    pub kind: EquipmentKind,
}

impl EquipmentRef {
    /// (class name, id) pair for diagnostics.
    pub fn element(&self) -> (&'static str, &str) {
        (self.kind.class_name(), &self.id)
    }
}

/// Id lookups against the network model. Every method returns `None` on a miss,
/// and a voltage level id is only handed out if the level itself exists.
pub trait NetworkDirectory {
    fn resolve_terminal(&self, terminal_id: &str) -> Option<TerminalRef>;
    fn resolve_equipment(&self, equipment_id: &str) -> Option<EquipmentRef>;
    /// Voltage level of the equipment's sole connection point.
    fn voltage_level_of(&self, equipment: &EquipmentRef) -> Option<String>;
    /// Voltage level by its own id or by the id of a container mapped onto it.
    fn resolve_voltage_level(&self, container_id: &str) -> Option<String>;
}

// ---------------------------------------------------------------------------
// Limit storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporaryLimit {
    pub name: String,
    pub value: f64,
}

/// Permanent limit plus temporary limits keyed by acceptable duration (seconds).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadingLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub temporary_limits: BTreeMap<u32, TemporaryLimit>,
}

impl LoadingLimits {
    pub fn temporary_value(&self, duration: u32) -> Option<f64> {
        self.temporary_limits.get(&duration).map(|t| t.value)
    }

    /// Insert or replace the temporary limit for `duration`. The name is made
    /// unique among the other durations by suffixing `#2`, `#3`, ...
    pub fn set_temporary(&mut self, duration: u32, name: &str, value: f64) {
        let taken = |candidate: &str| {
            self.temporary_limits
                .iter()
                .any(|(d, t)| *d != duration && t.name == candidate)
        };
        let mut unique = name.to_string();
        let mut n = 2;
        while taken(&unique) {
            unique = format!("{name}#{n}");
            n += 1;
        }
        self.temporary_limits.insert(duration, TemporaryLimit { name: unique, value });
    }

    /// Overwrite the value of an existing temporary limit; keeps its name.
    pub fn set_temporary_value(&mut self, duration: u32, value: f64) {
        if let Some(t) = self.temporary_limits.get_mut(&duration) {
            t.value = value;
        }
    }
}

/// Named container of loading limits attached to one (equipment, side).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalLimitsGroup {
    pub id: String,
    pub side: Side,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_limits: Option<LoadingLimits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_power_limits: Option<LoadingLimits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apparent_power_limits: Option<LoadingLimits>,
}

impl OperationalLimitsGroup {
    pub fn new(id: impl Into<String>, side: Side) -> Self {
        Self {
            id: id.into(),
            side,
            current_limits: None,
            active_power_limits: None,
            apparent_power_limits: None,
        }
    }

    pub fn limits(&self, subclass: LimitSubclass) -> Option<&LoadingLimits> {
        match subclass {
            LimitSubclass::Current => self.current_limits.as_ref(),
            LimitSubclass::ActivePower => self.active_power_limits.as_ref(),
            LimitSubclass::ApparentPower => self.apparent_power_limits.as_ref(),
        }
    }

    fn slot_mut(&mut self, subclass: LimitSubclass) -> &mut Option<LoadingLimits> {
        match subclass {
            LimitSubclass::Current => &mut self.current_limits,
            LimitSubclass::ActivePower => &mut self.active_power_limits,
            LimitSubclass::ApparentPower => &mut self.apparent_power_limits,
        }
    }

    pub fn limits_mut(&mut self, subclass: LimitSubclass) -> Option<&mut LoadingLimits> {
        self.slot_mut(subclass).as_mut()
    }

    pub fn limits_or_default(&mut self, subclass: LimitSubclass) -> &mut LoadingLimits {
        self.slot_mut(subclass).get_or_insert_with(LoadingLimits::default)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub kind: EquipmentKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limits_groups: Vec<OperationalLimitsGroup>,
    /// Flat string properties; provenance facts land here.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Equipment {
    pub fn new(kind: EquipmentKind) -> Self {
        Self {
            kind,
            limits_groups: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn limits_group(&self, side: Side, id: &str) -> Option<&OperationalLimitsGroup> {
        self.limits_groups.iter().find(|g| g.side == side && g.id == id)
    }

    pub fn limits_group_mut(&mut self, side: Side, id: &str) -> Option<&mut OperationalLimitsGroup> {
        self.limits_groups.iter_mut().find(|g| g.side == side && g.id == id)
    }

    /// Create the group for (side, id) unless it exists. Returns true if created.
    pub fn ensure_limits_group(&mut self, side: Side, id: &str) -> bool {
        if self.limits_group(side, id).is_some() {
            return false;
        }
        self.limits_groups.push(OperationalLimitsGroup::new(id, side));
        true
    }

    /// Merge `id -> name` into the JSON object stored under `property`.
    pub fn record_limit_set(&mut self, property: &str, id: &str, name: &str) -> Result<(), ConvertError> {
        let mut sets: serde_json::Map<String, serde_json::Value> = match self.properties.get(property) {
            Some(raw) => serde_json::from_str(raw)?,
            None => serde_json::Map::new(),
        };
        sets.insert(id.to_string(), serde_json::Value::String(name.to_string()));
        self.properties
            .insert(property.to_string(), serde_json::to_string(&sets)?);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoltageLevel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_voltage_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_voltage_limit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terminal {
    pub equipment_id: String,
    pub number: u8,
    pub voltage_level_id: String,
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Network snapshot: the element ids the directory answers for and the limit
/// storage the engine writes into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    #[serde(default)]
    pub voltage_levels: BTreeMap<String, VoltageLevel>,
    #[serde(default)]
    pub equipment: BTreeMap<String, Equipment>,
    #[serde(default)]
    pub terminals: BTreeMap<String, Terminal>,
    /// Bus-bar-like containers that carry no equipment of their own, mapped to
    /// the voltage level they belong to.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub containers: BTreeMap<String, String>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_voltage_level(&mut self, id: &str) -> &mut Self {
        self.voltage_levels.insert(id.to_string(), VoltageLevel::default());
        self
    }

    pub fn add_equipment(&mut self, id: &str, kind: EquipmentKind) -> &mut Self {
        self.equipment.insert(id.to_string(), Equipment::new(kind));
        self
    }

    pub fn add_terminal(&mut self, id: &str, equipment_id: &str, number: u8, voltage_level_id: &str) -> &mut Self {
        self.terminals.insert(
            id.to_string(),
            Terminal {
                equipment_id: equipment_id.to_string(),
                number,
                voltage_level_id: voltage_level_id.to_string(),
            },
        );
        self
    }

    pub fn add_container(&mut self, id: &str, voltage_level_id: &str) -> &mut Self {
        self.containers.insert(id.to_string(), voltage_level_id.to_string());
        self
    }

    pub fn equipment_mut(&mut self, id: &str) -> Result<&mut Equipment, ConvertError> {
        self.equipment.get_mut(id).ok_or_else(|| ConvertError::UnknownElement {
            kind: "equipment",
            id: id.to_string(),
        })
    }

    pub fn voltage_level_mut(&mut self, id: &str) -> Result<&mut VoltageLevel, ConvertError> {
        self.voltage_levels.get_mut(id).ok_or_else(|| ConvertError::UnknownElement {
            kind: "voltage level",
            id: id.to_string(),
        })
    }
}

impl NetworkDirectory for Network {
    fn resolve_terminal(&self, terminal_id: &str) -> Option<TerminalRef> {
        self.terminals.get(terminal_id).map(|t| TerminalRef {
            equipment_id: t.equipment_id.clone(),
            number: t.number,
            voltage_level_id: self.known_voltage_level(&t.voltage_level_id),
        })
    }

    fn resolve_equipment(&self, equipment_id: &str) -> Option<EquipmentRef> {
        self.equipment.get(equipment_id).map(|e| EquipmentRef {
            id: equipment_id.to_string(),
            kind: e.kind,
        })
    }

    fn voltage_level_of(&self, equipment: &EquipmentRef) -> Option<String> {
        let mut connections = self
            .terminals
            .values()
            .filter(|t| t.equipment_id == equipment.id);
        match (connections.next(), connections.next()) {
            (Some(only), None) => self.known_voltage_level(&only.voltage_level_id),
            _ => None,
        }
    }

    fn resolve_voltage_level(&self, container_id: &str) -> Option<String> {
        self.known_voltage_level(container_id)
            .or_else(|| self.containers.get(container_id).and_then(|vl| self.known_voltage_level(vl)))
    }
}

impl Network {
    fn known_voltage_level(&self, id: &str) -> Option<String> {
        self.voltage_levels.contains_key(id).then(|| id.to_string())
    }
}
