//! Provenance of resolved slots: which source record won a slot and the
//! baseline value it wrote.
//!
//! Inside a run, provenance lives in a typed [`ProvenanceStore`]. Only at the
//! boundary is it flattened into string properties on the owning equipment,
//! two facts per slot:
//!
//! ```text
//! <namespace>_sourceId_<limitSetId>_<side>_<subclass>_patl
//! <namespace>_baselineValue_<limitSetId>_<side>_<subclass>_tatl_<duration>
//! ```
//!
//! Keys are parsed right to left. Every segment after the limit-set id comes
//! from a closed vocabulary, so an id containing `_` still maps back to
//! exactly one slot.

use std::collections::BTreeMap;

use crate::error::ConvertError;
use crate::model::{LimitSubclass, Side};
use crate::network::{Equipment, Network};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    Permanent,
    /// Acceptable duration in seconds.
    Temporary(u32),
}

/// Identity of one slot within an equipment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIdentity {
    pub limit_set_id: String,
    pub subclass: LimitSubclass,
    pub side: Side,
    pub tier: Tier,
}

impl SlotIdentity {
    pub fn permanent(limit_set_id: &str, subclass: LimitSubclass, side: Side) -> Self {
        Self {
            limit_set_id: limit_set_id.to_string(),
            subclass,
            side,
            tier: Tier::Permanent,
        }
    }

    pub fn temporary(limit_set_id: &str, subclass: LimitSubclass, side: Side, duration: u32) -> Self {
        Self {
            limit_set_id: limit_set_id.to_string(),
            subclass,
            side,
            tier: Tier::Temporary(duration),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProvenanceEntry {
    pub source_id: String,
    pub baseline_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactKind {
    SourceId,
    BaselineValue,
}

impl FactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceId => "sourceId",
            Self::BaselineValue => "baselineValue",
        }
    }
}

/// Whatever facts were found for a slot; either may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
struct ProvenanceFacts {
    pub source_id: Option<String>,
    pub baseline_value: Option<f64>,
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProvenanceCodec {
    namespace: String,
}

impl ProvenanceCodec {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self { namespace: namespace.into() }
    }

    pub fn key(&self, fact: FactKind, slot: &SlotIdentity) -> String {
        let mut key = format!(
            "{}_{}_{}_{}_{}",
            self.namespace,
            fact.as_str(),
            slot.limit_set_id,
            slot.side.key_token(),
            slot.subclass.as_str(),
        );
        match slot.tier {
            Tier::Permanent => key.push_str("_patl"),
            Tier::Temporary(d) => {
                key.push_str("_tatl_");
                key.push_str(&d.to_string());
            }
        }
        key
    }

    /// Property holding the limit-set id -> name map of an equipment.
    pub fn limit_set_identifiers_key(&self) -> String {
        format!("{}_limitSetIdentifiers", self.namespace)
    }

    pub fn encode(&self, slot: &SlotIdentity, entry: &ProvenanceEntry) -> [(String, String); 2] {
        [
            (self.key(FactKind::SourceId, slot), entry.source_id.clone()),
            (self.key(FactKind::BaselineValue, slot), entry.baseline_value.to_string()),
        ]
    }

    fn facts(&self, properties: &BTreeMap<String, String>, slot: &SlotIdentity) -> ProvenanceFacts {
        let source_id = properties.get(&self.key(FactKind::SourceId, slot)).cloned();
        let baseline_value = properties
            .get(&self.key(FactKind::BaselineValue, slot))
            .and_then(|raw| match raw.parse::<f64>() {
                Ok(v) if !v.is_nan() => Some(v),
                _ => {
                    log::debug!("unreadable baseline '{raw}' for {slot:?}, ignoring");
                    None
                }
            });
        ProvenanceFacts { source_id, baseline_value }
    }

    /// Both facts, or nothing.
    pub fn decode(&self, properties: &BTreeMap<String, String>, slot: &SlotIdentity) -> Option<ProvenanceEntry> {
        let facts = self.facts(properties, slot);
        Some(ProvenanceEntry {
            source_id: facts.source_id?,
            baseline_value: facts.baseline_value?,
        })
    }

    /// Inverse of [`key`](Self::key). `None` for anything that is not a
    /// provenance key of this namespace.
    pub fn parse_key(&self, key: &str) -> Option<(FactKind, SlotIdentity)> {
        let rest = key.strip_prefix(self.namespace.as_str())?.strip_prefix('_')?;
        let (fact, rest) = if let Some(r) = rest.strip_prefix("sourceId_") {
            (FactKind::SourceId, r)
        } else {
            (FactKind::BaselineValue, rest.strip_prefix("baselineValue_")?)
        };

        let (rest, tier) = match rest.strip_suffix("_patl") {
            Some(r) => (r, Tier::Permanent),
            None => {
                let (r, d) = rest.rsplit_once('_')?;
                if d.is_empty() || !d.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let duration: u32 = d.parse().ok()?;
                if duration.to_string() != d {
                    return None;
                }
                (r.strip_suffix("_tatl")?, Tier::Temporary(duration))
            }
        };

        let (rest, subclass) = rest.rsplit_once('_')?;
        let subclass = LimitSubclass::from_key(subclass)?;
        let (limit_set_id, side) = rest.rsplit_once('_')?;
        let side = Side::from_key_token(side)?;
        if limit_set_id.is_empty() {
            return None;
        }

        Some((
            fact,
            SlotIdentity {
                limit_set_id: limit_set_id.to_string(),
                subclass,
                side,
                tier,
            },
        ))
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Slot provenance for one run, per equipment.
#[derive(Debug, Clone, Default)]
pub struct ProvenanceStore {
    entries: BTreeMap<String, BTreeMap<SlotIdentity, ProvenanceEntry>>,
}

impl ProvenanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the winner of a slot, superseding any earlier winner.
    pub fn record(&mut self, equipment_id: &str, slot: SlotIdentity, entry: ProvenanceEntry) {
        self.entries
            .entry(equipment_id.to_string())
            .or_default()
            .insert(slot, entry);
    }

    pub fn get(&self, equipment_id: &str, slot: &SlotIdentity) -> Option<&ProvenanceEntry> {
        self.entries.get(equipment_id)?.get(slot)
    }

    pub fn for_equipment(&self, equipment_id: &str) -> impl Iterator<Item = (&SlotIdentity, &ProvenanceEntry)> {
        self.entries.get(equipment_id).into_iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten every entry into properties of its equipment.
    pub fn write_to(&self, network: &mut Network, codec: &ProvenanceCodec) -> Result<(), ConvertError> {
        for (equipment_id, slots) in &self.entries {
            let equipment = network.equipment_mut(equipment_id)?;
            for (slot, entry) in slots {
                for (key, value) in codec.encode(slot, entry) {
                    equipment.properties.insert(key, value);
                }
            }
        }
        Ok(())
    }

    /// Rebuild a store from the properties of every equipment. Keys that do not
    /// parse and slots missing one of their two facts are skipped.
    pub fn read_from(network: &Network, codec: &ProvenanceCodec) -> Self {
        let mut store = Self::new();
        for (equipment_id, equipment) in &network.equipment {
            store.read_equipment(equipment_id, equipment, codec);
        }
        store
    }

    /// Add the provenance found in one equipment's properties.
    pub fn read_equipment(&mut self, equipment_id: &str, equipment: &Equipment, codec: &ProvenanceCodec) {
        for key in equipment.properties.keys() {
            let Some((FactKind::SourceId, slot)) = codec.parse_key(key) else {
                continue;
            };
            if let Some(entry) = codec.decode(&equipment.properties, &slot) {
                self.record(equipment_id, slot, entry);
            }
        }
    }
}
