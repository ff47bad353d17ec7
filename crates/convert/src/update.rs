//! Update pass: re-derive slot values from a refreshed data source using the
//! provenance recorded at conversion time.
//!
//! Nothing is re-classified or re-resolved. Provenance is read back from the
//! equipment properties into a [`ProvenanceStore`]; each slot already present
//! on an equipment looks up its entry there, asks the refreshed source for the
//! winning record's id and substitutes the value. Per equipment, every new
//! value is planned against an unchanged view and then applied in one step.

use std::collections::{BTreeMap, HashMap};
use std::ops::AddAssign;

use serde::Serialize;

use crate::config::{ConversionConfig, UpdateFallback};
use crate::error::ConvertError;
use crate::model::LimitSubclass;
use crate::network::{Equipment, Network};
use crate::provenance::{ProvenanceCodec, ProvenanceStore, SlotIdentity, Tier};

/// Refreshed values by source record id.
pub trait RefreshedSource {
    fn refreshed_value(&self, source_id: &str) -> Option<f64>;
}

impl RefreshedSource for HashMap<String, f64> {
    fn refreshed_value(&self, source_id: &str) -> Option<f64> {
        self.get(source_id).copied()
    }
}

impl RefreshedSource for BTreeMap<String, f64> {
    fn refreshed_value(&self, source_id: &str) -> Option<f64> {
        self.get(source_id).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOrigin {
    Refreshed,
    Baseline,
    Current,
}

/// New value planned for one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotUpdate {
    pub slot: SlotIdentity,
    pub value: f64,
    pub origin: ValueOrigin,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub slots: usize,
    pub refreshed: usize,
    pub from_baseline: usize,
    pub from_current: usize,
}

impl UpdateReport {
    fn from_plan(plan: &[SlotUpdate]) -> Self {
        let mut report = Self {
            slots: plan.len(),
            ..Self::default()
        };
        for update in plan {
            match update.origin {
                ValueOrigin::Refreshed => report.refreshed += 1,
                ValueOrigin::Baseline => report.from_baseline += 1,
                ValueOrigin::Current => report.from_current += 1,
            }
        }
        report
    }
}

impl AddAssign for UpdateReport {
    fn add_assign(&mut self, other: Self) {
        self.slots += other.slots;
        self.refreshed += other.refreshed;
        self.from_baseline += other.from_baseline;
        self.from_current += other.from_current;
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Every slot currently holding a value on `equipment`, with that value.
fn current_slots(equipment: &Equipment) -> Vec<(SlotIdentity, f64)> {
    let mut slots = Vec::new();
    for group in &equipment.limits_groups {
        for subclass in LimitSubclass::ALL {
            let Some(limits) = group.limits(subclass) else {
                continue;
            };
            if let Some(v) = limits.permanent_limit {
                slots.push((SlotIdentity::permanent(&group.id, subclass, group.side), v));
            }
            for (&duration, t) in &limits.temporary_limits {
                slots.push((SlotIdentity::temporary(&group.id, subclass, group.side, duration), t.value));
            }
        }
    }
    slots
}

/// Plan new values for every slot of `equipment` without touching it. A slot
/// with no entry in `provenance` keeps its current value.
pub fn plan_equipment(
    equipment_id: &str,
    equipment: &Equipment,
    provenance: &ProvenanceStore,
    fallback: UpdateFallback,
    source: &dyn RefreshedSource,
) -> Vec<SlotUpdate> {
    current_slots(equipment)
        .into_iter()
        .map(|(slot, current)| {
            let entry = provenance.get(equipment_id, &slot);
            let refreshed = entry
                .and_then(|e| source.refreshed_value(&e.source_id))
                .filter(|v| !v.is_nan());
            let baseline = entry.map(|e| e.baseline_value);
            let (value, origin) = match (refreshed, fallback, baseline) {
                (Some(v), _, _) => (v, ValueOrigin::Refreshed),
                (None, UpdateFallback::Baseline, Some(b)) => (b, ValueOrigin::Baseline),
                _ => (current, ValueOrigin::Current),
            };
            SlotUpdate { slot, value, origin }
        })
        .collect()
}

fn apply(equipment: &mut Equipment, plan: &[SlotUpdate]) {
    for update in plan {
        let slot = &update.slot;
        let Some(limits) = equipment
            .limits_group_mut(slot.side, &slot.limit_set_id)
            .and_then(|g| g.limits_mut(slot.subclass))
        else {
            continue;
        };
        match slot.tier {
            Tier::Permanent => limits.permanent_limit = Some(update.value),
            Tier::Temporary(d) => limits.set_temporary_value(d, update.value),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

fn reconcile_with(
    network: &mut Network,
    equipment_id: &str,
    provenance: &ProvenanceStore,
    fallback: UpdateFallback,
    source: &dyn RefreshedSource,
) -> Result<UpdateReport, ConvertError> {
    let equipment = network.equipment_mut(equipment_id)?;
    let plan = plan_equipment(equipment_id, equipment, provenance, fallback, source);
    for u in plan.iter().filter(|u| u.origin == ValueOrigin::Refreshed) {
        log::debug!("{equipment_id} {:?} {:?} -> {}", u.slot.subclass, u.slot.tier, u.value);
    }
    apply(equipment, &plan);
    Ok(UpdateReport::from_plan(&plan))
}

/// Run the update pass over one equipment.
pub fn reconcile_equipment(
    config: &ConversionConfig,
    network: &mut Network,
    equipment_id: &str,
    source: &dyn RefreshedSource,
) -> Result<UpdateReport, ConvertError> {
    let codec = ProvenanceCodec::new(config.namespace.as_str());
    let mut provenance = ProvenanceStore::new();
    provenance.read_equipment(equipment_id, network.equipment_mut(equipment_id)?, &codec);
    reconcile_with(network, equipment_id, &provenance, config.update.fallback, source)
}

/// Run the update pass over every equipment of the network.
pub fn reconcile_network(
    config: &ConversionConfig,
    network: &mut Network,
    source: &dyn RefreshedSource,
) -> Result<UpdateReport, ConvertError> {
    let codec = ProvenanceCodec::new(config.namespace.as_str());
    let provenance = ProvenanceStore::read_from(network, &codec);
    let ids: Vec<String> = network.equipment.keys().cloned().collect();
    let mut report = UpdateReport::default();
    for id in ids {
        report += reconcile_with(network, &id, &provenance, config.update.fallback, source)?;
    }
    log::debug!(
        "update: {} slots, {} refreshed, {} from baseline, {} from current",
        report.slots,
        report.refreshed,
        report.from_baseline,
        report.from_current
    );
    Ok(report)
}
