//! Folding competing loading-limit records into permanent and temporary slots.
//!
//! A slot keeps the lowest value it has been offered. Strictly lower replaces;
//! equal or higher is rejected and leaves the earlier winner's provenance and
//! name in place.

use std::collections::{BTreeSet, HashMap};

use ordered_float::OrderedFloat;

use crate::config::ConversionConfig;
use crate::diagnostics::Reporter;
use crate::error::ConvertError;
use crate::model::{AttachmentTarget, LimitRecord, LimitSubclass, Scope};
use crate::network::{Equipment, Network};
use crate::provenance::{ProvenanceCodec, ProvenanceEntry, ProvenanceStore, SlotIdentity};

const PERMANENT_LIMIT: &str = "Permanent Limit";
const TEMPORARY_LIMIT: &str = "Temporary Limit";

/// Outcome of offering a candidate to a slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub value: f64,
    pub replaced: bool,
}

/// Conservative-merge rule: an empty slot takes the candidate, an occupied
/// slot only takes a strictly lower one.
pub fn merge_candidate(current: Option<f64>, candidate: f64) -> Merge {
    match current {
        Some(v) if candidate >= v => Merge { value: v, replaced: false },
        _ => Merge { value: candidate, replaced: true },
    }
}

/// One record's contribution to the slots of a single target.
#[derive(Debug, Clone, Copy)]
pub struct Contribution<'a> {
    pub record: &'a LimitRecord,
    pub subclass: LimitSubclass,
    pub value: f64,
    pub scope: &'a Scope,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SlotKey {
    equipment_id: String,
    slot: SlotIdentity,
}

/// Run-scoped merge bookkeeping. Slot values themselves live in the network's
/// limit groups; this only remembers which conflicts were already reported so
/// that re-offering the same value does not report again.
#[derive(Debug, Default)]
pub struct SlotAggregator {
    reported: HashMap<SlotKey, BTreeSet<OrderedFloat<f64>>>,
}

impl SlotAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a permanent-limit contribution. Returns true if it won the slot.
    pub fn merge_permanent(
        &mut self,
        network: &mut Network,
        target: &AttachmentTarget,
        c: &Contribution<'_>,
        config: &ConversionConfig,
        provenance: &mut ProvenanceStore,
        reporter: &mut dyn Reporter,
    ) -> Result<bool, ConvertError> {
        let slot = SlotIdentity::permanent(&c.record.limit_set_id, c.subclass, target.side);
        let equipment = network.equipment_mut(&target.equipment_id)?;
        prepare_group(equipment, target, c.record, config)?;

        let limits = equipment
            .limits_group_mut(target.side, &c.record.limit_set_id)
            .map(|g| g.limits_or_default(c.subclass))
            .ok_or_else(|| ConvertError::UnknownElement {
                kind: "limits group",
                id: c.record.limit_set_id.clone(),
            })?;

        let current = limits.permanent_limit;
        let merge = merge_candidate(current, c.value);
        if merge.replaced {
            limits.permanent_limit = Some(merge.value);
        }

        if current.is_some() && self.first_report(target, &slot, c.value) {
            reporter.fixed(
                PERMANENT_LIMIT,
                format!("Several permanent limits defined for {}. Only the lowest is kept.", c.scope),
            );
        }

        if merge.replaced {
            log::trace!("{} {} {:?} <- {} ({})", target.equipment_id, target.side, slot.tier, c.value, c.record.source_id);
            provenance.record(&target.equipment_id, slot, entry(c));
        }
        Ok(merge.replaced)
    }

    /// Offer a temporary-limit contribution for `duration`. Returns true if it
    /// won the slot.
    #[allow(clippy::too_many_arguments)]
    pub fn merge_temporary(
        &mut self,
        network: &mut Network,
        target: &AttachmentTarget,
        c: &Contribution<'_>,
        duration: u32,
        config: &ConversionConfig,
        provenance: &mut ProvenanceStore,
        reporter: &mut dyn Reporter,
    ) -> Result<bool, ConvertError> {
        let slot = SlotIdentity::temporary(&c.record.limit_set_id, c.subclass, target.side, duration);
        let equipment = network.equipment_mut(&target.equipment_id)?;
        prepare_group(equipment, target, c.record, config)?;

        let limits = equipment
            .limits_group_mut(target.side, &c.record.limit_set_id)
            .map(|g| g.limits_or_default(c.subclass))
            .ok_or_else(|| ConvertError::UnknownElement {
                kind: "limits group",
                id: c.record.limit_set_id.clone(),
            })?;

        let current = limits.temporary_value(duration);
        let merge = merge_candidate(current, c.value);
        if merge.replaced {
            limits.set_temporary(duration, c.record.display_name(), merge.value);
        }

        if current.is_some() && self.first_report(target, &slot, c.value) {
            reporter.fixed(
                TEMPORARY_LIMIT,
                format!(
                    "Several temporary limits defined for same acceptable duration ({duration} s) for {}. Only the lowest is kept.",
                    c.scope
                ),
            );
        }

        if merge.replaced {
            log::trace!("{} {} {:?} <- {} ({})", target.equipment_id, target.side, slot.tier, c.value, c.record.source_id);
            provenance.record(&target.equipment_id, slot, entry(c));
        }
        Ok(merge.replaced)
    }

    fn first_report(&mut self, target: &AttachmentTarget, slot: &SlotIdentity, value: f64) -> bool {
        self.reported
            .entry(SlotKey {
                equipment_id: target.equipment_id.clone(),
                slot: slot.clone(),
            })
            .or_default()
            .insert(OrderedFloat(value))
    }
}

fn entry(c: &Contribution<'_>) -> ProvenanceEntry {
    ProvenanceEntry {
        source_id: c.record.source_id.clone(),
        baseline_value: c.value,
    }
}

// Lazily create the (side, limit set) group, recording its id/name pair.
fn prepare_group(
    equipment: &mut Equipment,
    target: &AttachmentTarget,
    record: &LimitRecord,
    config: &ConversionConfig,
) -> Result<(), ConvertError> {
    if equipment.ensure_limits_group(target.side, &record.limit_set_id) && config.record_limit_set_identifiers {
        let property = ProvenanceCodec::new(config.namespace.as_str()).limit_set_identifiers_key();
        equipment.record_limit_set(&property, &record.limit_set_id, record.limit_set_name())?;
    }
    Ok(())
}
