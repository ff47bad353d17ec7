use serde::Serialize;

use crate::aggregate::{Contribution, SlotAggregator};
use crate::attach::{not_assigned, resolve_loading, resolve_voltage_level};
use crate::classify::{classify, family, Category, Classification, Family};
use crate::config::ConversionConfig;
use crate::diagnostics::Reporter;
use crate::error::ConvertError;
use crate::model::{Direction, LimitRecord, LimitSubclass, LoadingTier};
use crate::network::Network;
use crate::provenance::{ProvenanceCodec, ProvenanceStore};
use crate::voltage::merge_bound;

const OPERATIONAL_LIMIT: &str = "Operational limit";
const TEMPORARY_LIMIT: &str = "Temporary Limit";

/// What became of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Reached at least one slot or voltage bound; `accepted` counts the ones it won.
    Merged { accepted: usize },
    /// Dropped with a diagnostic before reaching any slot.
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub records: usize,
    pub converted: usize,
    pub skipped: usize,
    /// Records whose conversion unit failed because nothing could be attached.
    pub invalid_units: usize,
    pub slots_written: usize,
}

/// Per-run conversion state. Records are converted strictly in the order they
/// are handed in; provenance is flattened onto the network by [`finish`](Self::finish).
pub struct Converter<'c> {
    config: &'c ConversionConfig,
    aggregator: SlotAggregator,
    provenance: ProvenanceStore,
    summary: ConversionSummary,
}

impl<'c> Converter<'c> {
    pub fn new(config: &'c ConversionConfig) -> Self {
        Self {
            config,
            aggregator: SlotAggregator::new(),
            provenance: ProvenanceStore::new(),
            summary: ConversionSummary::default(),
        }
    }

    pub fn provenance(&self) -> &ProvenanceStore {
        &self.provenance
    }

    pub fn summary(&self) -> &ConversionSummary {
        &self.summary
    }

    /// Convert one record. `Err(Unattached)` fails this record's unit only;
    /// the caller may carry on with the next record.
    pub fn convert(
        &mut self,
        network: &mut Network,
        record: &LimitRecord,
        reporter: &mut dyn Reporter,
    ) -> Result<RecordOutcome, ConvertError> {
        self.summary.records += 1;
        let result = self.convert_record(network, record, reporter);
        match &result {
            Ok(RecordOutcome::Merged { accepted }) => {
                self.summary.converted += 1;
                self.summary.slots_written += accepted;
            }
            Ok(RecordOutcome::Skipped) => self.summary.skipped += 1,
            Err(ConvertError::Unattached { .. }) => self.summary.invalid_units += 1,
            Err(_) => {}
        }
        result
    }

    /// Write the run's provenance onto the network and hand back the summary.
    pub fn finish(self, network: &mut Network) -> Result<ConversionSummary, ConvertError> {
        let codec = ProvenanceCodec::new(self.config.namespace.as_str());
        self.provenance.write_to(network, &codec)?;
        log::debug!(
            "converted {} of {} records, {} slots written, {} provenance entries",
            self.summary.converted,
            self.summary.records,
            self.summary.slots_written,
            self.provenance.len()
        );
        Ok(self.summary)
    }

    // Attachment is resolved before the value is looked at, so a record that
    // lands nowhere fails its unit whatever its value.
    fn convert_record(
        &mut self,
        network: &mut Network,
        record: &LimitRecord,
        reporter: &mut dyn Reporter,
    ) -> Result<RecordOutcome, ConvertError> {
        match family(&record.subclass) {
            Some(Family::Voltage) => convert_voltage(network, record, reporter),
            Some(Family::Loading(subclass)) => self.convert_loading(network, record, subclass, reporter),
            None => {
                let Classification { category, .. } = classify(record);
                if let Category::Unclassified(u) = category {
                    reporter.pending(OPERATIONAL_LIMIT, format!("Limit {} not classified: {u}", record.source_id));
                }
                Ok(RecordOutcome::Skipped)
            }
        }
    }

    fn convert_loading(
        &mut self,
        network: &mut Network,
        record: &LimitRecord,
        subclass: LimitSubclass,
        reporter: &mut dyn Reporter,
    ) -> Result<RecordOutcome, ConvertError> {
        let attachment = resolve_loading(record, &*network, reporter)?;
        if attachment.targets.is_empty() {
            return Ok(RecordOutcome::Skipped);
        }
        let Some(value) = checked_value(record, reporter) else {
            return Ok(RecordOutcome::Skipped);
        };
        let tier = match classify_reported(record, reporter) {
            Category::Loading { tier, .. } => tier,
            Category::Unclassified(u) => {
                reporter.pending(OPERATIONAL_LIMIT, format!("Limit {} not classified: {u}", record.source_id));
                return Ok(RecordOutcome::Skipped);
            }
            Category::Voltage(_) => return Ok(RecordOutcome::Skipped),
        };

        let duration = match tier {
            LoadingTier::Permanent => None,
            LoadingTier::Temporary => {
                match Direction::from_raw(record.direction.as_deref()) {
                    Direction::Low => {
                        reporter.invalid(TEMPORARY_LIMIT, format!("TATL {} is a low limit", record.source_id));
                        return Ok(RecordOutcome::Skipped);
                    }
                    d if !d.fills_temporary_slot() => {
                        reporter.invalid(
                            TEMPORARY_LIMIT,
                            format!("TATL {} does not have a valid direction", record.source_id),
                        );
                        return Ok(RecordOutcome::Skipped);
                    }
                    _ => {}
                }
                match record.duration_key() {
                    Some(d) => Some(d),
                    None => {
                        reporter.invalid(
                            TEMPORARY_LIMIT,
                            format!(
                                "TATL {} has an invalid acceptable duration ({})",
                                record.source_id,
                                record.acceptable_duration.unwrap_or(f64::NAN)
                            ),
                        );
                        return Ok(RecordOutcome::Skipped);
                    }
                }
            }
        };

        let contribution = Contribution {
            record,
            subclass,
            value,
            scope: &attachment.scope,
        };
        let mut accepted = 0;
        for target in &attachment.targets {
            let won = match duration {
                None => self.aggregator.merge_permanent(
                    network,
                    target,
                    &contribution,
                    self.config,
                    &mut self.provenance,
                    reporter,
                )?,
                Some(d) => self.aggregator.merge_temporary(
                    network,
                    target,
                    &contribution,
                    d,
                    self.config,
                    &mut self.provenance,
                    reporter,
                )?,
            };
            if won {
                accepted += 1;
            }
        }
        Ok(RecordOutcome::Merged { accepted })
    }
}

/// Effective value of a record, or `None` (reported) when absent or not positive.
fn checked_value(record: &LimitRecord, reporter: &mut dyn Reporter) -> Option<f64> {
    let value = record.effective_value();
    if value.is_nan() {
        reporter.ignored(OPERATIONAL_LIMIT, "value is not defined".into());
        None
    } else if value <= 0.0 {
        reporter.ignored(OPERATIONAL_LIMIT, "value is <= 0".into());
        None
    } else {
        Some(value)
    }
}

fn classify_reported(record: &LimitRecord, reporter: &mut dyn Reporter) -> Category {
    let Classification { category, conflict } = classify(record);
    if let Some(c) = conflict {
        reporter.invalid(
            OPERATIONAL_LIMIT,
            format!(
                "Limit {}: type {} and typeName {} disagree. Type is used.",
                record.source_id, c.limit_type, c.type_name
            ),
        );
    }
    category
}

fn convert_voltage(
    network: &mut Network,
    record: &LimitRecord,
    reporter: &mut dyn Reporter,
) -> Result<RecordOutcome, ConvertError> {
    let Some(vl_id) = resolve_voltage_level(record, &*network, reporter)? else {
        return Ok(RecordOutcome::Skipped);
    };
    let Some(value) = checked_value(record, reporter) else {
        return Ok(RecordOutcome::Skipped);
    };
    let Category::Voltage(bound) = classify_reported(record, reporter) else {
        not_assigned(record, Some(("VoltageLevel", vl_id.as_str())), None, reporter);
        return Ok(RecordOutcome::Skipped);
    };
    let level = network.voltage_level_mut(&vl_id)?;
    let accepted = merge_bound(level, bound, value, reporter);
    if accepted {
        log::trace!("{vl_id} {bound} <- {value} ({})", record.source_id);
    }
    Ok(RecordOutcome::Merged {
        accepted: usize::from(accepted),
    })
}

/// Convert every record in order. Records whose unit fails with
/// [`ConvertError::Unattached`] are counted and skipped; any other error stops
/// the run.
pub fn run<'r, I>(
    config: &ConversionConfig,
    network: &mut Network,
    records: I,
    reporter: &mut dyn Reporter,
) -> Result<ConversionSummary, ConvertError>
where
    I: IntoIterator<Item = &'r LimitRecord>,
{
    let mut converter = Converter::new(config);
    for record in records {
        match converter.convert(network, record, reporter) {
            Ok(_) => {}
            Err(e @ ConvertError::Unattached { .. }) => log::debug!("{e}"),
            Err(e) => return Err(e),
        }
    }
    converter.finish(network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticKind, DiagnosticLog};
    use crate::model::{EquipmentKind, Side, UNBOUNDED_DURATION};

    fn network() -> Network {
        let mut n = Network::new();
        n.add_voltage_level("VL1")
            .add_voltage_level("VL2")
            .add_equipment("L1", EquipmentKind::Line)
            .add_terminal("L1_1", "L1", 1, "VL1")
            .add_terminal("L1_2", "L1", 2, "VL2");
        n
    }

    fn loading(id: &str, limit_type: &str, value: f64) -> LimitRecord {
        LimitRecord {
            source_id: id.into(),
            subclass: "CurrentLimit".into(),
            limit_type: Some(limit_type.into()),
            value: Some(value),
            limit_set_id: "S".into(),
            terminal_id: Some("L1_1".into()),
            ..LimitRecord::default()
        }
    }

    fn voltage(id: &str, type_name: &str, value: f64) -> LimitRecord {
        LimitRecord {
            source_id: id.into(),
            subclass: "VoltageLimit".into(),
            type_name: Some(type_name.into()),
            value: Some(value),
            limit_set_id: "V".into(),
            terminal_id: Some("L1_2".into()),
            ..LimitRecord::default()
        }
    }

    fn current(n: &Network) -> &crate::network::LoadingLimits {
        n.equipment["L1"]
            .limits_group(Side::One, "S")
            .unwrap()
            .limits(LimitSubclass::Current)
            .unwrap()
    }

    #[test]
    fn bad_values_are_ignored() {
        let config = ConversionConfig::default();
        let mut n = network();
        let mut log = DiagnosticLog::new();
        let mut missing = loading("a", "LimitTypeKind.patl", 1.0);
        missing.value = None;
        let records = [missing, loading("b", "LimitTypeKind.patl", 0.0), loading("c", "LimitTypeKind.patl", -3.0)];

        let summary = run(&config, &mut n, &records, &mut log).unwrap();
        assert_eq!(summary.skipped, 3);
        assert_eq!(log.count(DiagnosticKind::Ignored), 3);
        assert_eq!(log.entries()[0].message, "value is not defined");
        assert_eq!(log.entries()[1].message, "value is <= 0");
        assert!(n.equipment["L1"].limits_groups.is_empty());
    }

    #[test]
    fn normal_value_preferred() {
        let config = ConversionConfig::default();
        let mut n = network();
        let mut log = DiagnosticLog::new();
        let mut r = loading("a", "LimitTypeKind.patl", 200.0);
        r.normal_value = Some(150.0);
        run(&config, &mut n, [&r], &mut log).unwrap();
        assert_eq!(current(&n).permanent_limit, Some(150.0));
    }

    #[test]
    fn unclassified_loading_is_pending() {
        let config = ConversionConfig::default();
        let mut n = network();
        let mut log = DiagnosticLog::new();
        let mut r = loading("a", "LimitTypeKind.alarm", 100.0);
        r.type_name = Some("Alarm".into());
        let mut converter = Converter::new(&config);
        assert_eq!(converter.convert(&mut n, &r, &mut log).unwrap(), RecordOutcome::Skipped);
        let d = log.of_kind(DiagnosticKind::Pending).next().unwrap();
        assert!(d.message.contains("typeName=Alarm"), "{}", d.message);
    }

    #[test]
    fn unclassified_voltage_not_assigned() {
        let config = ConversionConfig::default();
        let mut n = network();
        let mut log = DiagnosticLog::new();
        let r = voltage("v", "mediumVoltage", 400.0);
        run(&config, &mut n, [&r], &mut log).unwrap();
        let d = log.of_kind(DiagnosticKind::NotAssigned).next().unwrap();
        assert!(d.message.contains("VoltageLevel VL2"), "{}", d.message);
        assert_eq!(n.voltage_levels["VL2"].high_voltage_limit, None);
    }

    #[test]
    fn type_code_wins_over_name() {
        let config = ConversionConfig::default();
        let mut n = network();
        let mut log = DiagnosticLog::new();
        let mut r = loading("a", "LimitTypeKind.patl", 100.0);
        r.type_name = Some("TATL".into());
        run(&config, &mut n, [&r], &mut log).unwrap();
        assert_eq!(current(&n).permanent_limit, Some(100.0));
        assert!(current(&n).temporary_limits.is_empty());
        assert_eq!(log.count(DiagnosticKind::Invalid), 1);
    }

    #[test]
    fn low_and_unknown_directions_rejected() {
        let config = ConversionConfig::default();
        let mut n = network();
        let mut log = DiagnosticLog::new();
        let mut low = loading("low", "LimitKind.tatl", 100.0);
        low.direction = Some("OperationalLimitDirectionKind.low".into());
        let mut odd = loading("odd", "LimitKind.tatl", 100.0);
        odd.direction = Some("OperationalLimitDirectionKind.sideways".into());

        let summary = run(&config, &mut n, [&low, &odd], &mut log).unwrap();
        assert_eq!(summary.skipped, 2);
        let messages: Vec<_> = log.of_kind(DiagnosticKind::Invalid).map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["TATL low is a low limit", "TATL odd does not have a valid direction"]);
        assert!(n.equipment["L1"].limits_groups.is_empty());
    }

    #[test]
    fn absent_duration_is_unbounded() {
        let config = ConversionConfig::default();
        let mut n = network();
        let mut log = DiagnosticLog::new();
        let r = loading("t", "LimitKind.tatl", 800.0);
        run(&config, &mut n, [&r], &mut log).unwrap();
        assert_eq!(current(&n).temporary_value(UNBOUNDED_DURATION), Some(800.0));
    }

    #[test]
    fn negative_duration_is_invalid() {
        let config = ConversionConfig::default();
        let mut n = network();
        let mut log = DiagnosticLog::new();
        let mut r = loading("t", "LimitKind.tatl", 800.0);
        r.acceptable_duration = Some(-5.0);
        let summary = run(&config, &mut n, [&r], &mut log).unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(log.count(DiagnosticKind::Invalid), 1);
    }

    #[test]
    fn line_whole_fans_out_with_provenance() {
        let config = ConversionConfig::default();
        let mut n = network();
        let mut log = DiagnosticLog::new();
        let mut r = loading("p", "LimitTypeKind.patl", 100.0);
        r.terminal_id = None;
        r.equipment_id = Some("L1".into());

        let summary = run(&config, &mut n, [&r], &mut log).unwrap();
        assert_eq!(summary.slots_written, 2);
        let props = &n.equipment["L1"].properties;
        assert_eq!(props["CGMES_sourceId_S_1_CurrentLimit_patl"], "p");
        assert_eq!(props["CGMES_sourceId_S_2_CurrentLimit_patl"], "p");
        assert_eq!(props["CGMES_baselineValue_S_2_CurrentLimit_patl"], "100");
    }

    #[test]
    fn unattached_counts_and_run_continues() {
        let config = ConversionConfig::default();
        let mut n = network();
        let mut log = DiagnosticLog::new();
        let mut lost = loading("lost", "LimitTypeKind.patl", 100.0);
        lost.terminal_id = Some("ghost".into());
        let ok = loading("ok", "LimitTypeKind.patl", 90.0);

        let summary = run(&config, &mut n, [&lost, &ok], &mut log).unwrap();
        assert_eq!(summary.invalid_units, 1);
        assert_eq!(summary.converted, 1);
        assert_eq!(log.count(DiagnosticKind::Missing), 1);
        assert_eq!(current(&n).permanent_limit, Some(90.0));
    }

    #[test]
    fn unattached_wins_over_bad_value() {
        let config = ConversionConfig::default();
        let mut n = network();
        let mut log = DiagnosticLog::new();
        let mut lost = loading("lost", "LimitTypeKind.patl", 0.0);
        lost.terminal_id = Some("ghost".into());
        let mut lost_voltage = voltage("lost_v", "highVoltage", 400.0);
        lost_voltage.value = None;
        lost_voltage.terminal_id = Some("ghost".into());

        let summary = run(&config, &mut n, [&lost, &lost_voltage], &mut log).unwrap();
        assert_eq!(summary.invalid_units, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(log.count(DiagnosticKind::Missing), 2);
        assert_eq!(log.count(DiagnosticKind::Ignored), 0);
    }

    #[test]
    fn missing_voltage_level_fails_only_its_unit() {
        let config = ConversionConfig::default();
        let mut n = network();
        n.add_terminal("L1_X", "L1", 1, "VL_GONE");
        let mut lost = voltage("v", "highVoltage", 400.0);
        lost.terminal_id = Some("L1_X".into());
        let ok = loading("ok", "LimitTypeKind.patl", 90.0);
        let mut log = DiagnosticLog::new();

        let summary = run(&config, &mut n, [&lost, &ok], &mut log).unwrap();
        assert_eq!(summary.invalid_units, 1);
        assert_eq!(summary.converted, 1);
        assert_eq!(current(&n).permanent_limit, Some(90.0));
    }

    #[test]
    fn unknown_type_code_is_not_rescued_by_name() {
        let config = ConversionConfig::default();
        let mut n = network();
        let mut log = DiagnosticLog::new();
        let mut r = loading("a", "LimitTypeKind.alarm", 100.0);
        r.type_name = Some("TATL".into());

        let summary = run(&config, &mut n, [&r], &mut log).unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(log.count(DiagnosticKind::Invalid), 1);
        assert_eq!(log.count(DiagnosticKind::Pending), 1);
        assert!(n.equipment["L1"].limits_groups.is_empty());
    }

    #[test]
    fn voltage_bounds_merge() {
        let config = ConversionConfig::default();
        let mut n = network();
        let mut log = DiagnosticLog::new();
        let records = [
            voltage("h", "highVoltage", 420.0),
            voltage("l", "lowVoltage", 450.0),
            voltage("l2", "LowVoltage", 380.0),
        ];
        let summary = run(&config, &mut n, &records, &mut log).unwrap();
        assert_eq!(n.voltage_levels["VL2"].high_voltage_limit, Some(420.0));
        assert_eq!(n.voltage_levels["VL2"].low_voltage_limit, Some(380.0));
        assert_eq!(summary.converted, 3);
        assert_eq!(summary.slots_written, 2);
        assert_eq!(log.count(DiagnosticKind::Invalid), 1);
    }
}
