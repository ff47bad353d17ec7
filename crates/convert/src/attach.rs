//! Attachment resolution: which (equipment, side) pairs or which voltage level
//! a limit record lands on.

use crate::diagnostics::Reporter;
use crate::error::ConvertError;
use crate::model::{AttachmentTarget, EquipmentKind, LimitRecord, Scope, Side};
use crate::network::NetworkDirectory;

const OPERATIONAL_LIMIT: &str = "Operational limit";

/// Side a record declares, before the equipment kind has had its say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredSide {
    /// Attached to the equipment, not to one of its terminals.
    Whole,
    Terminal(u8),
}

impl std::fmt::Display for DeclaredSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Whole => write!(f, "whole"),
            Self::Terminal(n) => write!(f, "{n}"),
        }
    }
}

/// What an equipment kind makes of a declared side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fanout {
    Sides(&'static [Side]),
    /// Equipment with distinct sides cannot take a whole-equipment limit.
    WholeRejected { sides: u8 },
    OutOfRange(u8),
    /// Loading limits make no sense on this kind.
    Never,
}

impl EquipmentKind {
    pub fn fanout(self, declared: DeclaredSide) -> Fanout {
        use DeclaredSide::{Terminal, Whole};
        match (self, declared) {
            (EquipmentKind::Line, Whole) => Fanout::Sides(&[Side::One, Side::Two]),
            (EquipmentKind::TwoWindingTransformer, Whole) => Fanout::WholeRejected { sides: 2 },
            (EquipmentKind::ThreeWindingTransformer, Whole) => Fanout::WholeRejected { sides: 3 },
            (EquipmentKind::Line | EquipmentKind::TwoWindingTransformer, Terminal(n)) => match n {
                1 => Fanout::Sides(&[Side::One]),
                2 => Fanout::Sides(&[Side::Two]),
                n => Fanout::OutOfRange(n),
            },
            (EquipmentKind::ThreeWindingTransformer, Terminal(n)) => match n {
                1 => Fanout::Sides(&[Side::One]),
                2 => Fanout::Sides(&[Side::Two]),
                3 => Fanout::Sides(&[Side::Three]),
                n => Fanout::OutOfRange(n),
            },
            (EquipmentKind::DanglingLine, _) => Fanout::Sides(&[Side::Whole]),
            (EquipmentKind::Switch | EquipmentKind::Injection, _) => Fanout::Never,
        }
    }
}

/// Loading-limit destinations of one record. Empty targets mean the record
/// resolved but was not assigned (already reported).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingAttachment {
    pub scope: Scope,
    pub targets: Vec<AttachmentTarget>,
}

/// Resolve a loading limit: terminal first, then the equipment as a whole.
pub fn resolve_loading<D: NetworkDirectory + ?Sized>(
    record: &LimitRecord,
    directory: &D,
    reporter: &mut dyn Reporter,
) -> Result<LoadingAttachment, ConvertError> {
    let via_terminal = record.terminal_id.as_deref().and_then(|tid| {
        let terminal = directory.resolve_terminal(tid)?;
        let equipment = directory.resolve_equipment(&terminal.equipment_id)?;
        Some((Scope::Terminal(tid.to_string()), equipment, DeclaredSide::Terminal(terminal.number)))
    });
    let resolved = via_terminal.or_else(|| {
        let eid = record.equipment_id.as_deref()?;
        let equipment = directory.resolve_equipment(eid)?;
        Some((Scope::Equipment(eid.to_string()), equipment, DeclaredSide::Whole))
    });

    let Some((scope, equipment, declared)) = resolved else {
        return Err(unattached(record, reporter));
    };

    let targets = match equipment.kind.fanout(declared) {
        Fanout::Sides(sides) => sides
            .iter()
            .map(|&side| AttachmentTarget {
                equipment_id: equipment.id.clone(),
                kind: equipment.kind,
                side,
            })
            .collect(),
        Fanout::WholeRejected { sides } => {
            reporter.ignored(
                &record.subclass,
                format!(
                    "Defined for Equipment {}. Should be defined for one Terminal of {}",
                    equipment.kind,
                    if sides == 2 { "Two" } else { "Three" },
                ),
            );
            not_assigned(record, Some(equipment.element()), None, reporter);
            Vec::new()
        }
        Fanout::OutOfRange(n) => {
            not_assigned(record, Some(equipment.element()), Some(n), reporter);
            Vec::new()
        }
        Fanout::Never => {
            not_assigned(record, Some(equipment.element()), None, reporter);
            Vec::new()
        }
    };

    Ok(LoadingAttachment { scope, targets })
}

/// Resolve the voltage level a voltage limit applies to.
///
/// `Ok(None)` means the record resolved to a switch, through its terminal or
/// its equipment id, and was not assigned. A terminal whose voltage level is
/// unknown falls through to the equipment id.
pub fn resolve_voltage_level<D: NetworkDirectory + ?Sized>(
    record: &LimitRecord,
    directory: &D,
    reporter: &mut dyn Reporter,
) -> Result<Option<String>, ConvertError> {
    if let Some(t) = record.terminal_id.as_deref().and_then(|tid| directory.resolve_terminal(tid)) {
        if let Some(eq) = directory.resolve_equipment(&t.equipment_id) {
            if eq.kind == EquipmentKind::Switch {
                not_assigned(record, Some(eq.element()), Some(t.number), reporter);
                return Ok(None);
            }
        }
        if let Some(vl) = t.voltage_level_id {
            return Ok(Some(vl));
        }
    }

    let vl = match record.equipment_id.as_deref() {
        None => None,
        Some(eid) => match directory.resolve_equipment(eid) {
            // Unknown equipment: typically a bus-bar section in a bus-branch
            // model, attached through its container.
            None => directory.resolve_voltage_level(record.container_id.as_deref().unwrap_or(eid)),
            Some(eq) if eq.kind == EquipmentKind::Switch => {
                not_assigned(record, Some(eq.element()), None, reporter);
                return Ok(None);
            }
            Some(eq) => directory.voltage_level_of(&eq),
        },
    };

    match vl {
        Some(vl) => Ok(Some(vl)),
        None => Err(unattached(record, reporter)),
    }
}

fn unattached(record: &LimitRecord, reporter: &mut dyn Reporter) -> ConvertError {
    reporter.missing(
        OPERATIONAL_LIMIT,
        format!(
            "Terminal {} or Equipment {}",
            record.terminal_id.as_deref().unwrap_or("null"),
            record.equipment_id.as_deref().unwrap_or("null"),
        ),
    );
    ConvertError::Unattached {
        record_id: record.source_id.clone(),
        terminal_id: record.terminal_id.clone(),
        equipment_id: record.equipment_id.clone(),
    }
}

/// Report a record that resolved but cannot be attached. `element` is the
/// (class name, id) of what it resolved to.
pub fn not_assigned(
    record: &LimitRecord,
    element: Option<(&str, &str)>,
    side: Option<u8>,
    reporter: &mut dyn Reporter,
) {
    let (kind, id) = element.unwrap_or(("", ""));
    let side = side.map(|n| format!(" (side {n})")).unwrap_or_default();
    reporter.not_assigned(
        OPERATIONAL_LIMIT,
        format!(
            "Not assigned for {kind} {id}{side}. Limit id, type, typeName, subClass, terminal : {}, {}, {}, {}, {}",
            record.source_id,
            record.limit_type.as_deref().unwrap_or("null"),
            record.type_name.as_deref().unwrap_or("null"),
            record.subclass,
            record.terminal_id.as_deref().unwrap_or("null"),
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticKind, DiagnosticLog};
    use crate::network::Network;

    fn network() -> Network {
        let mut n = Network::new();
        n.add_voltage_level("VL1")
            .add_voltage_level("VL2")
            .add_voltage_level("VL3")
            .add_equipment("LINE", EquipmentKind::Line)
            .add_equipment("T2W", EquipmentKind::TwoWindingTransformer)
            .add_equipment("T3W", EquipmentKind::ThreeWindingTransformer)
            .add_equipment("DL", EquipmentKind::DanglingLine)
            .add_equipment("SW", EquipmentKind::Switch)
            .add_equipment("LOAD", EquipmentKind::Injection)
            .add_terminal("LINE_1", "LINE", 1, "VL1")
            .add_terminal("LINE_2", "LINE", 2, "VL2")
            .add_terminal("LINE_9", "LINE", 9, "VL2")
            .add_terminal("T3W_3", "T3W", 3, "VL3")
            .add_terminal("DL_1", "DL", 1, "VL1")
            .add_terminal("SW_1", "SW", 1, "VL1")
            .add_terminal("LOAD_1", "LOAD", 1, "VL2")
            .add_container("BBS", "VL3");
        n
    }

    fn record(terminal: Option<&str>, equipment: Option<&str>) -> LimitRecord {
        LimitRecord {
            source_id: "ol".into(),
            subclass: "CurrentLimit".into(),
            limit_set_id: "S".into(),
            terminal_id: terminal.map(Into::into),
            equipment_id: equipment.map(Into::into),
            ..LimitRecord::default()
        }
    }

    fn sides(a: &LoadingAttachment) -> Vec<Side> {
        a.targets.iter().map(|t| t.side).collect()
    }

    #[test]
    fn fanout_table() {
        use DeclaredSide::*;
        assert_eq!(EquipmentKind::Line.fanout(Whole), Fanout::Sides(&[Side::One, Side::Two]));
        assert_eq!(EquipmentKind::Line.fanout(Terminal(3)), Fanout::OutOfRange(3));
        assert_eq!(
            EquipmentKind::ThreeWindingTransformer.fanout(Whole),
            Fanout::WholeRejected { sides: 3 }
        );
        assert_eq!(
            EquipmentKind::ThreeWindingTransformer.fanout(Terminal(3)),
            Fanout::Sides(&[Side::Three])
        );
        assert_eq!(EquipmentKind::DanglingLine.fanout(Terminal(2)), Fanout::Sides(&[Side::Whole]));
        assert_eq!(EquipmentKind::Switch.fanout(Whole), Fanout::Never);
    }

    #[test]
    fn terminal_preferred_over_equipment() {
        let n = network();
        let mut log = DiagnosticLog::new();
        let a = resolve_loading(&record(Some("LINE_2"), Some("LINE")), &n, &mut log).unwrap();
        assert_eq!(a.scope, Scope::Terminal("LINE_2".into()));
        assert_eq!(sides(&a), vec![Side::Two]);
        assert!(log.is_empty());
    }

    #[test]
    fn unknown_terminal_falls_back_to_equipment() {
        let n = network();
        let mut log = DiagnosticLog::new();
        let a = resolve_loading(&record(Some("ghost"), Some("LINE")), &n, &mut log).unwrap();
        assert_eq!(a.scope, Scope::Equipment("LINE".into()));
        assert_eq!(sides(&a), vec![Side::One, Side::Two]);
    }

    #[test]
    fn three_winding_whole_is_rejected() {
        let n = network();
        let mut log = DiagnosticLog::new();
        let a = resolve_loading(&record(None, Some("T3W")), &n, &mut log).unwrap();
        assert!(a.targets.is_empty());
        assert_eq!(log.count(DiagnosticKind::NotAssigned), 1);
        let pointer = log.of_kind(DiagnosticKind::Ignored).next().unwrap();
        assert!(pointer.message.contains("one Terminal of Three"));
    }

    #[test]
    fn two_winding_whole_is_rejected() {
        let n = network();
        let mut log = DiagnosticLog::new();
        let a = resolve_loading(&record(None, Some("T2W")), &n, &mut log).unwrap();
        assert!(a.targets.is_empty());
        assert!(log.entries()[0].message.contains("one Terminal of Two"));
    }

    #[test]
    fn out_of_range_side_recorded() {
        let n = network();
        let mut log = DiagnosticLog::new();
        let a = resolve_loading(&record(Some("LINE_9"), None), &n, &mut log).unwrap();
        assert!(a.targets.is_empty());
        let d = log.of_kind(DiagnosticKind::NotAssigned).next().unwrap();
        assert!(d.message.contains("(side 9)"), "{}", d.message);
    }

    #[test]
    fn dangling_line_normalizes_side() {
        let n = network();
        let mut log = DiagnosticLog::new();
        let a = resolve_loading(&record(Some("DL_1"), None), &n, &mut log).unwrap();
        assert_eq!(sides(&a), vec![Side::Whole]);
    }

    #[test]
    fn switch_and_injection_never_assigned() {
        let n = network();
        for (t, e) in [(Some("SW_1"), None), (None, Some("LOAD"))] {
            let mut log = DiagnosticLog::new();
            let a = resolve_loading(&record(t, e), &n, &mut log).unwrap();
            assert!(a.targets.is_empty());
            assert_eq!(log.count(DiagnosticKind::NotAssigned), 1);
        }
    }

    #[test]
    fn nothing_resolves_is_fatal() {
        let n = network();
        let mut log = DiagnosticLog::new();
        let err = resolve_loading(&record(Some("ghost"), Some("phantom")), &n, &mut log).unwrap_err();
        assert!(matches!(err, ConvertError::Unattached { .. }));
        assert_eq!(log.count(DiagnosticKind::Missing), 1);
    }

    #[test]
    fn voltage_via_terminal_and_injection() {
        let n = network();
        let mut log = DiagnosticLog::new();
        let vl = resolve_voltage_level(&record(Some("LINE_2"), None), &n, &mut log).unwrap();
        assert_eq!(vl.as_deref(), Some("VL2"));
        let vl = resolve_voltage_level(&record(None, Some("LOAD")), &n, &mut log).unwrap();
        assert_eq!(vl.as_deref(), Some("VL2"));
    }

    #[test]
    fn voltage_via_container_for_unknown_equipment() {
        let n = network();
        let mut log = DiagnosticLog::new();
        let mut r = record(None, Some("BBS_SECTION"));
        r.container_id = Some("BBS".into());
        assert_eq!(resolve_voltage_level(&r, &n, &mut log).unwrap().as_deref(), Some("VL3"));

        // Without a container the equipment id itself is tried.
        let r = record(None, Some("VL1"));
        assert_eq!(resolve_voltage_level(&r, &n, &mut log).unwrap().as_deref(), Some("VL1"));
    }

    #[test]
    fn voltage_on_switch_not_assigned() {
        let n = network();
        let mut log = DiagnosticLog::new();
        assert_eq!(resolve_voltage_level(&record(None, Some("SW")), &n, &mut log).unwrap(), None);
        assert_eq!(log.count(DiagnosticKind::NotAssigned), 1);
    }

    #[test]
    fn voltage_on_switch_terminal_not_assigned() {
        let n = network();
        let mut log = DiagnosticLog::new();
        assert_eq!(resolve_voltage_level(&record(Some("SW_1"), None), &n, &mut log).unwrap(), None);
        let d = log.of_kind(DiagnosticKind::NotAssigned).next().unwrap();
        assert!(d.message.starts_with("Not assigned for Switch SW (side 1)"), "{}", d.message);
    }

    #[test]
    fn terminal_with_unknown_voltage_level_falls_back_to_equipment() {
        let mut n = network();
        n.add_terminal("LOAD_X", "LOAD", 1, "VL_GONE");
        let mut log = DiagnosticLog::new();

        // No equipment id to fall back on.
        let err = resolve_voltage_level(&record(Some("LOAD_X"), None), &n, &mut log).unwrap_err();
        assert!(matches!(err, ConvertError::Unattached { .. }));

        let mut r = record(Some("LOAD_X"), Some("BBS_SECTION"));
        r.container_id = Some("BBS".into());
        assert_eq!(resolve_voltage_level(&r, &n, &mut log).unwrap().as_deref(), Some("VL3"));
    }

    #[test]
    fn voltage_on_multi_terminal_equipment_is_fatal() {
        let n = network();
        let mut log = DiagnosticLog::new();
        let err = resolve_voltage_level(&record(None, Some("LINE")), &n, &mut log).unwrap_err();
        assert!(matches!(err, ConvertError::Unattached { .. }));
    }
}
