use crate::diagnostics::Reporter;
use crate::model::VoltageBound;
use crate::network::VoltageLevel;

/// Outcome of offering a voltage bound candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundDecision {
    Accept,
    /// Consistent but not tighter than the bound already resolved.
    Keep,
    /// Would cross the resolved opposite bound (carried here).
    Inconsistent(f64),
}

/// Decide a candidate against the bounds already resolved.
///
/// High bounds tighten downwards, low bounds upwards; neither may cross the
/// opposite bound.
pub fn decide(bound: VoltageBound, candidate: f64, high: Option<f64>, low: Option<f64>) -> BoundDecision {
    match bound {
        VoltageBound::High => match (low, high) {
            (Some(l), _) if candidate < l => BoundDecision::Inconsistent(l),
            (_, Some(h)) if candidate >= h => BoundDecision::Keep,
            _ => BoundDecision::Accept,
        },
        VoltageBound::Low => match (high, low) {
            (Some(h), _) if candidate > h => BoundDecision::Inconsistent(h),
            (_, Some(l)) if candidate <= l => BoundDecision::Keep,
            _ => BoundDecision::Accept,
        },
    }
}

/// Merge a candidate into a voltage level. Returns true if it was accepted.
pub fn merge_bound(level: &mut VoltageLevel, bound: VoltageBound, candidate: f64, reporter: &mut dyn Reporter) -> bool {
    match decide(bound, candidate, level.high_voltage_limit, level.low_voltage_limit) {
        BoundDecision::Accept => {
            match bound {
                VoltageBound::High => level.high_voltage_limit = Some(candidate),
                VoltageBound::Low => level.low_voltage_limit = Some(candidate),
            }
            true
        }
        BoundDecision::Keep => false,
        BoundDecision::Inconsistent(opposite) => {
            let (subject, other) = match bound {
                VoltageBound::High => ("HighVoltageLimit", "low"),
                VoltageBound::Low => ("LowVoltageLimit", "high"),
            };
            reporter.invalid(subject, format!("Inconsistent with {other} voltage limit ({opposite}kV)"));
            false
        }
    }
}
