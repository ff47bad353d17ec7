use crate::model::{LimitRecord, LimitSubclass, LoadingTier, VoltageBound};

/// Broad family a subclass name places a record in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Voltage,
    Loading(LimitSubclass),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    Voltage(VoltageBound),
    Loading {
        subclass: LimitSubclass,
        tier: LoadingTier,
    },
    Unclassified(Unclassified),
}

/// A record the classifier could not place, with the raw fields involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unclassified {
    /// `None` when the subclass itself was not recognized.
    pub family: Option<Family>,
    pub subclass: String,
    pub type_name: Option<String>,
    pub limit_type: Option<String>,
}

impl std::fmt::Display for Unclassified {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "subclass={}, typeName={}, type={}",
            self.subclass,
            self.type_name.as_deref().unwrap_or(""),
            self.limit_type.as_deref().unwrap_or(""),
        )
    }
}

/// The normalized type code and the free-text type name disagree. The type code
/// wins, even when it names no kind the classifier knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeConflict {
    pub limit_type: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub conflict: Option<TypeConflict>,
}

pub fn family(subclass: &str) -> Option<Family> {
    let lower = subclass.to_ascii_lowercase();
    if lower.contains("voltage") {
        Some(Family::Voltage)
    } else if lower.contains("current") {
        Some(Family::Loading(LimitSubclass::Current))
    } else if lower.contains("activepower") {
        Some(Family::Loading(LimitSubclass::ActivePower))
    } else if lower.contains("apparentpower") {
        Some(Family::Loading(LimitSubclass::ApparentPower))
    } else {
        None
    }
}

/// Decide category and tier of a record from its subclass and type fields.
pub fn classify(record: &LimitRecord) -> Classification {
    let limit_type = record.limit_type.as_deref();
    let type_name = record.type_name.as_deref();

    let unclassified = |family| Category::Unclassified(Unclassified {
        family,
        subclass: record.subclass.clone(),
        type_name: record.type_name.clone(),
        limit_type: record.limit_type.clone(),
    });

    match family(&record.subclass) {
        Some(Family::Voltage) => {
            let (bound, conflict) = split(limit_type, type_name, voltage_by_code, voltage_by_name);
            let category = match bound {
                Some(b) => Category::Voltage(b),
                None => unclassified(Some(Family::Voltage)),
            };
            Classification { category, conflict }
        }
        Some(Family::Loading(subclass)) => {
            let (tier, conflict) = split(limit_type, type_name, tier_by_code, tier_by_name);
            let category = match tier {
                Some(tier) => Category::Loading { subclass, tier },
                None => unclassified(Some(Family::Loading(subclass))),
            };
            Classification { category, conflict }
        }
        None => Classification {
            category: unclassified(None),
            conflict: None,
        },
    }
}

// A present type code is authoritative; the free-text name only decides when
// the code is absent.
fn split<T: Copy + PartialEq>(
    limit_type: Option<&str>,
    type_name: Option<&str>,
    by_code: fn(&str) -> Option<T>,
    by_name: fn(&str) -> Option<T>,
) -> (Option<T>, Option<TypeConflict>) {
    let named = type_name.and_then(by_name);
    let Some(code) = limit_type else {
        return (named, None);
    };
    let coded = by_code(code);
    let conflict = match (coded, named) {
        (_, None) => None,
        (Some(c), Some(n)) if c == n => None,
        _ => Some(TypeConflict {
            limit_type: code.to_string(),
            type_name: type_name.unwrap_or_default().to_string(),
        }),
    };
    (coded, conflict)
}

fn voltage_by_code(code: &str) -> Option<VoltageBound> {
    if code.ends_with("highVoltage") {
        Some(VoltageBound::High)
    } else if code.ends_with("lowVoltage") {
        Some(VoltageBound::Low)
    } else {
        None
    }
}

fn voltage_by_name(name: &str) -> Option<VoltageBound> {
    if name.eq_ignore_ascii_case("highvoltage") {
        Some(VoltageBound::High)
    } else if name.eq_ignore_ascii_case("lowvoltage") {
        Some(VoltageBound::Low)
    } else {
        None
    }
}

fn tier_by_code(code: &str) -> Option<LoadingTier> {
    if code.ends_with("patl") {
        Some(LoadingTier::Permanent)
    } else if code.ends_with("tatl") {
        Some(LoadingTier::Temporary)
    } else {
        None
    }
}

fn tier_by_name(name: &str) -> Option<LoadingTier> {
    match name {
        "PATL" => Some(LoadingTier::Permanent),
        "TATL" => Some(LoadingTier::Temporary),
        _ => None,
    }
}
