//! Structured data-quality events emitted during conversion.
//!
//! The engine never logs these directly: it hands them to a [`Reporter`]
//! supplied by the caller. [`DiagnosticLog`] keeps them for inspection,
//! [`LogReporter`] forwards them to the `log` facade. A pair of reporters
//! hands every diagnostic to both.

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Missing or non-positive value, or a pointer to a better declaration.
    Ignored,
    /// Record could not be classified; kept aside, not acted on.
    Pending,
    /// Record classified but no valid attachment for it.
    NotAssigned,
    /// Slot conflict resolved by keeping the lowest value.
    Fixed,
    /// Inconsistent direction, voltage bounds or type fields.
    Invalid,
    /// Neither terminal nor equipment resolved.
    Missing,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ignored => write!(f, "ignored"),
            Self::Pending => write!(f, "pending"),
            Self::NotAssigned => write!(f, "not_assigned"),
            Self::Fixed => write!(f, "fixed"),
            Self::Invalid => write!(f, "invalid"),
            Self::Missing => write!(f, "missing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// What the event is about (`Operational limit`, `Permanent Limit`, ...).
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.subject, self.message)
    }
}

/// Sink for diagnostics.
pub trait Reporter {
    fn report(&mut self, diagnostic: Diagnostic);

    fn ignored(&mut self, subject: &str, message: String) {
        self.report(Diagnostic::new(DiagnosticKind::Ignored, subject, message));
    }

    fn pending(&mut self, subject: &str, message: String) {
        self.report(Diagnostic::new(DiagnosticKind::Pending, subject, message));
    }

    fn not_assigned(&mut self, subject: &str, message: String) {
        self.report(Diagnostic::new(DiagnosticKind::NotAssigned, subject, message));
    }

    fn fixed(&mut self, subject: &str, message: String) {
        self.report(Diagnostic::new(DiagnosticKind::Fixed, subject, message));
    }

    fn invalid(&mut self, subject: &str, message: String) {
        self.report(Diagnostic::new(DiagnosticKind::Invalid, subject, message));
    }

    fn missing(&mut self, subject: &str, message: String) {
        self.report(Diagnostic::new(DiagnosticKind::Missing, subject, message));
    }
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn report(&mut self, diagnostic: Diagnostic) {
        (**self).report(diagnostic);
    }
}

impl<A: Reporter, B: Reporter> Reporter for (A, B) {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.0.report(diagnostic.clone());
        self.1.report(diagnostic);
    }
}

/// Collects diagnostics in arrival order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    pub fn counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for d in &self.entries {
            *counts.entry(d.kind.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

impl Reporter for DiagnosticLog {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }
}

/// Forwards diagnostics to the `log` facade under the `oplimits` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, d: Diagnostic) {
        match d.kind {
            DiagnosticKind::Ignored | DiagnosticKind::Fixed => {
                log::info!(target: "oplimits", "{d}")
            }
            DiagnosticKind::Pending
            | DiagnosticKind::NotAssigned
            | DiagnosticKind::Invalid
            | DiagnosticKind::Missing => log::warn!(target: "oplimits", "{d}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_counts_by_kind() {
        let mut log = DiagnosticLog::new();
        log.fixed("Permanent Limit", "a".into());
        log.fixed("Permanent Limit", "b".into());
        log.ignored("Operational limit", "value is <= 0".into());

        assert_eq!(log.len(), 3);
        assert_eq!(log.count(DiagnosticKind::Fixed), 2);
        assert_eq!(log.count(DiagnosticKind::Pending), 0);
        assert_eq!(log.counts().get("fixed"), Some(&2));
        assert_eq!(log.counts().get("ignored"), Some(&1));
        assert_eq!(log.entries()[2].message, "value is <= 0");
    }

    #[test]
    fn reporter_through_mut_ref() {
        fn emit(mut r: impl Reporter) {
            r.invalid("Temporary Limit", "TATL x is a low limit".into());
        }
        let mut log = DiagnosticLog::new();
        emit(&mut log);
        assert_eq!(log.of_kind(DiagnosticKind::Invalid).count(), 1);
    }

    #[test]
    fn log_reporter_accepts_every_kind() {
        let mut r = LogReporter;
        for kind in [
            DiagnosticKind::Ignored,
            DiagnosticKind::Pending,
            DiagnosticKind::NotAssigned,
            DiagnosticKind::Fixed,
            DiagnosticKind::Invalid,
            DiagnosticKind::Missing,
        ] {
            r.report(Diagnostic::new(kind, "Operational limit", kind.to_string()));
        }
    }

    #[test]
    fn pair_reports_to_both() {
        let mut first = DiagnosticLog::new();
        let mut second = DiagnosticLog::new();
        {
            let mut both = (&mut first, &mut second);
            both.fixed("Permanent Limit", "kept lowest".into());
            both.missing("Operational limit", "Terminal t or Equipment e".into());
        }
        assert_eq!(first.entries(), second.entries());
        assert_eq!(first.len(), 2);

        let mut with_log = (DiagnosticLog::new(), LogReporter);
        with_log.invalid("Temporary Limit", "TATL x is a low limit".into());
        assert_eq!(with_log.0.count(DiagnosticKind::Invalid), 1);
    }

    #[test]
    fn log_serializes_as_list() {
        let mut log = DiagnosticLog::new();
        log.pending("Operational limit", "unclassified".into());
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json[0]["kind"], "pending");
        assert_eq!(json[0]["message"], "unclassified");
    }

    #[test]
    fn display_format() {
        let d = Diagnostic::new(DiagnosticKind::NotAssigned, "Operational limit", "no side");
        assert_eq!(d.to_string(), "[not_assigned] Operational limit: no side");
    }
}
