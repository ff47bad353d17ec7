//! `oplimits-convert`: Operational-limit conversion engine.
//!
//! Pure engine crate: receives limit records and a network snapshot, attaches
//! the conservative resolution of every limit slot to the network and records
//! where each value came from, so a later update pass can re-derive it from a
//! refreshed source. No CLI or IO dependencies.

pub mod aggregate;
pub mod attach;
pub mod classify;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod model;
pub mod network;
pub mod provenance;
pub mod update;
pub mod voltage;

pub use config::ConversionConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLog, LogReporter, Reporter};
pub use engine::{run, ConversionSummary, Converter};
pub use error::ConvertError;
pub use model::LimitRecord;
pub use network::{Network, NetworkDirectory};
pub use update::{reconcile_network, RefreshedSource, UpdateReport};
