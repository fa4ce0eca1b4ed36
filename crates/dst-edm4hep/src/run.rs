//! Run header record.

use serde::{Deserialize, Serialize};

/// Per-run summary emitted when a (run, file) boundary is crossed or at
/// end of stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunHeader {
    /// Experiment number (always 1000 for DELPHI).
    pub experiment_number: i32,
    pub run_number: i32,
    /// File number within the run.
    pub file_number: i32,
    /// LEP fill number.
    pub fill_number: i32,
    /// Number of events converted for this (run, file) pair.
    pub event_count: u32,
    /// Center-of-mass energy in GeV, the run's first observed value.
    pub center_of_mass_energy: f32,
    /// Dataset version identifier, e.g. "94B2".
    pub processing_tag: String,
}
