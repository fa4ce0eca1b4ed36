//! Event header records.

use serde::{Deserialize, Serialize};

use crate::components::TimeStamp;

/// Standard EDM4hep event header.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventHeader {
    pub event_number: i32,
    /// Run number; negative values mark simulated data.
    pub run_number: i32,
    /// Event time in nanoseconds since the Unix epoch (UTC).
    pub time_stamp: i64,
    pub weight: f32,
}

/// DELPHI-specific event header with extended metadata.
///
/// Carries the source-native identifiers alongside the decoded timestamp
/// so the original bookkeeping stays recoverable from the output. The
/// multiplicity and energy summaries are zero until the corresponding DST
/// blocks are decoded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DelphiEventHeader {
    pub event_number: i32,
    pub run_number: i32,
    pub file_number: i32,
    pub time_stamp: TimeStamp,
    /// Original DELPHI packed date (YYMMDD).
    pub delphi_date: i32,
    /// Original DELPHI packed time (HHMMSS).
    pub delphi_time: i32,
    /// Solenoid field in Tesla, derived from the magnet current.
    pub magnetic_field: f32,
    pub n_charged_tracks: i32,
    pub n_charged_tracks_t4: i32,
    pub n_neutral_tracks: i32,
    pub total_charged_energy: f32,
    pub total_em_neutral_energy: f32,
    pub total_had_neutral_energy: f32,
    pub hadron_tag_t4: bool,
}
