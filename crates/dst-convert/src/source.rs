//! The event-source collaborator interface.
//!
//! The production binding wraps the PHDST/ZEBRA Fortran runtime: the
//! framework reads a pilot record, decides whether to unpack the full
//! event, and exposes the identifiers and the bank arena through common
//! blocks. That binding lives outside this repository; everything the
//! conversion core consumes from it is captured by [`EventSource`], so the
//! synthetic realization in [`crate::synthetic`] can stand in for it in
//! tests.

use dst_zebra::Arena;
use thiserror::Error;

/// Errors the event source declares unrecoverable.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Reading the underlying input failed.
    #[error("I/O error reading event source: {0}")]
    Io(#[from] std::io::Error),

    /// The input could not be interpreted as event data.
    #[error("malformed event input: {0}")]
    Malformed(String),
}

/// Pull-based sequential event source.
///
/// The driver calls [`advance`](EventSource::advance) once per record;
/// every other method describes the record the source is currently
/// positioned on. All accessors are plain reads of the source's current
/// state and stay valid until the next `advance`.
pub trait EventSource {
    /// Position on the next record. Returns `false` at end of stream.
    fn advance(&mut self) -> Result<bool, SourceError>;

    /// Run number; negative values encode simulated (Monte-Carlo) data.
    fn run_number(&self) -> i32;

    /// File number within the run.
    fn file_number(&self) -> i32;

    /// Event number.
    fn event_number(&self) -> i32;

    /// Experiment number (1000 for DELPHI).
    fn experiment_number(&self) -> i32;

    /// LEP fill number.
    fn fill_number(&self) -> i32;

    /// Packed date, YYMMDD.
    fn date(&self) -> i32;

    /// Packed time, HHMMSS.
    fn time(&self) -> i32;

    /// Record type tag; only `"DST"` records are converted.
    fn record_type(&self) -> &str;

    /// Number of pilot words for this record; non-positive means no pilot.
    fn pilot_words(&self) -> i32;

    /// Top-of-structure link; non-positive means no data for this event.
    fn top_link(&self) -> i32;

    /// Starting offset of the named pilot record, by 4-character tag.
    fn pilot_record(&self, tag: &str) -> Option<i32>;

    /// Pilot word at 1-based `index`.
    fn pilot_word(&self, index: i32) -> i32;

    /// Magnetic field in Tesla and the momentum conversion parameter in
    /// GeV/c per cm.
    fn magnetic_field(&self) -> (f32, f32);

    /// Dataset version identifier, e.g. "94B2".
    fn processing_tag(&self) -> String;

    /// Shared access to the bank arena.
    fn arena(&self) -> &dyn Arena;

    /// Mutable access to the bank arena (structural fix-up only).
    fn arena_mut(&mut self) -> &mut dyn Arena;
}
