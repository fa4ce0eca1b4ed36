//! Conversion core: DELPHI DST records to columnar EDM4hep-style frames.
//!
//! The pipeline is a linear, single-pass event loop driven by an external
//! event source:
//!
//! ```text
//! EventSource ──▶ structural fix-up ──▶ traversal & extraction ──▶ frames ──▶ FrameSink
//!                                        (ZebraRegistry over Arena)
//! ```
//!
//! [`run_analysis`] is the fixed driver loop; [`DstConverter`] implements
//! the [`Analysis`] hooks with the run/event state machine: (run, file)
//! boundary detection, run summaries, per-event collection assembly with
//! handle side maps for cross-references, and the mandatory registry reset
//! at every event boundary.
//!
//! Everything external stays behind traits: the event source
//! ([`EventSource`]), the serialization sink ([`FrameSink`]) and the
//! native secondary-interaction correction routine
//! ([`fixup::StructuralFix`]). [`SyntheticSource`] is the in-repo source
//! realization used by tests and for replaying declarative event files.

pub mod banks;
pub mod convert;
pub mod error;
pub mod fixup;
pub mod prob;
pub mod sink;
pub mod source;
pub mod synthetic;

pub use convert::{run_analysis, Analysis, ConverterConfig, DstConverter, LoopStats, Selection};
pub use error::ConvertError;
pub use sink::{FrameSink, JsonLinesSink, RecordingSink};
pub use source::{EventSource, SourceError};
pub use synthetic::{EventSpec, ParticleSpec, SimParticleSpec, SyntheticSource, VertexSpec};
