//! Conversion error type.
//!
//! Only the fatal class ever crosses the driver boundary: registry
//! exhaustion, sink I/O failures, and source errors the source itself
//! declares unrecoverable. Everything recoverable (missing top structure,
//! drifting constants, fix-up failures) is logged and handled locally.

use thiserror::Error;

use crate::source::SourceError;
use dst_zebra::ZebraError;

/// Fatal conversion errors; any of these aborts the whole run.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Registry exhaustion or a stale/invalid handle dereference.
    #[error("zebra registry error: {0}")]
    Registry(#[from] ZebraError),

    /// The output sink failed.
    #[error("output sink error: {0}")]
    Sink(#[source] std::io::Error),

    /// The event source reported an unrecoverable error.
    #[error("event source error: {0}")]
    Source(#[from] SourceError),
}
