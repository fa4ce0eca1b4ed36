//! Access layer for ZEBRA dynamic-memory banks.
//!
//! DELPHI DST records live in a flat memory arena owned by the legacy
//! Fortran runtime. Banks are reached through integer links and reference
//! each other through further links; the runtime may compact or relocate
//! the arena between operations, so raw links must never be cached across
//! calls that can trigger a reallocation.
//!
//! This crate provides the two building blocks the conversion layer is
//! built on:
//!
//! - [`Arena`]: cell-level read/write access to the word store with the
//!   foreign layout's 1-based link/integer/float views, plus
//!   [`ZebraArena`], an in-memory realization used by tests and the
//!   synthetic event source.
//! - [`ZebraRegistry`] / [`ZebraPtr`]: a deduplicating, bounded registry of
//!   live link values. Handles are small index newtypes carrying an epoch;
//!   the registry is reset once per event, and a handle that outlives its
//!   epoch fails loudly on resolution instead of reading stale memory.

pub mod arena;
pub mod error;
pub mod registry;

pub use arena::{Arena, ZebraArena, IQ_BIAS};
pub use error::ZebraError;
pub use registry::{ZebraPtr, ZebraRegistry, REGISTRY_CAPACITY};
