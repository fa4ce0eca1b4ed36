//! Error type for arena and registry operations.

use thiserror::Error;

/// Convenience alias for results using [`ZebraError`].
pub type Result<T> = std::result::Result<T, ZebraError>;

/// Errors raised by the link registry.
///
/// `RegistryFull` is in the fatal class: it indicates a traversal bug or a
/// runaway bank chain, not a recoverable data condition. The two pointer
/// variants are programming errors surfaced loudly instead of reading
/// stale arena memory.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZebraError {
    /// All registry slots are occupied.
    ///
    /// The capacity matches the foreign registry size and is far above
    /// anything a well-formed event produces. Hitting it means a chain
    /// never terminated or [`reset`](crate::ZebraRegistry::reset) was not
    /// called at the event boundary.
    #[error("link registry full ({capacity} slots): runaway bank chain or missing reset")]
    RegistryFull {
        /// Slot capacity of the registry that overflowed.
        capacity: usize,
    },

    /// A default-constructed (invalid) handle was dereferenced.
    #[error("invalid Zebra pointer dereferenced")]
    InvalidPointer,

    /// A handle from a previous epoch was dereferenced after a reset.
    #[error("stale Zebra pointer from epoch {held} dereferenced in epoch {current}")]
    StalePointer {
        /// Epoch the handle was created in.
        held: u32,
        /// Epoch the registry is currently in.
        current: u32,
    },
}
