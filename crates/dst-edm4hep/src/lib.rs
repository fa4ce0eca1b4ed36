//! Columnar output model for the DELPHI → EDM4hep conversion.
//!
//! The production data model is generated by podio from a schema
//! definition; this crate is the plain-Rust realization the conversion
//! core appends into: component types, record types, append-only
//! collections and the [`Frame`] records handed to the serialization sink.
//!
//! Collections are index-addressable and append-only; cross-references
//! between records are stored as indices into the sibling collection of
//! the same frame (a vertex's associated particle, an MC particle's
//! reconstructed match), assigned by the conversion driver through its
//! handle side maps.

pub mod collections;
pub mod components;
pub mod event;
pub mod frame;
pub mod mc;
pub mod reco;
pub mod run;

pub use collections::Collection;
pub use components::{TimeStamp, Vector3f};
pub use event::{DelphiEventHeader, EventHeader};
pub use frame::{EventFrame, Frame, ParamValue, RunFrame};
pub use mc::{McParticle, McRecoAssociation};
pub use reco::{ReconstructedParticle, Vertex};
pub use run::RunHeader;

/// Standard EDM4hep event header collection.
pub type EventHeaderCollection = Collection<EventHeader>;
/// DELPHI-specific event header collection.
pub type DelphiEventHeaderCollection = Collection<DelphiEventHeader>;
/// Run header collection.
pub type RunHeaderCollection = Collection<RunHeader>;
/// Reconstructed vertex collection.
pub type VertexCollection = Collection<Vertex>;
/// Reconstructed particle collection.
pub type ReconstructedParticleCollection = Collection<ReconstructedParticle>;
/// Simulated (Monte-Carlo) particle collection.
pub type McParticleCollection = Collection<McParticle>;
/// MC-to-reconstructed association collection.
pub type McRecoAssociationCollection = Collection<McRecoAssociation>;
