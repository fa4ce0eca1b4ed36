//! Frame records handed to the serialization sink.
//!
//! A frame is one self-contained structured record grouping named
//! collections, written under one of exactly two categories: "events" for
//! per-event content, "runs" for run summaries. The driver fully
//! assembles a frame before the sink sees it; no partial or interleaved
//! writes exist.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    DelphiEventHeaderCollection, EventHeaderCollection, McParticleCollection,
    McRecoAssociationCollection, ReconstructedParticleCollection, RunHeaderCollection,
    VertexCollection,
};

/// Named scalar parameter attached to a frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i32),
    Float(f32),
}

/// Per-event frame.
///
/// The simulated-particle collections exist only for Monte-Carlo data
/// (negative run number); for real data they are absent from the frame
/// entirely, not merely empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventFrame {
    #[serde(rename = "EventHeader")]
    pub event_header: EventHeaderCollection,
    #[serde(rename = "DelphiEventHeader")]
    pub delphi_event_header: DelphiEventHeaderCollection,
    #[serde(rename = "Vertices")]
    pub vertices: VertexCollection,
    #[serde(rename = "ReconstructedParticles")]
    pub particles: ReconstructedParticleCollection,
    #[serde(
        rename = "SimulatedParticles",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sim_particles: Option<McParticleCollection>,
    #[serde(
        rename = "RecoSimParticleAssociations",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sim_reco_associations: Option<McRecoAssociationCollection>,
    /// Named frame parameters (FILE_NUMBER, EBEAM, BMAG).
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
}

/// Per-run frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunFrame {
    #[serde(rename = "RunHeader")]
    pub run_header: RunHeaderCollection,
}

/// A complete record for the sink, tagged with its category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "category")]
pub enum Frame {
    #[serde(rename = "events")]
    Event(EventFrame),
    #[serde(rename = "runs")]
    Run(RunFrame),
}

impl Frame {
    /// Category name the sink files this frame under.
    pub fn category(&self) -> &'static str {
        match self {
            Frame::Event(_) => "events",
            Frame::Run(_) => "runs",
        }
    }
}
