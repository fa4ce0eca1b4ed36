//! Simulated-particle records, present only for Monte-Carlo data.

use serde::{Deserialize, Serialize};

use crate::components::Vector3f;

/// Simulated (generator-level) particle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct McParticle {
    /// PDG particle code.
    pub pdg: i32,
    pub charge: f32,
    /// Mass in GeV/c^2.
    pub mass: f32,
    /// Momentum in GeV/c.
    pub momentum: Vector3f,
    /// Production point, when the simulation recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex: Option<Vector3f>,
    /// Decay/interaction endpoint, when the simulation recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Vector3f>,
}

/// Association between a simulated particle and its reconstructed match.
///
/// Both sides are indices into the collections of the same frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct McRecoAssociation {
    /// Index into the frame's simulated-particle collection.
    pub sim: u32,
    /// Index into the frame's reconstructed-particle collection.
    pub rec: u32,
}
