//! Reconstructed vertex and particle records.

use serde::{Deserialize, Serialize};

use crate::components::Vector3f;

/// Reconstructed decay/interaction vertex.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Vertex {
    /// True for the primary interaction vertex.
    pub primary: bool,
    pub chi2: f32,
    /// Chi-square survival probability for `ndf` degrees of freedom.
    pub probability: f32,
    pub ndf: i32,
    pub position: Vector3f,
    /// Lower triangle of the symmetric 3x3 position covariance.
    pub cov_matrix: [f32; 6],
    /// Index of the incoming particle in the frame's particle collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_particle: Option<u32>,
}

/// Reconstructed particle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReconstructedParticle {
    /// Momentum in GeV/c.
    pub momentum: Vector3f,
    /// Energy in GeV.
    pub energy: f32,
    /// Mass in GeV/c^2.
    pub mass: f32,
    pub charge: f32,
    /// DELPHI particle type code.
    pub type_code: i32,
    /// Index of the production vertex in the frame's vertex collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_vertex: Option<u32>,
}
