//! Synthetic event source.
//!
//! Builds ZEBRA bank structures in an in-memory arena from declarative
//! per-event descriptions and replays them through the [`EventSource`]
//! trait. This is the test double for the arena/source seam; the specs are
//! serde-deserializable so the binary can also replay event files written
//! in TOML.
//!
//! Cross-references inside a spec use source ordinals (position within the
//! `particles` / `vertices` lists); the builder turns them into bank
//! links. An ordinal pointing outside the list becomes a zero link.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::banks::{
    BANK_WORDS, NEXT_LINK, PARTICLE_CHARGE, PARTICLE_ENERGY, PARTICLE_MASS, PARTICLE_MOMENTUM,
    PARTICLE_TYPE, SIM_CHARGE, SIM_END_VERTEX_LINK, SIM_MASS, SIM_MOMENTUM, SIM_PDG,
    SIM_PROD_VERTEX_LINK, SIM_RECO_LINK, SIM_SIGNATURE_WORD, STATUS_DUMMY, STATUS_SECONDARY,
    STATUS_WORD, TOP_PARTICLE_CHAIN, TOP_SIM_CHAIN, TOP_VERTEX_CHAIN, VERTEX_CHI2, VERTEX_COV,
    VERTEX_FIRST_OUT_LINK, VERTEX_INCOMING_LINK, VERTEX_NDF, VERTEX_OUT_COUNT, VERTEX_POSITION,
};
use crate::source::{EventSource, SourceError};
use dst_zebra::{Arena, ZebraArena};

/// Declarative description of one reconstructed vertex.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VertexSpec {
    /// Placeholder record: present on the chain, no output row.
    pub dummy: bool,
    pub secondary: bool,
    pub chi2: f32,
    pub ndf: i32,
    pub position: [f32; 3],
    pub cov: [f32; 6],
    /// (first particle ordinal, count) of outgoing particles.
    pub outgoing: Option<(usize, usize)>,
    /// Particle ordinal of the incoming particle.
    pub incoming: Option<usize>,
}

impl Default for VertexSpec {
    fn default() -> Self {
        Self {
            dummy: false,
            secondary: false,
            chi2: 0.0,
            ndf: 0,
            position: [0.0; 3],
            cov: [0.0; 6],
            outgoing: None,
            incoming: None,
        }
    }
}

/// Declarative description of one reconstructed particle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSpec {
    pub dummy: bool,
    pub momentum: [f32; 3],
    pub energy: f32,
    pub mass: f32,
    pub charge: f32,
    pub type_code: i32,
}

impl Default for ParticleSpec {
    fn default() -> Self {
        Self {
            dummy: false,
            momentum: [0.0; 3],
            energy: 0.0,
            mass: 0.0,
            charge: 0.0,
            type_code: 0,
        }
    }
}

/// Declarative description of one simulated particle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParticleSpec {
    pub pdg: i32,
    pub charge: f32,
    pub mass: f32,
    pub momentum: [f32; 3],
    /// Vertex ordinal of the production vertex.
    pub production_vertex: Option<usize>,
    /// Vertex ordinal of the decay/end vertex.
    pub end_vertex: Option<usize>,
    /// Particle ordinal of the reconstructed match.
    pub reco_match: Option<usize>,
    /// Raw blocklet tag word (its low 7 bits are the repair signature).
    pub signature: i32,
}

impl Default for SimParticleSpec {
    fn default() -> Self {
        Self {
            pdg: 0,
            charge: 0.0,
            mass: 0.0,
            momentum: [0.0; 3],
            production_vertex: None,
            end_vertex: None,
            reco_match: None,
            signature: 0,
        }
    }
}

/// Declarative description of one event record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSpec {
    pub run: i32,
    pub file: i32,
    pub event: i32,
    pub experiment: i32,
    pub fill: i32,
    /// Packed date, YYMMDD.
    pub date: i32,
    /// Packed time, HHMMSS.
    pub time: i32,
    pub record_type: String,
    /// Override for the pilot word count (selection skips records with a
    /// non-positive count).
    pub pilot_words: Option<i32>,
    /// When false the record carries no top-level structure.
    pub has_top: bool,
    /// Magnetic field in Tesla.
    pub magnetic_field: f32,
    /// Center-of-mass energy in MeV stored in a DANA pilot record; absent
    /// means no DANA record.
    pub dana_energy_mev: Option<i32>,
    pub processing_tag: String,
    pub vertices: Vec<VertexSpec>,
    pub particles: Vec<ParticleSpec>,
    pub sim_particles: Vec<SimParticleSpec>,
}

impl Default for EventSpec {
    fn default() -> Self {
        Self {
            run: 1000,
            file: 1,
            event: 1,
            experiment: 1000,
            fill: 0,
            date: 940_512,
            time: 120_000,
            record_type: "DST".to_string(),
            pilot_words: None,
            has_top: true,
            magnetic_field: 1.2,
            dana_energy_mev: None,
            processing_tag: "94B2".to_string(),
            vertices: Vec::new(),
            particles: Vec::new(),
            sim_particles: Vec::new(),
        }
    }
}

struct CurrentEvent {
    spec: EventSpec,
    top: i32,
    pilot: Vec<i32>,
    dana_offset: Option<i32>,
}

/// Event source replaying declarative [`EventSpec`]s from a fresh arena
/// per event.
pub struct SyntheticSource {
    pending: VecDeque<EventSpec>,
    arena: ZebraArena,
    current: Option<CurrentEvent>,
}

impl SyntheticSource {
    pub fn new(events: Vec<EventSpec>) -> Self {
        Self {
            pending: events.into(),
            arena: ZebraArena::new(),
            current: None,
        }
    }

    fn build(&mut self, spec: EventSpec) {
        self.arena.clear();
        let arena = &mut self.arena;

        // Particles first: vertex and simulation banks link into them.
        let particle_links: Vec<i32> =
            spec.particles.iter().map(|_| arena.alloc(BANK_WORDS)).collect();
        for (i, particle) in spec.particles.iter().enumerate() {
            let link = particle_links[i];
            arena.set_lq(
                link + NEXT_LINK,
                particle_links.get(i + 1).copied().unwrap_or(0),
            );
            arena.set_iq(
                link + STATUS_WORD,
                if particle.dummy { STATUS_DUMMY } else { 0 },
            );
            for (k, &p) in particle.momentum.iter().enumerate() {
                arena.set_q(link + PARTICLE_MOMENTUM + k as i32, p);
            }
            arena.set_q(link + PARTICLE_ENERGY, particle.energy);
            arena.set_q(link + PARTICLE_MASS, particle.mass);
            arena.set_q(link + PARTICLE_CHARGE, particle.charge);
            arena.set_iq(link + PARTICLE_TYPE, particle.type_code);
        }

        let vertex_links: Vec<i32> =
            spec.vertices.iter().map(|_| arena.alloc(BANK_WORDS)).collect();
        for (i, vertex) in spec.vertices.iter().enumerate() {
            let link = vertex_links[i];
            arena.set_lq(
                link + NEXT_LINK,
                vertex_links.get(i + 1).copied().unwrap_or(0),
            );
            let mut status = 0;
            if vertex.dummy {
                status |= STATUS_DUMMY;
            }
            if vertex.secondary {
                status |= STATUS_SECONDARY;
            }
            arena.set_iq(link + STATUS_WORD, status);
            arena.set_iq(link + VERTEX_NDF, vertex.ndf);
            arena.set_q(link + VERTEX_CHI2, vertex.chi2);
            for (k, &x) in vertex.position.iter().enumerate() {
                arena.set_q(link + VERTEX_POSITION + k as i32, x);
            }
            for (k, &c) in vertex.cov.iter().enumerate() {
                arena.set_q(link + VERTEX_COV + k as i32, c);
            }
            if let Some((first, count)) = vertex.outgoing {
                arena.set_lq(
                    link + VERTEX_FIRST_OUT_LINK,
                    particle_links.get(first).copied().unwrap_or(0),
                );
                arena.set_iq(link + VERTEX_OUT_COUNT, count as i32);
            }
            if let Some(incoming) = vertex.incoming {
                arena.set_lq(
                    link + VERTEX_INCOMING_LINK,
                    particle_links.get(incoming).copied().unwrap_or(0),
                );
            }
        }

        let sim_links: Vec<i32> =
            spec.sim_particles.iter().map(|_| arena.alloc(BANK_WORDS)).collect();
        for (i, sim) in spec.sim_particles.iter().enumerate() {
            let link = sim_links[i];
            arena.set_lq(link + NEXT_LINK, sim_links.get(i + 1).copied().unwrap_or(0));
            arena.set_iq(link + SIM_PDG, sim.pdg);
            arena.set_q(link + SIM_CHARGE, sim.charge);
            arena.set_q(link + SIM_MASS, sim.mass);
            for (k, &p) in sim.momentum.iter().enumerate() {
                arena.set_q(link + SIM_MOMENTUM + k as i32, p);
            }
            arena.set_iq(link + SIM_SIGNATURE_WORD, sim.signature);
            if let Some(iv) = sim.production_vertex {
                arena.set_lq(
                    link + SIM_PROD_VERTEX_LINK,
                    vertex_links.get(iv).copied().unwrap_or(0),
                );
            }
            if let Some(iv) = sim.end_vertex {
                arena.set_lq(
                    link + SIM_END_VERTEX_LINK,
                    vertex_links.get(iv).copied().unwrap_or(0),
                );
            }
            if let Some(ip) = sim.reco_match {
                arena.set_lq(
                    link + SIM_RECO_LINK,
                    particle_links.get(ip).copied().unwrap_or(0),
                );
            }
        }

        let top = arena.alloc(BANK_WORDS);
        arena.set_lq(
            top + TOP_VERTEX_CHAIN,
            vertex_links.first().copied().unwrap_or(0),
        );
        arena.set_lq(
            top + TOP_PARTICLE_CHAIN,
            particle_links.first().copied().unwrap_or(0),
        );
        arena.set_lq(top + TOP_SIM_CHAIN, sim_links.first().copied().unwrap_or(0));

        let (pilot, dana_offset) = match spec.dana_energy_mev {
            Some(mev) => {
                let offset = 1;
                let mut pilot = vec![0; 20];
                pilot[(offset + 13 - 1) as usize] = mev;
                (pilot, Some(offset))
            }
            None => (vec![0; 4], None),
        };

        self.current = Some(CurrentEvent {
            top: if spec.has_top { top } else { 0 },
            pilot,
            dana_offset,
            spec,
        });
    }
}

impl EventSource for SyntheticSource {
    fn advance(&mut self) -> Result<bool, SourceError> {
        match self.pending.pop_front() {
            Some(spec) => {
                self.build(spec);
                Ok(true)
            }
            None => {
                self.current = None;
                Ok(false)
            }
        }
    }

    fn run_number(&self) -> i32 {
        self.current.as_ref().map_or(0, |c| c.spec.run)
    }

    fn file_number(&self) -> i32 {
        self.current.as_ref().map_or(0, |c| c.spec.file)
    }

    fn event_number(&self) -> i32 {
        self.current.as_ref().map_or(0, |c| c.spec.event)
    }

    fn experiment_number(&self) -> i32 {
        self.current.as_ref().map_or(0, |c| c.spec.experiment)
    }

    fn fill_number(&self) -> i32 {
        self.current.as_ref().map_or(0, |c| c.spec.fill)
    }

    fn date(&self) -> i32 {
        self.current.as_ref().map_or(0, |c| c.spec.date)
    }

    fn time(&self) -> i32 {
        self.current.as_ref().map_or(0, |c| c.spec.time)
    }

    fn record_type(&self) -> &str {
        self.current.as_ref().map_or("", |c| c.spec.record_type.as_str())
    }

    fn pilot_words(&self) -> i32 {
        self.current.as_ref().map_or(0, |c| {
            c.spec.pilot_words.unwrap_or(c.pilot.len() as i32)
        })
    }

    fn top_link(&self) -> i32 {
        self.current.as_ref().map_or(0, |c| c.top)
    }

    fn pilot_record(&self, tag: &str) -> Option<i32> {
        match tag {
            "DANA" => self.current.as_ref().and_then(|c| c.dana_offset),
            _ => None,
        }
    }

    fn pilot_word(&self, index: i32) -> i32 {
        let Some(current) = self.current.as_ref() else {
            return 0;
        };
        usize::try_from(index - 1)
            .ok()
            .and_then(|i| current.pilot.get(i))
            .copied()
            .unwrap_or(0)
    }

    fn magnetic_field(&self) -> (f32, f32) {
        let b = self.current.as_ref().map_or(0.0, |c| c.spec.magnetic_field);
        // Momentum conversion parameter: 0.3 GeV/c per T·m, in cm.
        (b, b * 0.003 / 10.0)
    }

    fn processing_tag(&self) -> String {
        self.current
            .as_ref()
            .map_or(String::new(), |c| c.spec.processing_tag.clone())
    }

    fn arena(&self) -> &dyn Arena {
        &self.arena
    }

    fn arena_mut(&mut self) -> &mut dyn Arena {
        &mut self.arena
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_linked_chains() {
        let mut source = SyntheticSource::new(vec![EventSpec {
            particles: vec![ParticleSpec::default(), ParticleSpec::default()],
            vertices: vec![VertexSpec {
                chi2: 2.0,
                ndf: 1,
                ..VertexSpec::default()
            }],
            ..EventSpec::default()
        }]);
        assert!(source.advance().unwrap());

        let top = source.top_link();
        assert!(top > 0);
        let arena = source.arena();
        let first_particle = arena.lq(top + TOP_PARTICLE_CHAIN);
        assert!(first_particle > 0);
        let second_particle = arena.lq(first_particle + NEXT_LINK);
        assert!(second_particle > 0);
        assert_eq!(arena.lq(second_particle + NEXT_LINK), 0);

        let first_vertex = arena.lq(top + TOP_VERTEX_CHAIN);
        assert_eq!(arena.q(first_vertex + VERTEX_CHI2), 2.0);
        assert_eq!(arena.iq(first_vertex + VERTEX_NDF), 1);
        assert_eq!(arena.lq(top + TOP_SIM_CHAIN), 0);

        assert!(!source.advance().unwrap());
        assert_eq!(source.top_link(), 0);
    }

    #[test]
    fn dana_record_exposes_energy() {
        let mut source = SyntheticSource::new(vec![EventSpec {
            dana_energy_mev: Some(91_250),
            ..EventSpec::default()
        }]);
        assert!(source.advance().unwrap());
        let idana = source.pilot_record("DANA").unwrap();
        assert_eq!(source.pilot_word(idana + 13), 91_250);
        assert_eq!(source.pilot_record("XXXX"), None);
    }

    #[test]
    fn specs_deserialize_from_toml() {
        let spec: EventSpec = toml::from_str(
            r#"
            run = -1234
            file = 2
            event = 5
            dana_energy_mev = 91250

            [[vertices]]
            chi2 = 2.0
            ndf = 1
            outgoing = [0, 1]

            [[particles]]
            energy = 45.6
            "#,
        )
        .unwrap();
        assert_eq!(spec.run, -1234);
        assert_eq!(spec.vertices[0].outgoing, Some((0, 1)));
        assert_eq!(spec.particles[0].energy, 45.6);
    }
}
