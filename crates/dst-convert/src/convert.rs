//! Event/run conversion state machine.
//!
//! The host framework drives the conversion through four explicit hooks
//! (init, select, event, finalize) invoked by the fixed loop in
//! [`run_analysis`]. [`DstConverter`] implements them with the run/event
//! lifecycle:
//!
//! ```text
//! Idle ──first event──▶ RunOpen ──event──▶ EventInFlight ─┐
//!   ▲                      ▲ │(run,file) boundary:        │
//!   │                      └─┤ close run, open next   ◀───┘
//!   └──────end of stream: close final run
//! ```
//!
//! Per event: structural fix-up (optional) → fresh collections → header →
//! reconstructed particles → vertices → simulated content (Monte-Carlo
//! only) → frame to the sink → registry reset. The reset happens exactly
//! once per event, after the sink call, so no handle can outlive the data
//! it names.
//!
//! The converter is deliberately non-reentrant and single-threaded: one
//! driver instance owns one registry and one sink, and processes one event
//! at a time, matching the host framework's strictly sequential contract.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, info, trace, warn};

use crate::banks::{
    NEXT_LINK, PARTICLE_CHARGE, PARTICLE_ENERGY, PARTICLE_MASS, PARTICLE_MOMENTUM, PARTICLE_TYPE,
    SIM_CHARGE, SIM_END_VERTEX_LINK, SIM_MASS, SIM_MOMENTUM, SIM_PDG, SIM_PROD_VERTEX_LINK,
    SIM_RECO_LINK, STATUS_DUMMY, STATUS_SECONDARY, STATUS_WORD, TOP_PARTICLE_CHAIN, TOP_SIM_CHAIN,
    TOP_VERTEX_CHAIN, VERTEX_CHI2, VERTEX_COV, VERTEX_FIRST_OUT_LINK, VERTEX_INCOMING_LINK,
    VERTEX_NDF, VERTEX_OUT_COUNT, VERTEX_POSITION,
};
use crate::error::ConvertError;
use crate::fixup::{repair_secondary_interactions, NoopFix, StructuralFix};
use crate::prob::chi_squared_prob;
use crate::sink::FrameSink;
use crate::source::EventSource;
use dst_edm4hep::{
    DelphiEventHeader, EventFrame, EventHeader, Frame, McParticle, McParticleCollection,
    McRecoAssociation, McRecoAssociationCollection, ParamValue, ReconstructedParticle, RunFrame,
    RunHeader, TimeStamp, Vector3f, Vertex,
};
use dst_zebra::{ZebraPtr, ZebraRegistry};

/// Center-of-mass energy assumed when no DANA pilot record exists (the Z
/// boson mass region LEP1 ran at), in GeV.
pub const DEFAULT_CM_ENERGY_GEV: f32 = 91.250;

/// Tolerance for the per-event center-of-mass consistency check, in GeV.
pub const CM_TOLERANCE_GEV: f32 = 0.005;

/// Word offset of the energy (in MeV) within the DANA pilot record.
const DANA_ENERGY_WORD: i32 = 13;

/// Outcome of the selection hook for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Convert this record.
    Process,
    /// Skip this record, keep reading.
    Skip,
    /// Stop the loop (event limit reached).
    Stop,
}

/// The four transition hooks invoked by the fixed driver loop.
pub trait Analysis {
    /// Called once before the first record.
    fn on_init(&mut self, source: &mut dyn EventSource) -> Result<(), ConvertError>;

    /// Called per record, on the pilot information only.
    fn on_select(&mut self, source: &dyn EventSource) -> Selection;

    /// Called for each selected record.
    fn on_event(&mut self, source: &mut dyn EventSource) -> Result<(), ConvertError>;

    /// Called once after the last record.
    fn on_finalize(&mut self, source: &mut dyn EventSource) -> Result<(), ConvertError>;
}

/// Counters reported by [`run_analysis`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopStats {
    /// Records the source delivered.
    pub records_seen: u64,
    /// Records that passed selection.
    pub records_selected: u64,
}

/// The fixed driver loop: pull records from the source and feed them
/// through the analysis hooks until end of stream or a stop request.
pub fn run_analysis(
    source: &mut dyn EventSource,
    analysis: &mut dyn Analysis,
) -> Result<LoopStats, ConvertError> {
    analysis.on_init(source)?;
    let mut stats = LoopStats::default();
    loop {
        if !source.advance()? {
            break;
        }
        stats.records_seen += 1;
        match analysis.on_select(source) {
            Selection::Stop => {
                debug!(records = stats.records_seen, "selection requested stop");
                break;
            }
            Selection::Skip => continue,
            Selection::Process => {
                stats.records_selected += 1;
                analysis.on_event(source)?;
            }
        }
    }
    analysis.on_finalize(source)?;
    Ok(stats)
}

/// Converter configuration.
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Stop after this many converted events; 0 means unlimited.
    pub max_events: u64,
    /// Run the secondary-hadronic-interaction repair pass per event.
    pub fix_secondary_hadronic_interactions: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            max_events: 0,
            fix_secondary_hadronic_interactions: true,
        }
    }
}

/// Accumulation state for the currently open (run, file) pair.
#[derive(Debug)]
struct RunState {
    run: i32,
    file: i32,
    experiment: i32,
    fill: i32,
    event_count: u32,
    /// First observed center-of-mass energy; kept for the whole run even
    /// if later events drift.
    cm_energy: f32,
    processing_tag: String,
}

/// The DELPHI DST → EDM4hep converter.
pub struct DstConverter {
    config: ConverterConfig,
    sink: Box<dyn FrameSink>,
    fix: Box<dyn StructuralFix>,
    registry: ZebraRegistry,
    run: Option<RunState>,
    magnetic_field: f32,
    events_converted: u64,
}

impl DstConverter {
    /// Converter writing to `sink`, with no native correction routine
    /// bound (the fix-up pass walks but repairs nothing).
    pub fn new(config: ConverterConfig, sink: Box<dyn FrameSink>) -> Self {
        Self {
            config,
            sink,
            fix: Box::new(NoopFix),
            registry: ZebraRegistry::new(),
            run: None,
            magnetic_field: 0.0,
            events_converted: 0,
        }
    }

    /// Bind the native correction routine for the fix-up pass.
    pub fn with_fix_routine(mut self, fix: Box<dyn StructuralFix>) -> Self {
        self.fix = fix;
        self
    }

    /// Number of events written to the sink so far.
    pub fn events_converted(&self) -> u64 {
        self.events_converted
    }

    fn is_mc(run_number: i32) -> bool {
        run_number < 0
    }

    /// Center-of-mass energy for the current record: the DANA pilot record
    /// stores it in MeV; without one the LEP1 default applies.
    fn read_center_of_mass(source: &dyn EventSource) -> f32 {
        match source.pilot_record("DANA") {
            Some(idana) => {
                let mev = source.pilot_word(idana + DANA_ENERGY_WORD);
                mev as f32 / 1000.0
            }
            None => {
                debug!(
                    default = DEFAULT_CM_ENERGY_GEV,
                    "no DANA pilot record, using default center-of-mass energy"
                );
                DEFAULT_CM_ENERGY_GEV
            }
        }
    }

    /// Close the previous run and/or open a new one when the (run, file)
    /// pair changes; otherwise account this event to the open run.
    fn update_run_boundary(&mut self, source: &dyn EventSource) -> Result<(), ConvertError> {
        let run = source.run_number();
        let file = source.file_number();
        let same_pair = matches!(&self.run, Some(s) if s.run == run && s.file == file);

        if same_pair {
            let ecm = Self::read_center_of_mass(source);
            if let Some(state) = self.run.as_mut() {
                state.event_count += 1;
                if (state.cm_energy - ecm).abs() > CM_TOLERANCE_GEV {
                    warn!(
                        run,
                        first = state.cm_energy,
                        current = ecm,
                        "center-of-mass energy drifted within run, keeping first value"
                    );
                }
            }
            return Ok(());
        }

        if let Some(previous) = self.run.take() {
            self.write_run_summary(&previous)?;
        }
        let cm_energy = Self::read_center_of_mass(source);
        info!(run, file, cm_energy, "starting run");
        self.run = Some(RunState {
            run,
            file,
            experiment: source.experiment_number(),
            fill: source.fill_number(),
            event_count: 1,
            cm_energy,
            processing_tag: source.processing_tag(),
        });
        Ok(())
    }

    fn write_run_summary(&mut self, state: &RunState) -> Result<(), ConvertError> {
        debug!(
            run = state.run,
            file = state.file,
            events = state.event_count,
            "writing run summary"
        );
        let mut frame = RunFrame::default();
        frame.run_header.push(RunHeader {
            experiment_number: state.experiment,
            run_number: state.run,
            file_number: state.file,
            fill_number: state.fill,
            event_count: state.event_count,
            center_of_mass_energy: state.cm_energy,
            processing_tag: state.processing_tag.clone(),
        });
        self.sink
            .write_frame(&Frame::Run(frame))
            .map_err(ConvertError::Sink)
    }

    fn fill_event_headers(&self, frame: &mut EventFrame, source: &dyn EventSource) {
        let date = source.date();
        let time = source.time();
        let nanos = delphi_timestamp_nanos(date, time).unwrap_or_else(|| {
            warn!(date, time, "unrepresentable DELPHI date/time, timestamp zeroed");
            0
        });

        frame.delphi_event_header.push(DelphiEventHeader {
            event_number: source.event_number(),
            run_number: source.run_number(),
            file_number: source.file_number(),
            time_stamp: TimeStamp {
                unix_time: (nanos / 1_000_000_000).max(0) as u64,
            },
            delphi_date: date,
            delphi_time: time,
            magnetic_field: self.magnetic_field,
            ..DelphiEventHeader::default()
        });

        frame.event_header.push(EventHeader {
            event_number: source.event_number(),
            run_number: source.run_number(),
            time_stamp: nanos,
            weight: 1.0,
        });

        let cm_energy = self
            .run
            .as_ref()
            .map(|s| s.cm_energy)
            .unwrap_or(DEFAULT_CM_ENERGY_GEV);
        frame
            .parameters
            .insert("FILE_NUMBER".into(), ParamValue::Int(source.file_number()));
        frame
            .parameters
            .insert("EBEAM".into(), ParamValue::Float(cm_energy / 2.0));
        frame
            .parameters
            .insert("BMAG".into(), ParamValue::Float(self.magnetic_field));
    }

    /// Fill the reconstructed-particle collection, recording the handle →
    /// output-index side map the cross-reference resolution relies on.
    fn fill_particles(
        &mut self,
        frame: &mut EventFrame,
        source: &dyn EventSource,
        top: ZebraPtr,
    ) -> Result<HashMap<ZebraPtr, u32>, ConvertError> {
        let arena = source.arena();
        let mut index = HashMap::new();
        let mut ptr = self.registry.child_at(arena, top, TOP_PARTICLE_CHAIN)?;
        while self.registry.is_valid(ptr) {
            let status = self.registry.int_at(arena, ptr, STATUS_WORD)?;
            if status & STATUS_DUMMY != 0 {
                trace!("skipping dummy particle record");
                ptr = self.registry.child_at(arena, ptr, NEXT_LINK)?;
                continue;
            }
            let particle = ReconstructedParticle {
                momentum: Vector3f::new(
                    self.registry.float_at(arena, ptr, PARTICLE_MOMENTUM)?,
                    self.registry.float_at(arena, ptr, PARTICLE_MOMENTUM + 1)?,
                    self.registry.float_at(arena, ptr, PARTICLE_MOMENTUM + 2)?,
                ),
                energy: self.registry.float_at(arena, ptr, PARTICLE_ENERGY)?,
                mass: self.registry.float_at(arena, ptr, PARTICLE_MASS)?,
                charge: self.registry.float_at(arena, ptr, PARTICLE_CHARGE)?,
                type_code: self.registry.int_at(arena, ptr, PARTICLE_TYPE)?,
                start_vertex: None,
            };
            let at = frame.particles.push(particle);
            index.insert(ptr, at);
            ptr = self.registry.child_at(arena, ptr, NEXT_LINK)?;
        }
        Ok(index)
    }

    /// Fill the vertex collection and resolve vertex ↔ particle
    /// references through the particle side map.
    fn fill_vertices(
        &mut self,
        frame: &mut EventFrame,
        source: &dyn EventSource,
        top: ZebraPtr,
        particle_index: &HashMap<ZebraPtr, u32>,
    ) -> Result<HashMap<ZebraPtr, u32>, ConvertError> {
        let arena = source.arena();
        let mut index = HashMap::new();
        let mut ptr = self.registry.child_at(arena, top, TOP_VERTEX_CHAIN)?;
        while self.registry.is_valid(ptr) {
            let status = self.registry.int_at(arena, ptr, STATUS_WORD)?;
            trace!(status, "vertex record");
            if status & STATUS_DUMMY != 0 {
                trace!("skipping dummy vertex record");
                ptr = self.registry.child_at(arena, ptr, NEXT_LINK)?;
                continue;
            }

            let chi2 = self.registry.float_at(arena, ptr, VERTEX_CHI2)?;
            let ndf = self.registry.int_at(arena, ptr, VERTEX_NDF)?;
            let mut cov = [0.0f32; 6];
            for (i, c) in cov.iter_mut().enumerate() {
                *c = self.registry.float_at(arena, ptr, VERTEX_COV + i as i32)?;
            }
            let vertex = Vertex {
                primary: status & STATUS_SECONDARY == 0,
                chi2,
                probability: chi_squared_prob(chi2, ndf),
                ndf,
                position: Vector3f::new(
                    self.registry.float_at(arena, ptr, VERTEX_POSITION)?,
                    self.registry.float_at(arena, ptr, VERTEX_POSITION + 1)?,
                    self.registry.float_at(arena, ptr, VERTEX_POSITION + 2)?,
                ),
                cov_matrix: cov,
                associated_particle: None,
            };
            let at = frame.vertices.push(vertex);
            index.insert(ptr, at);

            // Outgoing particles: `count` consecutive records on the
            // particle chain, each resolved through the side map.
            let count = self.registry.int_at(arena, ptr, VERTEX_OUT_COUNT)?;
            let mut out = self.registry.child_at(arena, ptr, VERTEX_FIRST_OUT_LINK)?;
            for _ in 0..count {
                if !self.registry.is_valid(out) {
                    warn!(vertex = at, count, "outgoing particle chain shorter than count");
                    break;
                }
                match particle_index.get(&out) {
                    Some(&ip) => {
                        if let Some(p) = frame.particles.get_mut(ip) {
                            p.start_vertex = Some(at);
                        }
                    }
                    None => warn!(
                        vertex = at,
                        "outgoing particle has no output row, dropping reference"
                    ),
                }
                out = self.registry.child_at(arena, out, NEXT_LINK)?;
            }

            // Incoming particle.
            let incoming = self.registry.child_at(arena, ptr, VERTEX_INCOMING_LINK)?;
            if self.registry.is_valid(incoming) {
                match particle_index.get(&incoming) {
                    Some(&ip) => {
                        if let Some(v) = frame.vertices.get_mut(at) {
                            v.associated_particle = Some(ip);
                        }
                    }
                    None => warn!(
                        vertex = at,
                        "incoming particle has no output row, dropping reference"
                    ),
                }
            }

            ptr = self.registry.child_at(arena, ptr, NEXT_LINK)?;
        }
        trace!(vertices = frame.vertices.len(), "vertex chain done");
        Ok(index)
    }

    /// Fill the simulated-particle collections; Monte-Carlo data only.
    fn fill_simulation(
        &mut self,
        frame: &mut EventFrame,
        source: &dyn EventSource,
        top: ZebraPtr,
        particle_index: &HashMap<ZebraPtr, u32>,
        vertex_index: &HashMap<ZebraPtr, u32>,
    ) -> Result<(), ConvertError> {
        let arena = source.arena();
        let mut sim = McParticleCollection::new();
        let mut associations = McRecoAssociationCollection::new();

        let mut ptr = self.registry.child_at(arena, top, TOP_SIM_CHAIN)?;
        while self.registry.is_valid(ptr) {
            let mut particle = McParticle {
                pdg: self.registry.int_at(arena, ptr, SIM_PDG)?,
                charge: self.registry.float_at(arena, ptr, SIM_CHARGE)?,
                mass: self.registry.float_at(arena, ptr, SIM_MASS)?,
                momentum: Vector3f::new(
                    self.registry.float_at(arena, ptr, SIM_MOMENTUM)?,
                    self.registry.float_at(arena, ptr, SIM_MOMENTUM + 1)?,
                    self.registry.float_at(arena, ptr, SIM_MOMENTUM + 2)?,
                ),
                vertex: None,
                endpoint: None,
            };

            let production = self.registry.child_at(arena, ptr, SIM_PROD_VERTEX_LINK)?;
            if self.registry.is_valid(production) {
                particle.vertex = vertex_index
                    .get(&production)
                    .and_then(|&iv| frame.vertices.get(iv))
                    .map(|v| v.position);
            }
            let end = self.registry.child_at(arena, ptr, SIM_END_VERTEX_LINK)?;
            if self.registry.is_valid(end) {
                particle.endpoint = vertex_index
                    .get(&end)
                    .and_then(|&iv| frame.vertices.get(iv))
                    .map(|v| v.position);
            }

            let isim = sim.push(particle);

            let reco = self.registry.child_at(arena, ptr, SIM_RECO_LINK)?;
            if self.registry.is_valid(reco) {
                match particle_index.get(&reco) {
                    Some(&ip) => {
                        associations.push(McRecoAssociation { sim: isim, rec: ip });
                    }
                    None => warn!(
                        sim = isim,
                        "matched reconstructed particle has no output row, dropping association"
                    ),
                }
            }

            ptr = self.registry.child_at(arena, ptr, NEXT_LINK)?;
        }

        frame.sim_particles = Some(sim);
        frame.sim_reco_associations = Some(associations);
        Ok(())
    }

    fn build_event_frame(
        &mut self,
        source: &dyn EventSource,
    ) -> Result<EventFrame, ConvertError> {
        let top = self.registry.create(source.top_link())?;
        let mut frame = EventFrame::default();
        self.fill_event_headers(&mut frame, source);
        let particle_index = self.fill_particles(&mut frame, source, top)?;
        let vertex_index = self.fill_vertices(&mut frame, source, top, &particle_index)?;
        if Self::is_mc(source.run_number()) {
            self.fill_simulation(&mut frame, source, top, &particle_index, &vertex_index)?;
        }
        Ok(frame)
    }
}

impl Analysis for DstConverter {
    fn on_init(&mut self, _source: &mut dyn EventSource) -> Result<(), ConvertError> {
        info!(
            max_events = self.config.max_events,
            fix_secondary_hadronic_interactions =
                self.config.fix_secondary_hadronic_interactions,
            "conversion initialized"
        );
        Ok(())
    }

    fn on_select(&mut self, source: &dyn EventSource) -> Selection {
        if self.config.max_events > 0 && self.events_converted >= self.config.max_events {
            return Selection::Stop;
        }
        if source.pilot_words() <= 0 || source.record_type() != "DST" {
            trace!(
                record_type = source.record_type(),
                pilot_words = source.pilot_words(),
                "skipping non-DST record"
            );
            return Selection::Skip;
        }
        Selection::Process
    }

    fn on_event(&mut self, source: &mut dyn EventSource) -> Result<(), ConvertError> {
        let run = source.run_number();
        let file = source.file_number();
        let event = source.event_number();
        let top = source.top_link();
        if top <= 0 {
            warn!(run, file, event, top, "missing top-level structure, skipping event");
            return Ok(());
        }
        debug!(run, file, event, "converting event");

        self.update_run_boundary(source)?;
        self.magnetic_field = source.magnetic_field().0;

        // Structural repair must precede handle creation: it can
        // invalidate link values the extraction would otherwise cache.
        if self.config.fix_secondary_hadronic_interactions {
            let head = source.arena().lq(top + TOP_SIM_CHAIN);
            if head > 0 {
                repair_secondary_interactions(source.arena_mut(), self.fix.as_mut(), head);
            }
        }

        let frame = self.build_event_frame(source)?;
        self.sink
            .write_frame(&Frame::Event(frame))
            .map_err(ConvertError::Sink)?;
        self.events_converted += 1;

        // Handles are only valid within the event that created them.
        self.registry.reset();
        Ok(())
    }

    fn on_finalize(&mut self, _source: &mut dyn EventSource) -> Result<(), ConvertError> {
        if let Some(state) = self.run.take() {
            self.write_run_summary(&state)?;
        }
        self.sink.finish().map_err(ConvertError::Sink)?;
        info!(events = self.events_converted, "conversion finished");
        Ok(())
    }
}

/// Convert DELPHI packed date (YYMMDD) and time (HHMMSS) to nanoseconds
/// since the Unix epoch, UTC. Two-digit years below 50 belong to 20xx,
/// the rest to 19xx (LEP ran 1989–2000).
fn delphi_timestamp_nanos(date: i32, time: i32) -> Option<i64> {
    let yy = date / 10_000;
    let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
    let month = u32::try_from((date / 100) % 100).ok()?;
    let day = u32::try_from(date % 100).ok()?;
    let hour = u32::try_from(time / 10_000).ok()?;
    let minute = u32::try_from((time / 100) % 100).ok()?;
    let second = u32::try_from(time % 100).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(hour, minute, second)?
        .and_utc()
        .timestamp_nanos_opt()
}
