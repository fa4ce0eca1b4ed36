//! End-to-end conversion tests over the synthetic source.

use std::sync::{Arc, Mutex};

use dst_convert::fixup::{FixOutcome, StructuralFix, SHI_SIGNATURE};
use dst_convert::{
    run_analysis, ConverterConfig, DstConverter, EventSpec, ParticleSpec, RecordingSink,
    SimParticleSpec, SyntheticSource, VertexSpec,
};
use dst_edm4hep::{EventFrame, Frame, ParamValue, RunHeader, Vector3f};
use dst_zebra::Arena;

fn convert(specs: Vec<EventSpec>, config: ConverterConfig) -> Vec<Frame> {
    let sink = RecordingSink::new();
    let mut converter = DstConverter::new(config, Box::new(sink.clone()));
    let mut source = SyntheticSource::new(specs);
    run_analysis(&mut source, &mut converter).unwrap();
    assert!(sink.finished());
    sink.frames()
}

fn event_frames(frames: &[Frame]) -> Vec<&EventFrame> {
    frames
        .iter()
        .filter_map(|f| match f {
            Frame::Event(e) => Some(e),
            Frame::Run(_) => None,
        })
        .collect()
}

fn run_headers(frames: &[Frame]) -> Vec<&RunHeader> {
    frames
        .iter()
        .filter_map(|f| match f {
            Frame::Run(r) => r.run_header.get(0),
            Frame::Event(_) => None,
        })
        .collect()
}

#[test]
fn run_boundaries_flush_summaries_in_order() {
    let pairs = [(1, 1), (1, 1), (2, 1), (2, 1), (2, 2)];
    let specs = pairs
        .iter()
        .enumerate()
        .map(|(i, &(run, file))| EventSpec {
            run,
            file,
            event: i as i32 + 1,
            ..EventSpec::default()
        })
        .collect();

    let frames = convert(specs, ConverterConfig::default());

    let categories: Vec<&str> = frames.iter().map(|f| f.category()).collect();
    assert_eq!(
        categories,
        ["events", "events", "runs", "events", "events", "runs", "events", "runs"]
    );

    let runs = run_headers(&frames);
    assert_eq!(runs.len(), 3);
    let ids: Vec<(i32, i32, u32)> = runs
        .iter()
        .map(|r| (r.run_number, r.file_number, r.event_count))
        .collect();
    assert_eq!(ids, [(1, 1, 2), (2, 1, 2), (2, 2, 1)]);
}

#[test]
fn mc_content_is_gated_by_run_number_sign() {
    let sim_event = |run| EventSpec {
        run,
        particles: vec![ParticleSpec {
            energy: 45.0,
            ..ParticleSpec::default()
        }],
        sim_particles: vec![SimParticleSpec {
            pdg: 211,
            reco_match: Some(0),
            ..SimParticleSpec::default()
        }],
        ..EventSpec::default()
    };

    // Simulated data: negative run number.
    let frames = convert(vec![sim_event(-1234)], ConverterConfig::default());
    let events = event_frames(&frames);
    let sim = events[0].sim_particles.as_ref().unwrap();
    assert_eq!(sim.len(), 1);
    assert_eq!(sim.get(0).unwrap().pdg, 211);
    let assoc = events[0].sim_reco_associations.as_ref().unwrap();
    assert_eq!(assoc.len(), 1);
    assert_eq!(assoc.get(0).unwrap().sim, 0);
    assert_eq!(assoc.get(0).unwrap().rec, 0);

    // Real data: the collections are absent, not empty, even though the
    // source carries a simulation chain.
    let frames = convert(vec![sim_event(1234)], ConverterConfig::default());
    let events = event_frames(&frames);
    assert!(events[0].sim_particles.is_none());
    assert!(events[0].sim_reco_associations.is_none());
}

#[test]
fn end_to_end_minimal_scenario() {
    let vertex = VertexSpec {
        chi2: 2.0,
        ndf: 1,
        position: [0.0, 0.0, 0.0],
        ..VertexSpec::default()
    };
    let specs = vec![
        EventSpec {
            event: 1,
            vertices: vec![vertex.clone()],
            ..EventSpec::default()
        },
        EventSpec {
            event: 2,
            vertices: vec![vertex],
            ..EventSpec::default()
        },
    ];
    let config = ConverterConfig {
        fix_secondary_hadronic_interactions: false,
        ..ConverterConfig::default()
    };

    let frames = convert(specs, config);
    let events = event_frames(&frames);
    assert_eq!(events.len(), 2);
    for event in &events {
        assert_eq!(event.vertices.len(), 1);
        let v = event.vertices.get(0).unwrap();
        assert!(v.primary);
        assert_eq!(v.chi2, 2.0);
        assert!((v.probability - 0.157).abs() < 1e-3);
        assert_eq!(v.position, Vector3f::default());
        assert!(event.particles.is_empty());
    }

    let runs = run_headers(&frames);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].event_count, 2);
    // No DANA record anywhere: the LEP1 default applies.
    assert_eq!(runs[0].center_of_mass_energy, 91.25);
    assert_eq!(runs[0].processing_tag, "94B2");
    assert_eq!(
        events[0].parameters.get("EBEAM"),
        Some(&ParamValue::Float(45.625))
    );
}

#[test]
fn dummy_records_contribute_no_rows_but_keep_the_chain() {
    let specs = vec![EventSpec {
        vertices: vec![
            VertexSpec {
                dummy: true,
                ..VertexSpec::default()
            },
            VertexSpec {
                chi2: 5.0,
                ndf: 2,
                ..VertexSpec::default()
            },
            VertexSpec {
                dummy: true,
                ..VertexSpec::default()
            },
        ],
        particles: vec![
            ParticleSpec::default(),
            ParticleSpec {
                dummy: true,
                ..ParticleSpec::default()
            },
            ParticleSpec::default(),
        ],
        ..EventSpec::default()
    }];

    let frames = convert(specs, ConverterConfig::default());
    let events = event_frames(&frames);
    assert_eq!(events[0].vertices.len(), 1);
    assert_eq!(events[0].vertices.get(0).unwrap().chi2, 5.0);
    assert_eq!(events[0].particles.len(), 2);
}

#[test]
fn missing_top_structure_skips_the_event_only() {
    let specs = vec![
        EventSpec {
            event: 1,
            has_top: false,
            ..EventSpec::default()
        },
        EventSpec {
            event: 2,
            ..EventSpec::default()
        },
    ];
    let frames = convert(specs, ConverterConfig::default());
    let events = event_frames(&frames);
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].event_header.get(0).unwrap().event_number,
        2
    );
    let runs = run_headers(&frames);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].event_count, 1);
}

#[test]
fn all_events_skipped_produces_no_frames() {
    let specs = vec![EventSpec {
        has_top: false,
        ..EventSpec::default()
    }];
    let frames = convert(specs, ConverterConfig::default());
    assert!(frames.is_empty());
}

#[test]
fn drifting_center_of_mass_keeps_first_value() {
    let specs = vec![
        EventSpec {
            event: 1,
            dana_energy_mev: Some(91_250),
            ..EventSpec::default()
        },
        EventSpec {
            event: 2,
            dana_energy_mev: Some(91_300), // 50 MeV drift
            ..EventSpec::default()
        },
    ];
    let frames = convert(specs, ConverterConfig::default());
    let runs = run_headers(&frames);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].center_of_mass_energy, 91.25);
    assert_eq!(runs[0].event_count, 2);
}

#[test]
fn pilot_energy_overrides_the_default() {
    let specs = vec![EventSpec {
        dana_energy_mev: Some(88_000),
        ..EventSpec::default()
    }];
    let frames = convert(specs, ConverterConfig::default());
    assert_eq!(run_headers(&frames)[0].center_of_mass_energy, 88.0);
}

#[test]
fn max_events_stops_the_loop() {
    let specs = (1..=3)
        .map(|event| EventSpec {
            event,
            ..EventSpec::default()
        })
        .collect();
    let config = ConverterConfig {
        max_events: 2,
        ..ConverterConfig::default()
    };
    let frames = convert(specs, config);
    assert_eq!(event_frames(&frames).len(), 2);
    let runs = run_headers(&frames);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].event_count, 2);
}

#[test]
fn non_dst_records_are_skipped() {
    let specs = vec![
        EventSpec {
            record_type: "TAN".to_string(),
            ..EventSpec::default()
        },
        EventSpec {
            pilot_words: Some(0),
            ..EventSpec::default()
        },
        EventSpec::default(),
    ];
    let frames = convert(specs, ConverterConfig::default());
    assert_eq!(event_frames(&frames).len(), 1);
    assert_eq!(run_headers(&frames)[0].event_count, 1);
}

#[test]
fn cross_references_resolve_through_side_maps() {
    // The first source particle is a dummy, so source ordinals and output
    // indices diverge: the surviving particle is source ordinal 1 but
    // output row 0. Raw index arithmetic would mis-resolve both links.
    let specs = vec![EventSpec {
        particles: vec![
            ParticleSpec {
                dummy: true,
                ..ParticleSpec::default()
            },
            ParticleSpec {
                energy: 12.5,
                ..ParticleSpec::default()
            },
        ],
        vertices: vec![VertexSpec {
            chi2: 1.0,
            ndf: 1,
            outgoing: Some((0, 2)),
            incoming: Some(1),
            ..VertexSpec::default()
        }],
        ..EventSpec::default()
    }];

    let frames = convert(specs, ConverterConfig::default());
    let events = event_frames(&frames);
    assert_eq!(events[0].particles.len(), 1);
    let particle = events[0].particles.get(0).unwrap();
    assert_eq!(particle.energy, 12.5);
    assert_eq!(particle.start_vertex, Some(0));
    assert_eq!(
        events[0].vertices.get(0).unwrap().associated_particle,
        Some(0)
    );
}

#[test]
fn simulated_particles_resolve_vertex_positions() {
    let specs = vec![EventSpec {
        run: -5000,
        vertices: vec![
            VertexSpec {
                chi2: 1.0,
                ndf: 1,
                position: [1.0, 2.0, 3.0],
                ..VertexSpec::default()
            },
            VertexSpec {
                chi2: 1.0,
                ndf: 1,
                secondary: true,
                position: [4.0, 5.0, 6.0],
                ..VertexSpec::default()
            },
        ],
        sim_particles: vec![SimParticleSpec {
            pdg: 22,
            production_vertex: Some(0),
            end_vertex: Some(1),
            ..SimParticleSpec::default()
        }],
        ..EventSpec::default()
    }];

    let frames = convert(specs, ConverterConfig::default());
    let events = event_frames(&frames);
    let sim = events[0].sim_particles.as_ref().unwrap();
    let particle = sim.get(0).unwrap();
    assert_eq!(particle.vertex, Some(Vector3f::new(1.0, 2.0, 3.0)));
    assert_eq!(particle.endpoint, Some(Vector3f::new(4.0, 5.0, 6.0)));
}

#[test]
fn event_header_carries_decoded_timestamp() {
    let specs = vec![EventSpec {
        date: 940_512,
        time: 134_500,
        ..EventSpec::default()
    }];
    let frames = convert(specs, ConverterConfig::default());
    let events = event_frames(&frames);
    let header = events[0].event_header.get(0).unwrap();
    assert_eq!(header.time_stamp, 768_750_300 * 1_000_000_000);
    let delphi = events[0].delphi_event_header.get(0).unwrap();
    assert_eq!(delphi.time_stamp.unix_time, 768_750_300);
    assert_eq!(delphi.delphi_date, 940_512);
    assert_eq!(delphi.delphi_time, 134_500);
}

/// Correction routine double that records the links it was handed.
#[derive(Clone)]
struct SpyFix {
    calls: Arc<Mutex<Vec<i32>>>,
}

impl StructuralFix for SpyFix {
    fn apply(&mut self, arena: &mut dyn Arena, link: i32) -> FixOutcome {
        self.calls.lock().unwrap().push(link);
        // Clear the signature so the record reads as repaired.
        arena.set_iq(link + 4, 0);
        FixOutcome { link, status: 0 }
    }
}

#[test]
fn fixup_pass_repairs_matching_blocklets() {
    let specs = vec![EventSpec {
        run: -42,
        sim_particles: vec![
            SimParticleSpec {
                signature: SHI_SIGNATURE,
                ..SimParticleSpec::default()
            },
            SimParticleSpec::default(),
            SimParticleSpec {
                signature: SHI_SIGNATURE | 0x100, // high bits outside the mask
                ..SimParticleSpec::default()
            },
        ],
        ..EventSpec::default()
    }];

    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = RecordingSink::new();
    let mut converter = DstConverter::new(ConverterConfig::default(), Box::new(sink.clone()))
        .with_fix_routine(Box::new(SpyFix {
            calls: Arc::clone(&calls),
        }));
    let mut source = SyntheticSource::new(specs);
    run_analysis(&mut source, &mut converter).unwrap();

    assert_eq!(calls.lock().unwrap().len(), 2);
    // The repaired chain still converts.
    let events = event_frames(&sink.frames()).len();
    assert_eq!(events, 1);
}

#[test]
fn fixup_pass_can_be_disabled() {
    let specs = vec![EventSpec {
        run: -42,
        sim_particles: vec![SimParticleSpec {
            signature: SHI_SIGNATURE,
            ..SimParticleSpec::default()
        }],
        ..EventSpec::default()
    }];

    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = RecordingSink::new();
    let config = ConverterConfig {
        fix_secondary_hadronic_interactions: false,
        ..ConverterConfig::default()
    };
    let mut converter = DstConverter::new(config, Box::new(sink.clone()))
        .with_fix_routine(Box::new(SpyFix {
            calls: Arc::clone(&calls),
        }));
    let mut source = SyntheticSource::new(specs);
    run_analysis(&mut source, &mut converter).unwrap();

    assert!(calls.lock().unwrap().is_empty());
}
