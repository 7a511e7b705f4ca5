//! End-to-end runs of a weighting, jet selection and top reconstruction chain

use approx::assert_relative_eq;
use pxl_modules::{
    config,
    event_weight::WEIGHT_ANNOTATION,
    jet_selection::{CHARGED_MULTIPLICITY, DR_MIN, N_CONSTITUENTS},
    momentum::{from_pt_eta_phi_m, mass},
    numeric::Float,
    scheduling::run_pipeline,
    top_reconstruction::{COS_THETA_LQ, COS_THETA_WHEL, REFERENCE_TOP_MASS},
    Event, EventWeight, InformationChunk, JetSelection, Particle, Pipeline, ProcessingNode,
    Record, TopReconstruction, View,
};

const TTBAR: &str = "TTJets_MSDecaysCKM_central_Tune4C_13TeV-madgraph-tauola";

fn good_jet(pt: Float, eta: Float, phi: Float) -> Particle {
    Particle::new("Jet", from_pt_eta_phi_m(pt, eta, phi, 5.))
        .with(N_CONSTITUENTS, 10)
        .with(CHARGED_MULTIPLICITY, 6)
}

fn single_top_event(num_jets: usize) -> Event {
    let mut view = View::new("Reconstructed")
        .with(Particle::new("TightMuon", from_pt_eta_phi_m(35., 0.3, 0., 0.105)))
        .with(Particle::new("Neutrino", from_pt_eta_phi_m(40., 0.8, 2.8, 0.)))
        .with(Particle::new("SelectedBJet", from_pt_eta_phi_m(70., -0.5, -2., 4.8)));
    for i in 0..num_jets {
        view.push(good_jet(60. + 10. * i as Float, 1.2, 1.5 + 0.3 * i as Float));
    }
    let mut event = Event::new().with_view(view);
    event.annotations.set("ProcessName", TTBAR);
    event
}

fn pipeline(jets: JetSelection) -> Pipeline {
    let mut pipeline = Pipeline::new();
    let weights = pipeline.add_node(EventWeight::new("weights"));
    let jets = pipeline.add_node(jets);
    let top = pipeline.add_node(TopReconstruction::new("top"));
    pipeline.connect(weights, "output", jets).unwrap();
    pipeline.connect(jets, "1 Jet", top).unwrap();
    pipeline.connect(jets, "2 Jets", top).unwrap();
    pipeline.configure_all().unwrap();
    pipeline
}

#[test]
fn full_chain() {
    let pipeline = pipeline(JetSelection::new("jets"));
    let mut records = vec![
        Record::from(single_top_event(1)),
        Record::from(single_top_event(0)),
        Record::from(InformationChunk::default()),
        Record::from(single_top_event(3)),
    ];
    let summary = run_pipeline(&pipeline, &mut records).unwrap();
    assert_eq!(summary.arrivals("top", "selected"), 1);
    assert_eq!(summary.arrivals("jets", "0 Jets"), 1);
    assert_eq!(summary.arrivals("jets", "3 Jets"), 1);
    assert_eq!(summary.rejected(), 1);
    assert_eq!(summary.dropped(), 0);

    let event = records[0].as_event().unwrap();
    assert_relative_eq!(
        event.annotations.float(WEIGHT_ANNOTATION).unwrap(),
        831.76 / 25446993.
    );
    let view = &event.views[0];
    let selected = view.particles_named("SelectedJet").collect::<Vec<_>>();
    assert_eq!(selected.len(), 1);
    assert!(selected[0].annotations.float(DR_MIN).unwrap() > 0.4);

    let lepton = view.particles_named("TightMuon").next().unwrap().p4;
    let neutrino = view.particles_named("Neutrino").next().unwrap().p4;
    let bjet = view.particles_named("SelectedBJet").next().unwrap().p4;
    let wboson = view.particles_named("W").next().unwrap();
    assert_relative_eq!(wboson.mass(), mass(&(lepton + neutrino)), max_relative = 1e-9);

    let top = view.particles_named("Top").next().unwrap();
    assert_relative_eq!(top.mass(), mass(&(lepton + neutrino + bjet)), max_relative = 1e-9);
    for key in [COS_THETA_LQ, COS_THETA_WHEL] {
        let cosine = top.annotations.float(key).unwrap();
        assert!((-1. - 1e-9..=1. + 1e-9).contains(&cosine));
    }

    let best = view.particles_named("Top_best").next().unwrap();
    assert!(
        (best.mass() - REFERENCE_TOP_MASS).abs() <= (top.mass() - REFERENCE_TOP_MASS).abs() + 1e-9
    );
}

// Spans several batches: run with `--features multi-threading` to cover the
// rayon backend too
#[test]
fn every_record_is_accounted_for() {
    let pipeline = pipeline(JetSelection::new("jets"));
    let mut records = (0..2_500)
        .map(|i| match i % 4 {
            3 => Record::from(InformationChunk::default()),
            n => Record::from(single_top_event(n)),
        })
        .collect::<Vec<_>>();
    let summary = run_pipeline(&pipeline, &mut records).unwrap();
    let arrived = summary.iter().map(|(_, _, count)| count).sum::<usize>();
    assert_eq!(arrived + summary.dropped() + summary.rejected(), records.len());
    assert_eq!(summary.rejected(), 625);
    assert_eq!(summary.arrivals("jets", "0 Jets"), 625);
    assert_eq!(summary.arrivals("top", "selected"), 1_250);
}

#[test]
fn execution_errors_abort_the_run() {
    let pipeline = pipeline(JetSelection::new("jets"));
    let mut unnamed = single_top_event(1);
    unnamed.annotations = Default::default();
    let mut records = vec![Record::from(single_top_event(1)), Record::from(unnamed)];
    let err = run_pipeline(&pipeline, &mut records).unwrap_err();
    assert_eq!(err.node(), "weights");
}

#[test]
fn options_from_file() {
    let mut jets = JetSelection::new("jets");
    let mut options = jets.default_options();
    let path = std::env::temp_dir().join(format!("pxl_modules_jets_{}.cfg", std::process::id()));
    std::fs::write(
        &path,
        "# Tighter jets\nPF Jet Minimum pT = 100\n\nclean event = no\n",
    )
    .unwrap();
    config::load_overrides(&mut options, &path).unwrap();
    std::fs::remove_file(&path).unwrap();
    jets.configure(&options).unwrap();
    assert_eq!(jets.cuts().min_pt, 100.);

    let pipeline = pipeline(jets);
    let mut records = vec![Record::from(single_top_event(2))];
    let summary = run_pipeline(&pipeline, &mut records).unwrap();
    assert_eq!(summary.arrivals("jets", "0 Jets"), 1);

    // Failing jets are kept under their input name
    let view = &records[0].as_event().unwrap().views[0];
    assert_eq!(view.particles_named("Jet").count(), 2);
}
