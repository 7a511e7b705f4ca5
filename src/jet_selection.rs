//! Jet selection: particle-flow jet identification, cleaning of jets that
//! overlap with other objects (typically leptons), and routing of events
//! according to the number of selected jets.

use crate::{
    config::{ConfigError, OptionSet},
    event::{Event, EventError, Particle, View},
    momentum::{delta_r, Momentum},
    node::{PortSelection, ProcessingNode},
    numeric::Float,
};

use log::trace;
use strum::{EnumVariantNames, IntoStaticStr, VariantNames};

// Option names
const OPT_EVENT_VIEW: &str = "event view";
const OPT_INPUT_JET_NAME: &str = "input jet name";
const OPT_SELECTED_JET_NAME: &str = "name of selected jets";
const OPT_CLEAN_EVENT: &str = "clean event";
const OPT_MIN_PT: &str = "PF Jet Minimum pT";
const OPT_MAX_ETA: &str = "PF Jet Maximum Eta";
const OPT_CONSTITUENTS: &str = "PF Jet Number of Constituents";
const OPT_NEUTRAL_HADRON_FRAC: &str = "PF Jet ID: Neutral Hadr. Frac.";
const OPT_CHARGED_EM_FRAC: &str = "PF Jet ID: Charged Em. Frac.";
const OPT_NEUTRAL_EM_FRAC: &str = "PF Jet ID: Neutral Em. Frac.";
const OPT_MUON_FRAC: &str = "PF Jet ID: Muon Frac.";
const OPT_CENTRAL_CHARGED_HADRON_FRAC: &str = "PF Central Jet ID: Charged Hadr. Frac.";
const OPT_CENTRAL_CHARGED_EM_FRAC: &str = "PF Central Jet ID: Charged Em. Frac.";
const OPT_CENTRAL_CHARGED_MULT: &str = "PF Central Jet ID: Charged Multiplicity";
const OPT_INVERT_DR: &str = "invert dR";
const OPT_DR_CUT: &str = "dR cut";
const OPT_DR_OBJECTS: &str = "dR objects";

/// Annotation holding the number of jet constituents
pub const N_CONSTITUENTS: &str = "nConstituents";

/// Annotation holding the HF hadronic energy fraction
pub const HF_HADRON_FRAC: &str = "HFHadronEnergyFraction";

/// Annotation holding the neutral hadronic energy fraction
pub const NEUTRAL_HADRON_FRAC: &str = "neutralHadronEnergyFraction";

/// Annotation holding the neutral electromagnetic energy fraction
pub const NEUTRAL_EM_FRAC: &str = "neutralEmEnergyFraction";

/// Annotation holding the charged electromagnetic energy fraction
pub const CHARGED_EM_FRAC: &str = "electronEnergyFraction";

/// Annotation holding the muon energy fraction
pub const MUON_FRAC: &str = "muonEnergyFraction";

/// Annotation holding the charged hadronic energy fraction
pub const CHARGED_HADRON_FRAC: &str = "chargedHadronEnergyFraction";

/// Annotation holding the charged particle multiplicity
pub const CHARGED_MULTIPLICITY: &str = "chargedMultiplicity";

/// Annotation set on selected jets, holding the distance to the closest
/// cleaning object
pub const DR_MIN: &str = "dRmin";

/// Jets with |η| below this value lie within the tracker acceptance
pub const CENTRAL_ETA: Float = 2.4;

/// Value of the dRmin annotation when there is no cleaning object around
pub const NO_CLEANING_OBJECT_DR: Float = 100.;

/// Output ports, named after the number of selected jets
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumVariantNames, IntoStaticStr)]
pub enum JetMultiplicity {
    /// No selected jet
    #[strum(serialize = "0 Jets")]
    Zero,

    /// One selected jet
    #[strum(serialize = "1 Jet")]
    One,

    /// Two selected jets
    #[strum(serialize = "2 Jets")]
    Two,

    /// Three selected jets
    #[strum(serialize = "3 Jets")]
    Three,

    /// Four selected jets
    #[strum(serialize = "4 Jets")]
    Four,

    /// Five selected jets or more
    #[strum(serialize = ">4 Jets")]
    MoreThanFour,
}
//
impl JetMultiplicity {
    /// Port associated with a certain number of selected jets
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => Self::Zero,
            1 => Self::One,
            2 => Self::Two,
            3 => Self::Three,
            4 => Self::Four,
            _ => Self::MoreThanFour,
        }
    }

    /// Name of the port
    pub fn port(self) -> &'static str {
        self.into()
    }
}

/// Particle-flow jet identification cuts
#[derive(Clone, Debug, PartialEq)]
pub struct JetIdCuts {
    /// Minimal transverse momentum
    pub min_pt: Float,

    /// Maximal absolute pseudorapidity
    pub max_eta: Float,

    /// Number of constituents must be above this
    pub min_constituents: i64,

    /// Maximal neutral (HF + neutral) hadronic energy fraction
    pub max_neutral_hadron_frac: Float,

    /// Maximal neutral electromagnetic energy fraction
    pub max_neutral_em_frac: Float,

    /// Maximal charged electromagnetic energy fraction
    pub max_charged_em_frac: Float,

    /// Maximal muon energy fraction
    pub max_muon_frac: Float,

    /// Minimal charged hadronic energy fraction of central jets
    pub min_central_charged_hadron_frac: Float,

    /// Charged multiplicity of central jets must be above this
    pub min_central_charged_mult: Float,

    /// Maximal charged electromagnetic energy fraction of central jets
    pub max_central_charged_em_frac: Float,
}
//
impl Default for JetIdCuts {
    // Taken from the TOP JetMET recommendations for Run 2
    fn default() -> Self {
        Self {
            min_pt: 40.,
            max_eta: 4.7,
            min_constituents: 1,
            max_neutral_hadron_frac: 0.99,
            max_neutral_em_frac: 0.99,
            max_charged_em_frac: 0.9,
            max_muon_frac: 0.8,
            min_central_charged_hadron_frac: 0.,
            min_central_charged_mult: 0.,
            max_central_charged_em_frac: 0.99,
        }
    }
}
//
impl JetIdCuts {
    /// Decide whether a jet passes the identification, stopping at the first
    /// failed cut
    ///
    /// Energy fractions that the jet is not annotated with are not cut on,
    /// except for the hadronic fractions (which count as zero). The number of
    /// constituents, and the charged multiplicity of central jets, must be
    /// present.
    ///
    // Cuts are written as negated acceptance conditions so that NaNs fail them
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn passes(&self, jet: &Particle) -> Result<bool, EventError> {
        let annotations = &jet.annotations;

        // Kinematics
        if !(jet.pt() > self.min_pt) {
            return Ok(false);
        }
        let abs_eta = jet.eta().abs();
        if !(abs_eta < self.max_eta) {
            return Ok(false);
        }

        // Jet composition
        if !(annotations.int(N_CONSTITUENTS)? > self.min_constituents) {
            return Ok(false);
        }
        let hadron_frac = annotations.float_opt(HF_HADRON_FRAC)?.unwrap_or(0.)
            + annotations.float_opt(NEUTRAL_HADRON_FRAC)?.unwrap_or(0.);
        if !(hadron_frac < self.max_neutral_hadron_frac) {
            return Ok(false);
        }
        for (key, max) in [
            (NEUTRAL_EM_FRAC, self.max_neutral_em_frac),
            (CHARGED_EM_FRAC, self.max_charged_em_frac),
            (MUON_FRAC, self.max_muon_frac),
        ] {
            if let Some(frac) = annotations.float_opt(key)? {
                if !(frac < max) {
                    return Ok(false);
                }
            }
        }

        // Additional requirements within the tracker acceptance
        if abs_eta < CENTRAL_ETA {
            if let Some(frac) = annotations.float_opt(CHARGED_HADRON_FRAC)? {
                if !(frac > self.min_central_charged_hadron_frac) {
                    return Ok(false);
                }
            }
            if !(annotations.float(CHARGED_MULTIPLICITY)? > self.min_central_charged_mult) {
                return Ok(false);
            }
            if let Some(frac) = annotations.float_opt(CHARGED_EM_FRAC)? {
                if !(frac < self.max_central_charged_em_frac) {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

/// Removal of jets which are close to other objects in (η, φ) space
#[derive(Clone, Debug, PartialEq)]
pub struct OverlapCleaning {
    /// Jets closer than this to a cleaning object are removed
    pub dr_cut: Float,

    /// Only compute the distances, never remove jets
    pub invert: bool,

    /// Names of the objects jets should not be close to
    pub objects: Vec<String>,
}
//
impl Default for OverlapCleaning {
    fn default() -> Self {
        Self {
            dr_cut: 0.4,
            invert: false,
            objects: vec!["TightMuon".to_owned(), "TightElectron".to_owned()],
        }
    }
}
//
impl OverlapCleaning {
    /// Truth that a particle is one of the cleaning objects
    pub fn is_cleaning_object(&self, particle: &Particle) -> bool {
        self.objects.iter().any(|name| *name == particle.name)
    }

    /// Effective ΔR cut, if jets may be removed at all
    ///
    /// Cleaning is disabled if no cleaning object name is configured,
    /// whatever the configured cut.
    ///
    pub fn effective_cut(&self) -> Option<Float> {
        (!self.invert && !self.objects.is_empty()).then_some(self.dr_cut)
    }

    /// Distance from a jet to the closest cleaning object, or None if the jet
    /// must be removed
    ///
    /// The jet is removed as soon as one object is found within the cut, in
    /// which case the remaining objects are not looked at.
    ///
    pub fn min_distance(&self, jet: &Momentum, objects: &[Momentum]) -> Option<Float> {
        let cut = self.effective_cut();
        let mut dr_min = NO_CLEANING_OBJECT_DR;
        for object in objects {
            let dr = delta_r(jet, object);
            if cut.map_or(false, |cut| dr < cut) {
                return None;
            }
            dr_min = dr_min.min(dr);
        }
        Some(dr_min)
    }
}

/// Jet selection node
///
/// Within the configured event views, jets passing the identification are
/// renamed, jets failing it are removed (if cleaning is enabled), then
/// selected jets overlapping with cleaning objects are removed. The event is
/// routed to the output port matching the number of remaining selected jets.
///
#[derive(Clone, Debug)]
pub struct JetSelection {
    name: String,
    event_view: String,
    input_jet_name: String,
    selected_jet_name: String,
    clean_event: bool,
    cuts: JetIdCuts,
    cleaning: OverlapCleaning,
}
//
impl Default for JetSelection {
    fn default() -> Self {
        Self::new(Self::NODE_TYPE)
    }
}
//
impl JetSelection {
    /// Kind of node
    pub const NODE_TYPE: &'static str = "JetSelection";

    /// Set up a jet selection with the default settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            event_view: "Reconstructed".to_owned(),
            input_jet_name: "Jet".to_owned(),
            selected_jet_name: "SelectedJet".to_owned(),
            clean_event: true,
            cuts: JetIdCuts::default(),
            cleaning: OverlapCleaning::default(),
        }
    }

    /// Identification cuts in use
    pub fn cuts(&self) -> &JetIdCuts {
        &self.cuts
    }

    /// Overlap cleaning in use
    pub fn cleaning(&self) -> &OverlapCleaning {
        &self.cleaning
    }

    /// Identification verdict of each particle of a view (None for
    /// particles which are not input jets)
    fn identify_in_view(&self, view: &View) -> Result<Vec<Option<bool>>, EventError> {
        view.particles
            .iter()
            .map(|particle| {
                if particle.name == self.input_jet_name {
                    self.cuts.passes(particle).map(Some)
                } else {
                    Ok(None)
                }
            })
            .collect()
    }

    /// Select jets within one view, given the identification verdicts of its
    /// particles, returning the number of selected jets
    fn select_in_view(&self, view: &mut View, verdicts: Vec<Option<bool>>) -> usize {
        // Rebuild the view, renaming selected jets and dropping rejected ones
        let mut retained = Vec::with_capacity(view.particles.len());
        let mut selected = Vec::new();
        for (mut particle, verdict) in view.particles.drain(..).zip(verdicts) {
            match verdict {
                Some(true) => {
                    particle.name.clone_from(&self.selected_jet_name);
                    selected.push(retained.len());
                }
                Some(false) if self.clean_event => {
                    trace!("{}: removing jet failing identification", self.name);
                    continue;
                }
                _ => {}
            }
            retained.push(particle);
        }

        // Collect the objects that jets should be kept away from
        let cleaning_objects = retained
            .iter()
            .filter(|particle| self.cleaning.is_cleaning_object(particle))
            .map(|particle| particle.p4)
            .collect::<Vec<_>>();

        // Remove overlapping jets, annotate the others
        let mut overlapping = vec![false; retained.len()];
        for &idx in &selected {
            let jet = &mut retained[idx];
            match self.cleaning.min_distance(&jet.p4, &cleaning_objects) {
                Some(dr_min) => jet.annotations.set(DR_MIN, dr_min),
                None => {
                    trace!("{}: removing jet overlapping with another object", self.name);
                    overlapping[idx] = true;
                }
            }
        }
        let num_selected = selected.iter().filter(|&&idx| !overlapping[idx]).count();
        view.particles = retained
            .into_iter()
            .zip(overlapping)
            .filter_map(|(particle, overlaps)| (!overlaps).then_some(particle))
            .collect();
        num_selected
    }
}

impl ProcessingNode for JetSelection {
    fn node_type(&self) -> &'static str {
        Self::NODE_TYPE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_ports(&self) -> &'static [&'static str] {
        JetMultiplicity::VARIANTS
    }

    fn default_options(&self) -> OptionSet {
        let cuts = &self.cuts;
        OptionSet::new()
            .declare(
                OPT_EVENT_VIEW,
                "name of the event view where jets are selected",
                self.event_view.as_str(),
            )
            .declare(
                OPT_INPUT_JET_NAME,
                "name of particles to consider for selection",
                self.input_jet_name.as_str(),
            )
            .declare(OPT_SELECTED_JET_NAME, "", self.selected_jet_name.as_str())
            .declare(
                OPT_CLEAN_EVENT,
                "this option will clean the event of all jets failing cuts",
                self.clean_event,
            )
            .declare(OPT_MIN_PT, "", cuts.min_pt)
            .declare(OPT_MAX_ETA, "", cuts.max_eta)
            .declare(OPT_CONSTITUENTS, "", cuts.min_constituents)
            .declare(OPT_NEUTRAL_HADRON_FRAC, "", cuts.max_neutral_hadron_frac)
            .declare(OPT_CHARGED_EM_FRAC, "", cuts.max_charged_em_frac)
            .declare(OPT_NEUTRAL_EM_FRAC, "", cuts.max_neutral_em_frac)
            .declare(OPT_MUON_FRAC, "", cuts.max_muon_frac)
            .declare(
                OPT_CENTRAL_CHARGED_HADRON_FRAC,
                "",
                cuts.min_central_charged_hadron_frac,
            )
            .declare(
                OPT_CENTRAL_CHARGED_EM_FRAC,
                "",
                cuts.max_central_charged_em_frac,
            )
            .declare(OPT_CENTRAL_CHARGED_MULT, "", cuts.min_central_charged_mult)
            .declare(OPT_INVERT_DR, "inverts dR cleaning", self.cleaning.invert)
            .declare(
                OPT_DR_CUT,
                "remove jets close to other objects, e.g. leptons",
                self.cleaning.dr_cut,
            )
            .declare(
                OPT_DR_OBJECTS,
                "object names to which the jets should NOT be close to",
                self.cleaning.objects.clone(),
            )
    }

    fn apply_options(&mut self, options: &OptionSet) -> Result<(), ConfigError> {
        self.event_view = options.string(OPT_EVENT_VIEW)?;
        self.input_jet_name = options.string(OPT_INPUT_JET_NAME)?;
        self.selected_jet_name = options.string(OPT_SELECTED_JET_NAME)?;
        self.clean_event = options.boolean(OPT_CLEAN_EVENT)?;
        self.cuts = JetIdCuts {
            min_pt: options.float(OPT_MIN_PT)?,
            max_eta: options.float(OPT_MAX_ETA)?,
            min_constituents: options.int(OPT_CONSTITUENTS)?,
            max_neutral_hadron_frac: options.float(OPT_NEUTRAL_HADRON_FRAC)?,
            max_neutral_em_frac: options.float(OPT_NEUTRAL_EM_FRAC)?,
            max_charged_em_frac: options.float(OPT_CHARGED_EM_FRAC)?,
            max_muon_frac: options.float(OPT_MUON_FRAC)?,
            min_central_charged_hadron_frac: options.float(OPT_CENTRAL_CHARGED_HADRON_FRAC)?,
            min_central_charged_mult: options.float(OPT_CENTRAL_CHARGED_MULT)?,
            max_central_charged_em_frac: options.float(OPT_CENTRAL_CHARGED_EM_FRAC)?,
        };
        self.cleaning = OverlapCleaning {
            dr_cut: options.float(OPT_DR_CUT)?,
            invert: options.boolean(OPT_INVERT_DR)?,
            objects: options.string_list(OPT_DR_OBJECTS)?,
        };
        Ok(())
    }

    fn analyse(&self, event: &mut Event) -> Result<PortSelection, EventError> {
        // Run the identification on every view first, so that a faulty jet
        // leaves the event untouched
        let verdicts = event
            .views_named(&self.event_view)
            .map(|view| self.identify_in_view(view))
            .collect::<Result<Vec<_>, _>>()?;
        let mut num_selected = 0;
        for (view, verdicts) in event.views_named_mut(&self.event_view).zip(verdicts) {
            num_selected += self.select_in_view(view, verdicts);
        }
        let multiplicity = JetMultiplicity::from_count(num_selected);
        trace!("{}: {} selected jets", self.name, num_selected);
        Ok(PortSelection::to(multiplicity.port()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::OptionValue,
        event::Record,
        momentum::{from_pt_eta_phi_m, momentum},
        node::NodeError,
    };
    use approx::assert_relative_eq;

    /// Jet which passes the default identification, unless it is too soft
    fn jet(pt: Float, eta: Float, phi: Float) -> Particle {
        Particle::new("Jet", from_pt_eta_phi_m(pt, eta, phi, 5.))
            .with(N_CONSTITUENTS, 5)
            .with(CHARGED_MULTIPLICITY, 3)
    }

    fn muon(eta: Float, phi: Float) -> Particle {
        Particle::new("TightMuon", from_pt_eta_phi_m(30., eta, phi, 0.1))
    }

    fn event(particles: Vec<Particle>) -> Event {
        let view = particles
            .into_iter()
            .fold(View::new("Reconstructed"), View::with);
        Event::new().with_view(view)
    }

    fn configured(overrides: &[(&str, OptionValue)]) -> JetSelection {
        let mut node = JetSelection::default();
        let mut options = node.default_options();
        for (name, value) in overrides {
            options.set(name, value.clone()).unwrap();
        }
        node.configure(&options).unwrap();
        node
    }

    fn names(event: &Event) -> Vec<&str> {
        event.views[0]
            .particles
            .iter()
            .map(|p| p.name.as_str())
            .collect()
    }

    #[test]
    fn output_ports() {
        let node = JetSelection::default();
        assert_eq!(
            node.output_ports(),
            &["0 Jets", "1 Jet", "2 Jets", "3 Jets", "4 Jets", ">4 Jets"]
        );
    }

    #[test]
    fn routing_is_total() {
        let ports = JetSelection::default().output_ports();
        for count in 0..100 {
            let port = JetMultiplicity::from_count(count).port();
            let expected = ports[count.min(5)];
            assert_eq!(port, expected, "wrong port for {count} jets");
        }
        assert_eq!(JetMultiplicity::from_count(usize::MAX).port(), ">4 Jets");
    }

    #[test]
    fn single_good_jet_without_cleaning_objects() {
        let node = configured(&[(OPT_DR_OBJECTS, OptionValue::from(Vec::<String>::new()))]);
        let mut event = event(vec![jet(50., 1., 0.)]);
        assert_eq!(node.analyse(&mut event), Ok(PortSelection::to("1 Jet")));
        let selected = &event.views[0].particles[0];
        assert_eq!(selected.name, "SelectedJet");
        assert_eq!(
            selected.annotations.float(DR_MIN),
            Ok(NO_CLEANING_OBJECT_DR)
        );
    }

    #[test]
    fn soft_jet_is_removed() {
        let node = configured(&[]);
        let mut event = event(vec![jet(30., 1., 0.)]);
        assert_eq!(node.analyse(&mut event), Ok(PortSelection::to("0 Jets")));
        assert!(event.views[0].particles.is_empty());
    }

    #[test]
    fn failing_jets_are_kept_without_cleaning() {
        let node = configured(&[(OPT_CLEAN_EVENT, OptionValue::from(false))]);
        let mut event = event(vec![jet(30., 1., 0.), jet(60., 0.5, 1.)]);
        assert_eq!(node.analyse(&mut event), Ok(PortSelection::to("1 Jet")));
        assert_eq!(names(&event), ["Jet", "SelectedJet"]);
    }

    #[test]
    fn identification_cuts() {
        let cuts = JetIdCuts::default();
        let good = jet(50., 1., 0.);
        assert_eq!(cuts.passes(&good), Ok(true));

        // Forward jets are outside of the acceptance
        assert_eq!(cuts.passes(&jet(50., 4.8, 0.)), Ok(false));

        // Single-constituent jets are rejected
        assert_eq!(cuts.passes(&good.clone().with(N_CONSTITUENTS, 1)), Ok(false));

        // Hadronic fractions add up
        let hadronic = good
            .clone()
            .with(HF_HADRON_FRAC, 0.5 as Float)
            .with(NEUTRAL_HADRON_FRAC, 0.495 as Float);
        assert_eq!(cuts.passes(&hadronic), Ok(false));
        let hadronic = good.clone().with(NEUTRAL_HADRON_FRAC, 0.5 as Float);
        assert_eq!(cuts.passes(&hadronic), Ok(true));

        // Optional fractions are only checked when present
        assert_eq!(cuts.passes(&good.clone().with(MUON_FRAC, 0.8 as Float)), Ok(false));
        assert_eq!(cuts.passes(&good.clone().with(NEUTRAL_EM_FRAC, 0.995 as Float)), Ok(false));
        assert_eq!(cuts.passes(&good.clone().with(CHARGED_EM_FRAC, 0.95 as Float)), Ok(false));
    }

    #[test]
    fn central_jet_requirements() {
        let cuts = JetIdCuts::default();

        // Central jets need charged particles
        let central = jet(50., 1., 0.);
        assert_eq!(cuts.passes(&central.clone().with(CHARGED_MULTIPLICITY, 0)), Ok(false));
        assert_eq!(
            cuts.passes(&central.clone().with(CHARGED_HADRON_FRAC, 0 as Float)),
            Ok(false)
        );

        // Forward jets do not, and their multiplicity is not even looked at
        let mut forward = jet(50., 3., 0.).with(CHARGED_MULTIPLICITY, 0);
        assert_eq!(cuts.passes(&forward), Ok(true));
        forward.annotations = Default::default();
        forward.annotations.set(N_CONSTITUENTS, 5);
        assert_eq!(cuts.passes(&forward), Ok(true));

        // ...but central jets must carry it
        let mut central = central;
        central.annotations = Default::default();
        central.annotations.set(N_CONSTITUENTS, 5);
        assert_eq!(
            cuts.passes(&central),
            Err(EventError::MissingAnnotation {
                key: CHARGED_MULTIPLICITY.to_owned()
            })
        );
    }

    #[test]
    fn faulty_jet_leaves_event_untouched() {
        let node = JetSelection::new("jets");
        let bad = Particle::new("Jet", from_pt_eta_phi_m(50., 0., 0., 5.));
        let mut record = Record::from(event(vec![jet(50., 1., 2.), bad]));
        let before = record.clone();
        let err = node.process(&mut record).unwrap_err();
        assert_eq!(err.node(), "jets");
        assert!(matches!(err, NodeError::Execution { .. }));
        assert_eq!(record, before);
    }

    #[test]
    fn faulty_jet_in_later_view_leaves_event_untouched() {
        let node = JetSelection::new("jets");
        let good = View::new("Reconstructed").with(jet(50., 1., 2.));
        let bad = View::new("Reconstructed")
            .with(Particle::new("Jet", from_pt_eta_phi_m(50., 0., 0., 5.)));
        let mut record = Record::from(Event::new().with_view(good).with_view(bad));
        let before = record.clone();
        let err = node.process(&mut record).unwrap_err();
        assert!(matches!(err, NodeError::Execution { .. }));
        assert_eq!(record, before);
    }

    #[test]
    fn overlapping_jets_are_removed() {
        let node = configured(&[]);
        let mut event = event(vec![
            jet(50., 1., 0.),
            muon(1.1, 0.1),
            jet(70., -1., 2.),
            jet(45., 0., -2.),
        ]);
        assert_eq!(node.analyse(&mut event), Ok(PortSelection::to("2 Jets")));
        assert_eq!(names(&event), ["TightMuon", "SelectedJet", "SelectedJet"]);

        // Survivors know how far the muon is
        let muon_p4 = event.views[0].particles[0].p4;
        for selected in &event.views[0].particles[1..] {
            let dr_min = selected.annotations.float(DR_MIN).unwrap();
            assert_relative_eq!(dr_min, delta_r(&selected.p4, &muon_p4));
            assert!(dr_min >= 0.4);
        }
    }

    #[test]
    fn inverted_cleaning_keeps_overlapping_jets() {
        let node = configured(&[(OPT_INVERT_DR, OptionValue::from(true))]);
        let mut event = event(vec![jet(50., 1., 0.), muon(1.1, 0.1)]);
        assert_eq!(node.analyse(&mut event), Ok(PortSelection::to("1 Jet")));
        let dr_min = event.views[0].particles[0].annotations.float(DR_MIN).unwrap();
        assert!(dr_min < 0.4);
    }

    #[test]
    fn no_cleaning_objects_disables_cleaning() {
        let node = configured(&[
            (OPT_DR_OBJECTS, OptionValue::from(Vec::<String>::new())),
            (OPT_DR_CUT, OptionValue::from(1000. as Float)),
        ]);
        assert_eq!(node.cleaning().effective_cut(), None);
        let mut event = event(vec![jet(50., 1., 0.), muon(1., 0.), jet(50., 1., 0.01)]);
        assert_eq!(node.analyse(&mut event), Ok(PortSelection::to("2 Jets")));
        assert_eq!(names(&event), ["SelectedJet", "TightMuon", "SelectedJet"]);
    }

    #[test]
    fn cleaning_is_idempotent() {
        // Selected jets keep their name, so that they are selected again
        let node = configured(&[(OPT_SELECTED_JET_NAME, OptionValue::from("Jet"))]);
        let mut event = event(vec![
            jet(50., 1., 0.),
            muon(1.1, 0.1),
            jet(70., -1., 2.),
            muon(-1.2, 2.2),
            jet(45., 0., -2.),
        ]);
        assert_eq!(node.analyse(&mut event), Ok(PortSelection::to("1 Jet")));
        let cleaned = event.clone();
        assert_eq!(node.analyse(&mut event), Ok(PortSelection::to("1 Jet")));
        assert_eq!(event, cleaned);
    }

    #[test]
    fn first_overlap_removes_the_jet() {
        let cleaning = OverlapCleaning::default();
        let jet = momentum(100., 50., 0., 0.);
        let near = from_pt_eta_phi_m(20., 0., 0.1, 0.);
        let far = from_pt_eta_phi_m(20., 0., 3., 0.);
        assert_eq!(cleaning.min_distance(&jet, &[far, near]), None);
        let dr_min = cleaning.min_distance(&jet, &[far]).unwrap();
        assert_relative_eq!(dr_min, 3., max_relative = 1e-9);
        assert_eq!(cleaning.min_distance(&jet, &[]), Some(NO_CLEANING_OBJECT_DR));
    }

    #[test]
    fn jets_are_counted_across_views() {
        let node = configured(&[]);
        let mut event = event(vec![jet(50., 1., 0.), jet(60., 1., 2.)])
            .with_view(View::new("Generated").with(jet(50., 0., 0.)))
            .with_view(
                View::new("Reconstructed")
                    .with(jet(80., 0., 1.))
                    .with(jet(90., 0.5, -1.))
                    .with(jet(100., -0.5, -2.5)),
            );
        assert_eq!(node.analyse(&mut event), Ok(PortSelection::to(">4 Jets")));
        assert_eq!(event.views[1].particles[0].name, "Jet");
    }

    #[test]
    fn events_without_matching_view() {
        let node = configured(&[(OPT_EVENT_VIEW, OptionValue::from("Generated"))]);
        let mut event = event(vec![jet(50., 1., 0.)]);
        assert_eq!(node.analyse(&mut event), Ok(PortSelection::to("0 Jets")));
        assert_eq!(names(&event), ["Jet"]);
    }

    #[test]
    fn options_are_applied() {
        let mut node = JetSelection::default();
        let mut options = node.default_options();
        options
            .apply_overrides("PF Jet Minimum pT = 25\ndR objects = TightElectron")
            .unwrap();
        node.configure(&options).unwrap();
        assert_eq!(node.cuts().min_pt, 25.);
        assert_eq!(node.cleaning().objects, ["TightElectron"]);
        assert_eq!(node.default_options(), options);
    }
}
