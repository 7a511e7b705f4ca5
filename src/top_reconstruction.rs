//! Reconstruction of leptonically decaying top quarks (t → bW → bℓν) from the
//! selected objects of an event view, including an alternative hypothesis
//! using the light jet and the angles that are sensitive to the top quark and
//! W boson polarizations.

use crate::{
    config::{ConfigError, OptionSet},
    event::{Event, EventError, Particle, View},
    momentum::{cos_angle, in_rest_frame_of, mass, Momentum},
    node::{PortSelection, ProcessingNode},
    numeric::Float,
};

use log::{trace, warn};

// Option names
const OPT_EVENT_VIEW: &str = "event view";
const OPT_LEPTON: &str = "lepton";
const OPT_NEUTRINO: &str = "neutrino";
const OPT_BJET: &str = "b-jet";
const OPT_LIGHT_JET: &str = "light jet";
const OPT_WBOSON: &str = "W boson";
const OPT_TOP: &str = "top";
const OPT_ADD_BEST_TOP: &str = "add bestTop";
const OPT_ADD_ANGLES: &str = "add angles";

/// Single output port, which receives every event
pub const OUTPUT_PORT: &str = "selected";

/// Top quark mass used to pick the best top quark hypothesis (GeV)
pub const REFERENCE_TOP_MASS: Float = 173.0;

/// Suffix appended to the top quark name to name the best hypothesis
pub const BEST_TOP_SUFFIX: &str = "_best";

/// Annotation holding cos θ between the lepton and the light jet, both in
/// the top quark rest frame
pub const COS_THETA_LQ: &str = "cosTheta_lq";

/// Annotation holding cos θ between the lepton in the W boson rest frame and
/// the W boson in the top quark rest frame
pub const COS_THETA_WHEL: &str = "cosTheta_whel";

/// Truth that a top quark candidate is strictly closer to the reference top
/// mass than another one
pub fn is_closer_to_top_mass(candidate: &Momentum, other: &Momentum) -> bool {
    (mass(candidate) - REFERENCE_TOP_MASS).abs() < (mass(other) - REFERENCE_TOP_MASS).abs()
}

/// Polarization angles of a reconstructed top quark decay
///
/// Each cosine is None if one of the involved momenta vanishes in the
/// relevant rest frame.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolarizationAngles {
    /// cos θ between the lepton and the light jet, in the top rest frame
    pub cos_theta_lq: Option<Float>,

    /// cos θ between the lepton in the W rest frame and the W in the top
    /// rest frame
    pub cos_theta_whel: Option<Float>,
}
//
impl PolarizationAngles {
    /// Compute the angles from the decay products and composites
    pub fn new(lepton: &Momentum, light_jet: &Momentum, wboson: &Momentum, top: &Momentum) -> Self {
        Self {
            cos_theta_lq: cos_angle(
                &in_rest_frame_of(lepton, top),
                &in_rest_frame_of(light_jet, top),
            ),
            cos_theta_whel: cos_angle(
                &in_rest_frame_of(lepton, wboson),
                &in_rest_frame_of(wboson, top),
            ),
        }
    }
}

/// Top quark reconstruction node
///
/// In each matching event view, the first particle playing each role
/// (lepton, neutrino, b-jet, light jet) is looked up. Then a W boson is built
/// from the lepton and neutrino, a top quark from the W boson and the b-jet,
/// and, when a light jet is there, the best top quark hypothesis and the
/// polarization angles. All composites are added to the view. Every event is
/// forwarded to the single output port.
///
#[derive(Clone, Debug)]
pub struct TopReconstruction {
    name: String,
    event_view: String,
    lepton_name: String,
    neutrino_name: String,
    bjet_name: String,
    light_jet_name: String,
    wboson_name: String,
    top_name: String,
    add_best_top: bool,
    add_angles: bool,
}
//
impl Default for TopReconstruction {
    fn default() -> Self {
        Self::new(Self::NODE_TYPE)
    }
}
//
impl TopReconstruction {
    /// Kind of node
    pub const NODE_TYPE: &'static str = "TopReconstruction";

    /// Set up a top quark reconstruction with the default settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            event_view: "Reconstructed".to_owned(),
            lepton_name: "TightMuon".to_owned(),
            neutrino_name: "Neutrino".to_owned(),
            bjet_name: "SelectedBJet".to_owned(),
            light_jet_name: "SelectedJet".to_owned(),
            wboson_name: "W".to_owned(),
            top_name: "Top".to_owned(),
            add_best_top: true,
            add_angles: true,
        }
    }

    /// Name given to the best top quark hypothesis
    pub fn best_top_name(&self) -> String {
        format!("{}{}", self.top_name, BEST_TOP_SUFFIX)
    }

    /// Reconstruct the top quark decay within one view
    fn reconstruct_in_view(&self, view: &mut View) {
        // NOTE: Only the first particle of each role is used, so views that
        //       hold several leptons or jets depend on insertion order.
        let find = |role: &str| view.find_first(role).map(|idx| view.particles[idx].p4);
        let (Some(lepton), Some(neutrino)) = (find(&self.lepton_name), find(&self.neutrino_name))
        else {
            return;
        };
        let bjet = find(&self.bjet_name);
        let light_jet = find(&self.light_jet_name);

        // Leptonic W boson decay
        let wboson = Particle::composite(self.wboson_name.as_str(), [&lepton, &neutrino]);
        let wboson_p4 = wboson.p4;
        view.push(wboson);

        // Top quark decay
        let Some(bjet) = bjet else {
            trace!("{}: no b-jet, only the W boson is reconstructed", self.name);
            return;
        };
        let mut top = Particle::composite(self.top_name.as_str(), [&lepton, &bjet, &neutrino]);
        let Some(light_jet) = light_jet else {
            view.push(top);
            return;
        };

        // Alternative hypothesis where the light jet comes from the top quark
        // decay, replaced by the b-jet one if that is closer to the top mass
        let best_top = self.add_best_top.then(|| {
            let mut best_top =
                Particle::composite(self.best_top_name(), [&lepton, &light_jet, &neutrino]);
            if is_closer_to_top_mass(&top.p4, &best_top.p4) {
                best_top.p4 = top.p4;
            }
            best_top
        });

        if self.add_angles {
            let angles = PolarizationAngles::new(&lepton, &light_jet, &wboson_p4, &top.p4);
            for (key, cosine) in [
                (COS_THETA_LQ, angles.cos_theta_lq),
                (COS_THETA_WHEL, angles.cos_theta_whel),
            ] {
                match cosine {
                    Some(cosine) => top.annotations.set(key, cosine),
                    None => warn!("{}: {} is undefined for this event", self.name, key),
                }
            }
        }

        view.push(top);
        if let Some(best_top) = best_top {
            view.push(best_top);
        }
    }
}

impl ProcessingNode for TopReconstruction {
    fn node_type(&self) -> &'static str {
        Self::NODE_TYPE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_ports(&self) -> &'static [&'static str] {
        &[OUTPUT_PORT]
    }

    fn default_options(&self) -> OptionSet {
        OptionSet::new()
            .declare(OPT_EVENT_VIEW, "name of the event view", self.event_view.as_str())
            .declare(
                OPT_LEPTON,
                "name of the lepton from top decay",
                self.lepton_name.as_str(),
            )
            .declare(
                OPT_NEUTRINO,
                "name of the neutrino from top decay",
                self.neutrino_name.as_str(),
            )
            .declare(
                OPT_BJET,
                "name of the b-jet from top decay",
                self.bjet_name.as_str(),
            )
            .declare(
                OPT_LIGHT_JET,
                "name of the light jet from top decay (optional)",
                self.light_jet_name.as_str(),
            )
            .declare(
                OPT_WBOSON,
                "name of the reconstructed W boson",
                self.wboson_name.as_str(),
            )
            .declare(OPT_TOP, "name of the reconstructed top", self.top_name.as_str())
            .declare(
                OPT_ADD_BEST_TOP,
                "includes a best top candidate",
                self.add_best_top,
            )
            .declare(
                OPT_ADD_ANGLES,
                "calculates polarization angles",
                self.add_angles,
            )
    }

    fn apply_options(&mut self, options: &OptionSet) -> Result<(), ConfigError> {
        self.event_view = options.string(OPT_EVENT_VIEW)?;
        self.lepton_name = options.string(OPT_LEPTON)?;
        self.neutrino_name = options.string(OPT_NEUTRINO)?;
        self.bjet_name = options.string(OPT_BJET)?;
        self.light_jet_name = options.string(OPT_LIGHT_JET)?;
        self.wboson_name = options.string(OPT_WBOSON)?;
        self.top_name = options.string(OPT_TOP)?;
        self.add_best_top = options.boolean(OPT_ADD_BEST_TOP)?;
        self.add_angles = options.boolean(OPT_ADD_ANGLES)?;
        Ok(())
    }

    fn analyse(&self, event: &mut Event) -> Result<PortSelection, EventError> {
        for view in event.views_named_mut(&self.event_view) {
            self.reconstruct_in_view(view);
        }
        Ok(PortSelection::to(OUTPUT_PORT))
    }
}
