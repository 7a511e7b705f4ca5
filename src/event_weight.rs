//! Normalization of simulated events to their cross-section

use crate::{
    config::{ConfigError, OptionSet},
    event::{Event, EventError},
    node::{PortSelection, ProcessingNode},
    numeric::Float,
};

use lazy_static::lazy_static;
use log::error;

use std::collections::HashMap;

const OPT_PROCESS_NAME_FIELD: &str = "name of process field";

/// Single output port, which receives every event
pub const OUTPUT_PORT: &str = "output";

/// Event annotation receiving the weight
pub const WEIGHT_ANNOTATION: &str = "mc_weight";

/// Bookkeeping information of a simulated sample
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleInfo {
    /// Number of generated events
    pub num_events: Float,

    /// Cross-section of the process (pb)
    pub cross_section: Float,
}
//
impl SampleInfo {
    /// Weight that normalizes each event of the sample to the cross-section
    pub fn weight(&self) -> Float {
        self.cross_section / self.num_events
    }
}

lazy_static! {
    /// Samples of the 13 TeV CSA14 / Phys14 campaigns, by process name
    ///
    /// Leptonic single top cross-sections include the W → ℓν branching ratio
    /// (0.324), QCD ones include the filter efficiency of the enrichment.
    ///
    pub static ref SAMPLES: HashMap<&'static str, SampleInfo> = {
        let samples: [(&str, Float, Float); 21] = [
            ("TToLeptons_t-channel-CSA14_Tune4C_13TeV-aMCatNLO-tauola", 1037660., 136.02 * 0.324),
            ("TBarToLeptons_t-channel_Tune4C_CSA14_13TeV-aMCatNLO-tauola", 519948., 80.95 * 0.324),
            ("T_tW-channel-DR_Tune4C_13TeV-CSA14-powheg-tauola", 986100., 35.6),
            ("Tbar_tW-channel-DR_Tune4C_13TeV-CSA14-powheg-tauola", 971800., 35.6),
            ("TToLeptons_s-channel-CSA14_Tune4C_13TeV-aMCatNLO-tauola", 500000., 7.16 * 0.324),
            ("TBarToLeptons_s-channel-CSA14_Tune4C_13TeV-aMCatNLO-tauola", 250000., 4.20 * 0.324),
            ("TTJets_MSDecaysCKM_central_Tune4C_13TeV-madgraph-tauola", 25446993., 831.76),
            // Cross-section times the number of lepton flavours
            ("WJetsToLNu_13TeV-madgraph-pythia8-tauola", 10017462., 20508.9 * 3.),
            ("DYJetsToLL_M-50_13TeV-madgraph-pythia8", 2829164., 6025.2),
            ("QCD_Pt-20toInf_MuEnrichedPt15_PionKaonDecay_Tune4C_13TeV_pythia8", 4777926., 866600000. * 0.00044),
            ("QCD_Pt_20to30_bcToE_Tune4C_13TeV_pythia8", 999926., 675900000. * 0.00075),
            ("QCD_Pt_30to80_bcToE_Tune4C_13TeV_pythia8", 1852166., 185900000. * 0.00272),
            ("QCD_Pt_80to170_bcToE_Tune4C_13TeV_pythia8", 1000671., 3495000. * 0.01225),
            ("QCD_Pt_170toInf_bcToE_Tune4C_13TeV_pythia8", 1000221., 128500. * 0.0406),
            ("QCD_Pt-20to30_EMEnriched_Tune4C_13TeV_pythia8", 1987127., 677300000. * 0.007),
            ("QCD_Pt-30to80_EMEnriched_Tune4C_13TeV_pythia8", 2000838., 185900000. * 0.056),
            ("QCD_Pt-80to170_EMEnriched_Tune4C_13TeV_pythia8", 1959507., 3529000. * 0.158),
            ("WJetsToLNu_HT-100to200_Tune4C_13TeV-madgraph-tauola", 5262265., 1817.),
            ("WJetsToLNu_HT-200to400_Tune4C_13TeV-madgraph-tauola", 4936077., 471.6),
            ("WJetsToLNu_HT-400to600_Tune4C_13TeV-madgraph-tauola", 4640594., 55.61),
            ("WJetsToLNu_HT-600toInf_Tune4C_13TeV-madgraph-tauola", 4581841., 18.81),
        ];
        samples
            .into_iter()
            .map(|(process, num_events, cross_section)| {
                (process, SampleInfo { num_events, cross_section })
            })
            .collect()
    };
}

/// Event weighting node
///
/// Looks up the sample an event comes from, using the process name that the
/// event is annotated with, and annotates it with the corresponding weight.
/// Events from unknown processes are forwarded without a weight.
///
#[derive(Clone, Debug)]
pub struct EventWeight {
    name: String,
    process_name_field: String,
}
//
impl Default for EventWeight {
    fn default() -> Self {
        Self::new(Self::NODE_TYPE)
    }
}
//
impl EventWeight {
    /// Kind of node
    pub const NODE_TYPE: &'static str = "EventWeight";

    /// Set up event weighting with the default settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            process_name_field: "ProcessName".to_owned(),
        }
    }
}

impl ProcessingNode for EventWeight {
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
        OptionSet::new().declare(
            OPT_PROCESS_NAME_FIELD,
            "",
            self.process_name_field.as_str(),
        )
    }

    fn apply_options(&mut self, options: &OptionSet) -> Result<(), ConfigError> {
        self.process_name_field = options.string(OPT_PROCESS_NAME_FIELD)?;
        Ok(())
    }

    fn analyse(&self, event: &mut Event) -> Result<PortSelection, EventError> {
        let process = event.annotations.string(&self.process_name_field)?;
        match SAMPLES.get(process) {
            Some(sample) => event.annotations.set(WEIGHT_ANNOTATION, sample.weight()),
            None => error!(
                "{}: no event weight information available for process name '{}'",
                self.name, process
            ),
        }
        Ok(PortSelection::to(OUTPUT_PORT))
    }
}
