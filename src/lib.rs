//! PXL modules: event selection and reconstruction nodes for a HEP analysis
//!
//!
//! # Introduction (for the physicist)
//!
//! This library provides the building blocks of a single top quark analysis
//! of collision events, which are either recorded by a detector or simulated.
//!
//! * Jets are identified against a set of quality cuts, cleaned of the ones
//!   which are too close to selected leptons, and events are sorted by their
//!   number of selected jets.
//! * A leptonically decaying top quark is reconstructed from its lepton,
//!   neutrino and b-jet, together with a "best" top hypothesis that uses the
//!   light jet instead if its mass is closer to the reference top mass, and
//!   with the polarization angles of the decay.
//! * Simulated events are weighted by the cross-section of their process,
//!   divided by the number of events that were generated for it.
//!
//!
//! # Introduction (for the computer guy)
//!
//! Every analysis step is a [`ProcessingNode`]: it is configured once through
//! an [`OptionSet`], then receives [`Record`]s, annotates the events among
//! them in place and tells on which of its named output ports they should
//! continue. A [`Pipeline`] wires the nodes together, and the
//! [`scheduling`] module pushes batches of records through it, sequentially
//! or on multiple threads.

#![warn(missing_docs)]

pub mod config;
pub mod event;
pub mod event_weight;
pub mod jet_selection;
pub mod momentum;
pub mod node;
pub mod numeric;
pub mod pipeline;
pub mod scheduling;
pub mod top_reconstruction;

pub use crate::{
    config::{ConfigError, OptionSet, OptionValue},
    event::{Annotation, Event, EventError, InformationChunk, Particle, Record, View},
    event_weight::EventWeight,
    jet_selection::{JetMultiplicity, JetSelection},
    node::{NodeError, PortSelection, ProcessingNode},
    pipeline::{GraphError, NodeId, Pipeline, RoutingSummary},
    top_reconstruction::TopReconstruction,
};
