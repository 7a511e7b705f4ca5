//! Common skeleton of the analysis nodes
//!
//! A node has a single input port and a fixed set of named output ports. It is
//! configured once before the first event, and then analyses one record at a
//! time, synchronously, telling the caller which output ports the (possibly
//! modified) record should be forwarded to.

use crate::{
    config::{ConfigError, OptionSet},
    event::{Event, EventError, Record},
};

use log::error;
use thiserror::Error;

/// Name of the single input port of every node
pub const INPUT_PORT: &str = "input";

/// Errors reported by nodes, always tagged with the identity of the node
#[derive(Error, Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum NodeError {
    /// The node was handed something else than an event
    #[error("{node}: expected an event, got a {found}")]
    TypeMismatch { node: String, found: &'static str },

    /// The node's options are incomplete or ill-typed
    #[error("{node}: invalid configuration")]
    Configuration {
        node: String,
        #[source]
        source: ConfigError,
    },

    /// Something went wrong while analysing an event
    #[error("{node}: failed to analyse event")]
    Execution {
        node: String,
        #[source]
        source: EventError,
    },
}
//
impl NodeError {
    /// Identity of the node that reported the error
    pub fn node(&self) -> &str {
        match self {
            Self::TypeMismatch { node, .. }
            | Self::Configuration { node, .. }
            | Self::Execution { node, .. } => node,
        }
    }
}

/// Output ports that a record must be forwarded to
///
/// An empty selection means that the record is dropped.
///
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PortSelection(Vec<&'static str>);
//
impl PortSelection {
    /// Forward the record nowhere
    pub fn none() -> Self {
        Self::default()
    }

    /// Forward the record to a single port
    pub fn to(port: &'static str) -> Self {
        Self(vec![port])
    }

    /// Additionally forward the record to another port
    pub fn and(mut self, port: &'static str) -> Self {
        if !self.0.contains(&port) {
            self.0.push(port);
        }
        self
    }

    /// Selected ports, in selection order
    pub fn ports(&self) -> &[&'static str] {
        &self.0
    }

    /// Truth that the record is dropped
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Interface shared by all analysis nodes
///
/// Implementors provide the per-event analysis in [`analyse`], while the
/// record type check and the error tagging are handled by [`process`].
///
/// Nodes are not mutated while processing events, so a configured node can be
/// shared between threads which process independent events.
///
/// [`analyse`]: ProcessingNode::analyse
/// [`process`]: ProcessingNode::process
pub trait ProcessingNode: Send + Sync {
    /// Name of the kind of node (e.g. "JetSelection")
    fn node_type(&self) -> &'static str;

    /// Identity of this node instance, used to tag errors and log messages
    fn name(&self) -> &str;

    /// Names of the output ports, which never change during the node's life
    fn output_ports(&self) -> &'static [&'static str];

    /// Declared options of this node, holding its current settings (which
    /// are the defaults until the node is configured)
    fn default_options(&self) -> OptionSet;

    /// Read out the options, before the first event is processed
    fn apply_options(&mut self, options: &OptionSet) -> Result<(), ConfigError>;

    /// Analyse an event and select the output ports it should go to
    fn analyse(&self, event: &mut Event) -> Result<PortSelection, EventError>;

    /// Configure the node, tagging errors with the node's identity
    fn configure(&mut self, options: &OptionSet) -> Result<(), NodeError> {
        self.apply_options(options)
            .map_err(|source| NodeError::Configuration {
                node: self.name().to_owned(),
                source,
            })
    }

    /// Process a record delivered to the input port
    fn process(&self, record: &mut Record) -> Result<PortSelection, NodeError> {
        let found = record.kind();
        let Some(event) = record.as_event_mut() else {
            error!("{}: analysed record is not an event but a {}", self.name(), found);
            return Err(NodeError::TypeMismatch {
                node: self.name().to_owned(),
                found,
            });
        };
        let selection = self.analyse(event).map_err(|source| NodeError::Execution {
            node: self.name().to_owned(),
            source,
        })?;
        debug_assert!(
            selection
                .ports()
                .iter()
                .all(|port| self.output_ports().contains(port)),
            "{}: selected an undeclared output port among {:?}",
            self.name(),
            selection.ports()
        );
        Ok(selection)
    }
}
