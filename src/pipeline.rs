//! Wiring of analysis nodes into a processing graph
//!
//! The first node that is added to a pipeline receives the incoming records.
//! Output ports can be connected to the input of nodes that were added later,
//! which keeps the graph acyclic. Records which leave the pipeline through an
//! unconnected output port are tallied in a [`RoutingSummary`].

use crate::{
    event::Record,
    node::{NodeError, ProcessingNode},
};

use log::{debug, trace};
use thiserror::Error;

use std::{
    collections::{BTreeMap, HashMap},
    fmt::{self, Display},
};

/// Problems with the wiring of a pipeline
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum GraphError {
    /// There is no node with this identifier
    #[error("unknown node #{0}")]
    UnknownNode(usize),

    /// The node has no output port with this name
    #[error("node '{node}' has no output port '{port}'")]
    UnknownPort { node: String, port: String },

    /// The output port already feeds another node
    #[error("output port '{port}' of node '{node}' is already connected")]
    PortInUse { node: String, port: &'static str },

    /// Links must go from older to newer nodes
    #[error("node '{from}' cannot feed node '{to}', which was added before it")]
    BackwardLink { from: String, to: String },
}

/// Identifier of a node within a pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Graph of analysis nodes
#[derive(Default)]
pub struct Pipeline {
    /// Nodes, in insertion order
    nodes: Vec<Box<dyn ProcessingNode>>,

    /// Downstream node of each connected output port
    links: HashMap<(NodeId, &'static str), NodeId>,
}
//
impl Pipeline {
    /// Start with an empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, the first one being the entry point of the pipeline
    pub fn add_node(&mut self, node: impl ProcessingNode + 'static) -> NodeId {
        self.nodes.push(Box::new(node));
        NodeId(self.nodes.len() - 1)
    }

    /// Access a node
    pub fn node(&self, id: NodeId) -> Result<&dyn ProcessingNode, GraphError> {
        self.nodes
            .get(id.0)
            .map(Box::as_ref)
            .ok_or(GraphError::UnknownNode(id.0))
    }

    /// Mutably access a node, e.g. to configure it
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut dyn ProcessingNode, GraphError> {
        match self.nodes.get_mut(id.0) {
            Some(node) => Ok(node.as_mut()),
            None => Err(GraphError::UnknownNode(id.0)),
        }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Truth that the pipeline has no node
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Forward the records leaving an output port of a node to another node
    pub fn connect(&mut self, from: NodeId, port: &str, to: NodeId) -> Result<(), GraphError> {
        let source = self.node(from)?;
        let target = self.node(to)?;
        let port = source
            .output_ports()
            .iter()
            .copied()
            .find(|p| *p == port)
            .ok_or_else(|| GraphError::UnknownPort {
                node: source.name().to_owned(),
                port: port.to_owned(),
            })?;
        if to <= from {
            return Err(GraphError::BackwardLink {
                from: source.name().to_owned(),
                to: target.name().to_owned(),
            });
        }
        if self.links.contains_key(&(from, port)) {
            return Err(GraphError::PortInUse {
                node: source.name().to_owned(),
                port,
            });
        }
        debug!("Connecting {}/{} to {}", source.name(), port, target.name());
        self.links.insert((from, port), to);
        Ok(())
    }

    /// Configure every node with its declared options, so that
    /// configuration errors show up before the first event
    pub fn configure_all(&mut self) -> Result<(), NodeError> {
        for node in &mut self.nodes {
            let options = node.default_options();
            node.configure(&options)?;
        }
        Ok(())
    }

    /// Push a record through the pipeline
    ///
    /// Records that are not events are dropped and counted as rejected.
    /// Execution errors abort the processing of the record and are returned.
    ///
    pub fn run(&self, record: &mut Record, summary: &mut RoutingSummary) -> Result<(), NodeError> {
        if self.nodes.is_empty() {
            summary.dropped += 1;
            return Ok(());
        }
        self.visit(NodeId(0), record, summary)
    }

    /// Process a record within a node, then forward it to its destinations
    fn visit(
        &self,
        id: NodeId,
        record: &mut Record,
        summary: &mut RoutingSummary,
    ) -> Result<(), NodeError> {
        let node = &self.nodes[id.0];
        let selection = match node.process(record) {
            Ok(selection) => selection,
            Err(NodeError::TypeMismatch { .. }) => {
                summary.rejected += 1;
                return Ok(());
            }
            Err(other) => return Err(other),
        };

        // Each extra destination gets its own copy of the record
        let Some((&last, others)) = selection.ports().split_last() else {
            trace!("{}: record dropped", node.name());
            summary.dropped += 1;
            return Ok(());
        };
        for &port in others {
            let mut copy = record.clone();
            self.forward(id, port, &mut copy, summary)?;
        }
        self.forward(id, last, record, summary)
    }

    /// Send a record leaving an output port to its destination
    fn forward(
        &self,
        from: NodeId,
        port: &'static str,
        record: &mut Record,
        summary: &mut RoutingSummary,
    ) -> Result<(), NodeError> {
        match self.links.get(&(from, port)) {
            Some(&to) => self.visit(to, record, summary),
            None => {
                summary.record_arrival(self.nodes[from.0].name(), port);
                Ok(())
            }
        }
    }
}

/// Tally of where the records pushed through a pipeline ended up
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoutingSummary {
    /// Records which left the pipeline, by node name and output port
    arrivals: BTreeMap<String, BTreeMap<&'static str, usize>>,

    /// Records that a node forwarded nowhere
    dropped: usize,

    /// Records that were not events
    rejected: usize,
}
//
impl RoutingSummary {
    /// Start with an empty tally
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a record leaving the pipeline through some output port
    pub fn record_arrival(&mut self, node: &str, port: &'static str) {
        *self
            .arrivals
            .entry(node.to_owned())
            .or_default()
            .entry(port)
            .or_default() += 1;
    }

    /// Number of records which left the pipeline through some output port
    pub fn arrivals(&self, node: &str, port: &str) -> usize {
        self.arrivals
            .get(node)
            .and_then(|ports| ports.get(port))
            .copied()
            .unwrap_or(0)
    }

    /// Iterate over the (node, port, count) triplets, in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &'static str, usize)> + '_ {
        self.arrivals.iter().flat_map(|(node, ports)| {
            ports
                .iter()
                .map(move |(&port, &count)| (node.as_str(), port, count))
        })
    }

    /// Number of records that a node forwarded nowhere
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Number of records that were not events
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Integrate the tally of another batch of records
    pub fn merge(&mut self, other: Self) {
        for (node, ports) in other.arrivals {
            let target = self.arrivals.entry(node).or_default();
            for (port, count) in ports {
                *target.entry(port).or_default() += count;
            }
        }
        self.dropped += other.dropped;
        self.rejected += other.rejected;
    }
}

impl Display for RoutingSummary {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (node, port, count) in self.iter() {
            writeln!(fmt, "{:<40}: {}", format!("{node} / {port}"), count)?;
        }
        writeln!(fmt, "{:<40}: {}", "dropped", self.dropped)?;
        write!(fmt, "{:<40}: {}", "rejected", self.rejected)
    }
}
