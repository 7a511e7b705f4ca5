//! This module defines the records which flow through the analysis nodes:
//! events, their views, the particles inside of them, and the key/value
//! annotations that can be attached to all of the above.

use crate::{
    momentum::{self, Momentum},
    numeric::Float,
};
use std::collections::BTreeMap;
use thiserror::Error;

/// Faults that can occur while reading annotations
#[derive(Error, Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum EventError {
    /// A mandatory annotation is not present
    #[error("missing annotation '{key}'")]
    MissingAnnotation { key: String },

    /// An annotation holds a value of an unexpected kind
    #[error("annotation '{key}' holds a {found} value, expected {expected}")]
    AnnotationKind {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Scalar value attached to an event, view or particle
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum Annotation {
    Bool(bool),
    Int(i64),
    Float(Float),
    Str(String),
}
//
impl Annotation {
    /// Human-readable name of the kind of value, for error reporting
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }
}

impl From<bool> for Annotation {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Annotation {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Annotation {
    fn from(i: i32) -> Self {
        Self::Int(i.into())
    }
}

impl From<Float> for Annotation {
    fn from(x: Float) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Annotation {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for Annotation {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// String-keyed annotations
///
/// Numeric readout is lenient in the same way as the upstream producers are:
/// integers may be read as floats and floats may be read (truncated) as
/// integers. Booleans and strings are never converted.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Annotations(BTreeMap<String, Annotation>);
//
impl Annotations {
    /// Start with no annotation
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an annotation
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Annotation>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw access to an annotation
    pub fn get(&self, key: &str) -> Option<&Annotation> {
        self.0.get(key)
    }

    /// Truth that an annotation is present
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of annotations
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Truth that there is no annotation
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over annotations in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Annotation)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Read a numeric annotation as a float, if present
    pub fn float_opt(&self, key: &str) -> Result<Option<Float>, EventError> {
        match self.get(key) {
            None => Ok(None),
            Some(Annotation::Float(x)) => Ok(Some(*x)),
            Some(Annotation::Int(i)) => Ok(Some(*i as Float)),
            Some(other) => Err(kind_error(key, "float", other)),
        }
    }

    /// Read a mandatory numeric annotation as a float
    pub fn float(&self, key: &str) -> Result<Float, EventError> {
        self.float_opt(key)?.ok_or_else(|| missing(key))
    }

    /// Read a mandatory numeric annotation as an integer
    pub fn int(&self, key: &str) -> Result<i64, EventError> {
        match self.get(key) {
            None => Err(missing(key)),
            Some(Annotation::Int(i)) => Ok(*i),
            Some(Annotation::Float(x)) => Ok(*x as i64),
            Some(other) => Err(kind_error(key, "integer", other)),
        }
    }

    /// Read a mandatory string annotation
    pub fn string(&self, key: &str) -> Result<&str, EventError> {
        match self.get(key) {
            None => Err(missing(key)),
            Some(Annotation::Str(s)) => Ok(s),
            Some(other) => Err(kind_error(key, "string", other)),
        }
    }
}

fn missing(key: &str) -> EventError {
    EventError::MissingAnnotation {
        key: key.to_owned(),
    }
}

fn kind_error(key: &str, expected: &'static str, found: &Annotation) -> EventError {
    EventError::AnnotationKind {
        key: key.to_owned(),
        expected,
        found: found.kind(),
    }
}

/// Reconstructed physics object
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    /// Role of the particle in the analysis (e.g. "Jet", "TightMuon")
    pub name: String,

    /// 4-momentum
    pub p4: Momentum,

    /// Identification variables and derived quantities
    pub annotations: Annotations,
}
//
impl Particle {
    /// Build a particle with a given role and 4-momentum
    pub fn new(name: impl Into<String>, p4: Momentum) -> Self {
        Self {
            name: name.into(),
            p4,
            annotations: Annotations::new(),
        }
    }

    /// Build a composite particle whose 4-momentum is the sum of constituents
    pub fn composite<'a>(
        name: impl Into<String>,
        constituents: impl IntoIterator<Item = &'a Momentum>,
    ) -> Self {
        let p4 = constituents
            .into_iter()
            .fold(Momentum::zeros(), |sum, p| sum + p);
        Self::new(name, p4)
    }

    /// Builder-style annotation, handy when setting up events
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Annotation>) -> Self {
        self.annotations.set(key, value);
        self
    }

    /// Transverse momentum
    pub fn pt(&self) -> Float {
        momentum::pt(&self.p4)
    }

    /// Pseudorapidity
    pub fn eta(&self) -> Float {
        momentum::eta(&self.p4)
    }

    /// Invariant mass
    pub fn mass(&self) -> Float {
        momentum::mass(&self.p4)
    }
}

/// Named collection of particles within an event, e.g. one reconstruction
/// hypothesis. Several views of an event may share the same name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct View {
    /// Name of the view
    pub name: String,

    /// Particles, in insertion order
    pub particles: Vec<Particle>,

    /// View-level annotations
    pub annotations: Annotations,
}
//
impl View {
    /// Build an empty view
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append a particle, returning its index
    pub fn push(&mut self, particle: Particle) -> usize {
        self.particles.push(particle);
        self.particles.len() - 1
    }

    /// Builder-style particle insertion
    pub fn with(mut self, particle: Particle) -> Self {
        self.push(particle);
        self
    }

    /// Index of the first particle playing a certain role
    ///
    /// If several particles share the role name, the one that was inserted
    /// first wins. This is an ordering convention of the producers, not a
    /// physics criterion, so views with duplicate roles should be avoided.
    ///
    pub fn find_first(&self, role: &str) -> Option<usize> {
        self.particles.iter().position(|p| p.name == role)
    }

    /// Iterate over the particles playing a certain role
    pub fn particles_named<'a>(&'a self, role: &'a str) -> impl Iterator<Item = &'a Particle> {
        self.particles.iter().filter(move |p| p.name == role)
    }
}

/// Unit of work of the analysis pipeline
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Event {
    /// Views, in insertion order
    pub views: Vec<View>,

    /// Event-level annotations (process name, weights...)
    pub annotations: Annotations,
}
//
impl Event {
    /// Build an empty event
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a view, returning a mutable reference to it
    pub fn add_view(&mut self, view: View) -> &mut View {
        self.views.push(view);
        let last = self.views.len() - 1;
        &mut self.views[last]
    }

    /// Builder-style view insertion
    pub fn with_view(mut self, view: View) -> Self {
        self.views.push(view);
        self
    }

    /// Iterate over the views with a certain name
    pub fn views_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a View> {
        self.views.iter().filter(move |v| v.name == name)
    }

    /// Mutably iterate over the views with a certain name
    pub fn views_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut View> {
        self.views.iter_mut().filter(move |v| v.name == name)
    }
}

/// Free-standing block of metadata that can travel alongside events
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InformationChunk {
    /// Name of the chunk
    pub name: String,

    /// Metadata
    pub annotations: Annotations,
}

/// Anything that can be delivered to a node's input port
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    /// Physics event, the only record kind that analysis nodes process
    Event(Event),

    /// Metadata block, passed around but never analysed
    InformationChunk(InformationChunk),
}
//
impl Record {
    /// Human-readable name of the record type, for error reporting
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Event(_) => "event",
            Self::InformationChunk(_) => "information chunk",
        }
    }

    /// Access the event, if this record is one
    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Self::Event(event) => Some(event),
            _ => None,
        }
    }

    /// Mutably access the event, if this record is one
    pub fn as_event_mut(&mut self) -> Option<&mut Event> {
        match self {
            Self::Event(event) => Some(event),
            _ => None,
        }
    }
}

impl From<Event> for Record {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

impl From<InformationChunk> for Record {
    fn from(chunk: InformationChunk) -> Self {
        Self::InformationChunk(chunk)
    }
}
