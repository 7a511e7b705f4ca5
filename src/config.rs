//! Mechanism for declaring, overriding and reading out node options
//!
//! Every node declares its options along with their default value, which also
//! fixes the kind of value the option holds. The host may then override some
//! of them, either programmatically or from a text file, before handing the
//! resulting snapshot over to the node once at the start of the run.

use crate::numeric::Float;

use eyre::WrapErr;
use thiserror::Error;

use std::{fs::File, io::Read, path::Path, str::FromStr};

/// Problems with node options
#[derive(Error, Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum ConfigError {
    /// An option that a node needs was not provided
    #[error("missing option '{0}'")]
    MissingOption(String),

    /// An option override does not match any declared option
    #[error("unknown option '{0}'")]
    UnknownOption(String),

    /// An option holds a value of another kind than the expected one
    #[error("option '{name}' holds a {found} value, expected {expected}")]
    WrongKind {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The textual value of an option could not be parsed
    #[error("could not parse '{value}' as the {kind} value of option '{name}'")]
    InvalidValue {
        name: String,
        value: String,
        kind: &'static str,
    },

    /// A line of an option file is not of the form `name = value`
    #[error("malformed option line '{0}', expected 'name = value'")]
    MalformedLine(String),
}

/// Value of a node option
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum OptionValue {
    String(String),
    Bool(bool),
    Float(Float),
    Int(i64),
    StringList(Vec<String>),
}
//
impl OptionValue {
    /// Human-readable name of the kind of value, for error reporting
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Bool(_) => "boolean",
            Self::Float(_) => "float",
            Self::Int(_) => "integer",
            Self::StringList(_) => "string list",
        }
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Float> for OptionValue {
    fn from(x: Float) -> Self {
        Self::Float(x)
    }
}

impl From<i64> for OptionValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(list: Vec<String>) -> Self {
        Self::StringList(list)
    }
}

impl From<&[&str]> for OptionValue {
    fn from(list: &[&str]) -> Self {
        Self::StringList(list.iter().map(|s| (*s).to_owned()).collect())
    }
}

/// A declared option
#[derive(Clone, Debug, PartialEq)]
pub struct OptionEntry {
    /// Name under which the option is set and read
    pub name: String,

    /// What the option does
    pub description: String,

    /// Current value (initially the default)
    pub value: OptionValue,
}

/// Snapshot of the options of a node
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OptionSet {
    entries: Vec<OptionEntry>,
}
//
impl OptionSet {
    /// Start with no declared option
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an option with its default value
    ///
    /// Redeclaring an option replaces its description and default.
    ///
    pub fn declare(
        mut self,
        name: &str,
        description: &str,
        default: impl Into<OptionValue>,
    ) -> Self {
        let entry = OptionEntry {
            name: name.to_owned(),
            description: description.to_owned(),
            value: default.into(),
        };
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self
    }

    /// Iterate over the options in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &OptionEntry> {
        self.entries.iter()
    }

    /// Override a declared option
    ///
    /// The new value must be of the same kind as the default, except that
    /// integers are accepted for float options.
    ///
    pub fn set(&mut self, name: &str, value: impl Into<OptionValue>) -> Result<(), ConfigError> {
        let entry = self.entry_mut(name)?;
        let value = match (&entry.value, value.into()) {
            (OptionValue::Float(_), OptionValue::Int(i)) => OptionValue::Float(i as Float),
            (current, new) if current.kind() == new.kind() => new,
            (current, new) => {
                return Err(ConfigError::WrongKind {
                    name: name.to_owned(),
                    expected: current.kind(),
                    found: new.kind(),
                })
            }
        };
        entry.value = value;
        Ok(())
    }

    /// Override a declared option from its textual representation, which is
    /// interpreted according to the kind of the option's default value
    pub fn parse_value(&mut self, name: &str, raw: &str) -> Result<(), ConfigError> {
        let entry = self.entry_mut(name)?;
        let item = ConfigItem::new(name, raw.trim());
        entry.value = match entry.value {
            OptionValue::String(_) => OptionValue::String(item.data.to_owned()),
            OptionValue::Bool(_) => OptionValue::Bool(item.parse_bool()?),
            OptionValue::Float(_) => OptionValue::Float(item.parse("float")?),
            OptionValue::Int(_) => OptionValue::Int(item.parse("integer")?),
            OptionValue::StringList(_) => OptionValue::StringList(item.parse_list()),
        };
        Ok(())
    }

    /// Apply overrides from text made of `name = value` lines
    ///
    /// Blank lines and lines starting with `#` are ignored.
    ///
    pub fn apply_overrides(&mut self, text: &str) -> Result<(), ConfigError> {
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (name, raw) = line
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedLine(line.to_owned()))?;
            self.parse_value(name.trim(), raw)?;
        }
        Ok(())
    }

    /// Read out an option of any kind
    pub fn get(&self, name: &str) -> Result<&OptionValue, ConfigError> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.value)
            .ok_or_else(|| ConfigError::MissingOption(name.to_owned()))
    }

    /// Read out a string option
    pub fn string(&self, name: &str) -> Result<String, ConfigError> {
        match self.get(name)? {
            OptionValue::String(s) => Ok(s.clone()),
            other => Err(wrong_kind(name, "string", other)),
        }
    }

    /// Read out a boolean option
    pub fn boolean(&self, name: &str) -> Result<bool, ConfigError> {
        match self.get(name)? {
            OptionValue::Bool(b) => Ok(*b),
            other => Err(wrong_kind(name, "boolean", other)),
        }
    }

    /// Read out a float option
    pub fn float(&self, name: &str) -> Result<Float, ConfigError> {
        match self.get(name)? {
            OptionValue::Float(x) => Ok(*x),
            other => Err(wrong_kind(name, "float", other)),
        }
    }

    /// Read out an integer option
    pub fn int(&self, name: &str) -> Result<i64, ConfigError> {
        match self.get(name)? {
            OptionValue::Int(i) => Ok(*i),
            other => Err(wrong_kind(name, "integer", other)),
        }
    }

    /// Read out a string list option
    pub fn string_list(&self, name: &str) -> Result<Vec<String>, ConfigError> {
        match self.get(name)? {
            OptionValue::StringList(list) => Ok(list.clone()),
            other => Err(wrong_kind(name, "string list", other)),
        }
    }

    fn entry_mut(&mut self, name: &str) -> Result<&mut OptionEntry, ConfigError> {
        self.entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| ConfigError::UnknownOption(name.to_owned()))
    }
}

fn wrong_kind(name: &str, expected: &'static str, found: &OptionValue) -> ConfigError {
    ConfigError::WrongKind {
        name: name.to_owned(),
        expected,
        found: found.kind(),
    }
}

/// Load option overrides from a file (see [`OptionSet::apply_overrides`])
pub fn load_overrides(options: &mut OptionSet, path: impl AsRef<Path>) -> eyre::Result<()> {
    let path = path.as_ref();

    // Read out the option file or die trying
    let text = {
        let mut file = File::open(path)
            .wrap_err_with(|| format!("Failed to open option file {}", path.display()))?;
        let mut buffer = String::new();
        file.read_to_string(&mut buffer)?;
        buffer
    };

    options
        .apply_overrides(&text)
        .wrap_err_with(|| format!("Invalid option file {}", path.display()))
}

/// A textual option value, tagged with the name of the option which it is
/// supposed to set for error reporting purposes.
struct ConfigItem<'data> {
    name: &'data str,
    data: &'data str,
}
//
impl<'data> ConfigItem<'data> {
    /// Build a config item from an option name and raw text
    fn new(name: &'data str, data: &'data str) -> Self {
        Self { name, data }
    }

    /// Parse this data using Rust's standard parsing logic
    fn parse<T: FromStr>(&self, kind: &'static str) -> Result<T, ConfigError> {
        self.data.parse::<T>().map_err(|_| self.invalid(kind))
    }

    /// Parse this data as a boolean, accepting a few common spellings
    fn parse_bool(&self) -> Result<bool, ConfigError> {
        match self.data.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" | ".true." => Ok(true),
            "false" | "no" | "off" | "0" | ".false." => Ok(false),
            _ => Err(self.invalid("boolean")),
        }
    }

    /// Parse this data as a comma-separated list, dropping empty items
    fn parse_list(&self) -> Vec<String> {
        self.data
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect()
    }

    fn invalid(&self, kind: &'static str) -> ConfigError {
        ConfigError::InvalidValue {
            name: self.name.to_owned(),
            value: self.data.to_owned(),
            kind,
        }
    }
}
