//! Resolved option values keyed by destination.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{OptionValue, ParserNode};

/// Where a resolved value came from, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    Default,
    ConfigFile,
    Environment,
    CommandLine,
}

/// Destination key to value, with the source of each value.
///
/// Both maps are ordered, so two resolutions of the same inputs compare
/// equal structurally.
///
/// # Examples
///
/// ```
/// use pipkit_core::*;
///
/// let node = global_parser("/tmp/pipkit.log");
/// let mut options = ResolvedOptions::from_defaults(&node);
/// assert_eq!(options.float("timeout"), Some(15.0));
/// assert_eq!(options.source("timeout"), Some(ValueSource::Default));
///
/// options.set("timeout", OptionValue::Float(3.0), ValueSource::Environment);
/// assert_eq!(options.float("timeout"), Some(3.0));
/// assert_eq!(options.source("timeout"), Some(ValueSource::Environment));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedOptions {
    values: BTreeMap<String, OptionValue>,
    sources: BTreeMap<String, ValueSource>,
}

impl ResolvedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds every destination of `node` with its built-in default.
    pub fn from_defaults(node: &ParserNode) -> Self {
        let mut options = Self::new();
        for spec in node.all_options() {
            if let Some(dest) = spec.dest() {
                options.set(dest, spec.default.clone(), ValueSource::Default);
            }
        }
        options
    }

    pub fn set(&mut self, dest: &str, value: OptionValue, source: ValueSource) {
        self.values.insert(dest.to_string(), value);
        self.sources.insert(dest.to_string(), source);
    }

    pub fn get(&self, dest: &str) -> Option<&OptionValue> {
        self.values.get(dest)
    }

    pub fn source(&self, dest: &str) -> Option<ValueSource> {
        self.sources.get(dest).copied()
    }

    pub fn contains(&self, dest: &str) -> bool {
        self.values.contains_key(dest)
    }

    /// `true` only for a switch explicitly set to `true`.
    pub fn flag(&self, dest: &str) -> bool {
        matches!(self.get(dest), Some(OptionValue::Bool(true)))
    }

    /// Counter value; `0` for anything that is not a count.
    pub fn count(&self, dest: &str) -> u32 {
        match self.get(dest) {
            Some(OptionValue::Count(n)) => *n,
            _ => 0,
        }
    }

    /// Non-empty text value.
    pub fn text(&self, dest: &str) -> Option<&str> {
        match self.get(dest) {
            Some(OptionValue::Text(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    pub fn float(&self, dest: &str) -> Option<f64> {
        match self.get(dest) {
            Some(OptionValue::Float(f)) => Some(*f),
            _ => None,
        }
    }


    /// List value; empty for anything that is not a list.
    pub fn list(&self, dest: &str) -> &[String] {
        match self.get(dest) {
            Some(OptionValue::List(items)) => items,
            _ => &[],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
