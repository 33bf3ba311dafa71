//! Option declarations and the values they resolve to.
//!
//! An [`OptionSpec`] is an immutable description of one recognized flag.
//! Specs are shared between parser nodes by reference, so nothing in this
//! module mutates a spec after it is built; the builder methods consume and
//! return `self`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of value a flag stores into its destination.
///
/// # Examples
///
/// ```
/// use pipkit_core::ValueKind;
///
/// assert_eq!(ValueKind::default(), ValueKind::Text);
/// assert!(!ValueKind::Switch.takes_value());
/// assert!(ValueKind::Float.takes_value());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Store-true switch (`--no-input`).
    Switch,
    /// Occurrence counter (`-vvv`).
    Count,
    /// Free-form string (the default).
    #[default]
    Text,
    /// Floating point number (`--timeout 2.5`).
    Float,
}

impl ValueKind {
    /// Returns `true` if the flag consumes a value token.
    pub fn takes_value(self) -> bool {
        !matches!(self, Self::Switch | Self::Count)
    }
}

/// Whether repeated occurrences replace or accumulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    /// Last occurrence wins.
    #[default]
    Single,
    /// Every occurrence is appended to a list.
    Append,
}

/// Whether a flag is listed in help output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Shown,
    Hidden,
}

/// A resolved option value.
///
/// `Unset` is a real value: every declared destination resolves to
/// something, and flags without a default resolve to `Unset`.
///
/// # Examples
///
/// ```
/// use pipkit_core::OptionValue;
///
/// assert!(!OptionValue::Unset.is_truthy());
/// assert!(!OptionValue::Count(0).is_truthy());
/// assert!(OptionValue::Text("x".into()).is_truthy());
/// assert!(!OptionValue::List(vec![]).is_truthy());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OptionValue {
    #[default]
    Unset,
    Bool(bool),
    Count(u32),
    Text(String),
    Float(f64),
    List(Vec<String>),
}

impl OptionValue {
    /// Truthiness used when carrying global values into a command scope.
    ///
    /// `Unset`, `false`, zero, the empty string and the empty list are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Unset => false,
            Self::Bool(b) => *b,
            Self::Count(n) => *n > 0,
            Self::Text(s) => !s.is_empty(),
            Self::Float(f) => *f != 0.0,
            Self::List(items) => !items.is_empty(),
        }
    }

    /// Returns `true` if this value has the shape a spec of `kind` and
    /// `multiplicity` produces. `Unset` fits every spec.
    pub fn fits(&self, kind: ValueKind, multiplicity: Multiplicity) -> bool {
        match (self, kind, multiplicity) {
            (Self::Unset, _, _) => true,
            (Self::List(_), _, Multiplicity::Append) => true,
            (_, _, Multiplicity::Append) => false,
            (Self::Bool(_), ValueKind::Switch, _) => true,
            (Self::Count(_), ValueKind::Count, _) => true,
            (Self::Text(_), ValueKind::Text, _) => true,
            (Self::Float(_), ValueKind::Float, _) => true,
            _ => false,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Count(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Float(v) => write!(f, "{v}"),
            Self::List(items) => f.write_str(&items.join(" ")),
        }
    }
}

/// Declarative description of one recognized flag.
///
/// `name` is the canonical long flag (`--timeout`); `aliases` holds every
/// other spelling, short (`-v`) or long (`--default-timeout`). A spec whose
/// `dest` is `None` is a placeholder separator: it occupies a slot in a
/// node but is never parsed, resolved, or copied into command nodes.
///
/// Use the constructors [`switch`](OptionSpec::switch),
/// [`count`](OptionSpec::count), [`text`](OptionSpec::text),
/// [`float`](OptionSpec::float) and [`append`](OptionSpec::append), then
/// chain builder methods.
///
/// # Examples
///
/// ```
/// use pipkit_core::{OptionSpec, OptionValue, ValueKind};
///
/// let timeout = OptionSpec::float("--timeout", "timeout")
///     .alias("--default-timeout")
///     .with_default(OptionValue::Float(15.0))
///     .with_metavar("sec");
/// assert_eq!(timeout.kind, ValueKind::Float);
/// assert!(timeout.matches("--default-timeout"));
/// assert_eq!(timeout.dest(), Some("timeout"));
///
/// let verbose = OptionSpec::count("--verbose", "verbose").alias("-v");
/// assert_eq!(verbose.short(), Some('v'));
/// assert_eq!(verbose.default, OptionValue::Count(0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    /// Canonical long flag, e.g. `--timeout`.
    pub name: String,
    /// Other spellings, short or long.
    pub aliases: Vec<String>,
    /// Destination key in [`ResolvedOptions`](crate::ResolvedOptions).
    pub dest: Option<String>,
    pub kind: ValueKind,
    pub default: OptionValue,
    pub multiplicity: Multiplicity,
    pub visibility: Visibility,
    /// Placeholder for the value in help output.
    pub metavar: Option<String>,
    pub help: Option<String>,
}

impl OptionSpec {
    fn new(name: &str, dest: &str, kind: ValueKind, default: OptionValue) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            dest: Some(dest.to_string()),
            kind,
            default,
            multiplicity: Multiplicity::Single,
            visibility: Visibility::Shown,
            metavar: None,
            help: None,
        }
    }

    /// Store-true switch defaulting to `false`.
    pub fn switch(name: &str, dest: &str) -> Self {
        Self::new(name, dest, ValueKind::Switch, OptionValue::Bool(false))
    }

    /// Occurrence counter defaulting to `0`.
    pub fn count(name: &str, dest: &str) -> Self {
        Self::new(name, dest, ValueKind::Count, OptionValue::Count(0))
    }

    /// Single string value with no default.
    pub fn text(name: &str, dest: &str) -> Self {
        Self::new(name, dest, ValueKind::Text, OptionValue::Unset)
    }

    /// Single float value with no default.
    pub fn float(name: &str, dest: &str) -> Self {
        Self::new(name, dest, ValueKind::Float, OptionValue::Unset)
    }

    /// Repeatable string value collected into a list, defaulting to `[]`.
    pub fn append(name: &str, dest: &str) -> Self {
        let mut spec = Self::new(name, dest, ValueKind::Text, OptionValue::List(Vec::new()));
        spec.multiplicity = Multiplicity::Append;
        spec
    }

    /// A placeholder entry with no destination.
    pub fn separator() -> Self {
        Self {
            name: String::new(),
            aliases: Vec::new(),
            dest: None,
            kind: ValueKind::Switch,
            default: OptionValue::Unset,
            multiplicity: Multiplicity::Single,
            visibility: Visibility::Hidden,
            metavar: None,
            help: None,
        }
    }

    /// Adds another spelling (`-v`, `--default-timeout`).
    pub fn alias(mut self, flag: &str) -> Self {
        self.aliases.push(flag.to_string());
        self
    }

    pub fn with_default(mut self, default: OptionValue) -> Self {
        self.default = default;
        self
    }

    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    pub fn with_metavar(mut self, metavar: &str) -> Self {
        self.metavar = Some(metavar.to_string());
        self
    }

    /// Hides the flag from help output.
    pub fn hidden(mut self) -> Self {
        self.visibility = Visibility::Hidden;
        self
    }

    pub fn dest(&self) -> Option<&str> {
        self.dest.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.visibility == Visibility::Hidden
    }

    /// Every spelling of this flag, canonical name first.
    pub fn flags(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str())
            .chain(self.aliases.iter().map(String::as_str))
            .filter(|flag| !flag.is_empty())
    }

    /// Checks if `flag` is one of this spec's spellings.
    pub fn matches(&self, flag: &str) -> bool {
        self.flags().any(|f| f == flag)
    }

    /// The first single-character alias, without its dash.
    pub fn short(&self) -> Option<char> {
        self.aliases.iter().find_map(|alias| {
            let rest = alias.strip_prefix('-')?;
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c != '-' => Some(c),
                _ => None,
            }
        })
    }

    /// Long aliases without their leading `--`.
    pub fn long_aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().filter_map(|alias| alias.strip_prefix("--"))
    }
}
