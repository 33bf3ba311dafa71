//! Parser node validation.
//!
//! Catches malformed flag spellings, flags declared twice, destinations
//! declared twice and defaults that do not match their spec's kind before
//! a node is turned into a clap command.
//!
//! # Examples
//!
//! ```
//! use pipkit_core::*;
//!
//! let mut node = ParserNode::new("freeze");
//! node.add_option(OptionSpec::count("--verbose", "verbose").alias("-v"));
//! assert!(validate_parser(&node).is_empty());
//!
//! // Invalid: short alias missing its leading dash
//! let mut bad = ParserNode::new("freeze");
//! bad.add_option(OptionSpec::count("--verbose", "verbose").alias("v"));
//! assert!(!validate_parser(&bad).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{OptionSpec, ParserNode};

/// Parser node validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A short flag that is not a single dash plus one character.
    #[error("invalid short flag format: {0}")]
    InvalidShortFlag(String),
    /// A long flag that does not start with `--` or has no name after it.
    #[error("invalid long flag format: {0}")]
    InvalidLongFlag(String),
    /// The canonical name must be a long flag.
    #[error("canonical flag for '{0}' must be a long flag")]
    CanonicalNotLong(String),
    /// Two specs in the same node share a spelling.
    #[error("duplicate flag in scope: {0}")]
    DuplicateFlag(String),
    /// Two specs in the same node share a destination.
    #[error("duplicate destination in scope: {0}")]
    DuplicateDestination(String),
    /// A default whose shape does not match the spec's kind.
    #[error("default for '{0}' does not match its value kind")]
    DefaultKindMismatch(String),
}

fn check_flag(flag: &str) -> Option<ValidationError> {
    if let Some(name) = flag.strip_prefix("--") {
        if name.is_empty() || name.starts_with('-') {
            return Some(ValidationError::InvalidLongFlag(flag.to_string()));
        }
        return None;
    }
    match flag.strip_prefix('-') {
        Some(name) if name.chars().count() == 1 => None,
        Some(_) => Some(ValidationError::InvalidShortFlag(flag.to_string())),
        None if flag.chars().count() > 1 => Some(ValidationError::InvalidLongFlag(flag.to_string())),
        None => Some(ValidationError::InvalidShortFlag(flag.to_string())),
    }
}

fn validate_spec(spec: &OptionSpec, dest: &str, errors: &mut Vec<ValidationError>) {
    if !spec.name.starts_with("--") {
        errors.push(ValidationError::CanonicalNotLong(dest.to_string()));
    }
    errors.extend(spec.flags().filter_map(check_flag));
    if !spec.default.fits(spec.kind, spec.multiplicity) {
        errors.push(ValidationError::DefaultKindMismatch(dest.to_string()));
    }
}

/// Validates every spec of a parser node.
///
/// Separators (specs without a destination) are skipped. Returns every
/// problem found, in declaration order; an empty vector means the node is
/// valid.
///
/// # Examples
///
/// ```
/// use pipkit_core::*;
///
/// let mut node = ParserNode::new("freeze");
/// node.add_option(OptionSpec::switch("--json", "json"));
/// node.add_option(OptionSpec::switch("--json", "as_json"));
/// assert_eq!(
///     validate_parser(&node),
///     vec![ValidationError::DuplicateFlag("--json".into())]
/// );
/// ```
pub fn validate_parser(node: &ParserNode) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen_flags: HashSet<&str> = HashSet::new();
    let mut seen_dests: HashSet<&str> = HashSet::new();

    for spec in node.all_options() {
        let Some(dest) = spec.dest() else { continue };
        if !seen_dests.insert(dest) {
            errors.push(ValidationError::DuplicateDestination(dest.to_string()));
        }
        for flag in spec.flags() {
            if !seen_flags.insert(flag) {
                errors.push(ValidationError::DuplicateFlag(flag.to_string()));
            }
        }
        validate_spec(spec, dest, &mut errors);
    }

    errors
}
