//! Layered option resolution.
//!
//! Precedence, lowest first: built-in default, the `global` config
//! section, the node's own config section, `PIPKIT_*` environment
//! variables, command-line tokens. Config sections and the environment are
//! merged into one map keyed by normalized flag, so a later source simply
//! overwrites an earlier one under the same key.

use std::cell::OnceCell;
use std::collections::BTreeMap;

use pipkit_core::{GLOBAL_PARSER, ParsedArgs, ParserNode, ResolvedOptions, ValueSource, parse_args};
use tracing::{debug, trace};

use crate::coerce::coerce;
use crate::error::{ResolveError, Result};
use crate::sources::{ConfigFiles, Environment};

/// Normalizes a config or environment key to long-flag form.
///
/// # Examples
///
/// ```
/// use pipkit_config::normalize_key;
///
/// assert_eq!(normalize_key("no_input"), "--no-input");
/// assert_eq!(normalize_key("no-input"), "--no-input");
/// assert_eq!(normalize_key("--no-input"), "--no-input");
/// ```
pub fn normalize_key(key: &str) -> String {
    let key = key.replace('_', "-");
    if key.starts_with("--") {
        key
    } else {
        format!("--{key}")
    }
}

fn collect_raw(
    node: &ParserNode,
    files: &ConfigFiles,
    env: &Environment,
) -> Result<BTreeMap<String, (String, ValueSource)>> {
    let mut sections = vec![GLOBAL_PARSER];
    if node.name != GLOBAL_PARSER {
        sections.push(node.name.as_str());
    }

    let mut merged = BTreeMap::new();
    for section in sections {
        for (key, value) in files.section(section) {
            merged.insert(normalize_key(key), (value.to_string(), ValueSource::ConfigFile));
        }
    }
    for (key, value) in env.prefixed()? {
        merged.insert(normalize_key(&key), (value, ValueSource::Environment));
    }
    Ok(merged)
}

/// Applies config-file and environment values onto `defaults`.
///
/// Keys that name no flag of `node` are ignored, as are empty values.
/// When two keys reach the same destination through different aliases,
/// the one from the higher-precedence source wins; within one source the
/// lexically later key wins.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`](crate::ConfigError::InvalidValue)
/// for a value that does not coerce, and
/// [`ConfigError::Environment`](crate::ConfigError::Environment) if the
/// environment cannot be read.
pub fn update_defaults(
    node: &ParserNode,
    files: &ConfigFiles,
    env: &Environment,
    defaults: &mut ResolvedOptions,
) -> Result<()> {
    let mut entries: Vec<_> = collect_raw(node, files, env)?.into_iter().collect();
    entries.sort_by_key(|(_, (_, source))| *source);

    for (key, (raw, source)) in entries {
        if raw.trim().is_empty() {
            continue;
        }
        let Some((spec, dest)) = node
            .find_flag(&key)
            .and_then(|spec| spec.dest().map(|dest| (spec, dest)))
        else {
            trace!(key = %key, parser = %node.name, "ignoring unknown option key");
            continue;
        };
        let value = coerce(spec, &key, &raw)?;
        debug!(dest, ?source, %value, "option default overridden");
        defaults.set(dest, value, source);
    }
    Ok(())
}

/// Built-in defaults of `node` with config and environment applied.
///
/// # Errors
///
/// See [`update_defaults`].
///
/// # Examples
///
/// ```
/// use pipkit_config::{ConfigFiles, Environment, resolve_defaults};
/// use pipkit_core::{ValueSource, global_parser};
///
/// let node = global_parser("/tmp/pipkit.log");
/// let files = ConfigFiles::from_ini_str("[global]\ntimeout = 60\n").unwrap();
/// let env = Environment::from_pairs([("PIPKIT_TIMEOUT", "90")]);
///
/// let defaults = resolve_defaults(&node, &files, &env).unwrap();
/// assert_eq!(defaults.float("timeout"), Some(90.0));
/// assert_eq!(defaults.source("timeout"), Some(ValueSource::Environment));
/// ```
pub fn resolve_defaults(
    node: &ParserNode,
    files: &ConfigFiles,
    env: &Environment,
) -> Result<ResolvedOptions> {
    let mut defaults = ResolvedOptions::from_defaults(node);
    update_defaults(node, files, env, &mut defaults)?;
    Ok(defaults)
}

/// Resolves `node` against every source, command line last.
///
/// # Errors
///
/// Returns [`ResolveError::Config`] for bad config or environment values
/// and [`ResolveError::Parse`] for malformed command-line tokens.
pub fn resolve(
    node: &ParserNode,
    files: &ConfigFiles,
    env: &Environment,
    cli_args: &[String],
) -> std::result::Result<ParsedArgs, ResolveError> {
    ConfigOptionParser::new(node, files, env).parse_args(cli_args)
}

/// A parser node bound to its config sources.
///
/// Defaults are resolved on first use and cached, so repeated calls see
/// the same values.
#[derive(Debug)]
pub struct ConfigOptionParser<'a> {
    node: &'a ParserNode,
    files: &'a ConfigFiles,
    env: &'a Environment,
    defaults: OnceCell<ResolvedOptions>,
}

impl<'a> ConfigOptionParser<'a> {
    pub fn new(node: &'a ParserNode, files: &'a ConfigFiles, env: &'a Environment) -> Self {
        Self {
            node,
            files,
            env,
            defaults: OnceCell::new(),
        }
    }

    pub fn node(&self) -> &ParserNode {
        self.node
    }

    /// Resolved defaults, computed once.
    ///
    /// # Errors
    ///
    /// See [`update_defaults`]. A failed resolution is not cached.
    pub fn get_default_values(&self) -> Result<&ResolvedOptions> {
        if let Some(defaults) = self.defaults.get() {
            return Ok(defaults);
        }
        let defaults = resolve_defaults(self.node, self.files, self.env)?;
        Ok(self.defaults.get_or_init(|| defaults))
    }

    /// Parses command-line tokens on top of the resolved defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Config`] if defaults fail to resolve and
    /// [`ResolveError::Parse`] if the tokens are malformed.
    pub fn parse_args(&self, tokens: &[String]) -> std::result::Result<ParsedArgs, ResolveError> {
        let defaults = self.get_default_values()?;
        Ok(parse_args(self.node, defaults, tokens)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use pipkit_core::{CommandSpec, OptionSpec, OptionValue, build_command_parser, global_parser};

    fn freeze_node() -> ParserNode {
        let spec = CommandSpec::new("freeze", "")
            .with_option(OptionSpec::append("--find-links", "find_links").alias("-f"))
            .with_option(OptionSpec::switch("--find-tags", "find_tags"));
        build_command_parser(&global_parser("/tmp/pipkit.log"), &spec).unwrap()
    }

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_command_section_overrides_global_section() {
        let node = freeze_node();
        let files = ConfigFiles::from_ini_str("[global]\ntimeout = 10\n[freeze]\ntimeout = 20\n[list]\ntimeout = 30\n").unwrap();
        let defaults = resolve_defaults(&node, &files, &Environment::default()).unwrap();
        assert_eq!(defaults.float("timeout"), Some(20.0));
    }

    #[test]
    fn test_multiline_append_value() {
        let node = freeze_node();
        let files = ConfigFiles::from_ini_str("[freeze]\nfind-links =\n    http://a\n    http://b\n").unwrap();
        let defaults = resolve_defaults(&node, &files, &Environment::default()).unwrap();
        assert_eq!(defaults.list("find_links"), ["http://a", "http://b"]);
    }

    #[test]
    fn test_global_node_reads_only_global_section() {
        let node = global_parser("/tmp/pipkit.log");
        let files = ConfigFiles::from_ini_str("[global]\ntimeout = 10\n[freeze]\ntimeout = 20\n").unwrap();
        let defaults = resolve_defaults(&node, &files, &Environment::default()).unwrap();
        assert_eq!(defaults.float("timeout"), Some(10.0));
    }

    #[test]
    fn test_cli_beats_environment() {
        let node = freeze_node();
        let env = Environment::from_pairs([("PIPKIT_TIMEOUT", "90")]);
        let parsed = resolve(&node, &ConfigFiles::empty(), &env, &tokens(&["--timeout", "5"])).unwrap();
        assert_eq!(parsed.options.float("timeout"), Some(5.0));
    }

    #[test]
    fn test_dash_and_underscore_keys() {
        let node = freeze_node();
        let files = ConfigFiles::from_ini_str("[freeze]\nfind_tags = yes\n").unwrap();
        let env = Environment::from_pairs([("PIPKIT_NO_INPUT", "true")]);
        let defaults = resolve_defaults(&node, &files, &env).unwrap();
        assert!(defaults.flag("find_tags"));
        assert!(defaults.flag("no_input"));
    }

    #[test]
    fn test_alias_key_reaches_destination() {
        let node = freeze_node();
        let env = Environment::from_pairs([("PIPKIT_DEFAULT_TIMEOUT", "7")]);
        let files = ConfigFiles::from_ini_str("[global]\ntimeout = 60\n").unwrap();
        let defaults = resolve_defaults(&node, &files, &env).unwrap();
        assert_eq!(defaults.float("timeout"), Some(7.0));
    }

    #[test]
    fn test_append_config_replaces_default() {
        let node = freeze_node();
        let files = ConfigFiles::from_ini_str("[freeze]\nfind-links = http://a http://b\n").unwrap();
        let defaults = resolve_defaults(&node, &files, &Environment::default()).unwrap();
        assert_eq!(
            defaults.get("find_links"),
            Some(&OptionValue::List(vec!["http://a".into(), "http://b".into()]))
        );
    }

    #[test]
    fn test_empty_values_never_override() {
        let node = freeze_node();
        let files = ConfigFiles::from_ini_str("[global]\ntimeout = 60\n").unwrap();
        let env = Environment::from_pairs([("PIPKIT_TIMEOUT", "")]);
        let defaults = resolve_defaults(&node, &files, &env).unwrap();
        assert_eq!(defaults.float("timeout"), Some(60.0));
        assert_eq!(defaults.source("timeout"), Some(ValueSource::ConfigFile));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let node = freeze_node();
        let env = Environment::from_pairs([("PIPKIT_CONFIG_FILE", "/x"), ("PIPKIT_BOGUS", "1")]);
        let defaults = resolve_defaults(&node, &ConfigFiles::empty(), &env).unwrap();
        assert_eq!(defaults, ResolvedOptions::from_defaults(&node));
    }

    #[test]
    fn test_bad_value_is_fatal() {
        let node = freeze_node();
        let env = Environment::from_pairs([("PIPKIT_REQUIRE_VENV", "perhaps")]);
        let err = resolve_defaults(&node, &ConfigFiles::empty(), &env).unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "--require-venv");
                assert_eq!(value, "perhaps");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_defaults_are_cached() {
        let node = freeze_node();
        let files = ConfigFiles::empty();
        let env = Environment::default();
        let parser = ConfigOptionParser::new(&node, &files, &env);
        let first = parser.get_default_values().unwrap() as *const ResolvedOptions;
        let second = parser.get_default_values().unwrap() as *const ResolvedOptions;
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_error_surfaces() {
        let node = freeze_node();
        let err = resolve(&node, &ConfigFiles::empty(), &Environment::default(), &tokens(&["--nope"])).unwrap_err();
        assert!(matches!(err, ResolveError::Parse(_)));
    }
}
