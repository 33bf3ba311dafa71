//! Raw option sources: INI config files and the process environment.
//!
//! Both are snapshots. [`Environment`] is captured once and passed around
//! explicitly, so resolution never reads process state on its own and
//! tests can build any environment they need.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, File, FileStoredFormat, Format, Map, Source, Value, ValueKind};
use ini::{Ini, ParseOption};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::locations;

/// Prefix of environment variables that set option defaults.
pub const ENV_PREFIX: &str = "PIPKIT";

/// Snapshot of environment variables.
///
/// # Examples
///
/// ```
/// use pipkit_config::Environment;
///
/// let env = Environment::from_pairs([("PIPKIT_NO_INPUT", "yes"), ("HOME", "/home/me")]);
/// assert_eq!(env.get("HOME"), Some("/home/me"));
///
/// let options = env.prefixed().unwrap();
/// assert_eq!(options.get("no_input").map(String::as_str), Some("yes"));
/// assert!(!options.contains_key("home"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Captures the current process environment. Non-UTF-8 entries are
    /// skipped.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Non-empty value of `key`.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    /// Variables carrying the [`ENV_PREFIX`], prefix stripped and key
    /// lowercased.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Environment`] if the snapshot cannot be
    /// collected.
    pub fn prefixed(&self) -> Result<BTreeMap<String, String>> {
        let source = config::Environment::with_prefix(ENV_PREFIX).source(Some(
            self.vars
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ));
        let collected = source.collect().map_err(ConfigError::Environment)?;

        let mut options = BTreeMap::new();
        for (key, value) in collected {
            let value = value.into_string().map_err(ConfigError::Environment)?;
            options.insert(key, value);
        }
        Ok(options)
    }
}

/// INI format that folds indented lines into the preceding value.
///
/// ```text
/// [freeze]
/// find-links =
///     http://a
///     http://b
/// ```
///
/// Backslashes are literal.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndentedIni;

impl Format for IndentedIni {
    fn parse(
        &self,
        uri: Option<&String>,
        text: &str,
    ) -> std::result::Result<Map<String, Value>, Box<dyn std::error::Error + Send + Sync>> {
        let options = ParseOption {
            enabled_escape: false,
            enabled_indented_mutiline_value: true,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(text, options)?;

        let mut root = Map::new();
        for (section, properties) in ini.iter() {
            let entries = properties.iter().map(|(k, v)| {
                let value = ValueKind::String(v.trim().to_string());
                (k.to_string(), Value::new(uri, value))
            });
            match section {
                Some(name) => {
                    let table: Map<String, Value> = entries.collect();
                    root.insert(name.to_string(), Value::new(uri, ValueKind::Table(table)));
                }
                None => root.extend(entries),
            }
        }
        Ok(root)
    }
}

impl FileStoredFormat for IndentedIni {
    fn file_extensions(&self) -> &'static [&'static str] {
        &["ini", "conf", "cfg"]
    }
}

/// Parsed INI config: section name to key/value pairs.
///
/// # Examples
///
/// ```
/// use pipkit_config::ConfigFiles;
///
/// let files = ConfigFiles::from_ini_str("[global]\ntimeout = 60\n\n[freeze]\nfind-tags = yes\n").unwrap();
/// assert_eq!(files.section("global").collect::<Vec<_>>(), vec![("timeout", "60")]);
/// assert_eq!(files.section("install").count(), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFiles {
    sections: BTreeMap<String, BTreeMap<String, String>>,
    paths: Vec<PathBuf>,
}

impl ConfigFiles {
    /// No config at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads the config files for this environment.
    ///
    /// See [`config_files`](crate::config_files) for how they are chosen.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if a file exists but cannot be parsed.
    pub fn discover(env: &Environment) -> Result<Self> {
        Self::load(&locations::config_files(env))
    }

    /// Loads `paths` in order; later files override earlier ones key by
    /// key. Missing files are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if a file exists but cannot be parsed.
    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        let mut files = Self::empty();
        for path in paths {
            if !path.is_file() {
                debug!(path = %path.display(), "config file not found, skipping");
                continue;
            }
            let config = Config::builder()
                .add_source(File::new(&path.to_string_lossy(), IndentedIni))
                .build()
                .map_err(|source| ConfigError::Load {
                    path: path.clone(),
                    source,
                })?;
            files.absorb(&config, path)?;
            files.paths.push(path.clone());
            debug!(path = %path.display(), "loaded config file");
        }
        Ok(files)
    }

    /// Parses INI text, mostly for tests and embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the text is not valid INI.
    pub fn from_ini_str(text: &str) -> Result<Self> {
        let origin = Path::new("<inline>");
        let config = Config::builder()
            .add_source(File::from_str(text, IndentedIni))
            .build()
            .map_err(|source| ConfigError::Load {
                path: origin.to_path_buf(),
                source,
            })?;
        let mut files = Self::empty();
        files.absorb(&config, origin)?;
        Ok(files)
    }

    fn absorb(&mut self, config: &Config, path: &Path) -> Result<()> {
        let load_error = |source| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        };
        for (name, value) in config.collect().map_err(load_error)? {
            // Keys outside any section have no command to apply to.
            let Ok(table) = value.into_table() else {
                continue;
            };
            let section = self.sections.entry(name).or_default();
            for (key, value) in table {
                section.insert(key, Value::into_string(value).map_err(load_error)?);
            }
        }
        Ok(())
    }

    /// Key/value pairs of `name`, sorted by key. Empty if absent.
    pub fn section(&self, name: &str) -> impl Iterator<Item = (&str, &str)> {
        self.sections
            .get(name)
            .into_iter()
            .flat_map(|section| section.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Files that were actually loaded.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_stripped_and_lowercased() {
        let env = Environment::from_pairs([
            ("PIPKIT_DEFAULT_TIMEOUT", "30"),
            ("PIPKIT_PROXY", ""),
            ("PATH", "/usr/bin"),
            ("PIPKITX", "ignored"),
        ]);
        let options = env.prefixed().unwrap();
        assert_eq!(options.get("default_timeout").map(String::as_str), Some("30"));
        assert_eq!(options.get("proxy").map(String::as_str), Some(""));
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_non_empty() {
        let env = Environment::default().with("VIRTUAL_ENV", "");
        assert_eq!(env.get("VIRTUAL_ENV"), Some(""));
        assert_eq!(env.non_empty("VIRTUAL_ENV"), None);
    }

    #[test]
    fn test_load_skips_missing_and_merges_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.conf");
        let second = dir.path().join("second.conf");
        std::fs::write(&first, "[global]\ntimeout = 10\nproxy = a:1\n").unwrap();
        std::fs::write(&second, "[global]\ntimeout = 20\n").unwrap();

        let files = ConfigFiles::load(&[first.clone(), dir.path().join("missing.conf"), second.clone()]).unwrap();
        let global: Vec<_> = files.section("global").collect();
        assert_eq!(global, vec![("proxy", "a:1"), ("timeout", "20")]);
        assert_eq!(files.paths(), &[first, second]);
    }

    #[test]
    fn test_unparseable_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.conf");
        std::fs::write(&path, "[global\ntimeout = 10\n").unwrap();

        let err = ConfigFiles::load(&[path.clone()]).unwrap_err();
        assert!(matches!(err, ConfigError::Load { path: p, .. } if p == path));
    }

    #[test]
    fn test_indented_lines_continue_the_value() {
        let files = ConfigFiles::from_ini_str(
            "[freeze]\nfind-links =\n    http://a\n    http://b\nfind-tags = yes\n",
        )
        .unwrap();
        let freeze: Vec<_> = files.section("freeze").collect();
        assert_eq!(freeze.len(), 2, "{freeze:?}");
        let (key, links) = freeze[0];
        assert_eq!(key, "find-links");
        assert_eq!(links.split_whitespace().collect::<Vec<_>>(), ["http://a", "http://b"]);
        assert_eq!(freeze[1], ("find-tags", "yes"));
    }

    #[test]
    fn test_backslashes_are_literal() {
        let files = ConfigFiles::from_ini_str("[global]\nlog = C:\\Temp\\pipkit.log\n").unwrap();
        assert_eq!(files.section("global").collect::<Vec<_>>(), vec![("log", "C:\\Temp\\pipkit.log")]);
    }

    #[test]
    fn test_root_keys_are_ignored() {
        let files = ConfigFiles::from_ini_str("stray = 1\n[global]\nlog = /tmp/x\n").unwrap();
        assert_eq!(files.section("global").count(), 1);
        assert_eq!(files.section("stray").count(), 0);
    }
}
