//! Installed distribution metadata.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static UNSAFE_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9.]+").expect("static regex must compile"));

/// Replaces every run of characters other than letters, digits and `.`
/// with a single `-`.
///
/// # Examples
///
/// ```
/// use pipkit_freeze::safe_name;
///
/// assert_eq!(safe_name("zope interface"), "zope-interface");
/// assert_eq!(safe_name("my_pkg"), "my-pkg");
/// ```
pub fn safe_name(name: &str) -> String {
    UNSAFE_CHARS_RE.replace_all(name, "-").into_owned()
}

/// Like [`safe_name`], with spaces first turned into dots.
pub fn safe_version(version: &str) -> String {
    UNSAFE_CHARS_RE
        .replace_all(&version.replace(' ', "."), "-")
        .into_owned()
}

/// Turns `-` into `_` so the result can be used in a file name.
pub fn to_filename(name: &str) -> String {
    name.replace('-', "_")
}

/// One installed distribution.
///
/// `location` is where the importable code lives: the site-packages
/// directory for a regular install, the checkout for a develop install.
///
/// # Examples
///
/// ```
/// use pipkit_freeze::Distribution;
///
/// let dist = Distribution::new("My-Package", "1.0-r12", "/srv/venv/lib/python3.12/site-packages")
///     .with_py_version("3.12");
/// assert_eq!(dist.key(), "my-package");
/// assert_eq!(dist.egg_name(), "My_Package-1.0_r12-py3.12");
/// assert_eq!(dist.as_requirement(), "My-Package==1.0-r12");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub project_name: String,
    pub version: String,
    pub location: PathBuf,
    /// Interpreter tag the distribution was built for, e.g. `3.12`.
    pub py_version: Option<String>,
    /// Entries of the distribution's `dependency_links.txt`.
    pub dependency_links: Vec<String>,
}

impl Distribution {
    pub fn new(project_name: &str, version: &str, location: impl Into<PathBuf>) -> Self {
        Self {
            project_name: project_name.to_string(),
            version: version.to_string(),
            location: location.into(),
            py_version: None,
            dependency_links: Vec::new(),
        }
    }

    pub fn with_py_version(mut self, py_version: &str) -> Self {
        self.py_version = Some(py_version.to_string());
        self
    }

    pub fn with_dependency_links(mut self, links: Vec<String>) -> Self {
        self.dependency_links = links;
        self
    }

    /// Lowercased project name, used for lookups.
    pub fn key(&self) -> String {
        self.project_name.to_lowercase()
    }

    /// `<name>-<version>[-py<X.Y>]` with filename-safe parts.
    pub fn egg_name(&self) -> String {
        let mut name = format!(
            "{}-{}",
            to_filename(&safe_name(&self.project_name)),
            to_filename(&safe_version(&self.version))
        );
        if let Some(py) = &self.py_version {
            name.push_str("-py");
            name.push_str(py);
        }
        name
    }

    /// Version specifiers the distribution pins itself to.
    ///
    /// An installed distribution pins exactly its own version, or nothing
    /// when its metadata carries no version.
    pub fn specifiers(&self) -> Vec<(&str, &str)> {
        if self.version.is_empty() {
            Vec::new()
        } else {
            vec![("==", self.version.as_str())]
        }
    }

    /// `name==version`.
    pub fn as_requirement(&self) -> String {
        let specs: Vec<String> = self
            .specifiers()
            .into_iter()
            .map(|(op, version)| format!("{op}{version}"))
            .collect();
        format!("{}{}", self.project_name, specs.join(","))
    }
}
