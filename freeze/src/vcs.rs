//! Version-control backends and their registration table.
//!
//! Concrete backends live outside this crate; they implement
//! [`VcsBackend`] and are registered into a [`VcsRegistry`] once at
//! startup.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::Distribution;

/// Backend consulted for distributions whose version carries a legacy
/// revision or date marker.
pub const LEGACY_BACKEND: &str = "svn";

static EGG_FRAGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#egg=([^&]*)").expect("static regex must compile"));

/// A version-control system able to recognise and describe checkouts.
pub trait VcsBackend: Send + Sync {
    /// Registry key, e.g. `git` or `svn`.
    fn name(&self) -> &str;

    /// Returns `true` if `location` is a checkout managed by this backend.
    fn owns(&self, location: &Path) -> bool;

    /// Builds `<repository url>@<revision>#egg=<egg name>` for a checkout,
    /// or `None` if the repository location cannot be determined.
    fn source_requirement(&self, dist: &Distribution, location: &Path, find_tags: bool) -> Option<String>;

    /// Finds the repository URL of a distribution that was installed from
    /// a checkout but no longer lives in one.
    fn legacy_location(&self, dist: &Distribution, dependency_links: &[String]) -> Option<String> {
        scan_dependency_links(dist, dependency_links)
    }
}

/// Looks for a dependency link whose `#egg=` fragment names `dist`.
///
/// The fragment's last `-`-separated part is taken as the version and
/// dropped; the rest, lowercased, must equal the distribution key. Returns
/// the URL without its fragment.
///
/// # Examples
///
/// ```
/// use pipkit_freeze::{Distribution, scan_dependency_links};
///
/// let dist = Distribution::new("Paste", "1.7-r7300", "/tmp");
/// let links = vec![
///     "http://example.com/other#egg=Other-1.0".to_string(),
///     "http://svn.pythonpaste.org/Paste/trunk#egg=Paste-dev".to_string(),
/// ];
/// assert_eq!(
///     scan_dependency_links(&dist, &links).as_deref(),
///     Some("http://svn.pythonpaste.org/Paste/trunk")
/// );
/// ```
pub fn scan_dependency_links(dist: &Distribution, dependency_links: &[String]) -> Option<String> {
    let wanted = dist.key();
    dependency_links.iter().find_map(|url| {
        let fragment = EGG_FRAGMENT_RE.captures(url)?.get(1)?.as_str();
        if fragment.is_empty() {
            return None;
        }
        let key = match fragment.rsplit_once('-') {
            Some((name, _version)) => name.to_lowercase(),
            None => fragment.to_string(),
        };
        if key != wanted {
            return None;
        }
        let base = url.split_once('#').map_or(url.as_str(), |(base, _)| base);
        Some(base.to_string())
    })
}

/// Ordered table of registered backends.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use pipkit_freeze::{Distribution, VcsBackend, VcsRegistry};
///
/// struct Hg;
///
/// impl VcsBackend for Hg {
///     fn name(&self) -> &str { "hg" }
///     fn owns(&self, location: &Path) -> bool { location.join(".hg").is_dir() }
///     fn source_requirement(&self, _: &Distribution, _: &Path, _: bool) -> Option<String> { None }
/// }
///
/// let registry = VcsRegistry::new().with(Hg);
/// assert_eq!(registry.names(), vec!["hg"]);
/// assert!(registry.get("git").is_none());
/// ```
#[derive(Default)]
pub struct VcsRegistry {
    backends: Vec<Box<dyn VcsBackend>>,
}

impl std::fmt::Debug for VcsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VcsRegistry")
            .field("backends", &self.names())
            .finish()
    }
}

impl VcsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a backend, replacing any backend of the same name in
    /// place.
    pub fn register(&mut self, backend: Box<dyn VcsBackend>) {
        match self.backends.iter_mut().find(|b| b.name() == backend.name()) {
            Some(slot) => *slot = backend,
            None => self.backends.push(backend),
        }
    }

    pub fn with(mut self, backend: impl VcsBackend + 'static) -> Self {
        self.register(Box::new(backend));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn VcsBackend> {
        self.backends
            .iter()
            .find(|b| b.name() == name)
            .map(|b| b.as_ref())
    }

    /// First backend, in registration order, that owns `location`.
    pub fn owner_of(&self, location: &Path) -> Option<&dyn VcsBackend> {
        self.backends
            .iter()
            .find(|b| b.owns(location))
            .map(|b| b.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
