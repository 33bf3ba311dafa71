//! Requirement reconstruction for installed distributions.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FreezeError, Result};
use crate::vcs::{LEGACY_BACKEND, VcsRegistry};
use crate::Distribution;

static REVISION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-r(\d+)$").expect("static regex must compile"));
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(20\d{6})$").expect("static regex must compile"));
static PY_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-py\d+\.\d+$").expect("static regex must compile"));

const UNKNOWN_REPOSITORY: &str = "## !! Could not determine repository location";
const MISSING_SOURCE_URL: &str =
    "## FIXME: could not find source URL in dependency_links for this package:";

/// A requirement line rebuilt from installed state.
///
/// An editable requirement points at a checkout
/// (`<url>@<revision>#egg=<egg name>`); any other requirement is exactly
/// `name==version`.
///
/// # Examples
///
/// ```
/// use pipkit_freeze::{Distribution, FrozenRequirement, VcsRegistry};
///
/// let dist = Distribution::new("requests", "2.31.0", "/srv/venv/lib/python3.12/site-packages");
/// let frozen = FrozenRequirement::from_dist(&dist, &VcsRegistry::new(), &[], false).unwrap();
/// assert!(!frozen.editable);
/// assert_eq!(frozen.to_string(), "requests==2.31.0\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrozenRequirement {
    pub name: String,
    pub req: String,
    pub editable: bool,
    /// Lines emitted above the requirement.
    pub comments: Vec<String>,
}

/// Revision part of a legacy version suffix: the digits of `-r<digits>`,
/// or `{<date>}` for `-<8-digit date>`. The revision form wins.
fn legacy_revision(version: &str) -> Option<String> {
    if let Some(caps) = REVISION_RE.captures(version) {
        return Some(caps[1].to_string());
    }
    DATE_RE
        .captures(version)
        .map(|caps| format!("{{{}}}", &caps[1]))
}

impl FrozenRequirement {
    pub fn new(name: &str, req: &str, editable: bool, comments: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            req: req.to_string(),
            editable,
            comments,
        }
    }

    /// Rebuilds the requirement for `dist`.
    ///
    /// A distribution living in a checkout owned by a registered backend
    /// becomes an editable requirement from that backend. Otherwise it is
    /// pinned to its version; a version ending in a legacy revision or date
    /// marker is turned back into an editable checkout when the
    /// [`LEGACY_BACKEND`] can find its repository in `dependency_links`.
    ///
    /// # Errors
    ///
    /// Returns [`FreezeError::UnpinnedDistribution`] if a non-VCS
    /// distribution does not pin exactly one version.
    pub fn from_dist(
        dist: &Distribution,
        registry: &VcsRegistry,
        dependency_links: &[String],
        find_tags: bool,
    ) -> Result<Self> {
        let location = std::path::absolute(&dist.location).unwrap_or_else(|_| dist.location.clone());
        let mut comments = Vec::new();

        if let Some(backend) = registry.owner_of(&location) {
            if let Some(req) = backend.source_requirement(dist, &location, find_tags) {
                return Ok(Self::new(&dist.project_name, &req, true, comments));
            }
            warn!("Could not determine repository location of {}", location.display());
            comments.push(UNKNOWN_REPOSITORY.to_string());
            return Ok(Self::new(&dist.project_name, &dist.as_requirement(), false, comments));
        }

        let specifiers = dist.specifiers();
        if !matches!(specifiers.as_slice(), [("==", _)]) {
            return Err(FreezeError::UnpinnedDistribution {
                name: dist.project_name.clone(),
                specifiers: specifiers.len(),
            });
        }
        let pin = dist.as_requirement();

        let Some(revision) = legacy_revision(&dist.version) else {
            return Ok(Self::new(&dist.project_name, &pin, false, comments));
        };

        let source = registry
            .get(LEGACY_BACKEND)
            .and_then(|backend| backend.legacy_location(dist, dependency_links));
        match source {
            Some(url) => {
                comments.push(format!("# Installing as editable to satisfy requirement {pin}:"));
                let req = format!("{url}@{revision}#egg={}", Self::egg_name(dist));
                Ok(Self::new(&dist.project_name, &req, true, comments))
            }
            None => {
                warn!("cannot find source location for {pin}");
                comments.push(MISSING_SOURCE_URL.to_string());
                Ok(Self::new(&dist.project_name, &pin, false, comments))
            }
        }
    }

    /// The distribution's egg name without its interpreter tag.
    ///
    /// ```
    /// use pipkit_freeze::{Distribution, FrozenRequirement};
    ///
    /// let dist = Distribution::new("foo-bar", "1.0", "/tmp").with_py_version("3.12");
    /// assert_eq!(FrozenRequirement::egg_name(&dist), "foo_bar-1.0");
    /// ```
    pub fn egg_name(dist: &Distribution) -> String {
        let name = dist.egg_name();
        PY_TAG_RE.replace(&name, "").into_owned()
    }
}

impl fmt::Display for FrozenRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for comment in &self.comments {
            writeln!(f, "{comment}")?;
        }
        if self.editable {
            f.write_str("-e ")?;
        }
        writeln!(f, "{}", self.req)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::VcsBackend;

    struct FakeGit {
        url: Option<&'static str>,
    }

    impl VcsBackend for FakeGit {
        fn name(&self) -> &str {
            "git"
        }

        fn owns(&self, location: &Path) -> bool {
            location.ends_with("checkout")
        }

        fn source_requirement(&self, dist: &Distribution, _location: &Path, find_tags: bool) -> Option<String> {
            let rev = if find_tags { "v1.0" } else { "abc123" };
            self.url
                .map(|url| format!("{url}@{rev}#egg={}", FrozenRequirement::egg_name(dist)))
        }
    }

    struct FakeSvn;

    impl VcsBackend for FakeSvn {
        fn name(&self) -> &str {
            LEGACY_BACKEND
        }

        fn owns(&self, _location: &Path) -> bool {
            false
        }

        fn source_requirement(&self, _dist: &Distribution, _location: &Path, _find_tags: bool) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_vcs_checkout_is_editable() {
        let registry = VcsRegistry::new().with(FakeGit { url: Some("git+https://example.com/foo.git") });
        let dist = Distribution::new("foo", "1.0", "/src/checkout");
        let frozen = FrozenRequirement::from_dist(&dist, &registry, &[], false).unwrap();

        assert!(frozen.editable);
        assert!(frozen.comments.is_empty());
        assert_eq!(
            frozen.to_string(),
            "-e git+https://example.com/foo.git@abc123#egg=foo-1.0\n"
        );
    }

    #[test]
    fn test_find_tags_is_passed_to_backend() {
        let registry = VcsRegistry::new().with(FakeGit { url: Some("git+https://h/foo.git") });
        let dist = Distribution::new("foo", "1.0", "/src/checkout");
        let frozen = FrozenRequirement::from_dist(&dist, &registry, &[], true).unwrap();
        assert!(frozen.req.contains("@v1.0#"));
    }

    #[test]
    fn test_unknown_repository_falls_back_to_pin() {
        let registry = VcsRegistry::new().with(FakeGit { url: None });
        let dist = Distribution::new("foo", "1.0", "/src/checkout");
        let frozen = FrozenRequirement::from_dist(&dist, &registry, &[], false).unwrap();

        assert!(!frozen.editable);
        assert_eq!(
            frozen.to_string(),
            "## !! Could not determine repository location\nfoo==1.0\n"
        );
    }

    #[test]
    fn test_plain_release_is_pinned() {
        let dist = Distribution::new("name", "1.2.3", "/site-packages");
        let frozen = FrozenRequirement::from_dist(&dist, &VcsRegistry::new(), &[], false).unwrap();
        assert_eq!(frozen.to_string(), "name==1.2.3\n");
    }

    #[test]
    fn test_revision_marker_without_location() {
        let registry = VcsRegistry::new().with(FakeSvn);
        let dist = Distribution::new("name", "1.2-r45", "/site-packages");
        let frozen = FrozenRequirement::from_dist(&dist, &registry, &[], false).unwrap();

        assert!(!frozen.editable);
        assert_eq!(
            frozen.to_string(),
            "## FIXME: could not find source URL in dependency_links for this package:\nname==1.2-r45\n"
        );
    }

    #[test]
    fn test_revision_marker_without_legacy_backend() {
        let dist = Distribution::new("name", "1.2-r45", "/site-packages");
        let frozen = FrozenRequirement::from_dist(&dist, &VcsRegistry::new(), &[], false).unwrap();
        assert_eq!(frozen.comments, vec![MISSING_SOURCE_URL.to_string()]);
        assert_eq!(frozen.req, "name==1.2-r45");
    }

    #[test]
    fn test_revision_marker_with_location() {
        let registry = VcsRegistry::new().with(FakeSvn);
        let dist = Distribution::new("Paste", "1.7-r7300", "/site-packages").with_py_version("2.7");
        let links = vec!["http://svn.example.com/Paste/trunk#egg=Paste-dev".to_string()];
        let frozen = FrozenRequirement::from_dist(&dist, &registry, &links, false).unwrap();

        assert!(frozen.editable);
        assert_eq!(
            frozen.to_string(),
            "# Installing as editable to satisfy requirement Paste==1.7-r7300:\n\
             -e http://svn.example.com/Paste/trunk@7300#egg=Paste-1.7_r7300\n"
        );
    }

    #[test]
    fn test_date_marker_with_location() {
        let registry = VcsRegistry::new().with(FakeSvn);
        let dist = Distribution::new("foo", "0.1dev-20080101", "/site-packages");
        let links = vec!["http://svn/foo#egg=foo-dev".to_string()];
        let frozen = FrozenRequirement::from_dist(&dist, &registry, &links, false).unwrap();
        assert_eq!(frozen.req, "http://svn/foo@{20080101}#egg=foo-0.1dev_20080101");
    }

    #[test]
    fn test_revision_marker_takes_priority() {
        assert_eq!(legacy_revision("1.0-r20080101").as_deref(), Some("20080101"));
        assert_eq!(legacy_revision("1.0-20080101").as_deref(), Some("{20080101}"));
        assert_eq!(legacy_revision("1.0-19991231"), None);
        assert_eq!(legacy_revision("1.0"), None);
    }

    #[test]
    fn test_unpinned_distribution_is_an_error() {
        let dist = Distribution::new("foo", "", "/site-packages");
        let err = FrozenRequirement::from_dist(&dist, &VcsRegistry::new(), &[], false).unwrap_err();
        assert!(matches!(err, FreezeError::UnpinnedDistribution { specifiers: 0, .. }));
    }

    #[test]
    fn test_egg_name_strips_only_trailing_py_tag() {
        let tagged = Distribution::new("foo", "1.0", "/tmp").with_py_version("3.12");
        assert_eq!(FrozenRequirement::egg_name(&tagged), "foo-1.0");
        let untagged = Distribution::new("foo", "1.0", "/tmp");
        assert_eq!(FrozenRequirement::egg_name(&untagged), "foo-1.0");
    }
}
