//! Requirement reconstruction from installed distributions.
//!
//! [`FrozenRequirement::from_dist`] decides whether an installed
//! [`Distribution`] came from a version-control checkout or a release and
//! renders a requirement line that reinstalls it:
//!
//! - a checkout owned by a registered [`VcsBackend`] becomes
//!   `-e <url>@<revision>#egg=<egg name>`
//! - a release becomes `name==version`
//! - a release whose version ends in a legacy `-r<digits>` or
//!   `-<yyyymmdd>` marker is turned back into an editable checkout when
//!   its repository can be found in the dependency links
//!
//! [`find_distributions`] scans site-packages directories for the
//! distributions to freeze.
//!
//! # Example
//!
//! ```
//! use pipkit_freeze::{Distribution, FrozenRequirement, VcsRegistry};
//!
//! let registry = VcsRegistry::new();
//! let dist = Distribution::new("name", "1.2-r45", "/srv/venv/lib/python3.12/site-packages");
//! let frozen = FrozenRequirement::from_dist(&dist, &registry, &[], false).unwrap();
//! assert_eq!(
//!     frozen.to_string(),
//!     "## FIXME: could not find source URL in dependency_links for this package:\nname==1.2-r45\n"
//! );
//! ```

mod distribution;
mod error;
mod frozen;
mod installed;
mod vcs;

pub use distribution::{Distribution, safe_name, safe_version, to_filename};
pub use error::{FreezeError, Result};
pub use frozen::FrozenRequirement;
pub use installed::{find_distributions, site_packages_dirs};
pub use vcs::{LEGACY_BACKEND, VcsBackend, VcsRegistry, scan_dependency_links};
