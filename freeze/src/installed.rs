//! Discovery of installed distributions in site-packages directories.
//!
//! Three layouts are recognised:
//!
//! - `<name>-<version>.dist-info/METADATA`
//! - `<name>-<version>[-py<X.Y>].egg-info`, either a `PKG-INFO` file
//!   itself or a directory holding one
//! - `<name>.egg-link`, a develop install whose first line points at the
//!   checkout; metadata comes from the checkout's `*.egg-info`

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use glob::{Pattern, glob};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{FreezeError, Result};
use crate::Distribution;

static EGG_INFO_PY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-py(\d+\.\d+)\.egg-info$").expect("static regex must compile"));

const DEPENDENCY_LINKS: &str = "dependency_links.txt";

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| FreezeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let io_error = |source| FreezeError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        entries.push(entry.map_err(io_error)?.path());
    }
    entries.sort();
    Ok(entries)
}

/// `Name` and `Version` headers of a metadata file.
fn parse_metadata(text: &str) -> (Option<String>, Option<String>) {
    let mut name = None;
    let mut version = None;
    for line in text.lines() {
        if line.trim().is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            match key.trim() {
                "Name" => name = Some(value.trim().to_string()),
                "Version" => version = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }
    (name, version)
}

fn read_links(dir: &Path) -> Result<Vec<String>> {
    let path = dir.join(DEPENDENCY_LINKS);
    if !path.is_file() {
        return Ok(Vec::new());
    }
    Ok(read(&path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

/// Reads an `.egg-info` entry (file or directory) for a distribution
/// whose code lives at `location`.
fn from_egg_info(egg_info: &Path, location: &Path) -> Result<Option<Distribution>> {
    let (pkg_info, links) = if egg_info.is_dir() {
        (egg_info.join("PKG-INFO"), read_links(egg_info)?)
    } else {
        (egg_info.to_path_buf(), Vec::new())
    };
    if !pkg_info.is_file() {
        warn!(path = %egg_info.display(), "egg-info without PKG-INFO, skipping");
        return Ok(None);
    }

    let (Some(name), version) = parse_metadata(&read(&pkg_info)?) else {
        warn!(path = %pkg_info.display(), "metadata has no Name header, skipping");
        return Ok(None);
    };
    let mut dist = Distribution::new(&name, &version.unwrap_or_default(), location)
        .with_dependency_links(links);
    if let Some(caps) = EGG_INFO_PY_RE.captures(file_name(egg_info)) {
        dist = dist.with_py_version(&caps[1]);
    }
    Ok(Some(dist))
}

fn from_dist_info(dist_info: &Path, location: &Path) -> Result<Option<Distribution>> {
    let metadata = dist_info.join("METADATA");
    if !metadata.is_file() {
        warn!(path = %dist_info.display(), "dist-info without METADATA, skipping");
        return Ok(None);
    }
    let (Some(name), version) = parse_metadata(&read(&metadata)?) else {
        warn!(path = %metadata.display(), "metadata has no Name header, skipping");
        return Ok(None);
    };
    Ok(Some(
        Distribution::new(&name, &version.unwrap_or_default(), location)
            .with_dependency_links(read_links(dist_info)?),
    ))
}

fn from_egg_link(egg_link: &Path) -> Result<Option<Distribution>> {
    let contents = read(egg_link)?;
    let Some(target) = contents.lines().map(str::trim).find(|line| !line.is_empty()) else {
        warn!(path = %egg_link.display(), "empty egg-link, skipping");
        return Ok(None);
    };
    let base = egg_link.parent().unwrap_or(Path::new("."));
    let checkout = base.join(target);
    if !checkout.is_dir() {
        warn!(path = %checkout.display(), "egg-link target missing, skipping");
        return Ok(None);
    }

    let egg_info = sorted_entries(&checkout)?
        .into_iter()
        .find(|entry| file_name(entry).ends_with(".egg-info"));
    match egg_info {
        Some(egg_info) => from_egg_info(&egg_info, &checkout),
        None => {
            warn!(path = %checkout.display(), "develop checkout has no egg-info, skipping");
            Ok(None)
        }
    }
}

/// Finds every distribution installed under `site_dirs`.
///
/// Directories that do not exist are skipped. Results are sorted by
/// distribution key; when a key appears twice the first one found wins,
/// following the order of `site_dirs`.
///
/// # Errors
///
/// Returns [`FreezeError::Io`] if a directory or metadata file exists but
/// cannot be read.
pub fn find_distributions(site_dirs: &[PathBuf]) -> Result<Vec<Distribution>> {
    let mut found: BTreeMap<String, Distribution> = BTreeMap::new();

    for dir in site_dirs {
        if !dir.is_dir() {
            debug!(path = %dir.display(), "site directory not found, skipping");
            continue;
        }
        for entry in sorted_entries(dir)? {
            let name = file_name(&entry);
            let dist = if name.ends_with(".dist-info") {
                from_dist_info(&entry, dir)?
            } else if name.ends_with(".egg-info") {
                from_egg_info(&entry, dir)?
            } else if name.ends_with(".egg-link") {
                from_egg_link(&entry)?
            } else {
                None
            };
            if let Some(dist) = dist {
                found.entry(dist.key()).or_insert(dist);
            }
        }
    }

    Ok(found.into_values().collect())
}

/// Expands `<prefix>/lib/*/site-packages`.
///
/// The prefix itself is matched literally. A prefix that is not valid
/// UTF-8 yields nothing.
pub fn site_packages_dirs(prefix: &Path) -> Vec<PathBuf> {
    let Some(prefix) = prefix.to_str() else {
        return Vec::new();
    };
    let pattern = Path::new(&Pattern::escape(prefix))
        .join("lib")
        .join("*")
        .join("site-packages");
    let Some(pattern) = pattern.to_str() else {
        return Vec::new();
    };
    let Ok(paths) = glob(pattern) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = paths
        .filter_map(std::result::Result::ok)
        .filter(|dir| dir.is_dir())
        .collect();
    dirs.sort();
    dirs
}
