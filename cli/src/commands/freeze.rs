//! The `freeze` command.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use pipkit_core::{CommandSpec, ExitStatus, OptionSpec};
use pipkit_freeze::{FrozenRequirement, find_distributions, site_packages_dirs};
use tracing::debug;

use super::{Command, RunContext};
use crate::error::CommandError;

const VIRTUAL_ENV: &str = "VIRTUAL_ENV";

/// `pipkit freeze`: prints installed distributions as requirement lines.
pub struct FreezeCommand;

impl FreezeCommand {
    fn site_dirs(ctx: &RunContext<'_>) -> Result<Vec<PathBuf>, CommandError> {
        let explicit: Vec<PathBuf> = ctx.options.list("path").iter().map(PathBuf::from).collect();
        if !explicit.is_empty() {
            return Ok(explicit);
        }
        let dirs = ctx
            .env
            .non_empty(VIRTUAL_ENV)
            .map(|prefix| site_packages_dirs(Path::new(prefix)))
            .unwrap_or_default();
        if dirs.is_empty() {
            return Err(CommandError::Command(
                "no site-packages directory found; pass --path or activate a virtualenv".to_string(),
            ));
        }
        Ok(dirs)
    }
}

impl Command for FreezeCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new("freeze", "Output installed packages in requirements format")
            .with_usage("pipkit freeze [options]")
            .with_option(
                OptionSpec::append("--find-links", "find_links")
                    .alias("-f")
                    .with_metavar("URL")
                    .with_help("URL for finding packages, which will be added to the output"),
            )
            .with_option(
                OptionSpec::append("--path", "path")
                    .with_metavar("DIR")
                    .with_help("Site-packages directory to scan (default: the active virtualenv)"),
            )
            .with_option(
                OptionSpec::switch("--find-tags", "find_tags")
                    .with_help("Find tags for editable requirements in version control"),
            )
            .with_option(OptionSpec::switch("--json", "json").with_help("Emit a JSON array of requirements"))
    }

    fn run(&self, ctx: &mut RunContext<'_>) -> Result<Option<ExitStatus>, CommandError> {
        let site_dirs = Self::site_dirs(ctx)?;
        let dists = find_distributions(&site_dirs).context("reading installed distributions")?;
        debug!("found {} distributions in {} directories", dists.len(), site_dirs.len());

        let mut links: Vec<String> = ctx.options.list("find_links").to_vec();
        links.extend(dists.iter().flat_map(|dist| dist.dependency_links.iter().cloned()));
        let find_tags = ctx.options.flag("find_tags");

        let mut frozen = Vec::with_capacity(dists.len());
        for dist in &dists {
            ctx.check_cancelled()?;
            let requirement = FrozenRequirement::from_dist(dist, ctx.vcs, &links, find_tags)
                .with_context(|| format!("freezing {}", dist.project_name))?;
            frozen.push(requirement);
        }

        if ctx.options.flag("json") {
            let json = serde_json::to_string_pretty(&frozen).context("serializing requirements")?;
            writeln!(ctx.out, "{json}").context("writing output")?;
        } else {
            for link in ctx.options.list("find_links") {
                writeln!(ctx.out, "-f {link}").context("writing output")?;
            }
            for requirement in &frozen {
                write!(ctx.out, "{requirement}").context("writing output")?;
            }
        }
        Ok(None)
    }
}
