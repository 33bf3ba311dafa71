//! Parser nodes: ordered option specs plus titled groups.

use std::sync::Arc;

use crate::OptionSpec;

/// A titled group of options, rendered as its own help section.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionGroup {
    pub title: String,
    pub options: Vec<Arc<OptionSpec>>,
}

impl OptionGroup {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            options: Vec::new(),
        }
    }

    /// Adds a spec to the group, returning the group for chaining.
    pub fn with_option(mut self, spec: OptionSpec) -> Self {
        self.options.push(Arc::new(spec));
        self
    }
}

/// One parser scope: the global node or a single command's node.
///
/// Specs are held through `Arc` and never mutated, so copying a node is
/// cheap and the copy owns its own `Vec`s. Adding or removing options on
/// one node never changes another.
///
/// # Examples
///
/// ```
/// use pipkit_core::{OptionGroup, OptionSpec, ParserNode};
///
/// let mut node = ParserNode::new("freeze");
/// node.add_option(OptionSpec::switch("--find-tags", "find_tags"));
/// node.add_group(
///     OptionGroup::new("Command options")
///         .with_option(OptionSpec::append("--find-links", "find_links").alias("-f")),
/// );
///
/// assert_eq!(node.all_options().count(), 2);
/// assert!(node.find_flag("-f").is_some());
/// assert_eq!(node.destinations(), vec!["find_tags", "find_links"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParserNode {
    pub name: String,
    pub usage: Option<String>,
    pub description: Option<String>,
    /// Ungrouped specs, in declaration order.
    pub options: Vec<Arc<OptionSpec>>,
    pub groups: Vec<OptionGroup>,
    interspersed: bool,
}

impl ParserNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            usage: None,
            description: None,
            options: Vec::new(),
            groups: Vec::new(),
            interspersed: true,
        }
    }

    pub fn with_usage(mut self, usage: &str) -> Self {
        self.usage = Some(usage.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Adds an ungrouped spec and returns the shared handle to it.
    pub fn add_option(&mut self, spec: OptionSpec) -> Arc<OptionSpec> {
        let spec = Arc::new(spec);
        self.options.push(Arc::clone(&spec));
        spec
    }

    /// Adds an already shared spec without copying it.
    pub fn add_shared(&mut self, spec: Arc<OptionSpec>) {
        self.options.push(spec);
    }

    pub fn add_group(&mut self, group: OptionGroup) {
        self.groups.push(group);
    }

    /// Stops option parsing at the first positional argument.
    ///
    /// Used by the global node so everything after the command name is
    /// left for the command's own parser.
    pub fn disable_interspersed_args(&mut self) {
        self.interspersed = false;
    }

    pub fn allows_interspersed(&self) -> bool {
        self.interspersed
    }

    /// Ungrouped specs first, then each group's specs in order.
    pub fn all_options(&self) -> impl Iterator<Item = &Arc<OptionSpec>> {
        self.options
            .iter()
            .chain(self.groups.iter().flat_map(|group| group.options.iter()))
    }

    /// Finds the spec that owns `flag` (any spelling).
    pub fn find_flag(&self, flag: &str) -> Option<&Arc<OptionSpec>> {
        self.all_options().find(|spec| spec.matches(flag))
    }

    pub fn find_dest(&self, dest: &str) -> Option<&Arc<OptionSpec>> {
        self.all_options().find(|spec| spec.dest() == Some(dest))
    }

    /// Every declared destination, in declaration order.
    pub fn destinations(&self) -> Vec<&str> {
        self.all_options().filter_map(|spec| spec.dest()).collect()
    }
}
