use pipkit_config::{ConfigFiles, ConfigOptionParser, Environment, ResolveError, resolve, resolve_defaults};
use pipkit_core::{
    CommandSpec, OptionSpec, ParserNode, ValueSource, build_command_parser, global_parser,
};
use proptest::prelude::*;

fn freeze_node() -> ParserNode {
    let spec = CommandSpec::new("freeze", "Output installed packages.")
        .with_option(OptionSpec::append("--find-links", "find_links").alias("-f"))
        .with_option(OptionSpec::switch("--find-tags", "find_tags"));
    build_command_parser(&global_parser("/tmp/pipkit.log"), &spec).unwrap()
}

fn tokens(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_config_file_on_disk_feeds_command_node() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipkit.conf");
    std::fs::write(
        &path,
        "[global]\ntimeout = 30\nproxy = cfg:3128\n\n[freeze]\nfind-links = http://a http://b\n",
    )
    .unwrap();

    let env = Environment::default().with("PIPKIT_CONFIG_FILE", &path.to_string_lossy());
    let files = ConfigFiles::discover(&env).unwrap();
    assert_eq!(files.paths(), &[path]);

    let parsed = resolve(&freeze_node(), &files, &env, &tokens(&["--proxy", "cli:1"])).unwrap();
    assert_eq!(parsed.options.float("timeout"), Some(30.0));
    assert_eq!(parsed.options.text("proxy"), Some("cli:1"));
    assert_eq!(parsed.options.list("find_links"), ["http://a", "http://b"]);
}

#[test]
fn test_full_precedence_chain() {
    let node = freeze_node();
    let files = ConfigFiles::from_ini_str("[global]\nproxy = global:1\n[freeze]\nproxy = section:2\n").unwrap();

    let defaults = resolve_defaults(&node, &files, &Environment::default()).unwrap();
    assert_eq!(defaults.text("proxy"), Some("section:2"));

    let env = Environment::from_pairs([("PIPKIT_PROXY", "env:3")]);
    let defaults = resolve_defaults(&node, &files, &env).unwrap();
    assert_eq!(defaults.text("proxy"), Some("env:3"));

    let parsed = resolve(&node, &files, &env, &tokens(&["--proxy", "cli:4"])).unwrap();
    assert_eq!(parsed.options.text("proxy"), Some("cli:4"));
    assert_eq!(parsed.options.source("proxy"), Some(ValueSource::CommandLine));
}

#[test]
fn test_config_count_seeds_cli_counter() {
    let node = freeze_node();
    let files = ConfigFiles::from_ini_str("[global]\nverbose = yes\n").unwrap();
    let parsed = resolve(&node, &files, &Environment::default(), &tokens(&["-v"])).unwrap();
    assert_eq!(parsed.options.count("verbose"), 2);
}

#[test]
fn test_bad_config_value_is_config_error() {
    let node = freeze_node();
    let files = ConfigFiles::from_ini_str("[freeze]\ntimeout = soon\n").unwrap();
    let err = resolve(&node, &files, &Environment::default(), &[]).unwrap_err();
    assert!(matches!(err, ResolveError::Config(_)));
    assert_eq!(
        err.to_string(),
        "--timeout: invalid float literal (soon)"
    );
}

#[test]
fn test_repeated_parses_share_defaults() {
    let node = freeze_node();
    let files = ConfigFiles::from_ini_str("[global]\ntimeout = 30\n").unwrap();
    let env = Environment::default();
    let parser = ConfigOptionParser::new(&node, &files, &env);

    let first = parser.parse_args(&tokens(&["-v"])).unwrap();
    let second = parser.parse_args(&tokens(&["-v"])).unwrap();
    assert_eq!(first, second);
    assert_eq!(parser.get_default_values().unwrap().count("verbose"), 0);
}

fn layer() -> impl Strategy<Value = Option<u16>> {
    prop::option::of(1u16..1000)
}

proptest! {
    #[test]
    fn test_highest_present_source_wins(
        global in layer(),
        section in layer(),
        env in layer(),
        cli in layer(),
    ) {
        let node = freeze_node();
        let mut ini = String::new();
        if let Some(v) = global {
            ini.push_str(&format!("[global]\ntimeout = {v}\n"));
        }
        if let Some(v) = section {
            ini.push_str(&format!("[freeze]\ntimeout = {v}\n"));
        }
        let files = ConfigFiles::from_ini_str(&ini).unwrap();
        let environment = match env {
            Some(v) => Environment::from_pairs([("PIPKIT_TIMEOUT", v.to_string())]),
            None => Environment::default(),
        };
        let args = match cli {
            Some(v) => vec!["--timeout".to_string(), v.to_string()],
            None => Vec::new(),
        };

        let parsed = resolve(&node, &files, &environment, &args).unwrap();
        let expected = cli.or(env).or(section).or(global).map_or(15.0, f64::from);
        prop_assert_eq!(parsed.options.float("timeout"), Some(expected));
    }

    #[test]
    fn test_resolution_is_idempotent(
        timeout in 1u16..1000,
        verbose in 0usize..4,
        no_input in any::<bool>(),
    ) {
        let node = freeze_node();
        let files = ConfigFiles::from_ini_str(&format!("[global]\ntimeout = {timeout}\n")).unwrap();
        let env = Environment::from_pairs([("PIPKIT_NO_INPUT", if no_input { "yes" } else { "no" })]);
        let args: Vec<String> = std::iter::repeat("-v".to_string()).take(verbose).collect();

        let first = resolve(&node, &files, &env, &args).unwrap();
        let second = resolve(&node, &files, &env, &args).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.options.flag("no_input"), no_input);
        prop_assert_eq!(first.options.count("verbose") as usize, verbose);
    }
}
