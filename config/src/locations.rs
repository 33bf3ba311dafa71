//! Default file locations.

use std::path::PathBuf;

use crate::sources::Environment;

/// Environment variable naming an explicit config file.
pub const CONFIG_FILE_ENV: &str = "PIPKIT_CONFIG_FILE";

const APP_DIR: &str = "pipkit";
const CONFIG_FILE_NAME: &str = "pipkit.conf";
const LOG_DIR: &str = ".pipkit";
const LOG_FILE_NAME: &str = "pipkit.log";

/// The per-user config file, `<config dir>/pipkit/pipkit.conf`.
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
}

/// Config files to read, in override order.
///
/// A [`CONFIG_FILE_ENV`] naming an existing file replaces the default
/// location entirely.
pub fn config_files(env: &Environment) -> Vec<PathBuf> {
    if let Some(explicit) = env.non_empty(CONFIG_FILE_ENV).map(PathBuf::from) {
        if explicit.is_file() {
            return vec![explicit];
        }
    }
    default_config_file().into_iter().collect()
}

/// Where the complete log is stored when a run fails,
/// `<home>/.pipkit/pipkit.log`.
pub fn default_log_file(env: &Environment) -> PathBuf {
    let home = env
        .non_empty("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    home.join(LOG_DIR).join(LOG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_file_wins() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let env = Environment::default().with(CONFIG_FILE_ENV, &file.path().to_string_lossy());
        assert_eq!(config_files(&env), vec![file.path().to_path_buf()]);
    }

    #[test]
    fn test_missing_explicit_file_falls_back() {
        let env = Environment::default().with(CONFIG_FILE_ENV, "/definitely/not/here.conf");
        assert_eq!(config_files(&env), default_config_file().into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_log_file_under_home() {
        let env = Environment::default().with("HOME", "/home/me");
        assert_eq!(
            default_log_file(&env),
            PathBuf::from("/home/me/.pipkit/pipkit.log")
        );
    }
}
