//! Network settings computed once per run from the merged options.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use pipkit_config::Environment;
use pipkit_core::ResolvedOptions;
use thiserror::Error;

/// Environment variable consulted when `--proxy` is not given.
pub const PROXY_ENV: &str = "HTTP_PROXY";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    #[error("invalid proxy '{proxy}': {reason}")]
    InvalidProxy { proxy: String, reason: String },

    #[error("invalid timeout: {0}")]
    InvalidTimeout(f64),
}

/// A proxy in the form `[scheme://][user[:password]@]host[:port]`.
///
/// # Examples
///
/// ```
/// use pipkit_cli::Proxy;
///
/// let proxy: Proxy = "alice:s3cret@proxy.example.com:3128".parse().unwrap();
/// assert_eq!(proxy.user.as_deref(), Some("alice"));
/// assert_eq!(proxy.port, Some(3128));
/// assert_eq!(proxy.to_string(), "alice:***@proxy.example.com:3128");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: String,
    pub port: Option<u16>,
}

impl FromStr for Proxy {
    type Err = NetworkError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| NetworkError::InvalidProxy {
            proxy: raw.to_string(),
            reason: reason.to_string(),
        };

        let rest = raw.trim();
        let rest = rest.split_once("://").map_or(rest, |(_, rest)| rest);
        let rest = rest.trim_end_matches('/');

        let (auth, server) = match rest.split_once('@') {
            Some((auth, server)) => (Some(auth), server),
            None => (None, rest),
        };
        let (user, password) = match auth {
            Some(auth) => match auth.split_once(':') {
                Some((user, password)) => (Some(user.to_string()), Some(password.to_string())),
                None => (Some(auth.to_string()), None),
            },
            None => (None, None),
        };

        let (host, port) = match server.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| invalid("port must be a number"))?;
                (host, Some(port))
            }
            None => (server, None),
        };
        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        Ok(Self {
            user,
            password,
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(user) = &self.user {
            f.write_str(user)?;
            if self.password.is_some() {
                f.write_str(":***")?;
            }
            f.write_str("@")?;
        }
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

/// Socket timeout, proxy and prompting policy for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSettings {
    /// `None` when the timeout is unset or zero: wait indefinitely.
    pub timeout: Option<Duration>,
    pub proxy: Option<Proxy>,
    /// Whether a command may prompt for input.
    pub prompting: bool,
}

impl NetworkSettings {
    /// Reads `timeout`, `proxy` and `no_input` from merged options,
    /// falling back to [`PROXY_ENV`] for the proxy.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] for a malformed proxy or a negative or
    /// non-finite timeout.
    pub fn from_options(options: &ResolvedOptions, env: &Environment) -> Result<Self, NetworkError> {
        let timeout = match options.float("timeout") {
            Some(seconds) => {
                let timeout =
                    Duration::try_from_secs_f64(seconds).map_err(|_| NetworkError::InvalidTimeout(seconds))?;
                Some(timeout).filter(|t| !t.is_zero())
            }
            None => None,
        };

        let proxy = options
            .text("proxy")
            .or_else(|| env.non_empty(PROXY_ENV))
            .map(str::parse)
            .transpose()?;

        Ok(Self {
            timeout,
            proxy,
            prompting: !options.flag("no_input"),
        })
    }
}
